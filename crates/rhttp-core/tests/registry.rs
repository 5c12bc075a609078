//! Integration test: log sink registry lifecycle against real files.

use rhttp_core::config::{LoggingConfig, RotationType};
use rhttp_core::sinks::{
    Destination, FileSink, Level, LogSinkRegistry, ResetTarget, Rotation, RotationInterval,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn file_config(dir: &Path) -> LoggingConfig {
    LoggingConfig {
        name: "app".into(),
        level: Level::Debug,
        file_path: Some(dir.join("app.log")),
        max_bytes: 1024 * 1024,
        backup_count: 2,
        include_caller: false,
        ..LoggingConfig::default()
    }
}

#[test]
fn repeated_lookup_does_not_duplicate_handlers() {
    let dir = tempdir().unwrap();
    let registry = LogSinkRegistry::new(file_config(dir.path()));
    let first = registry.default_entry();
    let second = registry.get_or_create("app");
    assert_eq!(second.destinations().len(), 2);
    assert_eq!(second.file_handler_count(), 1);
    assert_eq!(
        second.file_rotation(dir.path().join("app.log")),
        Some(Rotation::Size {
            max_bytes: 1024 * 1024,
            backup_count: 2
        })
    );
    first.info("hello");
    second.flush();
    let text = fs::read_to_string(dir.path().join("app.log")).unwrap();
    assert_eq!(text.lines().count(), 1);
}

#[test]
fn reconfigure_with_new_size_leaves_one_handler() {
    let dir = tempdir().unwrap();
    let registry = LogSinkRegistry::new(file_config(dir.path()));
    let path = dir.path().join("app.log");
    registry.get_or_create("app");

    let sink = FileSink::size_rotating(&path, 2048, 2);
    let entry = registry.reconfigure("app", Level::Warning, Some(&sink));
    assert_eq!(entry.file_handler_count(), 1);
    assert_eq!(entry.level(), Level::Warning);
    assert_eq!(
        entry.file_rotation(&path),
        Some(Rotation::Size {
            max_bytes: 2048,
            backup_count: 2
        })
    );
    entry.info("filtered");
    entry.error("kept");
    entry.flush();
    let text = fs::read_to_string(&path).unwrap();
    assert!(!text.contains("filtered"));
    assert!(text.contains(" - app - ERROR - kept"));
}

#[test]
fn instances_get_their_own_files() {
    let dir = tempdir().unwrap();
    let registry = LogSinkRegistry::new(file_config(dir.path()));
    let worker = registry.get_or_create("worker");
    worker.info_kernel("booted");
    worker.flush();
    let text = fs::read_to_string(dir.path().join("app_worker.log")).unwrap();
    assert!(text.contains(" - worker - INFO_KERNEL - booted"));
    assert!(!dir.path().join("app.log").exists());
}

#[test]
fn shared_log_is_appended_by_every_instance() {
    let dir = tempdir().unwrap();
    let cfg = LoggingConfig {
        multi_instance_shared_log: true,
        ..file_config(dir.path())
    };
    let registry = LogSinkRegistry::new(cfg);
    let a = registry.get_or_create("alpha");
    let b = registry.get_or_create("beta");
    let path = dir.path().join("app.log");
    assert_eq!(a.file_rotation(&path), Some(Rotation::None));
    assert_eq!(b.file_rotation(&path), Some(Rotation::None));
    for i in 0..5 {
        a.info(format!("a{i}"));
        b.info(format!("b{i}"));
    }
    a.flush();
    b.flush();
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 10);
    assert_eq!(text.matches(" - alpha - ").count(), 5);
    assert_eq!(text.matches(" - beta - ").count(), 5);
}

#[test]
fn reset_closes_and_rebuilds() {
    let dir = tempdir().unwrap();
    let registry = LogSinkRegistry::new(file_config(dir.path()));
    let old = registry.get_or_create("app");
    registry.get_or_create("worker");
    assert_eq!(registry.instance_names(), vec!["app", "worker"]);

    assert_eq!(registry.reset(ResetTarget::Instance("app")), 1);
    assert_eq!(old.destinations(), vec![Destination::Console]);
    assert_eq!(registry.instance_names(), vec!["worker"]);

    let fresh = registry.get_or_create("app");
    assert_eq!(fresh.file_handler_count(), 1);
    assert_eq!(old.file_handler_count(), 1);

    assert_eq!(registry.reset(ResetTarget::All), 2);
    assert!(registry.instance_names().is_empty());
}

#[test]
fn unusable_log_path_falls_back_to_console() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let cfg = LoggingConfig {
        file_path: Some(blocker.join("app.log")),
        ..file_config(dir.path())
    };
    let registry = LogSinkRegistry::new(cfg);
    let entry = registry.get_or_create("app");
    assert_eq!(entry.destinations(), vec![Destination::Console]);
    entry.error("still logging");
}

#[test]
fn caller_location_points_at_call_site() {
    let dir = tempdir().unwrap();
    let cfg = LoggingConfig {
        include_caller: true,
        ..file_config(dir.path())
    };
    let registry = LogSinkRegistry::new(cfg);
    let entry = registry.default_entry();
    let line = line!() + 1;
    entry.info_service("located");
    entry.flush();
    let text = fs::read_to_string(dir.path().join("app.log")).unwrap();
    assert!(
        text.contains(&format!(" - INFO_SERVICE - registry.rs:{} - located", line)),
        "{text}"
    );
}

#[test]
fn time_rotation_from_config() {
    let dir = tempdir().unwrap();
    let cfg = LoggingConfig {
        rotation_type: RotationType::Time,
        rotation_interval: RotationInterval::Hourly,
        ..file_config(dir.path())
    };
    let registry = LogSinkRegistry::new(cfg);
    let entry = registry.default_entry();
    assert_eq!(
        entry.file_rotation(dir.path().join("app.log")),
        Some(Rotation::Time {
            interval: RotationInterval::Hourly,
            backup_count: 2
        })
    );
}
