use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::HttpError;
use crate::request::{check_timeout, Headers};
use crate::retry::RetryConfig;
use crate::sinks::{CallerFormat, FileSink, Level, Rotation, RotationInterval, SinkSettings};

const MIB: u64 = 1024 * 1024;

/// HTTP client settings (`[http]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-attempt timeout in seconds.
    pub timeout: f64,
    pub connect_timeout: f64,
    /// Seconds without received data before an attempt is abandoned.
    pub read_timeout: f64,
    /// Retries after the first attempt (0 = single attempt).
    pub max_retries: u32,
    /// Base backoff delay in seconds.
    pub retry_delay: f64,
    pub retry_backoff_factor: f64,
    pub log_level: Level,
    pub log_requests: bool,
    pub log_responses: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<PathBuf>,
    pub log_file_max_size: u64,
    pub log_file_backup_count: usize,
    /// When false the log file is appended without rotation, so several
    /// clients can share one externally managed file.
    pub log_file_rotation_enabled: bool,
    /// Registry instance the client logs through.
    pub logger_name: String,
    pub user_agent: String,
    pub follow_redirects: bool,
    pub verify_ssl: bool,
    /// Extra headers sent with every request.
    pub headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: 30.0,
            connect_timeout: 10.0,
            read_timeout: 30.0,
            max_retries: 3,
            retry_delay: 1.0,
            retry_backoff_factor: 2.0,
            log_level: Level::InfoUtils,
            log_requests: true,
            log_responses: true,
            log_file_path: None,
            log_file_max_size: 10 * MIB,
            log_file_backup_count: 5,
            log_file_rotation_enabled: false,
            logger_name: "http_client".to_string(),
            user_agent: concat!("rhttp/", env!("CARGO_PKG_VERSION")).to_string(),
            follow_redirects: true,
            verify_ssl: true,
            headers: BTreeMap::new(),
        }
    }
}

/// Timeouts as durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub overall: Duration,
    pub connect: Duration,
    pub read: Duration,
}

fn positive_secs(name: &str, secs: f64) -> Result<Duration, HttpError> {
    if !(secs > 0.0) {
        return Err(HttpError::Validation(format!(
            "{} must be positive, got {}",
            name, secs
        )));
    }
    let timeout = Duration::try_from_secs_f64(secs)
        .map_err(|e| HttpError::Validation(format!("{} out of range: {}", name, e)))?;
    check_timeout(name, timeout)
}

impl ClientConfig {
    pub fn timeouts(&self) -> Result<Timeouts, HttpError> {
        Ok(Timeouts {
            overall: positive_secs("timeout", self.timeout)?,
            connect: positive_secs("connect_timeout", self.connect_timeout)?,
            read: positive_secs("read_timeout", self.read_timeout)?,
        })
    }

    pub fn retry_config(&self) -> Result<RetryConfig, HttpError> {
        RetryConfig::from_secs(self.max_retries, self.retry_delay, self.retry_backoff_factor)
    }

    /// File destination for request logs, if one is configured.
    pub fn log_file_sink(&self) -> Option<FileSink> {
        let path = self.log_file_path.as_ref()?;
        Some(if self.log_file_rotation_enabled {
            FileSink::size_rotating(path, self.log_file_max_size, self.log_file_backup_count)
        } else {
            FileSink::plain(path)
        })
    }

    /// Configured headers plus `User-Agent` when not set explicitly.
    pub fn default_headers(&self) -> Headers {
        let mut headers: Headers = self
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if !headers.contains("User-Agent") {
            headers.insert("User-Agent", self.user_agent.as_str());
        }
        headers
    }

    pub fn validate(&self) -> Result<(), HttpError> {
        self.timeouts()?;
        self.retry_config()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationType {
    #[default]
    Size,
    Time,
}

/// Registry defaults (`[logging]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Name of the default instance.
    pub name: String,
    pub level: Level,
    /// `None` logs to the console only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    pub max_bytes: u64,
    pub backup_count: usize,
    pub rotation_type: RotationType,
    pub rotation_interval: RotationInterval,
    pub include_caller: bool,
    /// Record the caller's absolute path instead of its file name.
    pub use_absolute_path: bool,
    /// Every instance appends to `file_path` without rotation.
    pub multi_instance_shared_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            name: "rhttp".to_string(),
            level: Level::Info,
            file_path: Some(PathBuf::from("logs/app.log")),
            max_bytes: 10 * MIB,
            backup_count: 5,
            rotation_type: RotationType::Size,
            rotation_interval: RotationInterval::Midnight,
            include_caller: true,
            use_absolute_path: false,
            multi_instance_shared_log: false,
        }
    }
}

/// `logs/app.log` + `worker` → `logs/app_worker.log`.
fn instance_path(base: &Path, instance: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, instance, ext.to_string_lossy()),
        None => format!("{}_{}", stem, instance),
    };
    base.with_file_name(name)
}

impl LoggingConfig {
    pub fn rotation(&self) -> Rotation {
        match self.rotation_type {
            RotationType::Size => Rotation::Size {
                max_bytes: self.max_bytes,
                backup_count: self.backup_count,
            },
            RotationType::Time => Rotation::Time {
                interval: self.rotation_interval,
                backup_count: self.backup_count,
            },
        }
    }

    pub fn caller_format(&self) -> CallerFormat {
        match (self.include_caller, self.use_absolute_path) {
            (false, _) => CallerFormat::Off,
            (true, false) => CallerFormat::FileName,
            (true, true) => CallerFormat::AbsolutePath,
        }
    }

    /// Settings for a new entry named `instance`.
    pub fn sink_settings_for(&self, instance: &str) -> SinkSettings {
        let file = self.file_path.as_ref().map(|base| {
            if self.multi_instance_shared_log {
                FileSink::plain(base)
            } else {
                let path = if instance == self.name {
                    base.clone()
                } else {
                    instance_path(base, instance)
                };
                FileSink {
                    path,
                    rotation: self.rotation(),
                }
            }
        });
        SinkSettings {
            level: self.level,
            file,
            caller: self.caller_format(),
        }
    }
}

/// Global configuration loaded from `~/.config/rhttp/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http: ClientConfig,
    pub logging: LoggingConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rhttp")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<Settings> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = Settings::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<Settings> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: Settings =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
