//! File handlers: plain append, size-based rotation and time-based rotation.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::handler::{Destination, Handler};

/// Calendar period for time-based rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationInterval {
    /// Roll over when the local date changes.
    #[default]
    Midnight,
    /// Roll over when the local hour changes.
    Hourly,
}

impl RotationInterval {
    fn period_key(self, at: DateTime<Local>) -> String {
        match self {
            RotationInterval::Midnight => at.format("%Y-%m-%d").to_string(),
            RotationInterval::Hourly => at.format("%Y-%m-%d_%H").to_string(),
        }
    }
}

/// Rollover policy of a file handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// Append forever. Several instances may safely share one such file.
    None,
    /// Roll over before a line would push the file past `max_bytes` (`0` disables).
    Size { max_bytes: u64, backup_count: usize },
    /// Roll over when the calendar period changes.
    Time {
        interval: RotationInterval,
        backup_count: usize,
    },
}

/// Requested file destination plus rollover policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSink {
    pub path: PathBuf,
    pub rotation: Rotation,
}

impl FileSink {
    pub fn plain(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rotation: Rotation::None,
        }
    }

    pub fn size_rotating(path: impl Into<PathBuf>, max_bytes: u64, backup_count: usize) -> Self {
        Self {
            path: path.into(),
            rotation: Rotation::Size {
                max_bytes,
                backup_count,
            },
        }
    }

    pub fn time_rotating(
        path: impl Into<PathBuf>,
        interval: RotationInterval,
        backup_count: usize,
    ) -> Self {
        Self {
            path: path.into(),
            rotation: Rotation::Time {
                interval,
                backup_count,
            },
        }
    }
}

/// Absolute form of `path` with `.` and `..` collapsed lexically, used to
/// compare destinations. Symlinks are not resolved.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            // `..` above the root stays at the root.
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(".");
    os.push(suffix);
    PathBuf::from(os)
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Appends lines to a file, rolling it over according to its [`Rotation`].
///
/// Each line is written with a single `write_all` on an append-mode
/// descriptor, so independent handlers appending to one shared file do not
/// interleave partial lines.
pub struct FileHandler {
    path: PathBuf,
    rotation: Rotation,
    file: Option<File>,
    /// Period key of the current file (time rotation only).
    pub(crate) period: Option<String>,
}

impl FileHandler {
    /// Open (creating parent directories as needed) the file described by `sink`.
    pub fn open(sink: &FileSink) -> io::Result<Self> {
        let path = normalize(&sink.path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = open_append(&path)?;
        let period = match sink.rotation {
            Rotation::Time { interval, .. } => {
                let modified = file
                    .metadata()
                    .and_then(|m| m.modified())
                    .map(DateTime::<Local>::from)
                    .unwrap_or_else(|_| Local::now());
                Some(interval.period_key(modified))
            }
            _ => None,
        };
        Ok(Self {
            path,
            rotation: sink.rotation,
            file: Some(file),
            period,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other(format!("log file {} is closed", self.path.display())))
    }

    fn current_len(&mut self) -> io::Result<u64> {
        Ok(self.file()?.metadata()?.len())
    }

    fn reopen(&mut self) -> io::Result<()> {
        self.file = Some(open_append(&self.path)?);
        Ok(())
    }

    fn rotate_by_size(&mut self, backup_count: usize) -> io::Result<()> {
        if let Some(mut f) = self.file.take() {
            f.flush()?;
        }
        if backup_count == 0 {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            drop(file);
            return self.reopen();
        }
        let result = (|| -> io::Result<()> {
            for i in (1..backup_count).rev() {
                let src = with_suffix(&self.path, &i.to_string());
                if src.exists() {
                    fs::rename(&src, with_suffix(&self.path, &(i + 1).to_string()))?;
                }
            }
            if self.path.exists() {
                fs::rename(&self.path, with_suffix(&self.path, "1"))?;
            }
            Ok(())
        })();
        // Keep writing to the live path even if a rename failed.
        self.reopen()?;
        result
    }

    fn rotate_by_time(&mut self, old_period: &str, backup_count: usize) -> io::Result<()> {
        if let Some(mut f) = self.file.take() {
            f.flush()?;
        }
        let result = (|| -> io::Result<()> {
            if self.path.exists() {
                let target = with_suffix(&self.path, old_period);
                if target.exists() {
                    fs::remove_file(&target)?;
                }
                fs::rename(&self.path, target)?;
            }
            if backup_count > 0 {
                self.prune_time_backups(backup_count)?;
            }
            Ok(())
        })();
        self.reopen()?;
        result
    }

    /// Delete the oldest dated backups beyond `keep`.
    fn prune_time_backups(&self, keep: usize) -> io::Result<()> {
        let (Some(dir), Some(name)) = (self.path.parent(), self.path.file_name()) else {
            return Ok(());
        };
        let prefix = format!("{}.", name.to_string_lossy());
        let mut backups: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|n| n.starts_with(&prefix))
                    .unwrap_or(false)
            })
            .map(|e| e.path())
            .collect();
        if backups.len() <= keep {
            return Ok(());
        }
        // Period suffixes sort chronologically.
        backups.sort();
        let excess = backups.len() - keep;
        for old in backups.into_iter().take(excess) {
            fs::remove_file(old)?;
        }
        Ok(())
    }

    fn maybe_rotate(&mut self, next_record_bytes: u64) -> io::Result<()> {
        match self.rotation {
            Rotation::None => Ok(()),
            Rotation::Size {
                max_bytes,
                backup_count,
            } => {
                if max_bytes == 0 {
                    return Ok(());
                }
                let len = self.current_len()?;
                if len > 0 && len + next_record_bytes > max_bytes {
                    self.rotate_by_size(backup_count)?;
                }
                Ok(())
            }
            Rotation::Time {
                interval,
                backup_count,
            } => {
                let now = interval.period_key(Local::now());
                match self.period.take() {
                    Some(old) if old != now => {
                        self.period = Some(now);
                        self.rotate_by_time(&old, backup_count)
                    }
                    _ => {
                        self.period = Some(now);
                        Ok(())
                    }
                }
            }
        }
    }
}

impl Handler for FileHandler {
    fn destination(&self) -> Destination {
        Destination::File(self.path.clone())
    }

    fn rotation(&self) -> Option<Rotation> {
        Some(self.rotation)
    }

    fn emit(&mut self, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        if let Err(e) = self.maybe_rotate(buf.len() as u64) {
            tracing::warn!("log rotation failed for {}: {}", self.path.display(), e);
        }
        self.file()?.write_all(buf.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }

    fn close(&mut self) {
        if let Some(mut f) = self.file.take() {
            let _ = f.flush();
        }
    }
}

impl Drop for FileHandler {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap_or_default()
    }

    #[test]
    fn plain_handler_appends_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/app.log");
        let mut h = FileHandler::open(&FileSink::plain(&path)).unwrap();
        h.emit("one").unwrap();
        h.emit("two").unwrap();
        h.close();
        assert_eq!(read(&path), "one\ntwo\n");
        assert_eq!(h.destination(), Destination::File(normalize(&path)));
        assert_eq!(h.rotation(), Some(Rotation::None));
    }

    #[test]
    fn two_plain_handlers_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.log");
        let mut a = FileHandler::open(&FileSink::plain(&path)).unwrap();
        let mut b = FileHandler::open(&FileSink::plain(&path)).unwrap();
        a.emit("from a").unwrap();
        b.emit("from b").unwrap();
        a.emit("again a").unwrap();
        a.close();
        b.close();
        assert_eq!(read(&path), "from a\nfrom b\nagain a\n");
    }

    #[test]
    fn normalize_collapses_dot_segments() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("logs/app.log");
        let dotted = dir.path().join("logs/./../logs/app.log");
        assert_eq!(normalize(&plain), normalize(&dotted));
        assert!(normalize(&dotted).is_absolute());
        assert_eq!(normalize(Path::new("/../var/log")), PathBuf::from("/var/log"));
    }

    #[test]
    fn size_rotation_shifts_backups_and_caps_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        // Each line is 10 bytes with the newline; 25 bytes fit two lines.
        let mut h = FileHandler::open(&FileSink::size_rotating(&path, 25, 2)).unwrap();
        for i in 0..8 {
            h.emit(&format!("line-{i:04}")).unwrap();
        }
        h.close();
        assert_eq!(read(&path), "line-0006\nline-0007\n");
        assert_eq!(read(&with_suffix(&path, "1")), "line-0004\nline-0005\n");
        assert_eq!(read(&with_suffix(&path, "2")), "line-0002\nline-0003\n");
        assert!(!with_suffix(&path, "3").exists());
    }

    #[test]
    fn size_rotation_without_backups_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut h = FileHandler::open(&FileSink::size_rotating(&path, 15, 0)).unwrap();
        h.emit("line-0000").unwrap();
        h.emit("line-0001").unwrap();
        h.close();
        assert_eq!(read(&path), "line-0001\n");
        assert!(!with_suffix(&path, "1").exists());
    }

    #[test]
    fn zero_max_bytes_never_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut h = FileHandler::open(&FileSink::size_rotating(&path, 0, 3)).unwrap();
        for _ in 0..50 {
            h.emit("some fairly long log line").unwrap();
        }
        h.close();
        assert_eq!(read(&path).lines().count(), 50);
        assert!(!with_suffix(&path, "1").exists());
    }

    #[test]
    fn time_rotation_renames_to_previous_period_and_prunes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(with_suffix(&path, "2000-01-01"), "ancient\n").unwrap();
        fs::write(with_suffix(&path, "2000-01-02"), "old\n").unwrap();
        let mut h = FileHandler::open(&FileSink::time_rotating(
            &path,
            RotationInterval::Midnight,
            2,
        ))
        .unwrap();
        h.emit("yesterday").unwrap();
        h.period = Some("2000-01-03".to_string());
        h.emit("today").unwrap();
        h.close();

        assert_eq!(read(&path), "today\n");
        assert_eq!(read(&with_suffix(&path, "2000-01-03")), "yesterday\n");
        assert!(with_suffix(&path, "2000-01-02").exists());
        assert!(!with_suffix(&path, "2000-01-01").exists());
    }

    #[test]
    fn closed_handler_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = FileHandler::open(&FileSink::plain(dir.path().join("x.log"))).unwrap();
        h.close();
        h.close();
        assert!(h.emit("late").is_err());
    }
}
