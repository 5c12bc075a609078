//! A named logging instance: level, caller formatting and attached handlers.

use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::file::{normalize, FileHandler, FileSink, Rotation};
use super::handler::{ConsoleHandler, Destination, Handler};
use super::level::Level;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// How the caller location is rendered in each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerFormat {
    Off,
    /// `client.rs:42`
    #[default]
    FileName,
    /// Path resolved against the current working directory.
    AbsolutePath,
}

impl CallerFormat {
    const fn as_u8(self) -> u8 {
        match self {
            CallerFormat::Off => 0,
            CallerFormat::FileName => 1,
            CallerFormat::AbsolutePath => 2,
        }
    }

    const fn from_u8(v: u8) -> Self {
        match v {
            0 => CallerFormat::Off,
            2 => CallerFormat::AbsolutePath,
            _ => CallerFormat::FileName,
        }
    }
}

/// Settings used when an entry is first built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSettings {
    pub level: Level,
    pub file: Option<FileSink>,
    pub caller: CallerFormat,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            level: Level::Info,
            file: None,
            caller: CallerFormat::FileName,
        }
    }
}

/// One logical logger. Always has a console handler; at most one file
/// handler per distinct path.
///
/// Handles stay valid across registry resets: the registry rebuilds the
/// handlers of an existing entry instead of replacing the entry.
pub struct LogSinkEntry {
    name: String,
    level: AtomicU8,
    caller: AtomicU8,
    handlers: Mutex<Vec<Box<dyn Handler>>>,
}

impl fmt::Debug for LogSinkEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSinkEntry")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("destinations", &self.destinations())
            .finish()
    }
}

impl LogSinkEntry {
    /// Build an entry with a console handler plus the file handler from
    /// `settings`. A file that cannot be opened leaves the entry console-only
    /// and logs a warning through it.
    pub fn build(name: &str, settings: &SinkSettings) -> Self {
        let entry = Self {
            name: name.to_string(),
            level: AtomicU8::new(settings.level.value()),
            caller: AtomicU8::new(settings.caller.as_u8()),
            handlers: Mutex::new(vec![Box::new(ConsoleHandler)]),
        };
        if let Some(sink) = &settings.file {
            entry.ensure_file_sink(sink);
        }
        tracing::debug!(
            instance = name,
            destinations = ?entry.destinations(),
            "log sink entry created"
        );
        entry
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        Level::from_value(self.level.load(Ordering::Relaxed)).unwrap_or(Level::Info)
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level.value(), Ordering::Relaxed);
    }

    pub fn is_enabled_for(&self, level: Level) -> bool {
        level >= self.level()
    }

    pub fn caller_format(&self) -> CallerFormat {
        CallerFormat::from_u8(self.caller.load(Ordering::Relaxed))
    }

    fn handlers(&self) -> MutexGuard<'_, Vec<Box<dyn Handler>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn destinations(&self) -> Vec<Destination> {
        self.handlers().iter().map(|h| h.destination()).collect()
    }

    pub fn file_handler_count(&self) -> usize {
        self.handlers()
            .iter()
            .filter(|h| matches!(h.destination(), Destination::File(_)))
            .count()
    }

    /// Rotation of the handler writing to `path`, if any.
    pub fn file_rotation(&self, path: impl AsRef<Path>) -> Option<Rotation> {
        let wanted = Destination::File(normalize(path.as_ref()));
        self.handlers()
            .iter()
            .find(|h| h.destination() == wanted)
            .and_then(|h| h.rotation())
    }

    /// Make sure exactly one handler writes to `sink.path` with `sink.rotation`.
    ///
    /// Nothing changes when a matching handler already exists. A handler on the
    /// same path with different rotation is closed and replaced.
    pub fn ensure_file_sink(&self, sink: &FileSink) {
        let path = normalize(&sink.path);
        let failure = {
            let mut handlers = self.handlers();
            let wanted = Destination::File(path.clone());
            let existing = handlers.iter().position(|h| h.destination() == wanted);
            match existing {
                Some(i) if handlers[i].rotation() == Some(sink.rotation) => return,
                Some(i) => {
                    let mut stale = handlers.remove(i);
                    stale.close();
                    tracing::debug!(
                        instance = %self.name,
                        path = %path.display(),
                        "replacing file handler with new rotation settings"
                    );
                }
                None => {}
            }
            match FileHandler::open(sink) {
                Ok(handler) => {
                    handlers.push(Box::new(handler));
                    None
                }
                Err(e) => Some(e),
            }
        };
        if let Some(e) = failure {
            tracing::warn!(instance = %self.name, "file handler unavailable: {}", e);
            self.warning(format!(
                "Failed to create file handler for {}: {}",
                path.display(),
                e
            ));
        }
    }

    /// Flush and close every handler, leaving a fresh console handler.
    pub fn close_handlers(&self) {
        let mut handlers = self.handlers();
        for h in handlers.iter_mut() {
            h.close();
        }
        handlers.clear();
        handlers.push(Box::new(ConsoleHandler));
    }

    /// Replace level, caller format and handlers with those of `settings`.
    pub(crate) fn rebuild(&self, settings: &SinkSettings) {
        self.close_handlers();
        self.set_level(settings.level);
        self.caller.store(settings.caller.as_u8(), Ordering::Relaxed);
        if let Some(sink) = &settings.file {
            self.ensure_file_sink(sink);
        }
        tracing::debug!(
            instance = %self.name,
            destinations = ?self.destinations(),
            "log sink entry rebuilt"
        );
    }

    pub fn flush(&self) {
        for h in self.handlers().iter_mut() {
            if let Err(e) = h.flush() {
                tracing::warn!(instance = %self.name, "flush failed: {}", e);
            }
        }
    }

    fn caller_segment(&self, location: &Location<'_>) -> Option<String> {
        let file = match self.caller_format() {
            CallerFormat::Off => return None,
            CallerFormat::FileName => Path::new(location.file())
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| location.file().to_string()),
            CallerFormat::AbsolutePath => std::path::absolute(location.file())
                .unwrap_or_else(|_| PathBuf::from(location.file()))
                .display()
                .to_string(),
        };
        Some(format!("{}:{}", file, location.line()))
    }

    pub(crate) fn format_line(
        &self,
        level: Level,
        message: &str,
        location: &Location<'_>,
    ) -> String {
        let ts = Local::now().format(TIMESTAMP_FORMAT);
        match self.caller_segment(location) {
            Some(caller) => {
                format!("{} - {} - {} - {} - {}", ts, self.name, level, caller, message)
            }
            None => format!("{} - {} - {} - {}", ts, self.name, level, message),
        }
    }

    /// Emit `message` at `level`. Never fails; handler errors are reported
    /// through `tracing`.
    #[track_caller]
    pub fn log(&self, level: Level, message: impl fmt::Display) {
        if !self.is_enabled_for(level) {
            return;
        }
        let line = self.format_line(level, &message.to_string(), Location::caller());
        let errors: Vec<(Destination, std::io::Error)> = {
            let mut handlers = self.handlers();
            handlers
                .iter_mut()
                .filter_map(|h| h.emit(&line).err().map(|e| (h.destination(), e)))
                .collect()
        };
        for (dest, e) in errors {
            tracing::warn!(instance = %self.name, destination = ?dest, "log write failed: {}", e);
        }
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, message);
    }

    #[track_caller]
    pub fn info_config(&self, message: impl fmt::Display) {
        self.log(Level::InfoConfig, message);
    }

    #[track_caller]
    pub fn info_utils(&self, message: impl fmt::Display) {
        self.log(Level::InfoUtils, message);
    }

    #[track_caller]
    pub fn info_database(&self, message: impl fmt::Display) {
        self.log(Level::InfoDatabase, message);
    }

    #[track_caller]
    pub fn info_kernel(&self, message: impl fmt::Display) {
        self.log(Level::InfoKernel, message);
    }

    #[track_caller]
    pub fn info_core(&self, message: impl fmt::Display) {
        self.log(Level::InfoCore, message);
    }

    #[track_caller]
    pub fn info_service(&self, message: impl fmt::Display) {
        self.log(Level::InfoService, message);
    }

    #[track_caller]
    pub fn info_control(&self, message: impl fmt::Display) {
        self.log(Level::InfoControl, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message);
    }

    #[track_caller]
    pub fn warning(&self, message: impl fmt::Display) {
        self.log(Level::Warning, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, message);
    }

    #[track_caller]
    pub fn critical(&self, message: impl fmt::Display) {
        self.log(Level::Critical, message);
    }
}
