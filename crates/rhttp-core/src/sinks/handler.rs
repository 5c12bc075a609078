//! Output destinations attached to a log sink entry.

use std::io::{self, Write};
use std::path::PathBuf;

use super::file::Rotation;

/// Physical destination of a handler. An entry holds at most one handler per destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    Console,
    /// Absolute path of the log file.
    File(PathBuf),
}

/// A sink for formatted log lines.
///
/// Handlers are owned by a [`super::LogSinkEntry`] and only touched while its
/// handler lock is held, so implementations need `Send` but not `Sync`.
pub trait Handler: Send {
    fn destination(&self) -> Destination;

    /// Rotation settings for file handlers; `None` for non-file destinations.
    fn rotation(&self) -> Option<Rotation> {
        None
    }

    /// Write one line (without trailing newline).
    fn emit(&mut self, line: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Flush and release resources. Safe to call more than once.
    fn close(&mut self);
}

/// Writes lines to stderr.
#[derive(Debug, Default)]
pub struct ConsoleHandler;

impl Handler for ConsoleHandler {
    fn destination(&self) -> Destination {
        Destination::Console
    }

    fn emit(&mut self, line: &str) -> io::Result<()> {
        let mut err = io::stderr().lock();
        err.write_all(line.as_bytes())?;
        err.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().lock().flush()
    }

    fn close(&mut self) {
        let _ = self.flush();
    }
}
