//! User-facing log output: severity levels, handlers and the instance registry.
//!
//! This is separate from the crate's `tracing` diagnostics. Entries write
//! formatted lines (`<ts> - <instance> - <LEVEL> - [<file>:<line> - ]<msg>`)
//! to their own console and file handlers.

mod entry;
mod file;
mod handler;
mod level;
mod registry;

pub use entry::{CallerFormat, LogSinkEntry, SinkSettings};
pub use file::{FileHandler, FileSink, Rotation, RotationInterval};
pub use handler::{ConsoleHandler, Destination, Handler};
pub use level::{all_levels, custom_levels, level_or, Level, UnknownLevel};
pub use registry::{LogSinkRegistry, ResetTarget};
