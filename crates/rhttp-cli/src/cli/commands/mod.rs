//! CLI command handlers.

mod config;
mod levels;
mod request;

pub use config::run_config;
pub use levels::run_levels;
pub use request::{run_request, RequestArgs};
