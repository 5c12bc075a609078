use rhttp_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Diagnostics go to the XDG state dir, or stderr if that is unwritable.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("rhttp error: {:#}", err);
        std::process::exit(1);
    }
}
