//! CLI for the rhttp client.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rhttp_core::config;
use rhttp_core::sinks::LogSinkRegistry;
use std::path::PathBuf;

use commands::{run_config, run_levels, run_request, RequestArgs};

/// Top-level CLI for rhttp.
#[derive(Debug, Parser)]
#[command(name = "rhttp")]
#[command(
    about = "rhttp: HTTP requests with retry, backoff and request logging",
    long_about = None
)]
pub struct Cli {
    /// Read settings from this file instead of ~/.config/rhttp/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send a request with any method.
    Request {
        /// GET, POST, PUT, DELETE, PATCH, HEAD or OPTIONS (case-insensitive).
        method: String,
        /// HTTP/HTTPS URL.
        url: String,
        /// Extra header, "Name: value". Repeatable.
        #[arg(short = 'H', long = "header", value_name = "HEADER")]
        headers: Vec<String>,
        /// Query parameter, "name=value". Repeatable.
        #[arg(short = 'q', long = "query", value_name = "PAIR")]
        query: Vec<String>,
        /// Raw request body.
        #[arg(short = 'd', long, conflicts_with = "json")]
        data: Option<String>,
        /// JSON request body (validated before sending).
        #[arg(long)]
        json: Option<String>,
        /// Per-attempt timeout in seconds (overrides config).
        #[arg(long, value_name = "SECS")]
        timeout: Option<f64>,
        /// Override max_retries from config.
        #[arg(long, value_name = "N")]
        retries: Option<u32>,
        /// Send only headers given with -H.
        #[arg(long)]
        no_default_headers: bool,
        /// Exit with an error on a non-2xx status.
        #[arg(long)]
        fail: bool,
        /// Use the cooperative (async) request path.
        #[arg(long = "async")]
        cooperative: bool,
    },

    /// Shorthand for `request GET <url>`.
    Get {
        /// HTTP/HTTPS URL.
        url: String,
        /// Exit with an error on a non-2xx status.
        #[arg(long)]
        fail: bool,
        /// Use the cooperative (async) request path.
        #[arg(long = "async")]
        cooperative: bool,
    },

    /// Print the config file path and effective settings.
    Config,

    /// List log levels and their numeric values.
    Levels,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let settings = match &cli.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", settings);
        let registry = LogSinkRegistry::new(settings.logging.clone());

        match cli.command {
            CliCommand::Request {
                method,
                url,
                headers,
                query,
                data,
                json,
                timeout,
                retries,
                no_default_headers,
                fail,
                cooperative,
            } => {
                let args = RequestArgs {
                    method,
                    url,
                    headers,
                    query,
                    data,
                    json,
                    timeout,
                    retries,
                    no_default_headers,
                    fail,
                    cooperative,
                };
                run_request(&settings, &registry, args).await?;
            }
            CliCommand::Get {
                url,
                fail,
                cooperative,
            } => {
                let args = RequestArgs {
                    fail,
                    cooperative,
                    ..RequestArgs::get(url)
                };
                run_request(&settings, &registry, args).await?;
            }
            CliCommand::Config => run_config(cli.config.as_deref(), &settings)?,
            CliCommand::Levels => run_levels(),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
