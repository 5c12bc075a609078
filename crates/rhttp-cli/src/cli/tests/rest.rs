//! Tests for config, levels and global options.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_config() {
    assert!(matches!(parse(&["rhttp", "config"]), CliCommand::Config));
}

#[test]
fn cli_parse_levels() {
    assert!(matches!(parse(&["rhttp", "levels"]), CliCommand::Levels));
}

#[test]
fn cli_parse_global_config_path() {
    let cli =
        Cli::try_parse_from(["rhttp", "get", "http://h/", "--config", "/tmp/rhttp.toml"]).unwrap();
    assert_eq!(
        cli.config.as_deref(),
        Some(std::path::Path::new("/tmp/rhttp.toml"))
    );
    assert!(matches!(cli.command, CliCommand::Get { .. }));
}

#[test]
fn cli_requires_subcommand() {
    assert!(Cli::try_parse_from(["rhttp"]).is_err());
}
