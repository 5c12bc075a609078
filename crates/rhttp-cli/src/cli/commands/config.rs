//! `rhttp config` – show where settings come from and what they resolve to.

use anyhow::Result;
use rhttp_core::config::{self, Settings};
use std::path::Path;

pub fn run_config(explicit: Option<&Path>, settings: &Settings) -> Result<()> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => config::config_path()?,
    };
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(settings)?);
    Ok(())
}
