//! Command handlers for the protorule CLI.

pub mod generate;
pub mod info;
pub mod validate;

use crate::cli::Cli;
use protorule_core::{config::ProtoruleConfig, error::Result};
use tracing::info;

/// Loads the configuration named by `--config`, or searches for
/// `protorule.toml` from the working directory upward.
pub fn load_config(cli: &Cli) -> Result<ProtoruleConfig> {
    match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            ProtoruleConfig::from_path(path)
        }
        None => ProtoruleConfig::new(),
    }
}
