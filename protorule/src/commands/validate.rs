//! Validate command - checks the configuration and lists plugins.

use crate::cli::{Cli, ValidateArgs};
use crate::commands::load_config;
use protorule_core::error::Result;
use protorule_core::plugin::{plugin_options, plugin_outs};
use tracing::{error, info, warn};

/// Runs the validate command.
pub fn run(cli: &Cli, args: &ValidateArgs) -> Result<()> {
    info!("Validating protorule configuration");

    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration file: FAILED");
            return Err(e);
        }
    };
    let plugins = config.plugin_configurations()?;

    println!("Configuration: OK");
    println!("  Prefix: {}", config.general.prefix);
    println!("  Workspace env: {}", config.general.workspace_env);
    if plugins.is_empty() {
        warn!("No plugins configured; generate will produce no rules");
    }

    println!("  Plugins: {}", plugins.len());
    for (entry, plugin) in config.plugins.iter().zip(&plugins) {
        println!("    {} ({}) when={}", plugin.name, plugin.label, entry.when);
    }

    if args.show_plugins {
        let mut options: Vec<_> = plugin_options(&plugins).into_iter().collect();
        options.sort();
        for (name, values) in options {
            println!("  {} options: {}", name, values.join(","));
        }

        let mut outs: Vec<_> = plugin_outs(&plugins).into_iter().collect();
        outs.sort();
        for (name, out) in outs {
            println!("  {} out: {}", name, out);
        }
    }

    Ok(())
}
