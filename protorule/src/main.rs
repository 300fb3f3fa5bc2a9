mod cli;
mod commands;
mod emit;

use clap::Parser;
use cli::{Cli, Commands};
use protorule_core::error::Result;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli);
    debug!("Parsed arguments: {:?}", cli);

    let result = match &cli.command {
        Commands::Generate(args) => commands::generate::run(&cli, args),
        Commands::Info(args) => commands::info::run(&cli, args),
        Commands::Validate(args) => commands::validate::run(&cli, args),
    };

    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

/// Logs go to stderr so generated output on stdout stays clean.
/// `RUST_LOG` overrides the flags when set.
fn init_tracing(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
