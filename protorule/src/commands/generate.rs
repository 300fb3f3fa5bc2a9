//! Generate command - synthesizes proto_compile rules for one directory.

use crate::cli::{Cli, GenerateArgs, OutputFormat};
use crate::commands::load_config;
use crate::emit;
use protorule_core::{error::Result, generator::RuleGenerator};
use std::fs;
use tracing::{debug, info, warn};

/// Runs the generate command.
pub fn run(cli: &Cli, args: &GenerateArgs) -> Result<()> {
    let config = load_config(cli)?;
    let generator = RuleGenerator::new(config)?;

    info!("Generating rules for {}", args.dir);
    let report = generator.generate_requested(&args.dir, args.only.as_deref())?;

    for failure in &report.failures {
        warn!("{}: {}", failure.file, failure.error);
    }
    info!(
        "Parsed {} files, {} failed, {} rules",
        report.files_parsed,
        report.failures.len(),
        report.rules.len()
    );

    let rendered = match args.format {
        OutputFormat::Json => emit::render_json(&report.rules)?,
        OutputFormat::Build => emit::render_build(&report.rules)?,
    };
    debug!("Rendered {} bytes", rendered.len());

    match &args.output {
        Some(path) => {
            fs::write(path, rendered)?;
            info!("Rules written to {:?}", path);
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
