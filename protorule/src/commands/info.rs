//! Info command - displays what was parsed from a single proto file.

use crate::cli::{Cli, InfoArgs, InfoFormat};
use crate::commands::load_config;
use protorule_core::proto_file::{DEFAULT_WORKSPACE_ENV, ProtoFile, ProtoParser};
use protorule_core::error::{ProtoruleError, Result};
use serde_json::json;
use tracing::debug;

/// Runs the info command.
pub fn run(cli: &Cli, args: &InfoArgs) -> Result<()> {
    // A configuration is optional here; it only supplies the workspace
    // environment variable name.
    let workspace_env = match load_config(cli) {
        Ok(config) => config.general.workspace_env,
        Err(e) => {
            debug!("No usable configuration ({}), using defaults", e);
            DEFAULT_WORKSPACE_ENV.to_string()
        }
    };

    let basename = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ProtoruleError::config(format!("{:?} is not a file path", args.file)))?;
    let dir = args
        .file
        .parent()
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file = ProtoParser::default()
        .with_workspace_env(workspace_env)
        .parse_file(&dir, &basename)?;

    match args.format {
        InfoFormat::Pretty => print!("{}", pretty(&file)),
        InfoFormat::Json => println!("{}", serde_json::to_string_pretty(&summary(&file))?),
    }
    Ok(())
}

fn option_names(options: &[protorule_core::proto_parser::ProtoOption]) -> Vec<&str> {
    options.iter().map(|option| option.name.as_str()).collect()
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn pretty(file: &ProtoFile) -> String {
    let mut out = format!("\n=== {} ===\n\n", file.relname());
    out.push_str(&format!("Package:      {}\n", file.package_name().unwrap_or("-")));
    out.push_str(&format!("Syntax:       {}\n", file.syntax().unwrap_or("-")));
    out.push_str(&format!("Imports:      {}\n", file.imports().len()));
    out.push_str(&format!("Has messages: {}\n", yes_no(file.has_messages())));
    out.push_str(&format!("Has enums:    {}\n", yes_no(file.has_enums())));
    out.push_str(&format!("Has services: {}\n", yes_no(file.has_services())));

    if !file.options().is_empty() {
        out.push_str(&format!("\nOptions: {:?}\n", option_names(file.options())));
    }
    if !file.enum_options().is_empty() {
        out.push_str(&format!(
            "Enum options: {:?}\n",
            option_names(file.enum_options())
        ));
    }
    if let Some(go_package) = file.go_package() {
        out.push_str(&format!("Go package: {}\n", go_package.importpath));
    }
    out
}

fn summary(file: &ProtoFile) -> serde_json::Value {
    json!({
        "file": file.relname(),
        "name": file.name(),
        "package": file.package_name(),
        "syntax": file.syntax(),
        "imports": file.imports().len(),
        "options": option_names(file.options()),
        "enum_options": option_names(file.enum_options()),
        "has_messages": file.has_messages(),
        "has_enums": file.has_enums(),
        "has_services": file.has_services(),
    })
}
