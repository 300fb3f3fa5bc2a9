//! Command-line interface definitions for protorule.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// protorule - proto_compile rule generation for directories of .proto files
#[derive(Parser, Debug)]
#[command(name = "protorule")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to protorule.toml configuration file
    #[arg(short, long, global = true, env = "PROTORULE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate proto_compile rules for a package directory
    Generate(GenerateArgs),

    /// Display what was parsed from a single proto file
    Info(InfoArgs),

    /// Validate the configuration and list configured plugins
    Validate(ValidateArgs),
}

// ============================================================================
// Generate Arguments
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Package directory, relative to the workspace root
    pub dir: String,

    /// Output format
    #[arg(long, value_enum, default_value = "build")]
    pub format: OutputFormat,

    /// Only generate rules for these logical source names (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Option<Vec<String>>,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Rule descriptions as JSON
    Json,
    /// BUILD file rule blocks
    Build,
}

// ============================================================================
// Info Arguments
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    /// Proto file, relative to the workspace root
    pub file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "pretty")]
    pub format: InfoFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum InfoFormat {
    Pretty,
    Json,
}

// ============================================================================
// Validate Arguments
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Also print the resolved plugin options and output overrides
    #[arg(long)]
    pub show_plugins: bool,
}
