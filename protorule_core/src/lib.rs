// protorule - proto source modelling and proto_compile rule synthesis

// Source model
pub mod proto_file;
pub mod proto_parser;

// Rules
pub mod label;
pub mod matcher;
pub mod plugin;
pub mod rule;

// Host pipeline
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod generator;

// Re-export commonly used items for convenience
pub use config::{ProtoruleConfig, When};
pub use diagnostics::{Diagnostics, NullDiagnostics, TracingDiagnostics};
pub use error::{ProtoruleError, Result};
pub use generator::{FileFailure, GenerationReport, RuleGenerator};
pub use label::Label;
pub use matcher::FileMatcher;
pub use plugin::{PluginConfiguration, plugin_labels, plugin_options, plugin_outs};
pub use proto_file::{ProtoFile, ProtoParser};
pub use rule::{ProtoCompileRule, ProtoLibrary, RuleDescription};
