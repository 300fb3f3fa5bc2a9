use crate::proto_parser::ParseError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtoruleError {
    #[error("could not open {}: {source} (cwd={})", path.display(), root.display())]
    NotFound {
        path: PathBuf,
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {}: {source}", file.display())]
    Syntax {
        file: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid label {label:?}: {message}")]
    InvalidLabel { label: String, message: String },

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Invalid regex pattern: {0}")]
    Regex(String),
}

impl From<regex::Error> for ProtoruleError {
    fn from(err: regex::Error) -> Self {
        ProtoruleError::Regex(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProtoruleError>;

impl ProtoruleError {
    pub fn not_found(
        path: impl Into<PathBuf>,
        root: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        ProtoruleError::NotFound {
            path: path.into(),
            root: root.into(),
            source,
        }
    }

    pub fn syntax(file: impl Into<PathBuf>, source: ParseError) -> Self {
        ProtoruleError::Syntax {
            file: file.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ProtoruleError::Config(message.into())
    }

    pub fn invalid_label(label: impl Into<String>, message: impl Into<String>) -> Self {
        ProtoruleError::InvalidLabel {
            label: label.into(),
            message: message.into(),
        }
    }

    /// Whether this error concerns a single source file (and should be
    /// isolated to that file) rather than the whole run.
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            ProtoruleError::NotFound { .. } | ProtoruleError::Syntax { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto_parser::Position;

    #[test]
    fn test_not_found_message_names_path_and_root() {
        let err = ProtoruleError::not_found(
            "/ws/pkg/missing.proto",
            "/ws",
            std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        );
        let message = err.to_string();
        assert!(message.contains("/ws/pkg/missing.proto"));
        assert!(message.contains("cwd=/ws"));
        assert!(err.is_file_level());
    }

    #[test]
    fn test_syntax_message_names_file() {
        let err = ProtoruleError::syntax(
            "pkg/foo.proto",
            ParseError::new("expected ';'", Some(Position { line: 3, column: 7 })),
        );
        assert_eq!(
            err.to_string(),
            "could not parse pkg/foo.proto: 3:7: expected ';'"
        );
    }

    #[test]
    fn test_config_errors_are_not_file_level() {
        assert!(!ProtoruleError::config("missing prefix").is_file_level());
    }
}
