//! Reads proto files relative to the workspace root and parses them.

use super::ProtoFile;
use crate::diagnostics::{Diagnostics, tracing_diagnostics};
use crate::error::{ProtoruleError, Result};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variable that overrides the working directory. Set by the
/// build tool when running from inside its sandbox.
pub const DEFAULT_WORKSPACE_ENV: &str = "BUILD_WORKSPACE_DIRECTORY";

/// Resolves the directory relative source paths are joined onto: the value
/// of `env_name` when set, otherwise the process working directory.
pub fn workspace_root(env_name: &str) -> Result<PathBuf> {
    if let Some(root) = env::var_os(env_name) {
        return Ok(PathBuf::from(root));
    }
    env::current_dir()
        .map_err(|e| ProtoruleError::config(format!("could not determine working directory: {}", e)))
}

/// Parses proto files into [`ProtoFile`] models.
///
/// Parsing holds no shared mutable state, so one parser may be used from
/// many threads at once.
#[derive(Clone)]
pub struct ProtoParser {
    workspace_env: String,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for ProtoParser {
    fn default() -> Self {
        Self::new(tracing_diagnostics())
    }
}

impl ProtoParser {
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            workspace_env: DEFAULT_WORKSPACE_ENV.to_string(),
            diagnostics,
        }
    }

    /// Uses a different environment variable for the workspace root.
    pub fn with_workspace_env(mut self, name: impl Into<String>) -> Self {
        self.workspace_env = name.into();
        self
    }

    pub fn workspace_env(&self) -> &str {
        &self.workspace_env
    }

    /// Opens `<root>/<dir>/<basename>` and parses it.
    pub fn parse_file(&self, dir: &str, basename: &str) -> Result<ProtoFile> {
        let root = workspace_root(&self.workspace_env)?;
        let path = root.join(dir).join(basename);
        self.diagnostics.parse_started(&path);

        // Only a failed read is NotFound; stray non-UTF-8 bytes are replaced.
        let result = fs::read(&path)
            .map_err(|e| ProtoruleError::not_found(&path, &root, e))
            .and_then(|bytes| {
                ProtoFile::parse_str(dir, basename, &String::from_utf8_lossy(&bytes))
            });

        if let Err(err) = &result {
            self.diagnostics.parse_failed(&path, err);
        }
        result
    }

    /// Parses in-memory text as the file `dir/basename`.
    pub fn parse_source(&self, dir: &str, basename: &str, source: &str) -> Result<ProtoFile> {
        let path = PathBuf::from(dir).join(basename);
        self.diagnostics.parse_started(&path);

        let result = ProtoFile::parse_str(dir, basename, source);
        if let Err(err) = &result {
            self.diagnostics.parse_failed(&path, err);
        }
        result
    }
}
