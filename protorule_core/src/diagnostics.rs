//! Diagnostics sink injected into the parser and the matcher.
//!
//! Callers own the sink's lifecycle. [`TracingDiagnostics`] forwards to
//! `tracing`; [`NullDiagnostics`] discards everything.

use crate::error::ProtoruleError;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[cfg_attr(test, mockall::automock)]
pub trait Diagnostics: Send + Sync {
    /// A source file is about to be read and parsed.
    fn parse_started(&self, path: &Path);

    /// A source file could not be read or parsed. The file is skipped.
    fn parse_failed(&self, path: &Path, error: &ProtoruleError);

    /// The matcher is resolving `requested` against `known` parsed files.
    fn matching(&self, requested: &[String], known: usize);

    /// A requested name had no parsed file and was dropped.
    fn unmatched(&self, name: &str);

    /// The matcher finished with `count` files.
    fn matched(&self, count: usize);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn parse_started(&self, path: &Path) {
        trace!("parsing {}", path.display());
    }

    fn parse_failed(&self, path: &Path, error: &ProtoruleError) {
        warn!("skipping {}: {}", path.display(), error);
    }

    fn matching(&self, requested: &[String], known: usize) {
        debug!("matching {:?} against {} files", requested, known);
    }

    fn unmatched(&self, name: &str) {
        trace!("no parsed file for requested source {}", name);
    }

    fn matched(&self, count: usize) {
        debug!("matched {}", count);
    }
}

/// Discards all diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn parse_started(&self, _path: &Path) {}
    fn parse_failed(&self, _path: &Path, _error: &ProtoruleError) {}
    fn matching(&self, _requested: &[String], _known: usize) {}
    fn unmatched(&self, _name: &str) {}
    fn matched(&self, _count: usize) {}
}

pub fn tracing_diagnostics() -> Arc<dyn Diagnostics> {
    Arc::new(TracingDiagnostics)
}
