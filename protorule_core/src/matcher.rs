//! Resolves requested source names against parsed files.

use crate::diagnostics::{Diagnostics, tracing_diagnostics};
use crate::label::Label;
use crate::proto_file::{ProtoFile, logical_name};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct FileMatcher {
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for FileMatcher {
    fn default() -> Self {
        Self::new(tracing_diagnostics())
    }
}

impl FileMatcher {
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self { diagnostics }
    }

    /// Looks up each requested logical name in `files`, keeping request
    /// order and duplicates. Names without a parsed file are dropped; they
    /// may legitimately live in another package.
    pub fn matching_files<'a, S: AsRef<str>>(
        &self,
        files: &'a HashMap<String, ProtoFile>,
        requested: &[S],
    ) -> Vec<&'a ProtoFile> {
        let names: Vec<String> = requested.iter().map(|s| s.as_ref().to_string()).collect();
        self.diagnostics.matching(&names, files.len());

        let mut matched = Vec::with_capacity(names.len());
        for name in &names {
            match files.get(name) {
                Some(file) => matched.push(file),
                None => self.diagnostics.unmatched(name),
            }
        }

        self.diagnostics.matched(matched.len());
        matched
    }

    /// Same as [`matching_files`](Self::matching_files) for source labels
    /// such as `:foo.proto` or `//pkg:foo.proto`.
    pub fn matching_labels<'a>(
        &self,
        files: &'a HashMap<String, ProtoFile>,
        requested: &[Label],
    ) -> Vec<&'a ProtoFile> {
        let names: Vec<&str> = requested
            .iter()
            .map(|label| logical_name(&label.name))
            .collect();
        self.matching_files(files, &names)
    }
}
