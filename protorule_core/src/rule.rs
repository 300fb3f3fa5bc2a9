//! Synthesis of `proto_compile` rule descriptions.
//!
//! A [`ProtoCompileRule`] is built per source file and knows nothing about
//! the filesystem or the plugins themselves: plugin references, expected
//! outputs and options are all supplied by the caller.

use crate::label::Label;
use crate::proto_file::ProtoFile;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const PROTO_COMPILE_KIND: &str = "proto_compile";
const PROTO_COMPILE_BZL: &str = "@build_stack_rules_proto//rules:proto_compile.bzl";

/// The source rule a compile rule depends on.
pub trait ProtoLibrary {
    /// Logical name of the library's source (`foo` for `foo.proto`).
    fn base_name(&self) -> &str;

    /// Name of the library rule itself.
    fn name(&self) -> String;
}

impl ProtoLibrary for ProtoFile {
    fn base_name(&self) -> &str {
        ProtoFile::name(self)
    }

    fn name(&self) -> String {
        format!("{}_proto", ProtoFile::name(self))
    }
}

/// Attribute facts used when merging with previously generated rules.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct KindInfo {
    pub non_empty_attrs: Vec<&'static str>,
    pub mergeable_attrs: Vec<&'static str>,
}

/// The file and symbols a manifest has to load for a rule kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadInfo {
    pub name: &'static str,
    pub symbols: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleAttrs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Vec<String>>,
    pub proto: String,
    pub plugins: Vec<String>,
    pub generated_srcs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
}

/// Serializable build metadata for one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDescription {
    pub kind: String,
    pub name: String,
    pub attrs: RuleAttrs,
    pub deps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ProtoCompileRule {
    prefix: String,
    base_name: String,
    library: String,
    plugins: Vec<Label>,
    generated_srcs: Vec<String>,
    generated_options: HashMap<String, Vec<String>>,
    visibility: Vec<String>,
    comment: Vec<String>,
}

impl ProtoCompileRule {
    pub fn new(
        prefix: impl Into<String>,
        library: &impl ProtoLibrary,
        plugins: Vec<Label>,
        generated_srcs: Vec<String>,
        generated_options: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            base_name: library.base_name().to_string(),
            library: library.name(),
            plugins,
            generated_srcs,
            generated_options,
            visibility: Vec::new(),
            comment: Vec::new(),
        }
    }

    pub fn with_visibility(mut self, visibility: Vec<String>) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_comment(mut self, comment: Vec<String>) -> Self {
        self.comment = comment;
        self
    }

    pub fn kind(&self) -> &'static str {
        PROTO_COMPILE_KIND
    }

    /// `<base>_<prefix>_compile`. No escaping is applied.
    pub fn name(&self) -> String {
        format!("{}_{}_compile", self.base_name, self.prefix)
    }

    pub fn imports(&self) -> Vec<&'static str> {
        vec![PROTO_COMPILE_KIND]
    }

    pub fn visibility(&self) -> &[String] {
        &self.visibility
    }

    /// Always exactly one entry: the owning library rule.
    pub fn deps(&self) -> Vec<String> {
        vec![Label::relative(self.library.as_str()).to_string()]
    }

    /// Plugin options with each value list sorted and comma-joined.
    /// Plugins with no options are left out; `None` when nothing remains.
    pub fn options(&self) -> Option<BTreeMap<String, String>> {
        let options: BTreeMap<String, String> = self
            .generated_options
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| {
                let mut sorted = values.clone();
                sorted.sort();
                (name.clone(), sorted.join(","))
            })
            .collect();

        (!options.is_empty()).then_some(options)
    }

    pub fn kind_info(&self) -> KindInfo {
        KindInfo {
            non_empty_attrs: vec!["deps"],
            mergeable_attrs: Vec::new(),
        }
    }

    pub fn load_info(&self) -> LoadInfo {
        LoadInfo {
            name: PROTO_COMPILE_BZL,
            symbols: vec![PROTO_COMPILE_KIND],
        }
    }

    pub fn rule(&self) -> RuleDescription {
        RuleDescription {
            kind: self.kind().to_string(),
            name: self.name(),
            attrs: RuleAttrs {
                visibility: non_empty(&self.visibility),
                proto: self.library.clone(),
                plugins: self.plugins.iter().map(Label::to_string).collect(),
                generated_srcs: self.generated_srcs.clone(),
                options: self.options(),
            },
            deps: self.deps(),
            comment: non_empty(&self.comment),
        }
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}
