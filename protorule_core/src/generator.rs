//! Turns a directory of proto files into `proto_compile` rules.
//!
//! Each file is parsed independently. A file that fails to open or parse
//! is recorded in the report and left out of everything downstream; the
//! remaining files are still processed.

use crate::config::{PluginEntry, ProtoruleConfig, When};
use crate::diagnostics::{Diagnostics, tracing_diagnostics};
use crate::error::{ProtoruleError, Result};
use crate::matcher::FileMatcher;
use crate::plugin::{PluginConfiguration, plugin_options};
use crate::proto_file::{ProtoFile, ProtoParser, is_proto_file, workspace_root};
use crate::rule::ProtoCompileRule;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A source file that was skipped.
#[derive(Debug)]
pub struct FileFailure {
    /// `dir/basename` of the file
    pub file: String,
    pub error: ProtoruleError,
}

#[derive(Debug, Default)]
pub struct GenerationReport {
    /// One rule per file with at least one applicable plugin, by name.
    pub rules: Vec<ProtoCompileRule>,
    pub failures: Vec<FileFailure>,
    pub files_parsed: usize,
}

pub struct RuleGenerator {
    config: ProtoruleConfig,
    plugins: Vec<PluginConfiguration>,
    parser: ProtoParser,
    matcher: FileMatcher,
}

impl RuleGenerator {
    pub fn new(config: ProtoruleConfig) -> Result<Self> {
        Self::with_diagnostics(config, tracing_diagnostics())
    }

    pub fn with_diagnostics(
        config: ProtoruleConfig,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self> {
        config.validate()?;
        let plugins = config.plugin_configurations()?;
        let parser = ProtoParser::new(diagnostics.clone())
            .with_workspace_env(config.general.workspace_env.as_str());

        Ok(Self {
            config,
            plugins,
            parser,
            matcher: FileMatcher::new(diagnostics),
        })
    }

    pub fn config(&self) -> &ProtoruleConfig {
        &self.config
    }

    pub fn parser(&self) -> &ProtoParser {
        &self.parser
    }

    /// Generates rules for every proto file directly inside `dir`, which
    /// is relative to the workspace root.
    pub fn generate(&self, dir: &str) -> Result<GenerationReport> {
        self.generate_requested(dir, None)
    }

    /// Like [`generate`](Self::generate), narrowed to the requested logical
    /// names when `requested` is given.
    pub fn generate_requested(
        &self,
        dir: &str,
        requested: Option<&[String]>,
    ) -> Result<GenerationReport> {
        let basenames = self.discover(dir)?;
        info!("Found {} proto files in {:?}", basenames.len(), dir);

        let (files, failures) = self.parse_all(dir, &basenames);
        let files_parsed = files.len();
        let known: HashMap<String, ProtoFile> = files
            .into_iter()
            .map(|file| (file.name().to_string(), file))
            .collect();

        let selected: BTreeMap<&str, &ProtoFile> = match requested {
            Some(requested) => self
                .matcher
                .matching_files(&known, requested)
                .into_iter()
                .map(|file| (file.name(), file))
                .collect(),
            None => known.iter().map(|(name, file)| (name.as_str(), file)).collect(),
        };

        let rules: Vec<ProtoCompileRule> = selected
            .values()
            .filter_map(|file| self.rule_for(file))
            .collect();
        debug!("Synthesized {} rules", rules.len());

        Ok(GenerationReport {
            rules,
            failures,
            files_parsed,
        })
    }

    /// Basenames of the proto files directly inside `dir`, sorted.
    fn discover(&self, dir: &str) -> Result<Vec<String>> {
        let root = workspace_root(self.parser.workspace_env())?.join(dir);
        debug!("Scanning {:?}", root);

        let mut basenames = Vec::new();
        for entry in WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| ProtoruleError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let basename = entry.file_name().to_string_lossy();
            if is_proto_file(&basename) {
                basenames.push(basename.into_owned());
            }
        }
        Ok(basenames)
    }

    fn parse_all(&self, dir: &str, basenames: &[String]) -> (Vec<ProtoFile>, Vec<FileFailure>) {
        let results: Vec<(String, Result<ProtoFile>)> = basenames
            .par_iter()
            .map(|basename| (basename.clone(), self.parser.parse_file(dir, basename)))
            .collect();

        let mut files = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (basename, result) in results {
            match result {
                Ok(file) => files.push(file),
                Err(error) => {
                    let file = ProtoFile::new(dir, basename).relname();
                    warn!("Skipping {}: {}", file, error);
                    failures.push(FileFailure { file, error });
                }
            }
        }
        (files, failures)
    }

    /// The rule for one source file, or `None` when no plugin applies.
    pub fn rule_for(&self, file: &ProtoFile) -> Option<ProtoCompileRule> {
        let applicable: Vec<(&PluginEntry, &PluginConfiguration)> = self
            .config
            .plugins
            .iter()
            .zip(&self.plugins)
            .filter(|(entry, _)| applies(entry, file))
            .collect();

        if applicable.is_empty() {
            debug!("No plugin applies to {}", file.relname());
            return None;
        }

        let configurations: Vec<PluginConfiguration> =
            applicable.iter().map(|(_, plugin)| (*plugin).clone()).collect();
        let labels = configurations.iter().map(|p| p.label.clone()).collect();
        let outputs = generated_outputs(&applicable, file);

        let rule = ProtoCompileRule::new(
            self.config.general.prefix.as_str(),
            file,
            labels,
            outputs,
            plugin_options(&configurations),
        )
        .with_visibility(self.config.general.visibility.clone())
        .with_comment(self.config.general.comment.clone());

        Some(rule)
    }
}

/// Whether a configured plugin generates code for `file`.
pub fn applies(entry: &PluginEntry, file: &ProtoFile) -> bool {
    if !entry.srcs.is_empty() && !entry.srcs.iter().any(|src| src == file.name()) {
        return false;
    }

    match entry.when {
        When::Always => true,
        When::Messages => file.has_messages(),
        When::Enums => file.has_enums(),
        When::Services => file.has_services(),
        When::EnumOption => entry
            .enum_option
            .as_deref()
            .is_some_and(|name| file.has_enum_option(name)),
    }
}

/// Expands every applicable plugin's output templates for `file`, in
/// plugin order then template order, keeping the first of any duplicates.
fn generated_outputs(
    applicable: &[(&PluginEntry, &PluginConfiguration)],
    file: &ProtoFile,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut outputs = Vec::new();

    for (entry, plugin) in applicable {
        let stem = plugin
            .mappings
            .get(file.name())
            .map(String::as_str)
            .unwrap_or(file.name());

        for template in &entry.outputs {
            let output = expand_template(template, stem, file);
            if seen.insert(output.clone()) {
                outputs.push(output);
            }
        }
    }
    outputs
}

fn expand_template(template: &str, stem: &str, file: &ProtoFile) -> String {
    template
        .replace("{name}", stem)
        .replace("{basename}", file.basename())
        .replace("{dir}", file.dir())
        .replace("{package}", file.package_name().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullDiagnostics;
    use pretty_assertions::assert_eq;

    fn config(plugins: &str) -> ProtoruleConfig {
        ProtoruleConfig::from_toml_str(&format!(
            "[general]\nprefix = \"go\"\n{plugins}"
        ))
        .unwrap()
    }

    fn generator(plugins: &str) -> RuleGenerator {
        RuleGenerator::with_diagnostics(config(plugins), Arc::new(NullDiagnostics)).unwrap()
    }

    fn file(source: &str) -> ProtoFile {
        ProtoFile::parse_str("pkg", "foo.proto", source).unwrap()
    }

    fn entry(when: When) -> PluginEntry {
        PluginEntry {
            name: "p".to_string(),
            label: "//tools:p".to_string(),
            options: Vec::new(),
            out: None,
            outputs: Vec::new(),
            when,
            enum_option: None,
            srcs: Vec::new(),
            mappings: BTreeMap::new(),
        }
    }

    #[test]
    fn test_applies_by_predicate() {
        let messages_only = file("message M {}");
        assert!(applies(&entry(When::Always), &messages_only));
        assert!(applies(&entry(When::Messages), &messages_only));
        assert!(!applies(&entry(When::Enums), &messages_only));
        assert!(!applies(&entry(When::Services), &messages_only));

        let annotated = file("enum E { E_ZERO = 0 [(my.ext) = true]; }");
        let mut by_option = entry(When::EnumOption);
        by_option.enum_option = Some("(my.ext)".to_string());
        assert!(applies(&by_option, &annotated));
        by_option.enum_option = Some("(other.ext)".to_string());
        assert!(!applies(&by_option, &annotated));
    }

    #[test]
    fn test_applies_respects_srcs_filter() {
        let mut restricted = entry(When::Always);
        restricted.srcs = vec!["bar".to_string()];
        assert!(!applies(&restricted, &file("package pkg;")));
        restricted.srcs.push("foo".to_string());
        assert!(applies(&restricted, &file("package pkg;")));
    }

    #[test]
    fn test_rule_for_combines_applicable_plugins() {
        let generator = generator(
            r#"
            [[plugin]]
            name = "go"
            label = "//plugins:go"
            options = ["plugins=grpc", "paths=source_relative"]
            outputs = ["{name}.pb.go", "{name}_grpc.pb.go"]

            [[plugin]]
            name = "cpp"
            label = "//plugins:cpp"
            outputs = ["{name}.pb.cc", "{name}.pb.h"]
            when = "services"
            "#,
        );

        let rule = generator.rule_for(&file("message M {}")).unwrap().rule();
        assert_eq!(rule.name, "foo_go_compile");
        assert_eq!(rule.attrs.plugins, vec!["//plugins:go"]);
        assert_eq!(
            rule.attrs.generated_srcs,
            vec!["foo.pb.go", "foo_grpc.pb.go"]
        );
        assert_eq!(
            rule.attrs.options.unwrap()["go"],
            "paths=source_relative,plugins=grpc"
        );
    }

    #[test]
    fn test_rule_for_none_when_no_plugin_applies() {
        let generator = generator(
            r#"
            [[plugin]]
            name = "grpc"
            label = "//plugins:grpc"
            when = "services"
            "#,
        );
        assert!(generator.rule_for(&file("message M {}")).is_none());
    }

    #[test]
    fn test_outputs_use_mapping_and_dedupe() {
        let generator = generator(
            r#"
            [[plugin]]
            name = "a"
            label = "//plugins:a"
            outputs = ["{name}.pb.go", "{dir}/{package}/{basename}.txt"]
            [plugin.mappings]
            foo = "relocated/foo"

            [[plugin]]
            name = "b"
            label = "//plugins:b"
            outputs = ["relocated/foo.pb.go", "{name}.b"]
            "#,
        );

        let rule = generator.rule_for(&file("package api.v1;")).unwrap().rule();
        assert_eq!(
            rule.attrs.generated_srcs,
            vec![
                "relocated/foo.pb.go",
                "pkg/api.v1/foo.proto.txt",
                "foo.b",
            ]
        );
    }
}
