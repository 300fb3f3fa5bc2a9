use crate::error::{ProtoruleError, Result};
use crate::label::Label;
use crate::plugin::PluginConfiguration;
use crate::proto_file::DEFAULT_WORKSPACE_ENV;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::{env, fs};
use strum::{Display, EnumString};
use tracing::{debug, error, info, trace, warn};

pub const CONFIG_FILE_NAME: &str = "protorule.toml";

/// Which source files a plugin generates code for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum When {
    /// Every parsed file
    #[default]
    Always,
    /// Files declaring at least one message
    Messages,
    /// Files declaring at least one enum
    Enums,
    /// Files declaring at least one service
    Services,
    /// Files where an enum or enum value carries `enum_option`
    EnumOption,
}

fn default_workspace_env() -> String {
    DEFAULT_WORKSPACE_ENV.to_string()
}

/// Settings shared by every generated rule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Rule-name prefix: rules are named `<source>_<prefix>_compile`
    pub prefix: String,

    #[serde(default)]
    pub visibility: Vec<String>,

    /// Leading comment lines attached to each rule
    #[serde(default)]
    pub comment: Vec<String>,

    /// Environment variable that overrides the workspace root
    #[serde(default = "default_workspace_env")]
    pub workspace_env: String,
}

/// A `[[plugin]]` table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginEntry {
    pub name: String,
    pub label: String,

    #[serde(default)]
    pub options: Vec<String>,

    #[serde(default)]
    pub out: Option<String>,

    /// Output filename templates (`{name}.pb.go`)
    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default)]
    pub when: When,

    /// Option name tested when `when = "enum_option"`
    #[serde(default)]
    pub enum_option: Option<String>,

    /// Restricts the plugin to these logical source names
    #[serde(default)]
    pub srcs: Vec<String>,

    #[serde(default)]
    pub mappings: BTreeMap<String, String>,
}

/// Root configuration, read from `protorule.toml`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProtoruleConfig {
    pub general: GeneralConfig,

    #[serde(rename = "plugin", default)]
    pub plugins: Vec<PluginEntry>,
}

impl ProtoruleConfig {
    /// Load configuration by searching for protorule.toml in the current
    /// directory and its ancestors.
    pub fn new() -> Result<ProtoruleConfig> {
        info!("Loading protorule configuration");
        dotenv::dotenv().ok();
        debug!("Environment variables loaded from .env if present");

        let config_path = Self::find_config_file(&env::current_dir()?)?;
        info!("Found configuration file at: {:?}", config_path);

        Self::from_path(&config_path)
    }

    pub fn from_path(path: &Path) -> Result<ProtoruleConfig> {
        let contents = fs::read_to_string(path).map_err(|e| {
            error!("Failed to read configuration file {:?}: {}", path, e);
            ProtoruleError::from(e)
        })?;
        debug!("Configuration file size: {} bytes", contents.len());

        Self::from_toml_str(&contents)
    }

    /// Parses, substitutes environment variables and validates.
    pub fn from_toml_str(contents: &str) -> Result<ProtoruleConfig> {
        let mut config: ProtoruleConfig = toml::from_str(contents).map_err(|e| {
            error!("Failed to parse TOML configuration: {}", e);
            ProtoruleError::from(e)
        })?;
        debug!("Successfully parsed TOML configuration");

        for plugin in &mut config.plugins {
            plugin.label = Self::substitute_env_vars(&plugin.label)?;
            if let Some(out) = &plugin.out {
                plugin.out = Some(Self::substitute_env_vars(out)?);
            }
            for option in &mut plugin.options {
                *option = Self::substitute_env_vars(option)?;
            }
        }

        config.validate()?;

        info!(
            "Configuration loaded successfully with {} plugins",
            config.plugins.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.prefix.trim().is_empty() {
            return Err(ProtoruleError::config("general.prefix must not be empty"));
        }

        let mut seen = HashSet::new();
        for plugin in &self.plugins {
            if plugin.name.is_empty() {
                return Err(ProtoruleError::config("plugin name must not be empty"));
            }
            plugin.label.parse::<Label>()?;

            if plugin.when == When::EnumOption
                && plugin.enum_option.as_deref().is_none_or(str::is_empty)
            {
                return Err(ProtoruleError::config(format!(
                    "plugin {} uses when = \"enum_option\" without an enum_option name",
                    plugin.name
                )));
            }

            if !seen.insert(plugin.name.as_str()) {
                warn!(
                    "Plugin {} is declared more than once; the last declaration wins",
                    plugin.name
                );
            }
        }

        Ok(())
    }

    /// The registry view of the configured plugins, in declaration order.
    pub fn plugin_configurations(&self) -> Result<Vec<PluginConfiguration>> {
        self.plugins
            .iter()
            .map(|plugin| -> Result<PluginConfiguration> {
                Ok(PluginConfiguration::builder()
                    .label(plugin.label.parse()?)
                    .name(plugin.name.as_str())
                    .mappings(plugin.mappings.clone())
                    .options(plugin.options.clone())
                    .maybe_out(plugin.out.clone())
                    .srcs(plugin.srcs.clone())
                    .build())
            })
            .collect()
    }

    /// Searches for `protorule.toml` starting from `start` and traversing
    /// up to the root.
    pub fn find_config_file(start: &Path) -> Result<PathBuf> {
        debug!("Starting config file search from: {:?}", start);

        for path in start.ancestors() {
            let config_path = path.join(CONFIG_FILE_NAME);
            trace!("Checking for config at: {:?}", config_path);
            if config_path.exists() {
                return Ok(config_path);
            }
        }

        error!("Configuration file '{}' not found in any parent directory.", CONFIG_FILE_NAME);
        Err(ProtoruleError::config(format!(
            "{} not found in current or any parent directory.",
            CONFIG_FILE_NAME
        )))
    }

    /// Substitute environment variables in config strings.
    /// Supports ${VAR_NAME:-default} syntax.
    pub(crate) fn substitute_env_vars(value: &str) -> Result<String> {
        trace!("Substituting environment variables in: {}", value);
        let mut result = value.to_string();

        let re = regex::Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}")?;

        for cap in re.captures_iter(value) {
            let var_name = &cap[1];
            let default_value = cap.get(2).map(|m| m.as_str());

            let replacement = match env::var(var_name) {
                Ok(val) => {
                    debug!("Resolved environment variable: {}", var_name);
                    val
                }
                Err(_) => match default_value {
                    Some(default) => {
                        warn!(
                            "Environment variable {} not set, using default: {}",
                            var_name, default
                        );
                        default.to_string()
                    }
                    None => {
                        error!(
                            "Environment variable {} not set and no default provided",
                            var_name
                        );
                        return Err(ProtoruleError::EnvVarNotSet(var_name.to_string()));
                    }
                },
            };

            result = result.replace(&cap[0], &replacement);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
        [general]
        prefix = "go"
    "#;

    // ==================== When Tests ====================

    #[test]
    fn test_when_string_forms() {
        assert_eq!(When::EnumOption.to_string(), "enum_option");
        assert_eq!(When::from_str("services").unwrap(), When::Services);
        assert!(When::from_str("sometimes").is_err());
        assert_eq!(When::default(), When::Always);
    }

    // ==================== Parsing Tests ====================

    #[test]
    fn test_minimal_config_defaults() {
        let config = ProtoruleConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.general.prefix, "go");
        assert!(config.general.visibility.is_empty());
        assert_eq!(config.general.workspace_env, "BUILD_WORKSPACE_DIRECTORY");
        assert!(config.plugins.is_empty());
    }

    #[test]
    fn test_full_plugin_entry() {
        let toml_str = r#"
            [general]
            prefix = "go"
            visibility = ["//visibility:public"]

            [[plugin]]
            name = "go"
            label = "@build_stack_rules_proto//plugin/golang/protobuf:protoc-gen-go"
            options = ["paths=source_relative"]
            outputs = ["{name}.pb.go"]
            when = "messages"
            srcs = ["foo"]

            [plugin.mappings]
            foo = "relocated/foo"

            [[plugin]]
            name = "gogo_enum"
            label = "//tools:enum_gen"
            when = "enum_option"
            enum_option = "(gogoproto.enum_customname)"
        "#;

        let config = ProtoruleConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.plugins.len(), 2);

        let go = &config.plugins[0];
        assert_eq!(go.when, When::Messages);
        assert_eq!(go.outputs, vec!["{name}.pb.go"]);
        assert_eq!(go.mappings["foo"], "relocated/foo");
        assert_eq!(config.plugins[1].when, When::EnumOption);

        let registry = config.plugin_configurations().unwrap();
        assert_eq!(registry[0].label.pkg, "plugin/golang/protobuf");
        assert_eq!(registry[0].srcs, vec!["foo"]);
        assert_eq!(registry[1].label.to_string(), "//tools:enum_gen");
    }

    #[test]
    fn test_env_substitution_in_plugin_fields() {
        temp_env::with_vars(
            [
                ("PROTORULE_TEST_OUT", Some("gen/go")),
                ("PROTORULE_TEST_REPO", Some("my_rules")),
            ],
            || {
                let toml_str = r#"
                    [general]
                    prefix = "go"

                    [[plugin]]
                    name = "go"
                    label = "@${PROTORULE_TEST_REPO}//plugins:go"
                    out = "${PROTORULE_TEST_OUT}"
                    options = ["M=${PROTORULE_TEST_UNSET_OPTION:-fallback}"]
                "#;
                let config = ProtoruleConfig::from_toml_str(toml_str).unwrap();
                let plugin = &config.plugins[0];
                assert_eq!(plugin.label, "@my_rules//plugins:go");
                assert_eq!(plugin.out.as_deref(), Some("gen/go"));
                assert_eq!(plugin.options, vec!["M=fallback"]);
            },
        );
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_empty_prefix_rejected() {
        let err = ProtoruleConfig::from_toml_str("[general]\nprefix = \"\"\n").unwrap_err();
        assert!(matches!(err, ProtoruleError::Config(_)));
    }

    #[test]
    fn test_bad_label_rejected() {
        let toml_str = r#"
            [general]
            prefix = "go"

            [[plugin]]
            name = "go"
            label = "not//a:label:at:all"
        "#;
        let err = ProtoruleConfig::from_toml_str(toml_str).unwrap_err();
        assert!(matches!(err, ProtoruleError::InvalidLabel { .. }));
    }

    #[test]
    fn test_enum_option_predicate_requires_name() {
        let toml_str = r#"
            [general]
            prefix = "go"

            [[plugin]]
            name = "enum"
            label = "//tools:enum"
            when = "enum_option"
        "#;
        let err = ProtoruleConfig::from_toml_str(toml_str).unwrap_err();
        assert!(err.to_string().contains("enum_option"));
    }

    #[test]
    fn test_duplicate_plugin_names_allowed() {
        let toml_str = r#"
            [general]
            prefix = "go"

            [[plugin]]
            name = "go"
            label = "//a:go"

            [[plugin]]
            name = "go"
            label = "//b:go"
        "#;
        assert!(ProtoruleConfig::from_toml_str(toml_str).is_ok());
    }

    #[test]
    fn test_missing_general_is_toml_error() {
        let err = ProtoruleConfig::from_toml_str("").unwrap_err();
        assert!(matches!(err, ProtoruleError::Toml(_)));
    }

    // ==================== substitute_env_vars Tests ====================

    #[test]
    fn test_substitute_env_vars_basic() {
        temp_env::with_var("PROTORULE_TEST_VAR_BASIC", Some("hello"), || {
            let result =
                ProtoruleConfig::substitute_env_vars("${PROTORULE_TEST_VAR_BASIC}").unwrap();
            assert_eq!(result, "hello");
        });
    }

    #[test]
    fn test_substitute_env_vars_multiple_and_adjacent() {
        temp_env::with_vars(
            [
                ("PROTORULE_TEST_A", Some("a")),
                ("PROTORULE_TEST_B", Some("b")),
            ],
            || {
                let result = ProtoruleConfig::substitute_env_vars(
                    "${PROTORULE_TEST_A}${PROTORULE_TEST_B}/${PROTORULE_TEST_A}",
                )
                .unwrap();
                assert_eq!(result, "ab/a");
            },
        );
    }

    #[test]
    fn test_substitute_env_vars_missing_returns_error() {
        temp_env::with_var_unset("PROTORULE_DEFINITELY_NOT_SET", || {
            let result = ProtoruleConfig::substitute_env_vars("${PROTORULE_DEFINITELY_NOT_SET}");
            assert!(matches!(result, Err(ProtoruleError::EnvVarNotSet(name)) if name == "PROTORULE_DEFINITELY_NOT_SET"));
        });
    }

    #[test]
    fn test_substitute_env_vars_no_match() {
        let result = ProtoruleConfig::substitute_env_vars("plain {name}.pb.go").unwrap();
        assert_eq!(result, "plain {name}.pb.go");
    }

    // ==================== find_config_file Tests ====================

    #[test]
    fn test_find_config_file_in_ancestor() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), MINIMAL).unwrap();

        let found = ProtoruleConfig::find_config_file(&nested).unwrap();
        assert_eq!(found, temp_dir.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_find_config_file_prefers_nearest() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("inner");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), MINIMAL).unwrap();
        fs::write(nested.join(CONFIG_FILE_NAME), MINIMAL).unwrap();

        let found = ProtoruleConfig::find_config_file(&nested).unwrap();
        assert_eq!(found, nested.join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_from_path_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, MINIMAL).unwrap();
        assert_eq!(ProtoruleConfig::from_path(&path).unwrap().general.prefix, "go");

        let missing = ProtoruleConfig::from_path(&temp_dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ProtoruleError::Io(_))));
    }
}
