//! Protoc plugin configurations and projections over them.
//!
//! None of the projection functions mutate their input. When two plugins
//! share a name, the later one wins in the map-producing projections.

use crate::label::Label;
use bon::Builder;
use std::collections::{BTreeMap, HashMap};

/// The configuration of a protoc plugin and the sources and source
/// mappings it is expected to produce.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct PluginConfiguration {
    pub label: Label,
    #[builder(into)]
    pub name: String,
    /// Logical source name to relocated output stem.
    #[builder(default)]
    pub mappings: BTreeMap<String, String>,
    #[builder(default)]
    pub options: Vec<String>,
    /// Output directory override; `None` means the rule's default.
    #[builder(into)]
    pub out: Option<String>,
    #[builder(default)]
    pub srcs: Vec<String>,
}

/// Label strings for a list of plugins, one per plugin, in order.
pub fn plugin_labels(plugins: &[PluginConfiguration]) -> Vec<String> {
    plugins.iter().map(|plugin| plugin.label.to_string()).collect()
}

/// Options by plugin name, skipping plugins without options.
pub fn plugin_options(plugins: &[PluginConfiguration]) -> HashMap<String, Vec<String>> {
    let mut options = HashMap::new();
    for plugin in plugins {
        if plugin.options.is_empty() {
            continue;
        }
        options.insert(plugin.name.clone(), plugin.options.clone());
    }
    options
}

/// Output location by plugin name, skipping plugins without an override.
pub fn plugin_outs(plugins: &[PluginConfiguration]) -> HashMap<String, String> {
    let mut outs = HashMap::new();
    for plugin in plugins {
        match plugin.out.as_deref() {
            Some(out) if !out.is_empty() => {
                outs.insert(plugin.name.clone(), out.to_string());
            }
            _ => {}
        }
    }
    outs
}
