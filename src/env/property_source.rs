//! Named property sources.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::application::ApplicationArguments;

/// Name of the adapter source installed by [`attach`](crate::env::attach).
pub const CONFIGURATION_PROPERTIES: &str = "configurationProperties";

/// Property exposing non-option command-line arguments.
pub const NON_OPTION_ARGS: &str = "nonOptionArgs";

/// One named layer of configuration.
#[derive(Debug, Clone)]
pub enum PropertySource {
    /// Plain key/value map.
    Map {
        name: String,
        values: BTreeMap<String, Value>,
    },
    /// Options parsed from process arguments.
    CommandLine {
        name: String,
        args: ApplicationArguments,
    },
    /// Several sources searched first-to-last under one name.
    Composite {
        name: String,
        children: Vec<PropertySource>,
    },
    /// Marker for the relaxed-name adapter; holds no values.
    ConfigurationProperties,
}

/// Serializable view of a source, used for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSnapshot {
    pub name: String,
    pub properties: BTreeMap<String, Value>,
}

impl PropertySource {
    /// Create a map source.
    pub fn map(name: impl Into<String>, values: BTreeMap<String, Value>) -> Self {
        PropertySource::Map {
            name: name.into(),
            values,
        }
    }

    /// Create a command-line source.
    pub fn command_line(name: impl Into<String>, args: ApplicationArguments) -> Self {
        PropertySource::CommandLine {
            name: name.into(),
            args,
        }
    }

    /// Create a composite source.
    pub fn composite(name: impl Into<String>, children: Vec<PropertySource>) -> Self {
        PropertySource::Composite {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PropertySource::Map { name, .. }
            | PropertySource::CommandLine { name, .. }
            | PropertySource::Composite { name, .. } => name,
            PropertySource::ConfigurationProperties => CONFIGURATION_PROPERTIES,
        }
    }

    /// Look up a key in this source only.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            PropertySource::Map { values, .. } => values.get(key).cloned(),
            PropertySource::CommandLine { args, .. } => {
                if key == NON_OPTION_ARGS {
                    let rest = args.non_option_args();
                    return (!rest.is_empty()).then(|| Value::String(rest.join(",")));
                }
                args.option_values(key)
                    .map(|values| Value::String(values.join(",")))
            }
            PropertySource::Composite { children, .. } => {
                children.iter().find_map(|child| child.get(key))
            }
            PropertySource::ConfigurationProperties => None,
        }
    }

    /// Whether this source defines `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Every key this source defines, without duplicates.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = match self {
            PropertySource::Map { values, .. } => values.keys().cloned().collect(),
            PropertySource::CommandLine { args, .. } => {
                let mut names = args.option_names().to_vec();
                if !args.non_option_args().is_empty() {
                    names.push(NON_OPTION_ARGS.to_string());
                }
                names
            }
            PropertySource::Composite { children, .. } => {
                children.iter().flat_map(PropertySource::keys).collect()
            }
            PropertySource::ConfigurationProperties => Vec::new(),
        };
        let mut seen = std::collections::HashSet::new();
        keys.retain(|key| seen.insert(key.clone()));
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Resolved key/value view of this source.
    pub fn snapshot(&self) -> SourceSnapshot {
        let properties = self
            .keys()
            .into_iter()
            .filter_map(|key| self.get(&key).map(|value| (key, value)))
            .collect();
        SourceSnapshot {
            name: self.name().to_string(),
            properties,
        }
    }
}
