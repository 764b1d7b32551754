//! Configuration files as property sources.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::env::PropertySource;

/// Error type for configuration file loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Missing(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Missing(location) => {
                write!(f, "Config resource '{}' does not exist", location)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Missing(_) => None,
        }
    }
}

/// Name given to the source loaded from `path`.
pub fn source_name(path: &Path) -> String {
    format!("Config resource '{}'", path.display())
}

/// Load a TOML file as a property source with dotted keys.
pub fn load_config_source(path: &Path) -> Result<PropertySource, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Missing(path.display().to_string()));
    }
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let values = parse_properties(&content)?;
    Ok(PropertySource::map(source_name(path), values))
}

/// Parse TOML text into flattened `a.b.c` keys.
pub fn parse_properties(content: &str) -> Result<BTreeMap<String, Value>, ConfigError> {
    let table: toml::Table = toml::from_str(content).map_err(ConfigError::Parse)?;
    let mut values = BTreeMap::new();
    flatten("", toml::Value::Table(table), &mut values);
    Ok(values)
}

fn flatten(prefix: &str, value: toml::Value, out: &mut BTreeMap<String, Value>) {
    match value {
        toml::Value::Table(table) => {
            for (key, nested) in table {
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, nested, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), to_json(other));
        }
    }
}

fn to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, nested)| (key, to_json(nested)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_nested_tables_flatten() {
        let values = parse_properties(
            r#"
            [liftoff.main]
            banner-mode = "off"
            sources = ["a", "b"]

            [server]
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(values.get("liftoff.main.banner-mode"), Some(&json!("off")));
        assert_eq!(values.get("liftoff.main.sources"), Some(&json!(["a", "b"])));
        assert_eq!(values.get("server.port"), Some(&json!(8080)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "greeting = \"hello\"").unwrap();

        let source = load_config_source(file.path()).unwrap();
        assert_eq!(source.name(), source_name(file.path()));
        assert_eq!(source.get("greeting"), Some(json!("hello")));
    }

    #[test]
    fn test_missing_and_malformed() {
        let missing = load_config_source(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Missing(_)));
        assert!(matches!(parse_properties("= nope"), Err(ConfigError::Parse(_))));
    }
}
