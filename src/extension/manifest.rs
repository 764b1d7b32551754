//! Declarative extension manifest.
//!
//! ```toml
//! [capabilities]
//! "run-listener" = ["event-publishing", "audit"]
//! "failure-reporter" = ["pretty-reporter"]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Error type for manifest loading.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest")]
    Parse(#[from] toml::de::Error),

    #[error("manifest declares an empty implementer name for '{0}'")]
    EmptyName(String),
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    capabilities: BTreeMap<String, Vec<String>>,
}

/// Mapping from capability key to implementer names, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: HashMap<String, Vec<String>>,
}

impl Manifest {
    /// Parse a manifest document.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let file: ManifestFile = toml::from_str(content)?;
        let mut manifest = Self::default();
        for (capability, names) in file.capabilities {
            for name in names {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ManifestError::EmptyName(capability));
                }
                manifest.add(&capability, name);
            }
        }
        Ok(manifest)
    }

    /// Load and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Declare an implementer; duplicates keep their first position.
    pub fn add(&mut self, capability: &str, name: &str) {
        let names = self.entries.entry(capability.to_string()).or_default();
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }

    /// Append every declaration from another manifest.
    pub fn merge(&mut self, other: Manifest) {
        let mut capabilities: Vec<_> = other.entries.into_iter().collect();
        capabilities.sort_by(|a, b| a.0.cmp(&b.0));
        for (capability, names) in capabilities {
            for name in names {
                self.add(&capability, &name);
            }
        }
    }

    /// Implementer names for a capability, in discovery order.
    pub fn implementers(&self, capability: &str) -> &[String] {
        self.entries
            .get(capability)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(
            r#"
            [capabilities]
            "run-listener" = ["a", "b", "a"]
            "listener" = ["c"]
            "#,
        )
        .unwrap();

        assert_eq!(manifest.implementers("run-listener"), ["a", "b"]);
        assert_eq!(manifest.implementers("listener"), ["c"]);
        assert!(manifest.implementers("missing").is_empty());
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = Manifest::parse("[capabilities]\n\"listener\" = [\" \"]").unwrap_err();
        assert!(matches!(err, ManifestError::EmptyName(ref c) if c == "listener"));
    }

    #[test]
    fn test_merge_keeps_first_position() {
        let mut manifest = Manifest::default();
        manifest.add("listener", "x");
        manifest.merge(Manifest::parse("[capabilities]\n\"listener\" = [\"y\", \"x\"]").unwrap());
        assert_eq!(manifest.implementers("listener"), ["x", "y"]);
    }
}
