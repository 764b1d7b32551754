//! The layered environment.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::application::DeploymentType;
use crate::env::attach::{is_attached, relaxed_names};
use crate::env::conversion::{convert_strict, ConversionError, ConversionService};
use crate::env::property_source::{PropertySource, SourceSnapshot};
use crate::env::sources::PropertySources;
use crate::env::EnvironmentError;

/// Process environment variables.
pub const SYSTEM_ENVIRONMENT: &str = "systemEnvironment";
/// Server-variant init parameters (placeholder until a server supplies them).
pub const SERVER_CONFIG_INIT_PARAMS: &str = "serverConfigInitParams";
/// Server-variant context parameters (placeholder until a server supplies them).
pub const SERVER_CONTEXT_INIT_PARAMS: &str = "serverContextInitParams";

/// Explicit active profiles when none were set programmatically.
pub const ACTIVE_PROFILES_PROPERTY: &str = "liftoff.profiles.active";
/// Explicit default profiles when none were set programmatically.
pub const DEFAULT_PROFILES_PROPERTY: &str = "liftoff.profiles.default";

const SERVER_SOURCE_NAMES: [&str; 2] = [SERVER_CONFIG_INIT_PARAMS, SERVER_CONTEXT_INIT_PARAMS];

/// Environment variant, one per deployment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvironmentKind {
    Standard,
    Server,
    ReactiveServer,
}

impl EnvironmentKind {
    pub fn for_deployment(deployment: DeploymentType) -> Self {
        match deployment {
            DeploymentType::None => EnvironmentKind::Standard,
            DeploymentType::Server => EnvironmentKind::Server,
            DeploymentType::ReactiveServer => EnvironmentKind::ReactiveServer,
        }
    }

    /// Source names only this variant carries.
    pub(crate) fn specific_sources(self) -> &'static [&'static str] {
        match self {
            EnvironmentKind::Server => &SERVER_SOURCE_NAMES,
            EnvironmentKind::Standard | EnvironmentKind::ReactiveServer => &[],
        }
    }

    /// Whether `name` belongs to any variant's specific sources.
    pub(crate) fn is_variant_specific(name: &str) -> bool {
        SERVER_SOURCE_NAMES.contains(&name)
    }
}

/// Ordered property sources plus profiles and conversion.
#[derive(Debug, Clone)]
pub struct Environment {
    kind: EnvironmentKind,
    sources: PropertySources,
    active_profiles: Option<Vec<String>>,
    default_profiles: Option<Vec<String>>,
    conversion: Option<Arc<ConversionService>>,
}

impl Environment {
    /// Create an environment with the process variables as baseline.
    pub fn new(kind: EnvironmentKind) -> Self {
        Self::with_system_environment(kind, std::env::vars())
    }

    /// Create an environment with explicit variables as baseline.
    pub fn with_system_environment<I, K, V>(kind: EnvironmentKind, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Self::empty(kind);
        for name in kind.specific_sources() {
            env.sources.add_last(PropertySource::map(*name, BTreeMap::new()));
        }
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        env.sources
            .add_last(PropertySource::map(SYSTEM_ENVIRONMENT, vars));
        env
    }

    /// Create an environment with no sources at all.
    pub fn empty(kind: EnvironmentKind) -> Self {
        Self {
            kind,
            sources: PropertySources::new(),
            active_profiles: None,
            default_profiles: None,
            conversion: None,
        }
    }

    pub fn kind(&self) -> EnvironmentKind {
        self.kind
    }

    pub fn sources(&self) -> &PropertySources {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut PropertySources {
        &mut self.sources
    }

    pub fn set_conversion_service(&mut self, service: Arc<ConversionService>) {
        self.conversion = Some(service);
    }

    pub fn conversion_service(&self) -> Option<&Arc<ConversionService>> {
        self.conversion.as_ref()
    }

    /// Raw value of the highest-priority source defining `key`.
    pub fn property(&self, key: &str) -> Option<Value> {
        let names = if is_attached(self) {
            relaxed_names(key)
        } else {
            vec![key.to_string()]
        };
        self.sources
            .iter()
            .find_map(|source| names.iter().find_map(|name| source.get(name)))
    }

    /// Whether any source defines `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.property(key).is_some()
    }

    /// Typed lookup.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConversionError> {
        let Some(value) = self.property(key) else {
            return Ok(None);
        };
        let converted = match &self.conversion {
            Some(service) => service.convert(key, &value)?,
            None => convert_strict(key, &value)?,
        };
        Ok(Some(converted))
    }

    /// Typed lookup with a fallback.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ConversionError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Active profiles, falling back to `liftoff.profiles.active`.
    pub fn active_profiles(&self) -> Vec<String> {
        match &self.active_profiles {
            Some(profiles) => profiles.clone(),
            None => self.profile_property(ACTIVE_PROFILES_PROPERTY).unwrap_or_default(),
        }
    }

    pub fn set_active_profiles<I, S>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_profiles = Some(profiles.into_iter().map(Into::into).collect());
    }

    /// Default profiles, falling back to `liftoff.profiles.default`, then `default`.
    pub fn default_profiles(&self) -> Vec<String> {
        match &self.default_profiles {
            Some(profiles) => profiles.clone(),
            None => self
                .profile_property(DEFAULT_PROFILES_PROPERTY)
                .unwrap_or_else(|| vec!["default".to_string()]),
        }
    }

    pub fn set_default_profiles<I, S>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_profiles = Some(profiles.into_iter().map(Into::into).collect());
    }

    fn profile_property(&self, key: &str) -> Option<Vec<String>> {
        let value = self.property(key)?;
        let profiles: Vec<String> = ConversionService::shared().convert(key, &value).ok()?;
        Some(
            profiles
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        )
    }

    /// Replace `${key}` and `${key:default}` placeholders.
    pub fn resolve_placeholders(&self, text: &str) -> Result<String, EnvironmentError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| EnvironmentError::UnresolvablePlaceholder(text.to_string()))?;
            let expression = &after[..end];
            let (key, default) = match expression.split_once(':') {
                Some((key, default)) => (key, Some(default)),
                None => (expression, None),
            };
            match self.property(key) {
                Some(Value::String(value)) => out.push_str(&value),
                Some(value) => out.push_str(&value.to_string()),
                None => match default {
                    Some(default) => out.push_str(default),
                    None => return Err(EnvironmentError::UnresolvablePlaceholder(key.to_string())),
                },
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Snapshot of every source for inspection, adapter excluded.
    pub fn describe(&self) -> Vec<SourceSnapshot> {
        self.sources
            .iter()
            .filter(|source| !matches!(source, PropertySource::ConfigurationProperties))
            .map(PropertySource::snapshot)
            .collect()
    }

    /// Rebuild this environment as another variant around `sources`.
    pub(crate) fn rebuild(self, kind: EnvironmentKind, sources: PropertySources) -> Environment {
        Environment {
            kind,
            sources,
            active_profiles: self.active_profiles,
            default_profiles: self.default_profiles,
            conversion: self.conversion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::attach;
    use serde_json::json;

    fn with(pairs: &[(&str, Value)]) -> Environment {
        let mut env = Environment::empty(EnvironmentKind::Standard);
        env.sources_mut().add_last(PropertySource::map(
            "test",
            pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        ));
        env
    }

    #[test]
    fn test_baseline_sources_per_kind() {
        let standard = Environment::with_system_environment(EnvironmentKind::Standard, [("A", "1")]);
        assert_eq!(standard.sources().names(), vec![SYSTEM_ENVIRONMENT]);

        let server = Environment::with_system_environment(EnvironmentKind::Server, [("A", "1")]);
        assert_eq!(
            server.sources().names(),
            vec![SERVER_CONFIG_INIT_PARAMS, SERVER_CONTEXT_INIT_PARAMS, SYSTEM_ENVIRONMENT]
        );
    }

    #[test]
    fn test_relaxed_lookup_only_when_attached() {
        let mut env = Environment::with_system_environment(
            EnvironmentKind::Standard,
            [("LIFTOFF_MAIN_BANNER_MODE", "off")],
        );
        assert_eq!(env.property("liftoff.main.banner-mode"), None);

        attach::attach(&mut env);
        assert_eq!(env.property("liftoff.main.banner-mode"), Some(json!("off")));
    }

    #[test]
    fn test_typed_lookup_respects_conversion_service() {
        let mut env = with(&[("port", json!("8080"))]);
        assert!(env.get::<u16>("port").is_err());

        env.set_conversion_service(ConversionService::shared());
        assert_eq!(env.get::<u16>("port").unwrap(), Some(8080));
        assert_eq!(env.get::<u16>("missing").unwrap(), None);
        assert_eq!(env.get_or::<u16>("missing", 1).unwrap(), 1);
    }

    #[test]
    fn test_profiles_fall_back_to_properties() {
        let mut env = with(&[(ACTIVE_PROFILES_PROPERTY, json!("dev, local"))]);
        assert_eq!(env.active_profiles(), vec!["dev", "local"]);
        assert_eq!(env.default_profiles(), vec!["default"]);

        env.set_active_profiles(["prod"]);
        assert_eq!(env.active_profiles(), vec!["prod"]);
    }

    #[test]
    fn test_resolve_placeholders() {
        let env = with(&[("home", json!("/srv")), ("port", json!(80))]);
        assert_eq!(
            env.resolve_placeholders("file:${home}/app-${port}.toml").unwrap(),
            "file:/srv/app-80.toml"
        );
        assert_eq!(env.resolve_placeholders("${nope:fallback}").unwrap(), "fallback");
        assert!(matches!(
            env.resolve_placeholders("${nope}"),
            Err(EnvironmentError::UnresolvablePlaceholder(ref k)) if k == "nope"
        ));
    }
}
