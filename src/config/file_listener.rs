//! Built-in listener contributing TOML configuration files.
//!
//! On `EnvironmentPrepared` it loads `liftoff.config.location` (default
//! `liftoff.toml`) and any `<stem>-<profile>.toml` siblings for the active
//! profiles. Every contributed source sits directly above
//! `defaultProperties`; profile files outrank the base file and later
//! profiles outrank earlier ones.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::config::loader::{load_config_source, ConfigError};
use crate::env::{Environment, PropertySource, DEFAULT_PROPERTIES};
use crate::error::BoxError;
use crate::extension::{ExtensionRegistry, ListenerCapability, HIGHEST_PRECEDENCE};
use crate::lifecycle::{AppEvent, AppListener};

/// Property naming the configuration file.
pub const LOCATION_PROPERTY: &str = "liftoff.config.location";
/// File read when no location is configured; skipped if absent.
pub const DEFAULT_LOCATION: &str = "liftoff.toml";
/// Marks a configured location as optional.
pub const OPTIONAL_PREFIX: &str = "optional:";

/// Order of the config-file listener.
pub const ORDER: i32 = HIGHEST_PRECEDENCE + 10;

/// Loads configuration files into the environment.
#[derive(Debug, Default)]
pub struct ConfigFileListener;

impl ConfigFileListener {
    pub fn new() -> Self {
        Self
    }

    fn load_into(&self, environment: &mut Environment) -> Result<(), ConfigError> {
        let (location, optional) = match environment.property(LOCATION_PROPERTY) {
            Some(Value::String(configured)) => match configured.strip_prefix(OPTIONAL_PREFIX) {
                Some(rest) => (rest.to_string(), true),
                None => (configured, false),
            },
            Some(other) => (other.to_string(), false),
            None => (DEFAULT_LOCATION.to_string(), true),
        };
        let location = environment
            .resolve_placeholders(&location)
            .map_err(|_| ConfigError::Missing(location.clone()))?;
        let base = PathBuf::from(location);

        let base_name = if base.exists() {
            let source = load_config_source(&base)?;
            let name = source.name().to_string();
            insert_above_defaults(environment, source);
            tracing::info!(location = %base.display(), "Loaded configuration file");
            Some(name)
        } else if optional {
            tracing::debug!(location = %base.display(), "Skipping optional configuration file");
            None
        } else {
            return Err(ConfigError::Missing(base.display().to_string()));
        };

        let mut profiles = environment.active_profiles();
        if profiles.is_empty() {
            profiles = environment.default_profiles();
        }
        for profile in profiles.iter().rev() {
            let path = profile_path(&base, profile);
            if !path.exists() {
                continue;
            }
            let source = load_config_source(&path)?;
            insert_profile_source(environment, base_name.as_deref(), source);
            tracing::info!(profile = %profile, location = %path.display(), "Loaded profile configuration file");
        }
        Ok(())
    }
}

impl AppListener for ConfigFileListener {
    fn on_event(&self, event: &mut AppEvent<'_>) -> Result<(), BoxError> {
        if let AppEvent::EnvironmentPrepared { environment, .. } = event {
            self.load_into(environment)?;
        }
        Ok(())
    }

    fn order(&self) -> i32 {
        ORDER
    }
}

fn insert_above_defaults(environment: &mut Environment, source: PropertySource) {
    let sources = environment.sources_mut();
    if sources.contains(DEFAULT_PROPERTIES) && source.name() != DEFAULT_PROPERTIES {
        if let Err(err) = sources.add_before(DEFAULT_PROPERTIES, source) {
            tracing::warn!(error = %err, "Config file source not placed above defaults");
        }
    } else {
        sources.add_last(source);
    }
}

/// Profile files go directly above their base file, or above the defaults
/// when the base file is absent or no longer registered.
fn insert_profile_source(environment: &mut Environment, base: Option<&str>, source: PropertySource) {
    let base = base.filter(|name| *name != source.name() && environment.sources().contains(name));
    match base {
        Some(name) => {
            let name = name.to_string();
            if let Err(err) = environment.sources_mut().add_before(&name, source) {
                tracing::warn!(base = %name, error = %err, "Profile config source not placed");
            }
        }
        None => insert_above_defaults(environment, source),
    }
}

fn profile_path(base: &Path, profile: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "liftoff".to_string());
    let file = match base.extension() {
        Some(ext) => format!("{stem}-{profile}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{profile}"),
    };
    base.with_file_name(file)
}

/// Register the listener with the built-in extensions.
pub fn register_defaults(registry: &mut ExtensionRegistry) {
    registry.register::<ListenerCapability, _>("config-file-listener", ORDER, |_: &()| {
        Ok(Arc::new(ConfigFileListener::new()) as Arc<dyn AppListener>)
    });
}
