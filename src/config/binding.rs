//! Self-configuration: `liftoff.main.*` onto [`MainSettings`].
//!
//! # Design Decisions
//! - The key set is closed: every bindable key has an entry in
//!   [`MAIN_BINDINGS`] with a typed setter
//! - Binding never mutates its input; it returns a new snapshot
//! - Values are converted leniently even when the environment has no
//!   conversion service, so `--liftoff.main.lazy-initialization=true` works
//! - Unknown keys under the namespace are reported at warn, not rejected

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::schema::{AppSettings, MainSettings};
use crate::env::{ConversionError, ConversionService, Environment};

/// Namespace bound onto [`MainSettings`].
pub const MAIN_PREFIX: &str = "liftoff.main";

/// A `liftoff.main.*` value could not be converted.
#[derive(Debug, Error)]
#[error("failed to bind '{key}'")]
pub struct BindError {
    pub key: String,
    #[source]
    pub source: ConversionError,
}

type Setter = fn(&mut MainSettings, &str, &Value) -> Result<(), ConversionError>;

/// One bindable key and the setter that applies it.
pub struct Binding {
    /// Key relative to [`MAIN_PREFIX`], dashed form.
    pub key: &'static str,
    apply: Setter,
}

fn lenient<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T, ConversionError> {
    ConversionService::shared().convert(key, value)
}

/// Every key under `liftoff.main` and where it lands.
pub static MAIN_BINDINGS: &[Binding] = &[
    Binding {
        key: "sources",
        apply: |settings, key, value| {
            let bound: Vec<String> = lenient(key, value)?;
            for source in bound {
                if !settings.sources.contains(&source) {
                    settings.sources.push(source);
                }
            }
            Ok(())
        },
    },
    Binding {
        key: "deployment-type",
        apply: |settings, key, value| {
            settings.deployment_type = lenient(key, value)?;
            Ok(())
        },
    },
    Binding {
        key: "banner-mode",
        apply: |settings, key, value| {
            settings.banner_mode = lenient(key, value)?;
            Ok(())
        },
    },
    Binding {
        key: "log-startup-info",
        apply: |settings, key, value| {
            settings.log_startup_info = lenient(key, value)?;
            Ok(())
        },
    },
    Binding {
        key: "add-command-line-properties",
        apply: |settings, key, value| {
            settings.add_command_line_properties = lenient(key, value)?;
            Ok(())
        },
    },
    Binding {
        key: "add-conversion-support",
        apply: |settings, key, value| {
            settings.add_conversion_support = lenient(key, value)?;
            Ok(())
        },
    },
    Binding {
        key: "allow-definition-overriding",
        apply: |settings, key, value| {
            settings.allow_definition_overriding = lenient(key, value)?;
            Ok(())
        },
    },
    Binding {
        key: "lazy-initialization",
        apply: |settings, key, value| {
            settings.lazy_initialization = lenient(key, value)?;
            Ok(())
        },
    },
    Binding {
        key: "register-shutdown-hook",
        apply: |settings, key, value| {
            settings.register_shutdown_hook = lenient(key, value)?;
            Ok(())
        },
    },
    Binding {
        key: "headless",
        apply: |settings, key, value| {
            settings.headless = lenient(key, value)?;
            Ok(())
        },
    },
];

/// Bind every known `liftoff.main.*` key present in `environment` onto a copy
/// of `settings`.
pub fn bind_main_settings(environment: &Environment, settings: &AppSettings) -> Result<AppSettings, BindError> {
    let mut bound = settings.clone();

    for binding in MAIN_BINDINGS {
        let key = format!("{MAIN_PREFIX}.{}", binding.key);
        let Some(value) = environment.property(&key) else {
            continue;
        };
        (binding.apply)(&mut bound.main, &key, &value).map_err(|source| BindError {
            key: key.clone(),
            source,
        })?;
        tracing::trace!(key = %key, value = %value, "Bound application setting");
    }

    for unknown in unknown_keys(environment) {
        tracing::warn!(key = %unknown, "Ignoring unknown application setting");
    }

    Ok(bound)
}

fn unknown_keys(environment: &Environment) -> Vec<String> {
    let prefix = format!("{MAIN_PREFIX}.");
    let mut unknown = Vec::new();
    for source in environment.sources().iter() {
        for key in source.keys() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            let canonical = canonical_name(rest);
            if !MAIN_BINDINGS.iter().any(|binding| binding.key == canonical) && !unknown.contains(&key) {
                unknown.push(key);
            }
        }
    }
    unknown
}

/// `bannerMode` and `banner_mode` both become `banner-mode`.
fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch == '_' {
            out.push('-');
        } else if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::DeploymentType;
    use crate::config::BannerMode;
    use crate::env::{attach, EnvironmentKind, PropertySource};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, Value)]) -> Environment {
        let mut env = Environment::empty(EnvironmentKind::Standard);
        let values: BTreeMap<String, Value> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        env.sources_mut().add_last(PropertySource::map("test", values));
        attach(&mut env);
        env
    }

    #[test]
    fn test_binds_known_keys() {
        let env = env(&[
            ("liftoff.main.banner-mode", json!("OFF")),
            ("liftoff.main.deployment-type", json!("reactive-server")),
            ("liftoff.main.registerShutdownHook", json!(false)),
            ("liftoff.main.sources", json!("app.a, app.b")),
        ]);
        let mut settings = AppSettings::default();
        settings.main.sources = vec!["app.a".into()];

        let bound = bind_main_settings(&env, &settings).unwrap();
        assert_eq!(bound.main.banner_mode, BannerMode::Off);
        assert_eq!(bound.main.deployment_type, DeploymentType::ReactiveServer);
        assert!(!bound.main.register_shutdown_hook);
        assert_eq!(bound.main.sources, vec!["app.a", "app.b"]);
        assert_eq!(settings.main.banner_mode, BannerMode::Console);
    }

    #[test]
    fn test_conversion_failure_names_key() {
        let env = env(&[("liftoff.main.banner-mode", json!("sideways"))]);
        let err = bind_main_settings(&env, &AppSettings::default()).unwrap_err();
        assert_eq!(err.key, "liftoff.main.banner-mode");
    }

    #[test]
    fn test_unknown_keys_are_reported() {
        let env = env(&[
            ("liftoff.main.banner_mode", json!("log")),
            ("liftoff.main.web-application-type", json!("none")),
        ]);
        assert_eq!(unknown_keys(&env), vec!["liftoff.main.web-application-type"]);
        assert!(bind_main_settings(&env, &AppSettings::default()).is_ok());
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("lazyInitialization"), "lazy-initialization");
        assert_eq!(canonical_name("log_startup_info"), "log-startup-info");
        assert_eq!(canonical_name("headless"), "headless");
    }

    #[test]
    fn test_every_field_has_a_binding() {
        let keys: Vec<&str> = MAIN_BINDINGS.iter().map(|b| b.key).collect();
        let fields = serde_json::to_value(MainSettings::default()).unwrap();
        for field in fields.as_object().unwrap().keys() {
            assert!(keys.contains(&field.as_str()), "no binding for {field}");
        }
    }
}
