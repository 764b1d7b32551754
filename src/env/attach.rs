//! Configuration-properties adapter.
//!
//! Attaching installs a marker source at the highest priority. While it is
//! present, lookups through [`Environment`] also try the relaxed forms of a
//! key, so `liftoff.main.banner-mode` matches `liftoff.main.bannerMode` in a
//! TOML file or `LIFTOFF_MAIN_BANNER_MODE` in the process environment.

use crate::env::environment::Environment;
use crate::env::property_source::{PropertySource, CONFIGURATION_PROPERTIES};

/// Install (or move) the adapter to the top of the environment.
pub fn attach(environment: &mut Environment) {
    let sources = environment.sources_mut();
    sources.remove(CONFIGURATION_PROPERTIES);
    sources.add_first(PropertySource::ConfigurationProperties);
}

/// Whether the adapter is installed.
pub fn is_attached(environment: &Environment) -> bool {
    environment.sources().contains(CONFIGURATION_PROPERTIES)
}

/// Every spelling a canonical dashed key may take in a source.
pub fn relaxed_names(key: &str) -> Vec<String> {
    let segments: Vec<&str> = key.split('.').collect();
    let underscored = segments
        .iter()
        .map(|segment| segment.replace('-', "_"))
        .collect::<Vec<_>>()
        .join(".");
    let camel = segments
        .iter()
        .map(|segment| camel_case(segment))
        .collect::<Vec<_>>()
        .join(".");
    let env_joined = segments
        .iter()
        .map(|segment| segment.replace('-', "").to_uppercase())
        .collect::<Vec<_>>()
        .join("_");
    let env_underscored = segments
        .iter()
        .map(|segment| segment.replace('-', "_").to_uppercase())
        .collect::<Vec<_>>()
        .join("_");

    let mut names = vec![key.to_string()];
    for candidate in [underscored, camel, env_joined, env_underscored] {
        if !names.contains(&candidate) {
            names.push(candidate);
        }
    }
    names
}

fn camel_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut upper_next = false;
    for ch in segment.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvironmentKind;

    #[test]
    fn test_relaxed_names() {
        assert_eq!(
            relaxed_names("liftoff.main.banner-mode"),
            vec![
                "liftoff.main.banner-mode",
                "liftoff.main.banner_mode",
                "liftoff.main.bannerMode",
                "LIFTOFF_MAIN_BANNERMODE",
                "LIFTOFF_MAIN_BANNER_MODE",
            ]
        );
    }

    #[test]
    fn test_relaxed_names_without_dashes() {
        assert_eq!(relaxed_names("a.b"), vec!["a.b", "A_B"]);
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut env = Environment::empty(EnvironmentKind::Standard);
        attach(&mut env);
        attach(&mut env);
        assert!(is_attached(&env));
        assert_eq!(env.sources().names(), vec![CONFIGURATION_PROPERTIES]);
    }
}
