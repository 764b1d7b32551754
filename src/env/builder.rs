//! Environment assembly for a single run.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::application::ApplicationArguments;
use crate::bootstrap::BootstrapRegistry;
use crate::config::{bind_main_settings, AppSettings};
use crate::env::attach::attach;
use crate::env::conversion::ConversionService;
use crate::env::converter::convert;
use crate::env::environment::{Environment, EnvironmentKind};
use crate::env::property_source::PropertySource;
use crate::error::BootError;
use crate::lifecycle::RunListeners;

/// Programmatic defaults; always the lowest priority once prepared.
pub const DEFAULT_PROPERTIES: &str = "defaultProperties";
/// Options parsed from the process arguments.
pub const COMMAND_LINE: &str = "commandLineArgs";
/// Nested name of this run's arguments when merged into an existing source.
pub const APPLICATION_COMMAND_LINE: &str = "applicationCommandLineArgs";

/// Build the environment for a run and bind `liftoff.main.*` onto a fresh
/// settings snapshot.
///
/// Returns the finished environment together with the bound settings, which
/// replace `settings` for the remainder of the run.
pub fn prepare_environment(
    settings: &AppSettings,
    listeners: &RunListeners,
    bootstrap: &BootstrapRegistry,
    args: &ApplicationArguments,
) -> Result<(Environment, AppSettings), BootError> {
    let mut environment = match &settings.environment {
        Some(custom) => custom.clone(),
        None => Environment::new(EnvironmentKind::for_deployment(settings.main.deployment_type)),
    };

    if settings.main.add_conversion_support {
        environment.set_conversion_service(ConversionService::shared());
    }
    configure_property_sources(&mut environment, settings, args)?;
    attach(&mut environment);

    listeners.environment_prepared(bootstrap, &mut environment)?;

    environment.sources_mut().move_to_end(DEFAULT_PROPERTIES);
    configure_additional_profiles(&mut environment, &settings.additional_profiles);

    let bound = bind_main_settings(&environment, settings).map_err(BootError::Bind)?;

    if settings.environment.is_none() {
        let kind = EnvironmentKind::for_deployment(bound.main.deployment_type);
        environment = convert(environment, kind);
        attach(&mut environment);
    }

    tracing::debug!(
        kind = ?environment.kind(),
        sources = ?environment.sources().names(),
        "Environment prepared"
    );
    Ok((environment, bound))
}

fn configure_property_sources(
    environment: &mut Environment,
    settings: &AppSettings,
    args: &ApplicationArguments,
) -> Result<(), BootError> {
    if !settings.default_properties.is_empty() {
        add_or_merge_defaults(environment, &settings.default_properties);
    }

    if settings.main.add_command_line_properties && !args.is_empty() {
        let sources = environment.sources_mut();
        match sources.get(COMMAND_LINE).cloned() {
            Some(existing) => {
                let merged = PropertySource::composite(
                    COMMAND_LINE,
                    vec![
                        PropertySource::command_line(APPLICATION_COMMAND_LINE, args.clone()),
                        existing,
                    ],
                );
                // Merged in place: the existing source keeps its rank.
                sources.replace(COMMAND_LINE, merged)?;
            }
            None => sources.add_first(PropertySource::command_line(COMMAND_LINE, args.clone())),
        }
    }
    Ok(())
}

fn add_or_merge_defaults(environment: &mut Environment, defaults: &BTreeMap<String, Value>) {
    let sources = environment.sources_mut();
    match sources.get(DEFAULT_PROPERTIES) {
        Some(PropertySource::Map { values, .. }) => {
            let mut merged = values.clone();
            merged.extend(defaults.iter().map(|(k, v)| (k.clone(), v.clone())));
            let _ = sources.replace(DEFAULT_PROPERTIES, PropertySource::map(DEFAULT_PROPERTIES, merged));
        }
        _ => sources.add_last(PropertySource::map(DEFAULT_PROPERTIES, defaults.clone())),
    }
}

fn configure_additional_profiles(environment: &mut Environment, additional: &[String]) {
    if additional.is_empty() {
        return;
    }
    let mut profiles: Vec<String> = additional.to_vec();
    for active in environment.active_profiles() {
        if !profiles.contains(&active) {
            profiles.push(active);
        }
    }
    environment.set_active_profiles(profiles);
}
