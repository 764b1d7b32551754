//! Prints the layered environment a run would see, as JSON.
//!
//! ```text
//! liftoff-env --profile dev --property app.mode=demo -- --server.port=9000
//! ```

use std::collections::BTreeMap;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use serde_json::Value;

use liftoff::application::{ApplicationArguments, DeploymentType};
use liftoff::bootstrap::BootstrapRegistry;
use liftoff::config::AppSettings;
use liftoff::env::{prepare_environment, EnvironmentKind, SourceSnapshot};
use liftoff::error::display_chain;
use liftoff::extension::{ExtensionRegistry, ListenerCapability, RunListenerArgs, RunListenerCapability};
use liftoff::lifecycle::RunListeners;
use liftoff::observability::{init_logging, StartupRecorder};

#[derive(Parser)]
#[command(name = "liftoff-env")]
#[command(about = "Show the property sources assembled for a run", long_about = None)]
struct Cli {
    /// Additional profile to activate (repeatable).
    #[arg(short, long = "profile")]
    profiles: Vec<String>,

    /// Default property as key=value (repeatable).
    #[arg(short = 'D', long = "property", value_parser = parse_property)]
    properties: Vec<(String, String)>,

    /// none, server or reactive-server.
    #[arg(long, default_value = "none", value_parser = parse_deployment)]
    deployment_type: DeploymentType,

    /// Arguments as the application would receive them.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn parse_deployment(raw: &str) -> Result<DeploymentType, String> {
    serde_json::from_value(Value::String(raw.to_string())).map_err(|err| err.to_string())
}

#[derive(Serialize)]
struct Report {
    kind: EnvironmentKind,
    deployment_type: DeploymentType,
    active_profiles: Vec<String>,
    default_profiles: Vec<String>,
    sources: Vec<SourceSnapshot>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging("warn");

    match inspect(cli) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("failed to render report: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("{}", display_chain(&*err));
            ExitCode::FAILURE
        }
    }
}

fn inspect(cli: Cli) -> Result<Report, liftoff::BoxError> {
    let extensions = ExtensionRegistry::with_defaults();

    let mut settings = AppSettings::default();
    settings.main.deployment_type = cli.deployment_type;
    settings.additional_profiles = cli.profiles;
    settings.default_properties = cli
        .properties
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect::<BTreeMap<_, _>>();
    settings.listeners = extensions.instantiate::<ListenerCapability>(&())?;

    let run_listeners = extensions.instantiate::<RunListenerCapability>(&RunListenerArgs {
        listeners: settings.listeners.clone(),
        args: cli.args.clone(),
        main_name: None,
    })?;
    let listeners = RunListeners::new(run_listeners, StartupRecorder::default());

    let args = ApplicationArguments::parse(cli.args)?;
    let bootstrap = BootstrapRegistry::new();
    let (environment, bound) = prepare_environment(&settings, &listeners, &bootstrap, &args)?;

    Ok(Report {
        kind: environment.kind(),
        deployment_type: bound.main.deployment_type,
        active_profiles: environment.active_profiles(),
        default_profiles: environment.default_profiles(),
        sources: environment.describe(),
    })
}
