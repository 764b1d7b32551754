//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use liftoff::application::{ApplicationBuilder, Classpath};
use liftoff::container::{ComponentDefinition, SourceCatalog};
use liftoff::lifecycle::{listener_fn, AppListener, ApplicationRunner, CommandLineRunner};
use liftoff::{ApplicationArguments, BannerMode, BoxError};

/// Ordered record of everything the tests observe.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries().iter().any(|e| e == entry)
    }

    /// Listener recording every event name.
    pub fn listener(&self) -> Arc<dyn AppListener> {
        let log = self.clone();
        listener_fn(move |event| {
            log.push(event.name());
            Ok(())
        })
    }
}

/// Builder with console noise and the shutdown hook turned off, deducing a
/// plain deployment regardless of enabled features.
pub fn quiet_builder(catalog: SourceCatalog) -> ApplicationBuilder {
    ApplicationBuilder::new(["test.Main"])
        .classpath(Classpath::default())
        .banner_mode(BannerMode::Off)
        .log_startup_info(false)
        .register_shutdown_hook(false)
        .definition_loader(Arc::new(catalog))
}

pub struct RecordingRunner {
    pub label: String,
    pub log: EventLog,
    pub fail_with: Option<fn() -> BoxError>,
}

impl RecordingRunner {
    fn record(&self) -> Result<(), BoxError> {
        self.log.push(format!("runner:{}", self.label));
        match self.fail_with {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }
}

impl ApplicationRunner for RecordingRunner {
    fn run(&self, _: &ApplicationArguments) -> Result<(), BoxError> {
        self.record()
    }
}

impl CommandLineRunner for RecordingRunner {
    fn run(&self, _: &[String]) -> Result<(), BoxError> {
        self.record()
    }
}

/// Definition of an application runner that records `runner:<name>`.
pub fn app_runner(name: &str, order: i32, log: &EventLog) -> ComponentDefinition {
    runner_definition(name, order, log, None)
        .provides::<dyn ApplicationRunner, _>(|r| r as Arc<dyn ApplicationRunner>)
        .build()
}

/// Definition of a command-line runner that records `runner:<name>`.
pub fn cli_runner(name: &str, order: i32, log: &EventLog) -> ComponentDefinition {
    runner_definition(name, order, log, None)
        .provides::<dyn CommandLineRunner, _>(|r| r as Arc<dyn CommandLineRunner>)
        .build()
}

/// Application runner that records itself, then fails with `make`.
pub fn failing_runner(name: &str, log: &EventLog, make: fn() -> BoxError) -> ComponentDefinition {
    runner_definition(name, 0, log, Some(make))
        .provides::<dyn ApplicationRunner, _>(|r| r as Arc<dyn ApplicationRunner>)
        .build()
}

fn runner_definition(
    name: &str,
    order: i32,
    log: &EventLog,
    fail_with: Option<fn() -> BoxError>,
) -> liftoff::container::DefinitionBuilder<RecordingRunner> {
    let label = name.to_string();
    let log = log.clone();
    ComponentDefinition::builder(name, move |_| {
        Ok(RecordingRunner {
            label: label.clone(),
            log: log.clone(),
            fail_with,
        })
    })
    .order(order)
}

/// Catalog whose `test.Main` source contributes `definitions()`.
pub fn catalog_with<F>(definitions: F) -> SourceCatalog
where
    F: Fn() -> Vec<ComponentDefinition> + Send + Sync + 'static,
{
    SourceCatalog::new().source("test.Main", move |_| definitions())
}
