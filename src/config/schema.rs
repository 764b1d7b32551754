//! Orchestrator settings.
//!
//! `MainSettings` holds everything that can be bound from `liftoff.main.*`.
//! `AppSettings` wraps it together with the collaborators and extension
//! lists that only code can supply.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::{Banner, DeploymentType};
use crate::bootstrap::Bootstrapper;
use crate::container::{
    ContainerFactory, ContainerInitializer, DefaultContainerFactory, DefinitionLoader,
    NameGenerator, ResourceLoader, SourceCatalog,
};
use crate::env::Environment;
use crate::lifecycle::AppListener;
use crate::observability::StartupRecorder;

/// Where the startup banner goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BannerMode {
    /// No banner.
    Off,
    /// Printed to standard output.
    #[default]
    Console,
    /// Emitted through the log.
    Log,
}

/// Settings bindable from the `liftoff.main` namespace.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MainSettings {
    /// String sources: catalog ids, `prefix.*` packages, or resource locations.
    pub sources: Vec<String>,

    /// Deduced from the available markers unless overridden.
    pub deployment_type: DeploymentType,

    pub banner_mode: BannerMode,

    /// Log "Starting"/"Started" and the active profiles.
    pub log_startup_info: bool,

    /// Expose process arguments as the `commandLineArgs` source.
    pub add_command_line_properties: bool,

    /// Install the shared lenient conversion service.
    pub add_conversion_support: bool,

    pub allow_definition_overriding: bool,

    pub lazy_initialization: bool,

    pub register_shutdown_hook: bool,

    /// Exported as `LIFTOFF_HEADLESS` unless already set.
    pub headless: bool,
}

impl Default for MainSettings {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            deployment_type: DeploymentType::None,
            banner_mode: BannerMode::Console,
            log_startup_info: true,
            add_command_line_properties: true,
            add_conversion_support: true,
            allow_definition_overriding: false,
            lazy_initialization: false,
            register_shutdown_hook: true,
            headless: true,
        }
    }
}

/// Complete configuration of one application.
#[derive(Clone)]
pub struct AppSettings {
    pub main: MainSettings,

    /// Primary definition sources, always loaded first.
    pub primary_sources: Vec<String>,

    /// Identifier of the entry point, used in startup logging.
    pub main_name: Option<String>,

    pub default_properties: BTreeMap<String, Value>,

    pub additional_profiles: Vec<String>,

    /// Explicit environment; disables variant conversion.
    pub environment: Option<Environment>,

    pub resource_loader: Option<Arc<dyn ResourceLoader>>,

    pub name_generator: Option<Arc<dyn NameGenerator>>,

    pub banner: Option<Arc<dyn Banner>>,

    pub container_factory: Arc<dyn ContainerFactory>,

    /// Turns sources into component definitions.
    pub definition_loader: Arc<dyn DefinitionLoader>,

    pub initializers: Vec<Arc<dyn ContainerInitializer>>,

    pub listeners: Vec<Arc<dyn AppListener>>,

    pub bootstrappers: Vec<Arc<dyn Bootstrapper>>,

    pub startup: StartupRecorder,
}

impl AppSettings {
    /// Primary sources followed by string sources, first occurrence kept.
    pub fn all_sources(&self) -> Vec<String> {
        let mut all: Vec<String> = Vec::new();
        for source in self.primary_sources.iter().chain(self.main.sources.iter()) {
            if !all.contains(source) {
                all.push(source.clone());
            }
        }
        all
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            main: MainSettings::default(),
            primary_sources: Vec::new(),
            main_name: None,
            default_properties: BTreeMap::new(),
            additional_profiles: Vec::new(),
            environment: None,
            resource_loader: None,
            name_generator: None,
            banner: None,
            container_factory: Arc::new(DefaultContainerFactory),
            definition_loader: Arc::new(SourceCatalog::new()),
            initializers: Vec::new(),
            listeners: Vec::new(),
            bootstrappers: Vec::new(),
            startup: StartupRecorder::default(),
        }
    }
}

impl fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppSettings")
            .field("main", &self.main)
            .field("primary_sources", &self.primary_sources)
            .field("main_name", &self.main_name)
            .field("default_properties", &self.default_properties)
            .field("additional_profiles", &self.additional_profiles)
            .field("custom_environment", &self.environment.is_some())
            .field("initializers", &self.initializers.len())
            .field("listeners", &self.listeners.len())
            .field("bootstrappers", &self.bootstrappers.len())
            .finish_non_exhaustive()
    }
}
