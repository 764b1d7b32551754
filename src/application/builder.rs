//! Mutable configuration surface for an application.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::application::banner::Banner;
use crate::application::deployment::{Classpath, DeploymentType};
use crate::application::orchestrator::Application;
use crate::bootstrap::Bootstrapper;
use crate::config::{AppSettings, BannerMode};
use crate::container::{ContainerFactory, ContainerInitializer, DefinitionLoader, NameGenerator, ResourceLoader};
use crate::env::Environment;
use crate::extension::{
    BootstrapperCapability, DiscoveryError, ExtensionRegistry, InitializerCapability, ListenerCapability,
};
use crate::lifecycle::AppListener;
use crate::observability::StartupRecorder;

/// Collects settings, then discovers extensions in [`build`](Self::build).
///
/// ```no_run
/// use liftoff::ApplicationBuilder;
///
/// let app = ApplicationBuilder::new(["demo.Main"])
///     .main_name("demo")
///     .lazy_initialization(true)
///     .build()
///     .expect("extensions");
/// let container = app.run(std::env::args().skip(1)).expect("run");
/// ```
pub struct ApplicationBuilder {
    settings: AppSettings,
    extensions: ExtensionRegistry,
    classpath: Classpath,
    deployment_override: Option<DeploymentType>,
}

impl ApplicationBuilder {
    /// Start from the built-in extensions and the crate's own markers.
    pub fn new<I, S>(primary_sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut settings = AppSettings::default();
        settings.primary_sources = primary_sources.into_iter().map(Into::into).collect();
        Self {
            settings,
            extensions: ExtensionRegistry::with_defaults(),
            classpath: Classpath::current(),
            deployment_override: None,
        }
    }

    /// Replace the extension registry used for discovery.
    pub fn extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }

    /// Modify the extension registry in place.
    pub fn configure_extensions(mut self, configure: impl FnOnce(&mut ExtensionRegistry)) -> Self {
        configure(&mut self.extensions);
        self
    }

    /// Markers used to deduce the deployment type.
    pub fn classpath(mut self, classpath: Classpath) -> Self {
        self.classpath = classpath;
        self
    }

    /// Fix the deployment type; deduction is skipped.
    pub fn deployment_type(mut self, deployment: DeploymentType) -> Self {
        self.deployment_override = Some(deployment);
        self
    }

    pub fn main_name(mut self, name: impl Into<String>) -> Self {
        self.settings.main_name = Some(name.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.settings.main.sources.push(source.into());
        self
    }

    pub fn banner_mode(mut self, mode: BannerMode) -> Self {
        self.settings.main.banner_mode = mode;
        self
    }

    pub fn banner(mut self, banner: Arc<dyn Banner>) -> Self {
        self.settings.banner = Some(banner);
        self
    }

    pub fn log_startup_info(mut self, enabled: bool) -> Self {
        self.settings.main.log_startup_info = enabled;
        self
    }

    pub fn add_command_line_properties(mut self, enabled: bool) -> Self {
        self.settings.main.add_command_line_properties = enabled;
        self
    }

    pub fn add_conversion_support(mut self, enabled: bool) -> Self {
        self.settings.main.add_conversion_support = enabled;
        self
    }

    pub fn allow_definition_overriding(mut self, allowed: bool) -> Self {
        self.settings.main.allow_definition_overriding = allowed;
        self
    }

    pub fn lazy_initialization(mut self, lazy: bool) -> Self {
        self.settings.main.lazy_initialization = lazy;
        self
    }

    pub fn register_shutdown_hook(mut self, enabled: bool) -> Self {
        self.settings.main.register_shutdown_hook = enabled;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.settings.main.headless = headless;
        self
    }

    /// Add a property to the lowest-priority `defaultProperties` source.
    pub fn default_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.default_properties.insert(key.into(), value.into());
        self
    }

    pub fn default_properties(mut self, properties: BTreeMap<String, Value>) -> Self {
        self.settings.default_properties = properties;
        self
    }

    /// Profiles activated in addition to any configured ones.
    pub fn additional_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.additional_profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    /// Use this environment as-is instead of building one.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.settings.environment = Some(environment);
        self
    }

    pub fn resource_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.settings.resource_loader = Some(loader);
        self
    }

    pub fn name_generator(mut self, generator: Arc<dyn NameGenerator>) -> Self {
        self.settings.name_generator = Some(generator);
        self
    }

    pub fn container_factory(mut self, factory: Arc<dyn ContainerFactory>) -> Self {
        self.settings.container_factory = factory;
        self
    }

    pub fn definition_loader(mut self, loader: Arc<dyn DefinitionLoader>) -> Self {
        self.settings.definition_loader = loader;
        self
    }

    pub fn initializer(mut self, initializer: Arc<dyn ContainerInitializer>) -> Self {
        self.settings.initializers.push(initializer);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn AppListener>) -> Self {
        self.settings.listeners.push(listener);
        self
    }

    pub fn bootstrapper(mut self, bootstrapper: Arc<dyn Bootstrapper>) -> Self {
        self.settings.bootstrappers.push(bootstrapper);
        self
    }

    pub fn startup(mut self, recorder: StartupRecorder) -> Self {
        self.settings.startup = recorder;
        self
    }

    /// Discover extensions and freeze the settings.
    ///
    /// Discovered initializers, listeners and bootstrappers come before the
    /// ones added on the builder.
    pub fn build(self) -> Result<Application, DiscoveryError> {
        let Self {
            mut settings,
            extensions,
            classpath,
            deployment_override,
        } = self;

        settings.main.deployment_type = deployment_override.unwrap_or_else(|| classpath.deduce());

        let mut initializers = extensions.instantiate::<InitializerCapability>(&())?;
        initializers.append(&mut settings.initializers);
        settings.initializers = initializers;

        let mut listeners = extensions.instantiate::<ListenerCapability>(&())?;
        listeners.append(&mut settings.listeners);
        settings.listeners = listeners;

        let mut bootstrappers = extensions.instantiate::<BootstrapperCapability>(&())?;
        bootstrappers.append(&mut settings.bootstrappers);
        settings.bootstrappers = bootstrappers;

        tracing::debug!(
            deployment = ?settings.main.deployment_type,
            initializers = settings.initializers.len(),
            listeners = settings.listeners.len(),
            bootstrappers = settings.bootstrappers.len(),
            "Application built"
        );
        Ok(Application::new(settings, extensions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::deployment::SERVER_MARKERS;

    #[test]
    fn test_override_wins_over_deduction() {
        let server_classpath = Classpath::new(SERVER_MARKERS.iter().copied());

        let deduced = ApplicationBuilder::new(["demo.Main"])
            .classpath(server_classpath.clone())
            .build()
            .unwrap();
        assert_eq!(deduced.settings().main.deployment_type, DeploymentType::Server);

        let overridden = ApplicationBuilder::new(["demo.Main"])
            .classpath(server_classpath)
            .deployment_type(DeploymentType::None)
            .build()
            .unwrap();
        assert_eq!(overridden.settings().main.deployment_type, DeploymentType::None);
    }

    #[test]
    fn test_discovered_listeners_come_first() {
        let custom = crate::lifecycle::listener_fn(|_| Ok(()));
        let app = ApplicationBuilder::new(["demo.Main"])
            .listener(Arc::clone(&custom))
            .build()
            .unwrap();

        let listeners = &app.settings().listeners;
        assert_eq!(listeners.len(), 2);
        assert!(Arc::ptr_eq(&listeners[1], &custom));
    }

    #[test]
    fn test_discovery_failure_surfaces() {
        let mut extensions = ExtensionRegistry::new();
        extensions.load_manifest("[capabilities]\nlistener = [\"missing\"]\n").unwrap();

        let err = ApplicationBuilder::new(["demo.Main"])
            .extensions(extensions)
            .build()
            .err()
            .unwrap();
        assert_eq!(err.implementer(), "missing");
    }
}
