//! The run protocol.
//!
//! # Data Flow
//! ```text
//! run(args)
//!     → bootstrap registry + bootstrappers
//!     → run listeners (extension discovery)         ─┐
//!     → starting                                     │
//!     → prepare_environment (environmentPrepared)    │ any error:
//!     → validate, banner                             │ handle_run_failure
//!     → create container                             │ (failed phase,
//!     → initializers → contextPrepared               │  reporters, close)
//!     → close bootstrap registry                     │
//!     → load definitions → contextLoaded             │
//!     → refresh → started → runners                 ─┘
//!     → running (its failure is handled without listeners)
//!     → Arc<Container>
//! ```
//!
//! # Design Decisions
//! - One `run` per application is the supported use; concurrent runs on the
//!   same instance are not synchronized
//! - The bound settings snapshot replaces the built one for the rest of a run

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::application::arguments::ApplicationArguments;
use crate::application::banner::{print_banner, Banner};
use crate::application::startup_info;
use crate::bootstrap::BootstrapRegistry;
use crate::config::{validate_settings, AppSettings};
use crate::container::{Container, LoadRequest};
use crate::env::{prepare_environment, Environment};
use crate::error::{display_chain, BootError, RunFailed};
use crate::extension::{sort_by_order, ExtensionRegistry, RunListenerArgs, RunListenerCapability};
use crate::failure::{handle_run_failure, FailureScope};
use crate::lifecycle::{call_runners, shutdown_hook, RunListeners};

/// Singleton name of the parsed arguments.
pub const APPLICATION_ARGUMENTS_NAME: &str = "liftoffApplicationArguments";
/// Singleton name of the printed banner (`Arc<dyn Banner>`).
pub const BANNER_NAME: &str = "liftoffBanner";
/// Singleton name of an overriding name generator (`Arc<dyn NameGenerator>`).
pub const NAME_GENERATOR_NAME: &str = "liftoffNameGenerator";
/// Process variable carrying the headless flag.
pub const HEADLESS_VAR: &str = "LIFTOFF_HEADLESS";

static HEADLESS: OnceLock<String> = OnceLock::new();

/// Headless flag as exported by the first run in this process.
pub fn headless_flag() -> Option<&'static str> {
    HEADLESS.get().map(String::as_str)
}

/// A configured application, ready to run.
pub struct Application {
    settings: AppSettings,
    extensions: ExtensionRegistry,
}

impl Application {
    pub(crate) fn new(settings: AppSettings, extensions: ExtensionRegistry) -> Self {
        Self {
            settings,
            extensions,
        }
    }

    /// Settings as built, before self-configuration binding.
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Run the application and return its refreshed container.
    pub fn run<I, S>(&self, args: I) -> Result<Arc<Container>, RunFailed>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let started = Instant::now();
        let raw: Vec<String> = args.into_iter().map(Into::into).collect();

        let bootstrap = self.create_bootstrap_registry().map_err(|err| {
            tracing::error!(error = %display_chain(&err), "Bootstrap failed");
            RunFailed::new(err)
        })?;
        self.configure_headless();

        let listeners = self.run_listeners(&raw).map_err(|err| {
            tracing::error!(error = %display_chain(&err), "Run listener discovery failed");
            RunFailed::new(err)
        })?;

        let mut slot: Option<Arc<Container>> = None;
        let container = match self.run_forward(&raw, &bootstrap, &listeners, started, &mut slot) {
            Ok(container) => container,
            Err(err) => {
                return Err(handle_run_failure(
                    err,
                    FailureScope {
                        container: slot.as_ref(),
                        listeners: Some(&listeners),
                        extensions: &self.extensions,
                    },
                ))
            }
        };

        if let Err(err) = listeners.running(&container, started.elapsed()) {
            return Err(handle_run_failure(
                err,
                FailureScope {
                    container: Some(&container),
                    listeners: None,
                    extensions: &self.extensions,
                },
            ));
        }
        Ok(container)
    }

    fn run_forward(
        &self,
        raw: &[String],
        bootstrap: &BootstrapRegistry,
        listeners: &RunListeners,
        started: Instant,
        slot: &mut Option<Arc<Container>>,
    ) -> Result<Arc<Container>, BootError> {
        let main_name = self.settings.main_name.as_deref();
        listeners.starting(bootstrap, main_name)?;

        let args = ApplicationArguments::parse(raw.iter().cloned())?;
        let (environment, settings) = prepare_environment(&self.settings, listeners, bootstrap, &args)?;
        validate_settings(&settings)?;
        let banner = print_banner(&settings, &environment);

        let container = Arc::new(settings.container_factory.create(settings.main.deployment_type)?);
        *slot = Some(Arc::clone(&container));
        tracing::debug!(container = %container.id(), kind = ?container.kind(), "Container created");

        self.prepare_container(&container, environment, &settings, listeners, bootstrap, &args, banner)?;
        self.refresh_container(&container, &settings)?;

        let time_taken = started.elapsed();
        if settings.main.log_startup_info {
            startup_info::log_started(settings.main_name.as_deref(), time_taken);
        }
        listeners.started(&container, time_taken)?;
        call_runners(&container, &args)?;
        Ok(container)
    }

    fn create_bootstrap_registry(&self) -> Result<BootstrapRegistry, BootError> {
        let registry = BootstrapRegistry::new();
        for bootstrapper in &self.settings.bootstrappers {
            bootstrapper.initialize(&registry).map_err(BootError::Bootstrapper)?;
        }
        Ok(registry)
    }

    fn configure_headless(&self) {
        let headless = self.settings.main.headless;
        HEADLESS.get_or_init(|| match std::env::var(HEADLESS_VAR) {
            Ok(existing) => existing,
            Err(_) => {
                let value = headless.to_string();
                std::env::set_var(HEADLESS_VAR, &value);
                value
            }
        });
    }

    fn run_listeners(&self, raw: &[String]) -> Result<RunListeners, BootError> {
        let args = RunListenerArgs {
            listeners: self.settings.listeners.clone(),
            args: raw.to_vec(),
            main_name: self.settings.main_name.clone(),
        };
        let instances = self.extensions.instantiate::<RunListenerCapability>(&args)?;
        Ok(RunListeners::new(instances, self.settings.startup.clone()))
    }

    #[allow(clippy::too_many_arguments)]
    fn prepare_container(
        &self,
        container: &Arc<Container>,
        environment: Environment,
        settings: &AppSettings,
        listeners: &RunListeners,
        bootstrap: &BootstrapRegistry,
        args: &ApplicationArguments,
        banner: Option<Arc<dyn Banner>>,
    ) -> Result<(), BootError> {
        container.set_environment(environment);
        if let Some(generator) = &settings.name_generator {
            container.register_singleton(NAME_GENERATOR_NAME, Arc::new(Arc::clone(generator)))?;
        }
        if let Some(loader) = &settings.resource_loader {
            container.set_resource_loader(Arc::clone(loader));
        }

        let mut initializers = settings.initializers.clone();
        sort_by_order(&mut initializers, |initializer| initializer.order());
        for initializer in &initializers {
            initializer.initialize(container).map_err(BootError::Initializer)?;
        }

        listeners.context_prepared(container)?;
        bootstrap.close(container)?;

        if settings.main.log_startup_info {
            startup_info::log_starting(settings.main_name.as_deref());
            startup_info::log_profiles(&container.environment());
        }

        container.register_singleton(APPLICATION_ARGUMENTS_NAME, Arc::new(args.clone()))?;
        if let Some(banner) = banner {
            container.register_singleton(BANNER_NAME, Arc::new(banner))?;
        }
        container
            .definitions()
            .set_allow_overriding(settings.main.allow_definition_overriding);
        container.set_lazy_initialization(settings.main.lazy_initialization);

        let sources = settings.all_sources();
        let request = LoadRequest {
            sources: &sources,
            name_generator: settings.name_generator.clone(),
            resource_loader: settings.resource_loader.clone(),
            environment: Some(container.environment()),
        };
        let step = settings.startup.start("liftoff.definitions.load");
        let loaded = settings.definition_loader.load(container.definitions(), &request);
        step.end();
        tracing::debug!(sources = ?sources, definitions = container.definitions().len(), "Definitions loaded");
        loaded?;

        listeners.context_loaded(container)?;
        Ok(())
    }

    fn refresh_container(&self, container: &Arc<Container>, settings: &AppSettings) -> Result<(), BootError> {
        if settings.main.register_shutdown_hook {
            let hook = shutdown_hook();
            hook.install();
            hook.register(container);
        }
        let step = settings.startup.start("liftoff.container.refresh");
        let refreshed = container.refresh();
        step.end();
        Ok(refreshed?)
    }
}

/// Build with `configure` and run in one call.
pub fn run_with<I, S, F>(primary_sources: &[&str], args: I, configure: F) -> Result<Arc<Container>, RunFailed>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    F: FnOnce(crate::application::ApplicationBuilder) -> crate::application::ApplicationBuilder,
{
    let builder = crate::application::ApplicationBuilder::new(primary_sources.iter().copied());
    let application = configure(builder)
        .build()
        .map_err(|err| RunFailed::new(BootError::Discovery(err)))?;
    application.run(args)
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("settings", &self.settings)
            .field("extensions", &self.extensions)
            .finish()
    }
}
