//! Application bootstrap orchestrator.
//!
//! `liftoff` turns a set of declared sources and the process arguments into a
//! refreshed component [`Container`]: it assembles a layered
//! [`Environment`], binds `liftoff.main.*` back onto its own settings,
//! selects and populates the container for the deployment type, calls the
//! runner components and reports lifecycle phases to pluggable listeners.
//! Failures are reported, the container is closed, and exit codes are
//! resolved from the failure.
//!
//! ```no_run
//! use liftoff::{failure, ApplicationBuilder, SourceCatalog};
//! use std::sync::Arc;
//!
//! let catalog = SourceCatalog::new().source("demo.Main", |_| Vec::new());
//! let container = ApplicationBuilder::new(["demo.Main"])
//!     .main_name("demo")
//!     .definition_loader(Arc::new(catalog))
//!     .build()
//!     .expect("extensions")
//!     .run(std::env::args().skip(1))
//!     .expect("run");
//! std::process::exit(failure::exit(&container, &[]));
//! ```

pub mod application;
pub mod bootstrap;
pub mod config;
pub mod container;
pub mod env;
pub mod error;
pub mod extension;
pub mod failure;
pub mod lifecycle;
pub mod observability;

use std::sync::Arc;

pub use application::{Application, ApplicationArguments, ApplicationBuilder, DeploymentType};
pub use config::{AppSettings, BannerMode};
pub use container::{ComponentDefinition, Container, SourceCatalog};
pub use env::Environment;
pub use error::{BootError, BoxError, RunFailed};
pub use extension::ExtensionRegistry;

/// Run `primary_source` with default settings.
pub fn run<I, S>(primary_source: &str, args: I) -> Result<Arc<Container>, RunFailed>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    application::run_with(&[primary_source], args, |builder| builder)
}
