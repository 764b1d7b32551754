//! Layered configuration environment.
//!
//! # Data Flow
//! ```text
//! Environment::new(kind)              (baseline: systemEnvironment, server params)
//!     → conversion service            (lenient typed lookups)
//!     → defaultProperties (last)      + commandLineArgs (first, or composite)
//!     → attach()                      (relaxed-name adapter on top)
//!     → environmentPrepared listeners (config files, custom sources)
//!     → defaultProperties demoted to the end
//!     → additional profiles merged
//!     → liftoff.main.* bound onto settings
//!     → convert() to the deployment's variant, re-attach
//! ```
//!
//! # Design Decisions
//! - Sources are searched first-to-last; the first hit wins
//! - `defaultProperties` always ends up below every contributed source
//! - Conversion between variants drops variant-specific baseline sources only

pub mod attach;
pub mod builder;
pub mod conversion;
pub mod converter;
pub mod environment;
pub mod property_source;
pub mod sources;

use thiserror::Error;

pub use attach::{attach, relaxed_names};
pub use builder::{prepare_environment, APPLICATION_COMMAND_LINE, COMMAND_LINE, DEFAULT_PROPERTIES};
pub use conversion::{ConversionError, ConversionService};
pub use converter::convert;
pub use environment::{Environment, EnvironmentKind, SYSTEM_ENVIRONMENT};
pub use property_source::{PropertySource, SourceSnapshot, CONFIGURATION_PROPERTIES};
pub use sources::PropertySources;

/// Errors raised while manipulating the environment.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("property source '{0}' does not exist")]
    MissingSource(String),

    #[error("property source '{0}' cannot be added relative to itself")]
    SelfRelative(String),

    #[error("could not resolve placeholder '{0}'")]
    UnresolvablePlaceholder(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}
