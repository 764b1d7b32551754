//! Extension discovery subsystem.
//!
//! # Data Flow
//! ```text
//! static registration (register::<C>)      manifest file (TOML)
//!         → catalog (name → factory)        → manifest (capability → names)
//!                         ↘                ↙
//!                 instantiate::<C>(args)
//!                         → resolve names for C::KEY
//!                         → check capability, build each
//!                         → stable sort by order
//! ```
//!
//! # Design Decisions
//! - Factories are typed per capability, so a constructor signature mismatch
//!   is a compile error rather than a runtime lookup failure
//! - Any construction failure aborts discovery for that capability
//! - Ties in ordering keep discovery order

pub mod capabilities;
pub mod manifest;
pub mod ordered;
pub mod registry;

pub use capabilities::{
    BootstrapperCapability, FailureReporterCapability, InitializerCapability, ListenerCapability,
    RunListenerArgs, RunListenerCapability,
};
pub use manifest::{Manifest, ManifestError};
pub use ordered::{sort_by_order, HIGHEST_PRECEDENCE, LOWEST_PRECEDENCE};
pub use registry::{Capability, DiscoveryError, ExtensionRegistry};
