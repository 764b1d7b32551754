//! Pre-container bootstrap registry.
//!
//! # Data Flow
//! ```text
//! run() start
//!     → BootstrapRegistry::new()
//!     → every Bootstrapper::initialize(&registry)
//!     → starting / environmentPrepared listeners read & register
//!     → close(&container) after contextPrepared
//!         → close listeners receive the final container
//!         → registry unusable afterwards
//! ```

pub mod registry;

pub use registry::{BootstrapError, BootstrapRegistry, Bootstrapper, InstanceSupplier, Scope};
