//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Run phases, container, failures:
//!     → tracing events (logging.rs installs the subscriber in binaries)
//!     → StartupRecorder steps (startup.rs)
//!         → liftoff_startup_step_seconds histogram (metrics.rs)
//!     → liftoff_lifecycle_events_total counter (metrics.rs)
//! ```

pub mod logging;
pub mod metrics;
pub mod startup;

pub use logging::init_logging;
pub use self::metrics::init_metrics;
pub use startup::{StartupRecorder, StartupStep, StepRecord};
