//! Startup metrics.
//!
//! # Metrics
//! - `liftoff_startup_step_seconds` (histogram): duration of each recorded
//!   startup step, labelled by `step`
//! - `liftoff_lifecycle_events_total` (counter): run phases dispatched,
//!   labelled by `phase`
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const STARTUP_STEP_SECONDS: &str = "liftoff_startup_step_seconds";

pub const LIFECYCLE_EVENTS_TOTAL: &str = "liftoff_lifecycle_events_total";

static INSTALLED: OnceLock<SocketAddr> = OnceLock::new();

/// Install the Prometheus exporter, serving scrapes on `addr`.
///
/// Only the first successful call installs anything.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    let _ = INSTALLED.set(addr);

    describe_histogram!(STARTUP_STEP_SECONDS, "Duration of startup steps in seconds");
    describe_counter!(LIFECYCLE_EVENTS_TOTAL, "Run lifecycle phases dispatched");

    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

/// Record a finished startup step.
pub fn record_startup_step(step: &str, duration: Duration) {
    histogram!(STARTUP_STEP_SECONDS, "step" => step.to_string()).record(duration.as_secs_f64());
}

/// Count a dispatched run phase.
pub fn record_lifecycle_event(phase: &str) {
    counter!(LIFECYCLE_EVENTS_TOTAL, "phase" => phase.to_string()).increment(1);
}
