//! Startup info log lines.

use std::time::Duration;

use crate::env::Environment;

const UNNAMED: &str = "application";

pub fn log_starting(main_name: Option<&str>) {
    tracing::info!(
        pid = std::process::id(),
        "Starting {} using liftoff {}",
        main_name.unwrap_or(UNNAMED),
        env!("CARGO_PKG_VERSION")
    );
}

pub fn log_profiles(environment: &Environment) {
    let active = environment.active_profiles();
    if active.is_empty() {
        tracing::info!(
            "No active profile set, falling back to default profiles: {}",
            environment.default_profiles().join(", ")
        );
    } else {
        tracing::info!("The following profiles are active: {}", active.join(", "));
    }
}

pub fn log_started(main_name: Option<&str>, time_taken: Duration) {
    tracing::info!(
        "Started {} in {:.3} seconds",
        main_name.unwrap_or(UNNAMED),
        time_taken.as_secs_f64()
    );
}
