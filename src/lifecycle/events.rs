//! Application events and their listeners.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::bootstrap::BootstrapRegistry;
use crate::container::Container;
use crate::env::Environment;
use crate::error::{BoxError, BootError};
use crate::extension::LOWEST_PRECEDENCE;

/// An event published during a run or by the container.
pub enum AppEvent<'a> {
    /// The run has begun; nothing but the bootstrap registry exists.
    Starting {
        bootstrap: &'a BootstrapRegistry,
        main_name: Option<&'a str>,
    },
    /// The environment is assembled but not yet frozen; listeners may add,
    /// remove or reorder sources.
    EnvironmentPrepared {
        bootstrap: &'a BootstrapRegistry,
        environment: &'a mut Environment,
    },
    /// Initializers have run; definitions are not loaded yet.
    ContextInitialized { container: &'a Container },
    /// Definitions are loaded; the container is not refreshed.
    Prepared { container: &'a Container },
    /// The container finished refreshing.
    ContextRefreshed { container: &'a Container },
    /// Refreshed, runners not yet called.
    Started {
        container: &'a Container,
        time_taken: Duration,
    },
    /// Runners completed; the application is ready.
    Ready {
        container: &'a Container,
        time_taken: Duration,
    },
    /// The run failed.
    Failed {
        container: Option<&'a Container>,
        error: &'a BootError,
    },
    /// A non-zero exit code was computed.
    ExitCode { code: i32 },
    /// The container is closing.
    ContextClosed { container: &'a Container },
}

impl AppEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::Starting { .. } => "starting",
            AppEvent::EnvironmentPrepared { .. } => "environment-prepared",
            AppEvent::ContextInitialized { .. } => "context-initialized",
            AppEvent::Prepared { .. } => "prepared",
            AppEvent::ContextRefreshed { .. } => "context-refreshed",
            AppEvent::Started { .. } => "started",
            AppEvent::Ready { .. } => "ready",
            AppEvent::Failed { .. } => "failed",
            AppEvent::ExitCode { .. } => "exit-code",
            AppEvent::ContextClosed { .. } => "context-closed",
        }
    }
}

impl fmt::Debug for AppEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppEvent::ExitCode { code } => f.debug_struct("ExitCode").field("code", code).finish(),
            AppEvent::Failed { error, .. } => f.debug_struct("Failed").field("error", &error.to_string()).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// Receives application events.
pub trait AppListener: Send + Sync {
    fn on_event(&self, event: &mut AppEvent<'_>) -> Result<(), BoxError>;

    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE
    }
}

impl<F> AppListener for F
where
    F: Fn(&mut AppEvent<'_>) -> Result<(), BoxError> + Send + Sync,
{
    fn on_event(&self, event: &mut AppEvent<'_>) -> Result<(), BoxError> {
        self(event)
    }
}

/// Wrap a closure as a shared listener.
pub fn listener_fn<F>(listener: F) -> Arc<dyn AppListener>
where
    F: Fn(&mut AppEvent<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(listener)
}

/// Deliver `event` to `listeners` in slice order; the first error stops delivery.
pub fn multicast(listeners: &[Arc<dyn AppListener>], event: &mut AppEvent<'_>) -> Result<(), BoxError> {
    for listener in listeners {
        listener.on_event(event)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_multicast_stops_at_first_error() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first_sink = Arc::clone(&seen);
        let last_sink = Arc::clone(&seen);
        let listeners = vec![
            listener_fn(move |event| {
                first_sink.lock().unwrap().push(event.name());
                Ok(())
            }),
            listener_fn(|_| Err("refused".into())),
            listener_fn(move |event| {
                last_sink.lock().unwrap().push(event.name());
                Ok(())
            }),
        ];

        let err = multicast(&listeners, &mut AppEvent::ExitCode { code: 3 }).unwrap_err();
        assert_eq!(err.to_string(), "refused");
        assert_eq!(*seen.lock().unwrap(), vec!["exit-code"]);
    }

    #[test]
    fn test_listener_can_edit_environment() {
        let listener = listener_fn(|event| {
            if let AppEvent::EnvironmentPrepared { environment, .. } = event {
                environment.set_active_profiles(["edited"]);
            }
            Ok(())
        });
        let bootstrap = BootstrapRegistry::new();
        let mut environment = Environment::empty(crate::env::EnvironmentKind::Standard);
        listener
            .on_event(&mut AppEvent::EnvironmentPrepared {
                bootstrap: &bootstrap,
                environment: &mut environment,
            })
            .unwrap();
        assert_eq!(environment.active_profiles(), vec!["edited"]);
    }
}
