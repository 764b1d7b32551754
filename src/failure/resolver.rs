//! Run-path failure handling.
//!
//! # Data Flow
//! ```text
//! BootError escapes a phase
//!     → exit code: container mappers (active container only), else the
//!       first ExitCodeError in the cause chain
//!     → non-zero: ExitCode event on the container, FailureHandler record
//!     → RunListeners::failed (when listeners exist)
//!     → FailureReporter extensions, else error log
//!     → close container (errors logged)
//!     → RunFailed
//! ```

use std::sync::Arc;

use crate::container::Container;
use crate::error::{display_chain, BootError, RunFailed};
use crate::extension::{ExtensionRegistry, FailureReporterCapability};
use crate::failure::exit_code::{exit_code_from_chain, ExitCodeExceptionMapper, ExitCodeGenerators};
use crate::failure::handler::FailureHandler;
use crate::lifecycle::{shutdown_hook, AppEvent, RunListeners};

/// Everything that exists at the moment a run fails.
pub struct FailureScope<'a> {
    pub container: Option<&'a Arc<Container>>,
    pub listeners: Option<&'a RunListeners>,
    pub extensions: &'a ExtensionRegistry,
}

/// Clean up after a failed run and wrap the failure for the caller.
pub fn handle_run_failure(error: BootError, scope: FailureScope<'_>) -> RunFailed {
    let container = scope.container.map(|c| &**c);

    let code = exit_code_for(&error, container);
    if code != 0 {
        if let Some(container) = container {
            if let Err(err) = container.publish_event(&mut AppEvent::ExitCode { code }) {
                tracing::warn!(error = %err, "Exit code listener failed");
            }
        }
        if let Some(handler) = FailureHandler::current() {
            handler.register_exit_code(code);
        }
    }

    if let Some(listeners) = scope.listeners {
        listeners.failed(container, &error);
    }

    report_failure(&error, scope.container, scope.extensions);

    if let Some(container) = container {
        if let Err(err) = container.close() {
            tracing::warn!(error = %err, "Unable to close container");
        }
        shutdown_hook().deregister(container);
    }

    RunFailed::new(error)
}

fn exit_code_for(error: &BootError, container: Option<&Container>) -> i32 {
    let mut code = 0;
    if let Some(container) = container.filter(|c| c.is_active()) {
        match container.components_of::<dyn ExitCodeExceptionMapper>() {
            Ok(mappers) => {
                let mappers: Vec<_> = mappers.into_iter().map(|m| m.instance).collect();
                code = ExitCodeGenerators::new().add_mapped(error, &mappers).exit_code();
            }
            Err(err) => tracing::debug!(error = %err, "Exit code mappers unavailable"),
        }
    }
    if code == 0 {
        code = exit_code_from_chain(error);
    }
    code
}

/// Offer `error` to the failure reporters, falling back to the log.
///
/// Returns `true` if a reporter took it.
pub fn report_failure(
    error: &BootError,
    container: Option<&Arc<Container>>,
    extensions: &ExtensionRegistry,
) -> bool {
    let reporters = extensions
        .instantiate::<FailureReporterCapability>(&container.cloned())
        .unwrap_or_else(|err| {
            tracing::debug!(error = %err, "Failure reporters unavailable");
            Vec::new()
        });

    let mut reported = false;
    for reporter in &reporters {
        match reporter.report(error) {
            Ok(true) => {
                reported = true;
                break;
            }
            Ok(false) => {}
            Err(err) => {
                tracing::debug!(error = %err, "Failure reporter failed");
                break;
            }
        }
    }

    if !reported {
        tracing::error!(error = %display_chain(error), "Application run failed");
    }
    if let Some(handler) = FailureHandler::current() {
        handler.register_logged(error);
    }
    reported
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ComponentDefinition, ContainerKind};
    use crate::error::BoxError;
    use crate::failure::exit_code::ExitCodeError;
    use crate::failure::FailureReporter;
    use crate::lifecycle::{listener_fn, RunnerKind};
    use std::sync::Mutex;

    struct Accepting(Arc<Mutex<Vec<String>>>, bool);

    impl FailureReporter for Accepting {
        fn report(&self, error: &BootError) -> Result<bool, BoxError> {
            self.0.lock().unwrap().push(error.to_string());
            Ok(self.1)
        }
    }

    fn runner_failure(code: i32) -> BootError {
        BootError::Runner {
            kind: RunnerKind::ApplicationRunner,
            source: Box::new(ExitCodeError::new(code, "bad input")),
        }
    }

    #[test]
    fn test_reporter_discovery_failure_falls_back_to_log() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut extensions = ExtensionRegistry::new();
        let (first, second) = (Arc::clone(&seen), Arc::clone(&seen));
        extensions
            .register::<FailureReporterCapability, _>("declines", 1, move |_| {
                Ok(Arc::new(Accepting(Arc::clone(&first), false)))
            })
            .register::<FailureReporterCapability, _>("accepts", 2, move |_| {
                Ok(Arc::new(Accepting(Arc::clone(&second), true)))
            })
            .register::<FailureReporterCapability, _>("never", 3, |_| {
                Err("reporter unavailable".into())
            });

        assert!(!report_failure(&BootError::IllegalState("x".into()), None, &extensions));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reporting_stops_at_first_acceptance() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut extensions = ExtensionRegistry::new();
        let (first, second, third) = (Arc::clone(&seen), Arc::clone(&seen), Arc::clone(&seen));
        extensions
            .register::<FailureReporterCapability, _>("declines", 1, move |_| {
                Ok(Arc::new(Accepting(Arc::clone(&first), false)))
            })
            .register::<FailureReporterCapability, _>("accepts", 2, move |_| {
                Ok(Arc::new(Accepting(Arc::clone(&second), true)))
            })
            .register::<FailureReporterCapability, _>("skipped", 3, move |_| {
                Ok(Arc::new(Accepting(Arc::clone(&third), true)))
            });

        assert!(report_failure(&BootError::IllegalState("broken".into()), None, &extensions));
        assert_eq!(*seen.lock().unwrap(), vec!["broken", "broken"]);
    }

    #[test]
    fn test_failure_closes_container_and_publishes_exit_code() {
        let codes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&codes);
        let container = Arc::new(Container::new(ContainerKind::Plain));
        container.add_listener(listener_fn(move |event| {
            if let AppEvent::ExitCode { code } = event {
                sink.lock().unwrap().push(*code);
            }
            Ok(())
        }));
        container.refresh().unwrap();

        let failed = handle_run_failure(
            runner_failure(9),
            FailureScope {
                container: Some(&container),
                listeners: None,
                extensions: &ExtensionRegistry::new(),
            },
        );

        assert!(container.is_closed());
        assert_eq!(*codes.lock().unwrap(), vec![9]);
        assert_eq!(failed.cause().to_string(), "Failed to execute ApplicationRunner");
    }

    #[test]
    fn test_mappers_take_precedence_over_cause_chain() {
        struct Mapper;

        impl ExitCodeExceptionMapper for Mapper {
            fn exit_code(&self, _: &(dyn std::error::Error + 'static)) -> i32 {
                64
            }
        }

        let container = Container::new(ContainerKind::Plain);
        container
            .definitions()
            .register(
                ComponentDefinition::builder("mapper", |_| Ok(Mapper))
                    .provides::<dyn ExitCodeExceptionMapper, _>(|m| m as Arc<dyn ExitCodeExceptionMapper>)
                    .build(),
            )
            .unwrap();

        assert_eq!(exit_code_for(&runner_failure(9), Some(&container)), 9);
        container.refresh().unwrap();
        assert_eq!(exit_code_for(&runner_failure(9), Some(&container)), 64);
    }
}
