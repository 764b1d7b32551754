//! Bridges run phases onto application events.

use std::sync::Arc;
use std::time::Duration;

use crate::bootstrap::BootstrapRegistry;
use crate::container::Container;
use crate::env::Environment;
use crate::error::{BoxError, BootError};
use crate::extension::{sort_by_order, ExtensionRegistry, RunListenerArgs, RunListenerCapability};
use crate::lifecycle::events::{multicast, AppEvent, AppListener};
use crate::lifecycle::listeners::RunListener;

/// Publishes an `AppEvent` for every run phase.
///
/// Until the container has its listeners (`context_loaded`), events are
/// multicast directly. From `started` on they go through the container, which
/// only delivers while it is active.
pub struct EventPublishingRunListener {
    listeners: Vec<Arc<dyn AppListener>>,
}

impl EventPublishingRunListener {
    pub fn new(args: &RunListenerArgs) -> Self {
        let mut listeners = args.listeners.clone();
        sort_by_order(&mut listeners, |listener| listener.order());
        Self { listeners }
    }

    fn multicast(&self, mut event: AppEvent<'_>) -> Result<(), BoxError> {
        multicast(&self.listeners, &mut event)
    }
}

impl RunListener for EventPublishingRunListener {
    fn starting(&self, bootstrap: &BootstrapRegistry, main_name: Option<&str>) -> Result<(), BoxError> {
        self.multicast(AppEvent::Starting { bootstrap, main_name })
    }

    fn environment_prepared(
        &self,
        bootstrap: &BootstrapRegistry,
        environment: &mut Environment,
    ) -> Result<(), BoxError> {
        self.multicast(AppEvent::EnvironmentPrepared {
            bootstrap,
            environment,
        })
    }

    fn context_prepared(&self, container: &Container) -> Result<(), BoxError> {
        self.multicast(AppEvent::ContextInitialized { container })
    }

    fn context_loaded(&self, container: &Container) -> Result<(), BoxError> {
        for listener in &self.listeners {
            container.add_listener(Arc::clone(listener));
        }
        self.multicast(AppEvent::Prepared { container })
    }

    fn started(&self, container: &Container, time_taken: Duration) -> Result<(), BoxError> {
        container.publish_event(&mut AppEvent::Started {
            container,
            time_taken,
        })
    }

    fn running(&self, container: &Container, time_taken: Duration) -> Result<(), BoxError> {
        container.publish_event(&mut AppEvent::Ready {
            container,
            time_taken,
        })
    }

    fn failed(&self, container: Option<&Container>, error: &BootError) -> Result<(), BoxError> {
        match container {
            Some(active) if active.is_active() => active.publish_event(&mut AppEvent::Failed {
                container: Some(active),
                error,
            }),
            _ => {
                let mut event = AppEvent::Failed { container, error };
                for listener in &self.listeners {
                    if let Err(err) = listener.on_event(&mut event) {
                        tracing::debug!(error = %err, "Listener failed while handling failed event");
                    }
                }
                Ok(())
            }
        }
    }
}

/// Declare the built-in run listener.
pub(crate) fn register_defaults(registry: &mut ExtensionRegistry) {
    registry.register::<RunListenerCapability, _>("event-publishing-run-listener", 0, |args| {
        Ok(Arc::new(EventPublishingRunListener::new(args)))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerKind;
    use crate::env::EnvironmentKind;
    use crate::lifecycle::events::listener_fn;
    use std::sync::Mutex;

    fn recording(seen: &Arc<Mutex<Vec<&'static str>>>) -> Arc<dyn AppListener> {
        let sink = Arc::clone(seen);
        listener_fn(move |event| {
            sink.lock().unwrap().push(event.name());
            Ok(())
        })
    }

    fn args(listeners: Vec<Arc<dyn AppListener>>) -> RunListenerArgs {
        RunListenerArgs {
            listeners,
            args: Vec::new(),
            main_name: None,
        }
    }

    #[test]
    fn test_early_phases_multicast_directly() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publisher = EventPublishingRunListener::new(&args(vec![recording(&seen)]));
        let bootstrap = BootstrapRegistry::new();
        let mut environment = Environment::empty(EnvironmentKind::Standard);

        publisher.starting(&bootstrap, Some("demo")).unwrap();
        publisher.environment_prepared(&bootstrap, &mut environment).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["starting", "environment-prepared"]);
    }

    #[test]
    fn test_context_loaded_registers_listeners_with_container() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publisher = EventPublishingRunListener::new(&args(vec![recording(&seen)]));
        let container = Container::new(ContainerKind::Plain);

        publisher.context_prepared(&container).unwrap();
        publisher.context_loaded(&container).unwrap();
        assert_eq!(container.listeners().len(), 1);

        container.refresh().unwrap();
        publisher.started(&container, Duration::from_millis(5)).unwrap();
        publisher.running(&container, Duration::from_millis(7)).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["context-initialized", "prepared", "context-refreshed", "started", "ready"]
        );
    }

    #[test]
    fn test_failed_without_active_container_multicasts() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publisher = EventPublishingRunListener::new(&args(vec![
            listener_fn(|_| Err("listener broke".into())),
            recording(&seen),
        ]));

        let error = BootError::IllegalState("boom".into());
        publisher.failed(None, &error).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["failed"]);
    }

    #[test]
    fn test_listeners_sorted_by_order() {
        struct Early(Arc<Mutex<Vec<&'static str>>>);

        impl AppListener for Early {
            fn on_event(&self, _: &mut AppEvent<'_>) -> Result<(), BoxError> {
                self.0.lock().unwrap().push("early");
                Ok(())
            }

            fn order(&self) -> i32 {
                -10
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let late = {
            let sink = Arc::clone(&seen);
            listener_fn(move |_| {
                sink.lock().unwrap().push("late");
                Ok(())
            })
        };
        let publisher =
            EventPublishingRunListener::new(&args(vec![late, Arc::new(Early(Arc::clone(&seen)))]));
        publisher.starting(&BootstrapRegistry::new(), None).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["early", "late"]);
    }
}
