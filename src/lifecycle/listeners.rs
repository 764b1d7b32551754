//! Run-phase listeners and their dispatcher.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::bootstrap::BootstrapRegistry;
use crate::container::Container;
use crate::env::Environment;
use crate::error::{display_chain, BoxError, BootError};
use crate::observability::{metrics, StartupRecorder};

/// The phases of one run, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Starting,
    EnvironmentPrepared,
    ContextPrepared,
    ContextLoaded,
    Started,
    Running,
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::EnvironmentPrepared => "environmentPrepared",
            Phase::ContextPrepared => "contextPrepared",
            Phase::ContextLoaded => "contextLoaded",
            Phase::Started => "started",
            Phase::Running => "running",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener for the phases of a run.
///
/// Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait RunListener: Send + Sync {
    fn starting(&self, bootstrap: &BootstrapRegistry, main_name: Option<&str>) -> Result<(), BoxError> {
        Ok(())
    }

    fn environment_prepared(
        &self,
        bootstrap: &BootstrapRegistry,
        environment: &mut Environment,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    fn context_prepared(&self, container: &Container) -> Result<(), BoxError> {
        Ok(())
    }

    fn context_loaded(&self, container: &Container) -> Result<(), BoxError> {
        Ok(())
    }

    fn started(&self, container: &Container, time_taken: Duration) -> Result<(), BoxError> {
        Ok(())
    }

    fn running(&self, container: &Container, time_taken: Duration) -> Result<(), BoxError> {
        Ok(())
    }

    fn failed(&self, container: Option<&Container>, error: &BootError) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Ordered set of run listeners.
///
/// Each phase is recorded as a startup step. A listener error aborts the
/// phase and becomes the run failure, except during `failed`, where errors
/// are logged and the remaining listeners still run.
pub struct RunListeners {
    listeners: Vec<Arc<dyn RunListener>>,
    startup: StartupRecorder,
}

impl RunListeners {
    pub fn new(listeners: Vec<Arc<dyn RunListener>>, startup: StartupRecorder) -> Self {
        Self { listeners, startup }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn dispatch<F>(&self, phase: Phase, mut call: F) -> Result<(), BootError>
    where
        F: FnMut(&dyn RunListener) -> Result<(), BoxError>,
    {
        let step = self.startup.start(format!("liftoff.{phase}"));
        metrics::record_lifecycle_event(phase.as_str());
        tracing::debug!(phase = %phase, listeners = self.listeners.len(), "Dispatching run phase");

        for listener in &self.listeners {
            if let Err(source) = call(listener.as_ref()) {
                step.tag("failed", "true").end();
                return Err(BootError::Listener { phase, source });
            }
        }
        step.end();
        Ok(())
    }

    pub fn starting(&self, bootstrap: &BootstrapRegistry, main_name: Option<&str>) -> Result<(), BootError> {
        self.dispatch(Phase::Starting, |listener| listener.starting(bootstrap, main_name))
    }

    pub fn environment_prepared(
        &self,
        bootstrap: &BootstrapRegistry,
        environment: &mut Environment,
    ) -> Result<(), BootError> {
        self.dispatch(Phase::EnvironmentPrepared, |listener| {
            listener.environment_prepared(bootstrap, environment)
        })
    }

    pub fn context_prepared(&self, container: &Container) -> Result<(), BootError> {
        self.dispatch(Phase::ContextPrepared, |listener| listener.context_prepared(container))
    }

    pub fn context_loaded(&self, container: &Container) -> Result<(), BootError> {
        self.dispatch(Phase::ContextLoaded, |listener| listener.context_loaded(container))
    }

    pub fn started(&self, container: &Container, time_taken: Duration) -> Result<(), BootError> {
        self.dispatch(Phase::Started, |listener| listener.started(container, time_taken))
    }

    pub fn running(&self, container: &Container, time_taken: Duration) -> Result<(), BootError> {
        self.dispatch(Phase::Running, |listener| listener.running(container, time_taken))
    }

    /// Tell every listener about the failure; never fails itself.
    pub fn failed(&self, container: Option<&Container>, error: &BootError) {
        let step = self.startup.start(format!("liftoff.{}", Phase::Failed));
        metrics::record_lifecycle_event(Phase::Failed.as_str());
        for listener in &self.listeners {
            if let Err(err) = listener.failed(container, error) {
                tracing::error!(
                    error = %display_chain(&*err),
                    "Error handling failed event"
                );
            }
        }
        step.end();
    }
}

impl fmt::Debug for RunListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunListeners")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerKind;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail_on: Option<Phase>,
    }

    impl Recorder {
        fn record(&self, phase: Phase) -> Result<(), BoxError> {
            self.calls.lock().unwrap().push(phase.to_string());
            if self.fail_on == Some(phase) {
                return Err(format!("{phase} refused").into());
            }
            Ok(())
        }
    }

    impl RunListener for Recorder {
        fn starting(&self, _: &BootstrapRegistry, _: Option<&str>) -> Result<(), BoxError> {
            self.record(Phase::Starting)
        }

        fn context_prepared(&self, _: &Container) -> Result<(), BoxError> {
            self.record(Phase::ContextPrepared)
        }

        fn failed(&self, _: Option<&Container>, _: &BootError) -> Result<(), BoxError> {
            self.record(Phase::Failed)
        }
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::EnvironmentPrepared.to_string(), "environmentPrepared");
    }

    #[test]
    fn test_listener_error_aborts_phase() {
        let failing = Arc::new(Recorder {
            fail_on: Some(Phase::ContextPrepared),
            ..Default::default()
        });
        let after = Arc::new(Recorder::default());
        let listeners = RunListeners::new(
            vec![failing.clone(), after.clone()],
            StartupRecorder::default(),
        );

        let container = Container::new(ContainerKind::Plain);
        let err = listeners.context_prepared(&container).unwrap_err();
        assert!(matches!(err, BootError::Listener { phase: Phase::ContextPrepared, .. }));
        assert!(after.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_swallows_listener_errors() {
        let failing = Arc::new(Recorder {
            fail_on: Some(Phase::Failed),
            ..Default::default()
        });
        let after = Arc::new(Recorder::default());
        let listeners = RunListeners::new(
            vec![failing.clone(), after.clone()],
            StartupRecorder::default(),
        );

        listeners.failed(None, &BootError::IllegalState("boom".into()));
        assert_eq!(*after.calls.lock().unwrap(), vec!["failed"]);
    }

    #[test]
    fn test_phases_are_recorded_as_steps() {
        let recorder = StartupRecorder::buffering();
        let listeners = RunListeners::new(vec![Arc::new(Recorder::default())], recorder.clone());
        listeners.starting(&BootstrapRegistry::new(), Some("demo")).unwrap();

        let steps = recorder.steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "liftoff.starting");
    }
}
