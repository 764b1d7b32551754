//! Built-in capabilities recognized by the orchestrator.

use std::sync::Arc;

use crate::bootstrap::Bootstrapper;
use crate::container::{Container, ContainerInitializer};
use crate::extension::registry::Capability;
use crate::failure::FailureReporter;
use crate::lifecycle::{AppListener, RunListener};

/// Constructor arguments for run listeners.
#[derive(Clone)]
pub struct RunListenerArgs {
    /// Application listeners configured on the orchestrator.
    pub listeners: Vec<Arc<dyn AppListener>>,
    /// Raw process arguments of the run.
    pub args: Vec<String>,
    /// Identifier of the application entry point, if known.
    pub main_name: Option<String>,
}

/// Phase listeners driven directly by the orchestrator.
pub struct RunListenerCapability;

impl Capability for RunListenerCapability {
    const KEY: &'static str = "run-listener";
    type Args = RunListenerArgs;
    type Instance = dyn RunListener;
}

/// Initializers applied to the container before `contextPrepared`.
pub struct InitializerCapability;

impl Capability for InitializerCapability {
    const KEY: &'static str = "initializer";
    type Args = ();
    type Instance = dyn ContainerInitializer;
}

/// Application event listeners.
pub struct ListenerCapability;

impl Capability for ListenerCapability {
    const KEY: &'static str = "listener";
    type Args = ();
    type Instance = dyn AppListener;
}

/// Extensions that populate the bootstrap registry.
pub struct BootstrapperCapability;

impl Capability for BootstrapperCapability {
    const KEY: &'static str = "bootstrapper";
    type Args = ();
    type Instance = dyn Bootstrapper;
}

/// Failure reporters, constructed with whatever container exists.
pub struct FailureReporterCapability;

impl Capability for FailureReporterCapability {
    const KEY: &'static str = "failure-reporter";
    type Args = Option<Arc<Container>>;
    type Instance = dyn FailureReporter;
}
