//! Error types shared by the run protocol.
//!
//! Every subsystem owns its own error enum. `BootError` aggregates them for
//! the run path, and `RunFailed` is the only error a caller of
//! [`Application::run`](crate::Application::run) ever sees. Failure kinds are
//! distinguished by walking the `source()` chain, not by matching on the
//! top-level type.

use std::error::Error as StdError;

use thiserror::Error;

use crate::application::ArgumentError;
use crate::bootstrap::BootstrapError;
use crate::config::{BindError, ValidationErrors};
use crate::container::ContainerError;
use crate::env::EnvironmentError;
use crate::extension::DiscoveryError;
use crate::lifecycle::{Phase, RunnerKind};

/// Boxed error used at every extension seam (listeners, runners, reporters).
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A failure raised anywhere along the run path.
#[derive(Debug, Error)]
pub enum BootError {
    /// An extension could not be discovered or constructed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// The bootstrap registry was used after close, or a supplier failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    /// A bootstrapper extension failed while populating the registry.
    #[error("bootstrapper failed")]
    Bootstrapper(#[source] BoxError),

    /// Raw process arguments could not be parsed.
    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    /// The layered environment could not be assembled.
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    /// Self-configuration binding failed.
    #[error("Cannot bind to application settings")]
    Bind(#[source] BindError),

    /// Settings failed semantic validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Container creation, definition loading, or refresh failed.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// An initializer extension failed while preparing the container.
    #[error("container initializer failed")]
    Initializer(#[source] BoxError),

    /// A lifecycle listener failed while handling a phase.
    #[error("run listener failed during {phase}")]
    Listener {
        phase: Phase,
        #[source]
        source: BoxError,
    },

    /// A runner component failed.
    #[error("Failed to execute {kind}")]
    Runner {
        kind: RunnerKind,
        #[source]
        source: BoxError,
    },

    /// The run reached a state it cannot continue from.
    #[error("{0}")]
    IllegalState(String),
}

/// The single error surfaced by a failed run.
///
/// The original failure is available through [`RunFailed::cause`] and through
/// `source()`.
#[derive(Debug, Error)]
#[error("application run failed")]
pub struct RunFailed {
    #[source]
    source: BootError,
}

impl RunFailed {
    /// Wrap a run-stage failure.
    pub fn new(source: BootError) -> Self {
        Self { source }
    }

    /// The failure that aborted the run.
    pub fn cause(&self) -> &BootError {
        &self.source
    }

    /// Take ownership of the underlying failure.
    pub fn into_cause(self) -> BootError {
        self.source
    }

    /// Find the first error of type `E` anywhere in the cause chain.
    pub fn find_cause<E: StdError + 'static>(&self) -> Option<&E> {
        let mut current: Option<&(dyn StdError + 'static)> = Some(&self.source);
        while let Some(err) = current {
            if let Some(found) = err.downcast_ref::<E>() {
                return Some(found);
            }
            current = err.source();
        }
        None
    }
}

impl From<BootError> for RunFailed {
    fn from(source: BootError) -> Self {
        Self::new(source)
    }
}

/// Render an error and its full cause chain on a single line.
pub fn display_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(cause) = current {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}
