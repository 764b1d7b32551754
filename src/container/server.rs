//! Embedded server seam for the server container kinds.

use crate::container::context::Container;
use crate::error::BoxError;

/// Creates the server a server-kind container runs.
///
/// Exactly one component must provide this facet when the container kind is
/// `Server` or `ReactiveServer`.
pub trait ServerFactory: Send + Sync {
    fn create_server(&self, container: &Container) -> Result<Box<dyn Server>, BoxError>;
}

/// A server owned by a container.
///
/// Created during refresh, started once every eager component exists, and
/// stopped when the container closes.
pub trait Server: Send + Sync {
    fn start(&self) -> Result<(), BoxError>;

    fn stop(&self) -> Result<(), BoxError>;

    /// Bound port, when there is one.
    fn port(&self) -> Option<u16> {
        None
    }
}
