//! Container selection.

use crate::application::DeploymentType;
use crate::container::context::{Container, ContainerKind};
use crate::container::ContainerError;

/// Produces the un-refreshed container for a deployment type.
pub trait ContainerFactory: Send + Sync {
    fn create(&self, deployment: DeploymentType) -> Result<Container, ContainerError>;
}

/// One container kind per deployment type.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultContainerFactory;

impl ContainerFactory for DefaultContainerFactory {
    fn create(&self, deployment: DeploymentType) -> Result<Container, ContainerError> {
        Ok(Container::new(ContainerKind::for_deployment(deployment)))
    }
}

impl<F> ContainerFactory for F
where
    F: Fn(DeploymentType) -> Result<Container, ContainerError> + Send + Sync,
{
    fn create(&self, deployment: DeploymentType) -> Result<Container, ContainerError> {
        self(deployment)
    }
}
