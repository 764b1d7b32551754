//! Dependency-injection container and its collaborators.
//!
//! # Data Flow
//! ```text
//! DeploymentType
//!     → factory.rs (ContainerFactory: pick the kind, no side effects)
//!     → Container (un-refreshed)
//!     → loader.rs (DefinitionLoader: sources → definitions)
//!     → context.rs refresh() (server, eager singletons, ContextRefreshed)
//!     → components_of::<dyn Facet>() for runners, mappers, generators
//! ```

pub mod context;
pub mod definition;
pub mod factory;
pub mod loader;
pub mod registry;
pub mod server;

use thiserror::Error;

use crate::env::EnvironmentError;
use crate::error::BoxError;

pub use context::{ComponentRef, Container, ContainerInitializer, ContainerKind};
pub use definition::{ComponentDefinition, DefinitionBuilder};
pub use factory::{ContainerFactory, DefaultContainerFactory};
pub use loader::{
    DefaultNameGenerator, DefinitionLoader, FileResourceLoader, LoadRequest, NameGenerator,
    ResourceLoader, SourceCatalog, SourceContext,
};
pub use registry::DefinitionRegistry;
pub use server::{Server, ServerFactory};

/// Errors raised by the container and definition loading.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("No component named '{0}' is defined")]
    NoSuchComponent(String),

    #[error("Component '{name}' is not of type {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("Cannot register definition '{name}': a definition with that name already exists and overriding is disabled")]
    DefinitionOverride { name: String },

    #[error("A singleton named '{0}' is already registered")]
    DuplicateSingleton(String),

    #[error("Component '{0}' is currently in creation: is there an unresolvable circular reference?")]
    CurrentlyInCreation(String),

    #[error("Error creating component '{name}'")]
    Creation {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Unable to start server container: no ServerFactory component is defined")]
    MissingServerFactory,

    #[error("Unable to start server container: multiple ServerFactory components: {}", .0.join(", "))]
    MultipleServerFactories(Vec<String>),

    #[error("Server failed")]
    Server(#[source] BoxError),

    #[error("Invalid source '{0}'")]
    InvalidSource(String),

    #[error("Cannot load resource '{location}'")]
    Resource {
        location: String,
        #[source]
        source: BoxError,
    },

    #[error("Refresh hook failed")]
    RefreshHook(#[source] BoxError),

    #[error("Container listener failed")]
    Listener(#[source] BoxError),

    #[error("Container has been closed")]
    Closed,

    #[error("Container has already been refreshed")]
    AlreadyRefreshed,

    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}
