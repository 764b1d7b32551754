//! The component container.
//!
//! # Responsibilities
//! - Hold definitions and the singletons created from them
//! - Refresh: run refresh hooks, create the server (server kinds), create
//!   eager singletons, start the server, publish `ContextRefreshed`
//! - Close: publish `ContextClosed`, stop the server, destroy singletons in
//!   reverse creation order
//!
//! # Design Decisions
//! - Singletons live in a `DashMap` so the shutdown hook thread can close a
//!   container while application threads still read from it
//! - No lock is held while a factory runs; factories may look up other
//!   components, and a cycle is reported as `CurrentlyInCreation`
//! - `close` is idempotent

use std::any::type_name;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::application::DeploymentType;
use crate::container::definition::{ComponentDefinition, ErasedInstance};
use crate::container::loader::ResourceLoader;
use crate::container::registry::DefinitionRegistry;
use crate::container::server::{Server, ServerFactory};
use crate::container::ContainerError;
use crate::env::{Environment, EnvironmentKind};
use crate::error::BoxError;
use crate::extension::{sort_by_order, LOWEST_PRECEDENCE};
use crate::lifecycle::{multicast, AppEvent, AppListener};

const CREATED: u8 = 0;
const ACTIVE: u8 = 1;
const CLOSED: u8 = 2;

/// Container variant, one per deployment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerKind {
    Plain,
    Server,
    ReactiveServer,
}

impl ContainerKind {
    pub fn for_deployment(deployment: DeploymentType) -> Self {
        match deployment {
            DeploymentType::None => ContainerKind::Plain,
            DeploymentType::Server => ContainerKind::Server,
            DeploymentType::ReactiveServer => ContainerKind::ReactiveServer,
        }
    }

    /// Whether refresh must create and start a server.
    pub fn runs_server(self) -> bool {
        !matches!(self, ContainerKind::Plain)
    }

    fn environment_kind(self) -> EnvironmentKind {
        match self {
            ContainerKind::Plain => EnvironmentKind::Standard,
            ContainerKind::Server => EnvironmentKind::Server,
            ContainerKind::ReactiveServer => EnvironmentKind::ReactiveServer,
        }
    }
}

/// Extension applied to the container before `contextPrepared`.
pub trait ContainerInitializer: Send + Sync {
    fn initialize(&self, container: &Container) -> Result<(), BoxError>;

    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE
    }
}

/// A component found through one of its facets.
pub struct ComponentRef<F: ?Sized> {
    pub name: String,
    pub order: i32,
    pub instance: Arc<F>,
}

impl<F: ?Sized> Clone for ComponentRef<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            order: self.order,
            instance: Arc::clone(&self.instance),
        }
    }
}

type RefreshHook = Box<dyn FnOnce(&Container) -> Result<(), BoxError> + Send>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Dependency-injection container.
pub struct Container {
    id: Uuid,
    kind: ContainerKind,
    state: AtomicU8,
    environment: Mutex<Arc<Environment>>,
    definitions: DefinitionRegistry,
    singletons: DashMap<String, ErasedInstance>,
    creation_order: Mutex<Vec<String>>,
    in_creation: Mutex<HashSet<String>>,
    listeners: Mutex<Vec<Arc<dyn AppListener>>>,
    refresh_hooks: Mutex<Vec<RefreshHook>>,
    lazy_initialization: AtomicBool,
    server: Mutex<Option<Box<dyn Server>>>,
    resource_loader: Mutex<Option<Arc<dyn ResourceLoader>>>,
}

impl Container {
    /// Create an empty, un-refreshed container.
    pub fn new(kind: ContainerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            state: AtomicU8::new(CREATED),
            environment: Mutex::new(Arc::new(Environment::empty(kind.environment_kind()))),
            definitions: DefinitionRegistry::new(),
            singletons: DashMap::new(),
            creation_order: Mutex::new(Vec::new()),
            in_creation: Mutex::new(HashSet::new()),
            listeners: Mutex::new(Vec::new()),
            refresh_hooks: Mutex::new(Vec::new()),
            lazy_initialization: AtomicBool::new(false),
            server: Mutex::new(None),
            resource_loader: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn environment(&self) -> Arc<Environment> {
        Arc::clone(&lock(&self.environment))
    }

    pub fn set_environment(&self, environment: Environment) {
        *lock(&self.environment) = Arc::new(environment);
    }

    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.definitions
    }

    pub fn set_lazy_initialization(&self, lazy: bool) {
        self.lazy_initialization.store(lazy, Ordering::SeqCst);
    }

    pub fn is_lazy_initialization(&self) -> bool {
        self.lazy_initialization.load(Ordering::SeqCst)
    }

    pub fn set_resource_loader(&self, loader: Arc<dyn ResourceLoader>) {
        *lock(&self.resource_loader) = Some(loader);
    }

    pub fn resource_loader(&self) -> Option<Arc<dyn ResourceLoader>> {
        lock(&self.resource_loader).clone()
    }

    pub fn is_active(&self) -> bool {
        self.state.load(Ordering::SeqCst) == ACTIVE
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CLOSED
    }

    fn ensure_open(&self) -> Result<(), ContainerError> {
        if self.is_closed() {
            return Err(ContainerError::Closed);
        }
        Ok(())
    }

    /// Register a ready-made instance under `name`.
    pub fn register_singleton<T: Send + Sync + 'static>(
        &self,
        name: impl Into<String>,
        instance: Arc<T>,
    ) -> Result<(), ContainerError> {
        self.ensure_open()?;
        let name = name.into();
        match self.singletons.entry(name.clone()) {
            Entry::Occupied(_) => Err(ContainerError::DuplicateSingleton(name)),
            Entry::Vacant(slot) => {
                slot.insert(instance);
                lock(&self.creation_order).push(name);
                Ok(())
            }
        }
    }

    /// Whether a singleton or definition named `name` exists.
    pub fn contains_component(&self, name: &str) -> bool {
        self.singletons.contains_key(name) || self.definitions.contains(name)
    }

    /// Look up a component by name and concrete type, creating it if needed.
    pub fn component<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ContainerError> {
        let instance = self.instance(name)?;
        instance
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Every component providing facet `F`, sorted by order.
    ///
    /// Ties keep registration order.
    pub fn components_of<F: ?Sized + 'static>(&self) -> Result<Vec<ComponentRef<F>>, ContainerError> {
        let mut found = Vec::new();
        for definition in self.definitions.definitions() {
            if !definition.provides::<F>() {
                continue;
            }
            let instance = self.instance(definition.name())?;
            if let Some(instance) = definition.cast::<F>(instance) {
                found.push(ComponentRef {
                    name: definition.name().to_string(),
                    order: definition.order(),
                    instance,
                });
            }
        }
        sort_by_order(&mut found, |component| component.order);
        Ok(found)
    }

    fn instance(&self, name: &str) -> Result<ErasedInstance, ContainerError> {
        self.ensure_open()?;
        if let Some(existing) = self.singletons.get(name) {
            return Ok(Arc::clone(existing.value()));
        }
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| ContainerError::NoSuchComponent(name.to_string()))?;
        self.create(&definition)
    }

    fn create(&self, definition: &ComponentDefinition) -> Result<ErasedInstance, ContainerError> {
        let name = definition.name();
        if !lock(&self.in_creation).insert(name.to_string()) {
            return Err(ContainerError::CurrentlyInCreation(name.to_string()));
        }
        let created = definition.create(self);
        lock(&self.in_creation).remove(name);

        let instance = created.map_err(|source| ContainerError::Creation {
            name: name.to_string(),
            source,
        })?;
        tracing::trace!(container = %self.id, component = %name, "Created component");

        match self.singletons.entry(name.to_string()) {
            Entry::Occupied(existing) => Ok(Arc::clone(existing.get())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&instance));
                lock(&self.creation_order).push(name.to_string());
                Ok(instance)
            }
        }
    }

    /// Run `hook` at the start of the next refresh.
    pub fn add_refresh_hook<F>(&self, hook: F)
    where
        F: FnOnce(&Container) -> Result<(), BoxError> + Send + 'static,
    {
        lock(&self.refresh_hooks).push(Box::new(hook));
    }

    /// Add an application listener; listeners stay sorted by order.
    pub fn add_listener(&self, listener: Arc<dyn AppListener>) {
        let mut listeners = lock(&self.listeners);
        listeners.push(listener);
        sort_by_order(listeners.as_mut_slice(), |listener| listener.order());
    }

    pub fn listeners(&self) -> Vec<Arc<dyn AppListener>> {
        lock(&self.listeners).clone()
    }

    /// Deliver `event` to every registered listener.
    pub fn publish_event(&self, event: &mut AppEvent<'_>) -> Result<(), BoxError> {
        let listeners = self.listeners();
        multicast(&listeners, event)
    }

    /// Initialize the container.
    ///
    /// On failure every component created so far is destroyed and the
    /// container stays un-refreshed.
    pub fn refresh(&self) -> Result<(), ContainerError> {
        match self.state.load(Ordering::SeqCst) {
            ACTIVE => return Err(ContainerError::AlreadyRefreshed),
            CLOSED => return Err(ContainerError::Closed),
            _ => {}
        }

        if let Err(err) = self.try_refresh() {
            tracing::warn!(container = %self.id, error = %err, "Refresh failed, destroying created components");
            let _ = self
                .state
                .compare_exchange(ACTIVE, CREATED, Ordering::SeqCst, Ordering::SeqCst);
            if let Err(stop) = self.stop_server() {
                tracing::debug!(error = %stop, "Server stop after failed refresh also failed");
            }
            self.destroy_singletons();
            return Err(err);
        }
        Ok(())
    }

    fn try_refresh(&self) -> Result<(), ContainerError> {
        let hooks = std::mem::take(&mut *lock(&self.refresh_hooks));
        for hook in hooks {
            hook(self).map_err(ContainerError::RefreshHook)?;
        }

        if self.kind.runs_server() {
            self.create_server()?;
        }

        let lazy = self.is_lazy_initialization();
        for definition in self.definitions.definitions() {
            if lazy || definition.is_lazy() || self.singletons.contains_key(definition.name()) {
                continue;
            }
            self.create(&definition)?;
        }

        self.start_server()?;
        self.state.store(ACTIVE, Ordering::SeqCst);
        tracing::debug!(
            container = %self.id,
            kind = ?self.kind,
            components = self.singletons.len(),
            "Container refreshed"
        );

        self.publish_event(&mut AppEvent::ContextRefreshed { container: self })
            .map_err(ContainerError::Listener)
    }

    fn create_server(&self) -> Result<(), ContainerError> {
        let factories = self.components_of::<dyn ServerFactory>()?;
        let factory = match factories.as_slice() {
            [] => return Err(ContainerError::MissingServerFactory),
            [only] => Arc::clone(&only.instance),
            many => {
                return Err(ContainerError::MultipleServerFactories(
                    many.iter().map(|f| f.name.clone()).collect(),
                ))
            }
        };
        let server = factory.create_server(self).map_err(ContainerError::Server)?;
        *lock(&self.server) = Some(server);
        Ok(())
    }

    fn start_server(&self) -> Result<(), ContainerError> {
        if let Some(server) = lock(&self.server).as_ref() {
            server.start().map_err(ContainerError::Server)?;
            tracing::info!(container = %self.id, port = ?server.port(), "Server started");
        }
        Ok(())
    }

    fn stop_server(&self) -> Result<(), ContainerError> {
        let server = lock(&self.server).take();
        if let Some(server) = server {
            server.stop().map_err(ContainerError::Server)?;
            tracing::info!(container = %self.id, "Server stopped");
        }
        Ok(())
    }

    /// Port of the running server, if any.
    pub fn server_port(&self) -> Option<u16> {
        lock(&self.server).as_ref().and_then(|server| server.port())
    }

    fn destroy_singletons(&self) {
        let names = std::mem::take(&mut *lock(&self.creation_order));
        for name in names.iter().rev() {
            let Some((_, instance)) = self.singletons.remove(name) else {
                continue;
            };
            if let Some(definition) = self.definitions.get(name) {
                definition.destroy(&instance);
            }
        }
        self.singletons.clear();
    }

    /// Close the container. Calling it again does nothing.
    ///
    /// Every step runs even if an earlier one fails; the first error is
    /// returned.
    pub fn close(&self) -> Result<(), ContainerError> {
        let previous = self.state.swap(CLOSED, Ordering::SeqCst);
        if previous == CLOSED {
            return Ok(());
        }
        tracing::debug!(container = %self.id, "Closing container");

        let mut result = Ok(());
        if previous == ACTIVE {
            if let Err(err) = self.publish_event(&mut AppEvent::ContextClosed { container: self }) {
                result = Err(ContainerError::Listener(err));
            }
        }
        if let Err(err) = self.stop_server() {
            if result.is_ok() {
                result = Err(err);
            }
        }
        self.destroy_singletons();
        result
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state.load(Ordering::SeqCst))
            .field("definitions", &self.definitions.names())
            .finish_non_exhaustive()
    }
}
