//! Typed registry usable before the main container exists.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::container::Container;
use crate::error::BoxError;

/// Errors raised by the bootstrap registry.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The registry has been closed.
    #[error("bootstrap registry is no longer available")]
    Closed,

    /// Nothing is registered for the requested type.
    #[error("{type_name} has not been registered")]
    NotFound { type_name: &'static str },

    /// The registered supplier failed.
    #[error("failed to supply {type_name}")]
    Supplier {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },
}

/// How often a supplier is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Supplied once, then cached.
    #[default]
    Singleton,
    /// Supplied on every `get`.
    Prototype,
}

type ErasedInstance = Arc<dyn Any + Send + Sync>;
type ErasedSupplier = Arc<dyn Fn(&BootstrapRegistry) -> Result<ErasedInstance, BoxError> + Send + Sync>;
type CloseListener = Box<dyn FnOnce(&Container) + Send>;

/// Supplies an instance of `T` on demand.
pub struct InstanceSupplier<T> {
    scope: Scope,
    supply: Arc<dyn Fn(&BootstrapRegistry) -> Result<Arc<T>, BoxError> + Send + Sync>,
}

impl<T: Send + Sync + 'static> InstanceSupplier<T> {
    /// Supply an existing value.
    pub fn of(value: T) -> Self {
        let value = Arc::new(value);
        Self {
            scope: Scope::Singleton,
            supply: Arc::new(move |_| Ok(Arc::clone(&value))),
        }
    }

    /// Supply lazily; the closure may read other registered types.
    pub fn from_fn<F>(supply: F) -> Self
    where
        F: Fn(&BootstrapRegistry) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            scope: Scope::Singleton,
            supply: Arc::new(move |registry| supply(registry).map(Arc::new)),
        }
    }

    /// Change the supplier scope.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    fn erase(self) -> (Scope, ErasedSupplier) {
        let supply = self.supply;
        let erased: ErasedSupplier =
            Arc::new(move |registry| supply(registry).map(|instance| instance as ErasedInstance));
        (self.scope, erased)
    }
}

struct Entry {
    type_name: &'static str,
    scope: Scope,
    supply: ErasedSupplier,
}

#[derive(Default)]
struct State {
    closed: bool,
    entries: HashMap<TypeId, Entry>,
    instances: HashMap<TypeId, ErasedInstance>,
    close_listeners: Vec<CloseListener>,
}

/// Transient key/value store with a close transition.
#[derive(Default)]
pub struct BootstrapRegistry {
    state: Mutex<State>,
}

/// Extension that stages state in the bootstrap registry.
pub trait Bootstrapper: Send + Sync {
    /// Populate the registry at the start of a run.
    fn initialize(&self, registry: &BootstrapRegistry) -> Result<(), BoxError>;
}

impl BootstrapRegistry {
    /// Create an empty, open registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open(&self) -> Result<MutexGuard<'_, State>, BootstrapError> {
        let state = self.lock();
        if state.closed {
            return Err(BootstrapError::Closed);
        }
        Ok(state)
    }

    /// Register a supplier, replacing any existing one for `T`.
    pub fn register<T: Send + Sync + 'static>(
        &self,
        supplier: InstanceSupplier<T>,
    ) -> Result<(), BootstrapError> {
        let mut state = self.open()?;
        let (scope, supply) = supplier.erase();
        let key = TypeId::of::<T>();
        state.instances.remove(&key);
        state.entries.insert(
            key,
            Entry {
                type_name: type_name::<T>(),
                scope,
                supply,
            },
        );
        Ok(())
    }

    /// Register a supplier unless one already exists for `T`.
    pub fn register_if_absent<T: Send + Sync + 'static>(
        &self,
        supplier: InstanceSupplier<T>,
    ) -> Result<(), BootstrapError> {
        if self.is_registered::<T>()? {
            return Ok(());
        }
        self.register(supplier)
    }

    /// Whether a supplier exists for `T`.
    pub fn is_registered<T: 'static>(&self) -> Result<bool, BootstrapError> {
        Ok(self.open()?.entries.contains_key(&TypeId::of::<T>()))
    }

    /// Obtain the instance registered for `T`.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, BootstrapError> {
        let key = TypeId::of::<T>();
        let (scope, supply) = {
            let state = self.open()?;
            if let Some(instance) = state.instances.get(&key) {
                return Ok(downcast::<T>(Arc::clone(instance)));
            }
            let entry = state.entries.get(&key).ok_or(BootstrapError::NotFound {
                type_name: type_name::<T>(),
            })?;
            (entry.scope, Arc::clone(&entry.supply))
        };

        // Lock released: suppliers may read other registered types.
        let instance = supply(self).map_err(|source| BootstrapError::Supplier {
            type_name: type_name::<T>(),
            source,
        })?;

        if scope == Scope::Singleton {
            let mut state = self.open()?;
            let cached = state.instances.entry(key).or_insert(instance);
            return Ok(downcast::<T>(Arc::clone(cached)));
        }
        Ok(downcast::<T>(instance))
    }

    /// Obtain the instance for `T`, or `other` when nothing is registered.
    pub fn get_or_else<T: Send + Sync + 'static>(&self, other: T) -> Result<Arc<T>, BootstrapError> {
        match self.get::<T>() {
            Err(BootstrapError::NotFound { .. }) => Ok(Arc::new(other)),
            result => result,
        }
    }

    /// Be told about the final container when the registry closes.
    pub fn add_close_listener<F>(&self, listener: F) -> Result<(), BootstrapError>
    where
        F: FnOnce(&Container) + Send + 'static,
    {
        self.open()?.close_listeners.push(Box::new(listener));
        Ok(())
    }

    /// Whether `close` has run.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Hand the final container to every close listener, then close.
    pub fn close(&self, container: &Container) -> Result<(), BootstrapError> {
        let listeners = {
            let mut state = self.open()?;
            state.closed = true;
            state.instances.clear();
            std::mem::take(&mut state.close_listeners)
        };

        tracing::debug!(listeners = listeners.len(), "Closing bootstrap registry");
        for listener in listeners {
            listener(container);
        }
        Ok(())
    }
}

fn downcast<T: Send + Sync + 'static>(instance: ErasedInstance) -> Arc<T> {
    match instance.downcast::<T>() {
        Ok(typed) => typed,
        // Entries are keyed by TypeId::of::<T>(), so the stored instance is a T.
        Err(_) => unreachable!("bootstrap entry stored under the wrong type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Token(String);

    #[test]
    fn test_register_and_get() {
        let registry = BootstrapRegistry::new();
        registry.register(InstanceSupplier::of(Token("abc".into()))).unwrap();

        assert!(registry.is_registered::<Token>().unwrap());
        assert_eq!(*registry.get::<Token>().unwrap(), Token("abc".into()));
    }

    #[test]
    fn test_get_missing_fails() {
        let registry = BootstrapRegistry::new();
        let err = registry.get::<Token>().err().unwrap();
        assert!(matches!(err, BootstrapError::NotFound { .. }));
        assert_eq!(*registry.get_or_else(Token("fallback".into())).unwrap(), Token("fallback".into()));
    }

    #[test]
    fn test_singleton_supplied_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry = BootstrapRegistry::new();
        registry
            .register(InstanceSupplier::from_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Token("lazy".into()))
            }))
            .unwrap();

        let first = registry.get::<Token>().unwrap();
        let second = registry.get::<Token>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prototype_supplied_each_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry = BootstrapRegistry::new();
        registry
            .register(
                InstanceSupplier::from_fn(move |_| {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Token(n.to_string()))
                })
                .with_scope(Scope::Prototype),
            )
            .unwrap();

        assert_eq!(*registry.get::<Token>().unwrap(), Token("0".into()));
        assert_eq!(*registry.get::<Token>().unwrap(), Token("1".into()));
    }

    #[test]
    fn test_supplier_can_read_registry() {
        let registry = BootstrapRegistry::new();
        registry.register(InstanceSupplier::of(41u32)).unwrap();
        registry
            .register(InstanceSupplier::from_fn(|r| {
                let base = r.get::<u32>()?;
                Ok(Token(format!("{}", *base + 1)))
            }))
            .unwrap();

        assert_eq!(*registry.get::<Token>().unwrap(), Token("42".into()));
    }

    #[test]
    fn test_register_if_absent_keeps_existing() {
        let registry = BootstrapRegistry::new();
        registry.register(InstanceSupplier::of(Token("first".into()))).unwrap();
        registry
            .register_if_absent(InstanceSupplier::of(Token("second".into())))
            .unwrap();
        assert_eq!(*registry.get::<Token>().unwrap(), Token("first".into()));
    }

    #[test]
    fn test_close_notifies_listeners_once() {
        let registry = BootstrapRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry
            .add_close_listener(move |container| {
                sink.lock().unwrap().push(container.id().to_string());
            })
            .unwrap();

        let container = Container::new(ContainerKind::Plain);
        registry.close(&container).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![container.id().to_string()]);
        assert!(registry.is_closed());
    }

    #[test]
    fn test_closed_registry_rejects_everything() {
        let registry = BootstrapRegistry::new();
        registry.register(InstanceSupplier::of(Token("x".into()))).unwrap();
        let container = Container::new(ContainerKind::Plain);
        registry.close(&container).unwrap();

        assert!(matches!(registry.get::<Token>(), Err(BootstrapError::Closed)));
        assert!(matches!(
            registry.register(InstanceSupplier::of(1u8)),
            Err(BootstrapError::Closed)
        ));
        let second = registry.close(&container).unwrap_err();
        assert_eq!(second.to_string(), "bootstrap registry is no longer available");
    }
}
