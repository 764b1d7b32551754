//! Component definitions.
//!
//! A definition describes how to build one named component. Besides its
//! concrete type, a component can be looked up through any "facet" (trait
//! object type) it declares with [`DefinitionBuilder::provides`]; the cast is
//! captured at definition time so lookups never need reflection.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::context::Container;
use crate::error::BoxError;
use crate::extension::LOWEST_PRECEDENCE;

/// A created component, type-erased.
pub type ErasedInstance = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn(&Container) -> Result<ErasedInstance, BoxError> + Send + Sync>;
type Destroy = Arc<dyn Fn(&ErasedInstance) + Send + Sync>;

/// Turns the erased instance into `Arc<F>`; stored boxed under `TypeId::of::<F>()`.
pub(crate) type FacetCast<F> = Arc<dyn Fn(ErasedInstance) -> Option<Arc<F>> + Send + Sync>;

/// How to create one named component.
pub struct ComponentDefinition {
    name: String,
    type_name: &'static str,
    order: i32,
    lazy: bool,
    factory: Factory,
    destroy: Option<Destroy>,
    facets: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ComponentDefinition {
    /// Start a definition for a component of type `T`.
    pub fn builder<T, F>(name: impl Into<String>, factory: F) -> DefinitionBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(move |container| factory(container).map(|value| Arc::new(value) as ErasedInstance));
        DefinitionBuilder {
            definition: ComponentDefinition {
                name: name.into(),
                type_name: type_name::<T>(),
                order: LOWEST_PRECEDENCE,
                lazy: false,
                factory,
                destroy: None,
                facets: HashMap::new(),
            },
            _type: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// Whether the component can be looked up as `F`.
    pub fn provides<F: ?Sized + 'static>(&self) -> bool {
        self.facets.contains_key(&TypeId::of::<F>())
    }

    pub(crate) fn create(&self, container: &Container) -> Result<ErasedInstance, BoxError> {
        (self.factory)(container)
    }

    pub(crate) fn destroy(&self, instance: &ErasedInstance) {
        if let Some(destroy) = &self.destroy {
            destroy(instance);
        }
    }

    pub(crate) fn cast<F: ?Sized + 'static>(&self, instance: ErasedInstance) -> Option<Arc<F>> {
        let cast = self
            .facets
            .get(&TypeId::of::<F>())?
            .downcast_ref::<FacetCast<F>>()?;
        cast(instance)
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("order", &self.order)
            .field("lazy", &self.lazy)
            .field("facets", &self.facets.len())
            .finish()
    }
}

/// Typed builder for [`ComponentDefinition`].
pub struct DefinitionBuilder<T> {
    definition: ComponentDefinition,
    _type: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> DefinitionBuilder<T> {
    /// Position among components of the same facet; lower runs first.
    pub fn order(mut self, order: i32) -> Self {
        self.definition.order = order;
        self
    }

    /// Create on first lookup instead of at refresh.
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.definition.lazy = lazy;
        self
    }

    /// Expose the component as `F`.
    pub fn provides<F, C>(mut self, cast: C) -> Self
    where
        F: ?Sized + Send + Sync + 'static,
        C: Fn(Arc<T>) -> Arc<F> + Send + Sync + 'static,
    {
        let erased: FacetCast<F> = Arc::new(move |instance: ErasedInstance| {
            instance.downcast::<T>().ok().map(|typed| cast(typed))
        });
        self.definition
            .facets
            .insert(TypeId::of::<F>(), Box::new(erased));
        self
    }

    /// Called with the instance when the container closes.
    pub fn on_close<D>(mut self, destroy: D) -> Self
    where
        D: Fn(&T) + Send + Sync + 'static,
    {
        self.definition.destroy = Some(Arc::new(move |instance: &ErasedInstance| {
            if let Some(typed) = instance.downcast_ref::<T>() {
                destroy(typed);
            }
        }));
        self
    }

    pub fn build(self) -> ComponentDefinition {
        self.definition
    }
}
