//! Capability-keyed plugin registry.
//!
//! # Responsibilities
//! - Hold a catalog of named factories, each bound to one capability
//! - Track which implementers are declared for each capability
//! - Build ordered instance lists on demand
//!
//! # Design Decisions
//! - A factory's argument and instance types come from its `Capability`,
//!   so signatures are checked when the factory is registered
//! - The manifest only names implementers; a name the catalog does not know
//!   is reported as not found when instantiated, not when declared

use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::error::BoxError;
use crate::extension::manifest::{Manifest, ManifestError};
use crate::extension::ordered::sort_by_order;

/// A recognized extension point.
pub trait Capability: 'static {
    /// Manifest key for this capability.
    const KEY: &'static str;

    /// Constructor arguments handed to every factory.
    type Args: ?Sized + 'static;

    /// The instance type produced by factories.
    type Instance: ?Sized + Send + Sync + 'static;
}

type Factory<C> = Arc<
    dyn Fn(&<C as Capability>::Args) -> Result<Arc<<C as Capability>::Instance>, BoxError>
        + Send
        + Sync,
>;

struct CatalogEntry {
    capability: &'static str,
    order: i32,
    factory: Box<dyn Any + Send + Sync>,
}

/// Errors raised while discovering extensions.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The manifest names an implementer the catalog does not contain.
    #[error("Cannot instantiate {capability} : {name} (no such implementer)")]
    NotFound {
        capability: &'static str,
        name: String,
    },

    /// The implementer exists but belongs to another capability.
    #[error("Cannot instantiate {capability} : {name} (registered as {actual})")]
    NotAssignable {
        capability: &'static str,
        name: String,
        actual: &'static str,
    },

    /// The implementer's factory failed.
    #[error("Cannot instantiate {capability} : {name}")]
    Instantiation {
        capability: &'static str,
        name: String,
        #[source]
        source: BoxError,
    },
}

impl DiscoveryError {
    /// The implementer that caused the failure.
    pub fn implementer(&self) -> &str {
        match self {
            DiscoveryError::NotFound { name, .. }
            | DiscoveryError::NotAssignable { name, .. }
            | DiscoveryError::Instantiation { name, .. } => name,
        }
    }
}

/// Registry of extension factories keyed by capability.
#[derive(Default)]
pub struct ExtensionRegistry {
    catalog: HashMap<String, CatalogEntry>,
    manifest: Manifest,
}

impl ExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in extensions.
    ///
    /// Built-ins: the event-publishing run listener and the config-file
    /// listener.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::lifecycle::publishing::register_defaults(&mut registry);
        crate::config::file_listener::register_defaults(&mut registry);
        registry
    }

    /// Add a factory to the catalog and declare it for its capability.
    pub fn register<C, F>(&mut self, name: impl Into<String>, order: i32, factory: F) -> &mut Self
    where
        C: Capability,
        F: Fn(&C::Args) -> Result<Arc<C::Instance>, BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        self.define::<C, F>(name.clone(), order, factory);
        self.manifest.add(C::KEY, &name);
        self
    }

    /// Add a factory to the catalog without declaring it.
    ///
    /// The factory is only discovered once a manifest names it.
    pub fn define<C, F>(&mut self, name: impl Into<String>, order: i32, factory: F) -> &mut Self
    where
        C: Capability,
        F: Fn(&C::Args) -> Result<Arc<C::Instance>, BoxError> + Send + Sync + 'static,
    {
        let factory: Factory<C> = Arc::new(factory);
        self.catalog.insert(
            name.into(),
            CatalogEntry {
                capability: C::KEY,
                order,
                factory: Box::new(factory),
            },
        );
        self
    }

    /// Merge declarations from a manifest document.
    pub fn load_manifest(&mut self, content: &str) -> Result<&mut Self, ManifestError> {
        self.manifest.merge(Manifest::parse(content)?);
        Ok(self)
    }

    /// Merge declarations from a manifest file.
    pub fn load_manifest_file(&mut self, path: &Path) -> Result<&mut Self, ManifestError> {
        self.manifest.merge(Manifest::load(path)?);
        Ok(self)
    }

    /// Every implementer name declared for a capability, in discovery order.
    pub fn resolve_implementers(&self, capability: &str) -> Vec<String> {
        self.manifest.implementers(capability).to_vec()
    }

    /// Build every declared implementer of `C`, sorted by order.
    pub fn instantiate<C: Capability>(
        &self,
        args: &C::Args,
    ) -> Result<Vec<Arc<C::Instance>>, DiscoveryError> {
        let names = self.manifest.implementers(C::KEY);
        let mut instances = Vec::with_capacity(names.len());

        for name in names {
            let entry = self.catalog.get(name).ok_or_else(|| DiscoveryError::NotFound {
                capability: C::KEY,
                name: name.clone(),
            })?;

            let factory = entry
                .factory
                .downcast_ref::<Factory<C>>()
                .filter(|_| entry.capability == C::KEY)
                .ok_or_else(|| DiscoveryError::NotAssignable {
                    capability: C::KEY,
                    name: name.clone(),
                    actual: entry.capability,
                })?;

            let instance = factory(args).map_err(|source| DiscoveryError::Instantiation {
                capability: C::KEY,
                name: name.clone(),
                source,
            })?;

            tracing::trace!(capability = C::KEY, implementer = %name, "Extension instantiated");
            instances.push((entry.order, instance));
        }

        sort_by_order(&mut instances, |(order, _)| *order);
        Ok(instances.into_iter().map(|(_, instance)| instance).collect())
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.catalog.keys().collect();
        names.sort();
        f.debug_struct("ExtensionRegistry")
            .field("catalog", &names)
            .field("manifest", &self.manifest)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Fixed(&'static str);

    impl Greeter for Fixed {
        fn greet(&self) -> String {
            self.0.to_string()
        }
    }

    struct GreeterCapability;

    impl Capability for GreeterCapability {
        const KEY: &'static str = "greeter";
        type Args = str;
        type Instance = dyn Greeter;
    }

    struct OtherCapability;

    impl Capability for OtherCapability {
        const KEY: &'static str = "other";
        type Args = ();
        type Instance = dyn Greeter;
    }

    #[test]
    fn test_instances_sorted_by_order_then_discovery() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register::<GreeterCapability, _>("late", 10, |_: &str| Ok(Arc::new(Fixed("late"))))
            .register::<GreeterCapability, _>("first", 1, |_: &str| Ok(Arc::new(Fixed("first"))))
            .register::<GreeterCapability, _>("tie", 10, |_: &str| Ok(Arc::new(Fixed("tie"))));

        let greeters = registry.instantiate::<GreeterCapability>("hi").unwrap();
        let names: Vec<_> = greeters.iter().map(|g| g.greet()).collect();
        assert_eq!(names, vec!["first", "late", "tie"]);
    }

    #[test]
    fn test_factory_receives_args() {
        let mut registry = ExtensionRegistry::new();
        registry.register::<GreeterCapability, _>("echo", 0, |prefix: &str| {
            Ok(Arc::new(Fixed(if prefix == "x" { "got x" } else { "other" })))
        });

        let greeters = registry.instantiate::<GreeterCapability>("x").unwrap();
        assert_eq!(greeters[0].greet(), "got x");
    }

    #[test]
    fn test_unknown_manifest_name_is_not_found() {
        let mut registry = ExtensionRegistry::new();
        registry
            .load_manifest("[capabilities]\n\"greeter\" = [\"ghost\"]")
            .unwrap();

        let err = registry.instantiate::<GreeterCapability>("").err().unwrap();
        assert!(matches!(err, DiscoveryError::NotFound { .. }));
        assert_eq!(err.implementer(), "ghost");
    }

    #[test]
    fn test_wrong_capability_is_not_assignable() {
        let mut registry = ExtensionRegistry::new();
        registry.define::<OtherCapability, _>("impostor", 0, |_: &()| Ok(Arc::new(Fixed("x"))));
        registry
            .load_manifest("[capabilities]\n\"greeter\" = [\"impostor\"]")
            .unwrap();

        let err = registry.instantiate::<GreeterCapability>("").err().unwrap();
        assert!(matches!(
            err,
            DiscoveryError::NotAssignable { actual: "other", .. }
        ));
    }

    #[test]
    fn test_factory_failure_aborts_discovery() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register::<GreeterCapability, _>("ok", 0, |_: &str| Ok(Arc::new(Fixed("ok"))))
            .register::<GreeterCapability, _>("broken", 1, |_: &str| Err("constructor failed".into()));

        let err = registry.instantiate::<GreeterCapability>("").err().unwrap();
        assert_eq!(err.implementer(), "broken");
        assert_eq!(err.to_string(), "Cannot instantiate greeter : broken");
    }

    #[test]
    fn test_defined_factory_needs_manifest() {
        let mut registry = ExtensionRegistry::new();
        registry.define::<GreeterCapability, _>("hidden", 0, |_: &str| Ok(Arc::new(Fixed("hidden"))));
        assert!(registry.instantiate::<GreeterCapability>("").unwrap().is_empty());

        registry
            .load_manifest("[capabilities]\n\"greeter\" = [\"hidden\"]")
            .unwrap();
        assert_eq!(registry.resolve_implementers("greeter"), vec!["hidden"]);
        assert_eq!(registry.instantiate::<GreeterCapability>("").unwrap().len(), 1);
    }
}
