//! Definition registry.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::container::definition::ComponentDefinition;
use crate::container::ContainerError;

#[derive(Default)]
struct State {
    definitions: Vec<Arc<ComponentDefinition>>,
    allow_overriding: bool,
}

/// Named definitions in registration order.
#[derive(Default)]
pub struct DefinitionRegistry {
    state: Mutex<State>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Allow a later definition to replace an earlier one of the same name.
    pub fn set_allow_overriding(&self, allow: bool) {
        self.lock().allow_overriding = allow;
    }

    pub fn allow_overriding(&self) -> bool {
        self.lock().allow_overriding
    }

    /// Add a definition.
    ///
    /// A replaced definition keeps the position of the one it replaces.
    pub fn register(&self, definition: ComponentDefinition) -> Result<(), ContainerError> {
        let mut state = self.lock();
        let name = definition.name().to_string();
        match state.definitions.iter().position(|d| d.name() == name) {
            Some(index) if state.allow_overriding => {
                tracing::debug!(
                    name = %name,
                    previous = state.definitions[index].type_name(),
                    replacement = definition.type_name(),
                    "Overriding component definition"
                );
                state.definitions[index] = Arc::new(definition);
                Ok(())
            }
            Some(_) => Err(ContainerError::DefinitionOverride { name }),
            None => {
                state.definitions.push(Arc::new(definition));
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.lock()
            .definitions
            .iter()
            .find(|d| d.name() == name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        let mut state = self.lock();
        let index = state.definitions.iter().position(|d| d.name() == name)?;
        Some(state.definitions.remove(index))
    }

    /// Snapshot of every definition in registration order.
    pub fn definitions(&self) -> Vec<Arc<ComponentDefinition>> {
        self.lock().definitions.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock()
            .definitions
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(name: &str, value: u32) -> ComponentDefinition {
        ComponentDefinition::builder(name, move |_| Ok(value)).build()
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let registry = DefinitionRegistry::new();
        registry.register(definition("a", 1)).unwrap();

        let err = registry.register(definition("a", 2)).unwrap_err();
        assert!(matches!(err, ContainerError::DefinitionOverride { ref name } if name == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_overriding_keeps_position() {
        let registry = DefinitionRegistry::new();
        registry.set_allow_overriding(true);
        registry.register(definition("a", 1)).unwrap();
        registry.register(definition("b", 1)).unwrap();
        registry
            .register(ComponentDefinition::builder("a", |_| Ok("text")).build())
            .unwrap();

        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().type_name(), "&str");
    }

    #[test]
    fn test_remove() {
        let registry = DefinitionRegistry::new();
        registry.register(definition("a", 1)).unwrap();
        assert!(registry.remove("a").is_some());
        assert!(registry.is_empty());
        assert!(registry.remove("a").is_none());
    }
}
