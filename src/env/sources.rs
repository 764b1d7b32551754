//! Ordered, mutable collection of property sources (highest priority first).

use crate::env::property_source::PropertySource;
use crate::env::EnvironmentError;

#[derive(Debug, Clone, Default)]
pub struct PropertySources {
    list: Vec<PropertySource>,
}

impl PropertySources {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.list.iter().position(|source| source.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&PropertySource> {
        self.position(name).map(|index| &self.list[index])
    }

    /// Add with highest priority, replacing any source of the same name.
    pub fn add_first(&mut self, source: PropertySource) {
        self.remove(source.name());
        self.list.insert(0, source);
    }

    /// Add with lowest priority, replacing any source of the same name.
    pub fn add_last(&mut self, source: PropertySource) {
        self.remove(source.name());
        self.list.push(source);
    }

    /// Add directly above `relative`.
    pub fn add_before(&mut self, relative: &str, source: PropertySource) -> Result<(), EnvironmentError> {
        if source.name() == relative {
            return Err(EnvironmentError::SelfRelative(relative.to_string()));
        }
        self.remove(source.name());
        let index = self
            .position(relative)
            .ok_or_else(|| EnvironmentError::MissingSource(relative.to_string()))?;
        self.list.insert(index, source);
        Ok(())
    }

    /// Add directly below `relative`.
    pub fn add_after(&mut self, relative: &str, source: PropertySource) -> Result<(), EnvironmentError> {
        if source.name() == relative {
            return Err(EnvironmentError::SelfRelative(relative.to_string()));
        }
        self.remove(source.name());
        let index = self
            .position(relative)
            .ok_or_else(|| EnvironmentError::MissingSource(relative.to_string()))?;
        self.list.insert(index + 1, source);
        Ok(())
    }

    /// Replace the source called `name`, keeping its position.
    pub fn replace(&mut self, name: &str, source: PropertySource) -> Result<(), EnvironmentError> {
        let index = self
            .position(name)
            .ok_or_else(|| EnvironmentError::MissingSource(name.to_string()))?;
        self.list[index] = source;
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertySource> {
        self.position(name).map(|index| self.list.remove(index))
    }

    /// Demote a source to the lowest priority. No-op if absent.
    pub fn move_to_end(&mut self, name: &str) {
        if let Some(source) = self.remove(name) {
            self.list.push(source);
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.list.iter().map(PropertySource::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertySource> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl IntoIterator for PropertySources {
    type Item = PropertySource;
    type IntoIter = std::vec::IntoIter<PropertySource>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn empty(name: &str) -> PropertySource {
        PropertySource::map(name, BTreeMap::new())
    }

    #[test]
    fn test_add_first_and_last() {
        let mut sources = PropertySources::new();
        sources.add_last(empty("b"));
        sources.add_first(empty("a"));
        sources.add_last(empty("c"));
        assert_eq!(sources.names(), vec!["a", "b", "c"]);

        sources.add_first(empty("c"));
        assert_eq!(sources.names(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_add_relative() {
        let mut sources = PropertySources::new();
        sources.add_last(empty("a"));
        sources.add_last(empty("z"));
        sources.add_before("z", empty("y")).unwrap();
        sources.add_after("a", empty("b")).unwrap();
        assert_eq!(sources.names(), vec!["a", "b", "y", "z"]);

        assert!(matches!(
            sources.add_before("missing", empty("q")),
            Err(EnvironmentError::MissingSource(_))
        ));
        assert!(sources.add_before("a", empty("a")).is_err());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut sources = PropertySources::new();
        sources.add_last(empty("a"));
        sources.add_last(empty("b"));
        sources.replace("a", empty("a2")).unwrap();
        assert_eq!(sources.names(), vec!["a2", "b"]);
        assert!(sources.replace("nope", empty("x")).is_err());
    }

    #[test]
    fn test_move_to_end() {
        let mut sources = PropertySources::new();
        sources.add_last(empty("a"));
        sources.add_last(empty("b"));
        sources.add_last(empty("c"));
        sources.move_to_end("a");
        sources.move_to_end("missing");
        assert_eq!(sources.names(), vec!["b", "c", "a"]);
    }
}
