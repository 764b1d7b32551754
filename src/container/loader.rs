//! Turning declared sources into component definitions.
//!
//! # Source Forms
//! ```text
//! demo.Greeter             exact catalog id
//! demo.jobs.*              every catalog id under the prefix
//! file:conf/sources.toml   resource listing further sources: sources = [...]
//! ```
//!
//! Resource locations may contain `${...}` placeholders, resolved against the
//! environment before loading.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use crate::container::definition::ComponentDefinition;
use crate::container::registry::DefinitionRegistry;
use crate::container::ContainerError;
use crate::env::Environment;
use crate::error::BoxError;

/// Everything a loader is given besides the registry.
pub struct LoadRequest<'a> {
    pub sources: &'a [String],
    pub name_generator: Option<Arc<dyn NameGenerator>>,
    pub resource_loader: Option<Arc<dyn ResourceLoader>>,
    pub environment: Option<Arc<Environment>>,
}

/// Registers the definitions contributed by a set of sources.
pub trait DefinitionLoader: Send + Sync {
    /// Returns the number of definitions registered.
    fn load(&self, registry: &DefinitionRegistry, request: &LoadRequest<'_>) -> Result<usize, ContainerError>;
}

/// Derives component names from source ids.
pub trait NameGenerator: Send + Sync {
    fn generate(&self, source_id: &str) -> String;
}

/// `demo.jobs.GreetingRunner` becomes `greetingRunner`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNameGenerator;

impl NameGenerator for DefaultNameGenerator {
    fn generate(&self, source_id: &str) -> String {
        let short = source_id
            .rsplit(|c: char| c == '.' || c == ':' || c == '/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(source_id);
        decapitalize(short)
    }
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) if first.is_uppercase() && second.is_uppercase() => name.to_string(),
        (Some(first), _) => first.to_lowercase().chain(name.chars().skip(1)).collect(),
        (None, _) => String::new(),
    }
}

/// Reads resource content by location.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, location: &str) -> Result<String, BoxError>;
}

/// Loads `file:` locations and plain paths from the filesystem.
#[derive(Debug, Default, Clone)]
pub struct FileResourceLoader {
    base: Option<PathBuf>,
}

impl FileResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `base`.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    fn path_for(&self, location: &str) -> Result<PathBuf, BoxError> {
        let path = if location.starts_with("file://") {
            let url = Url::parse(location)?;
            url.to_file_path()
                .map_err(|_| format!("'{location}' is not a local file URL"))?
        } else if let Some(rest) = location.strip_prefix("file:") {
            PathBuf::from(rest)
        } else if let Ok(url) = Url::parse(location) {
            return Err(format!("unsupported resource scheme '{}'", url.scheme()).into());
        } else {
            PathBuf::from(location)
        };
        Ok(match &self.base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        })
    }
}

impl ResourceLoader for FileResourceLoader {
    fn load(&self, location: &str) -> Result<String, BoxError> {
        let path = self.path_for(location)?;
        Ok(fs::read_to_string(path)?)
    }
}

/// What a catalog entry sees when it contributes definitions.
pub struct SourceContext<'a> {
    pub id: &'a str,
    /// Name produced by the active name generator for `id`.
    pub default_name: String,
    pub environment: Option<&'a Environment>,
}

type Contribution = Arc<dyn Fn(&SourceContext<'_>) -> Vec<ComponentDefinition> + Send + Sync>;

#[derive(Deserialize)]
struct SourceList {
    #[serde(default)]
    sources: Vec<String>,
}

/// Catalog of known source ids; the default [`DefinitionLoader`].
#[derive(Clone, Default)]
pub struct SourceCatalog {
    entries: Vec<(String, Contribution)>,
}

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a source and the definitions it contributes.
    pub fn source<F>(mut self, id: impl Into<String>, contribute: F) -> Self
    where
        F: Fn(&SourceContext<'_>) -> Vec<ComponentDefinition> + Send + Sync + 'static,
    {
        self.add_source(id, contribute);
        self
    }

    pub fn add_source<F>(&mut self, id: impl Into<String>, contribute: F) -> &mut Self
    where
        F: Fn(&SourceContext<'_>) -> Vec<ComponentDefinition> + Send + Sync + 'static,
    {
        let id = id.into();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.push((id, Arc::new(contribute)));
        self
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|(id, _)| id.as_str()).collect()
    }

    fn contribute(
        &self,
        id: &str,
        contribution: &Contribution,
        registry: &DefinitionRegistry,
        request: &LoadRequest<'_>,
    ) -> Result<usize, ContainerError> {
        let default_name = match &request.name_generator {
            Some(generator) => generator.generate(id),
            None => DefaultNameGenerator.generate(id),
        };
        let context = SourceContext {
            id,
            default_name,
            environment: request.environment.as_deref(),
        };
        let definitions = contribution(&context);
        let count = definitions.len();
        for definition in definitions {
            registry.register(definition)?;
        }
        tracing::trace!(source = %id, definitions = count, "Loaded source");
        Ok(count)
    }

    fn resolve(
        &self,
        source: &str,
        registry: &DefinitionRegistry,
        request: &LoadRequest<'_>,
        visited: &mut HashSet<String>,
    ) -> Result<usize, ContainerError> {
        if let Some((id, contribution)) = self.entries.iter().find(|(id, _)| id == source) {
            return self.contribute(id, contribution, registry, request);
        }

        if let Some(prefix) = source.strip_suffix('*') {
            let matching: Vec<_> = self
                .entries
                .iter()
                .filter(|(id, _)| id.starts_with(prefix))
                .collect();
            if matching.is_empty() {
                return Err(ContainerError::InvalidSource(source.to_string()));
            }
            let mut count = 0;
            for (id, contribution) in matching {
                count += self.contribute(id, contribution, registry, request)?;
            }
            return Ok(count);
        }

        if is_resource(source) {
            return self.load_resource(source, registry, request, visited);
        }

        Err(ContainerError::InvalidSource(source.to_string()))
    }

    fn load_resource(
        &self,
        source: &str,
        registry: &DefinitionRegistry,
        request: &LoadRequest<'_>,
        visited: &mut HashSet<String>,
    ) -> Result<usize, ContainerError> {
        let location = match &request.environment {
            Some(environment) => environment.resolve_placeholders(source)?,
            None => source.to_string(),
        };
        if !visited.insert(location.clone()) {
            return Ok(0);
        }

        let content = match &request.resource_loader {
            Some(loader) => loader.load(&location),
            None => FileResourceLoader::new().load(&location),
        }
        .map_err(|source| ContainerError::Resource {
            location: location.clone(),
            source,
        })?;
        let listed: SourceList = toml::from_str(&content).map_err(|err| ContainerError::Resource {
            location: location.clone(),
            source: Box::new(err),
        })?;

        let mut count = 0;
        for nested in &listed.sources {
            count += self.resolve(nested, registry, request, visited)?;
        }
        Ok(count)
    }
}

fn is_resource(source: &str) -> bool {
    source.starts_with("file:") || source.ends_with(".toml") || Url::parse(source).is_ok()
}

impl DefinitionLoader for SourceCatalog {
    fn load(&self, registry: &DefinitionRegistry, request: &LoadRequest<'_>) -> Result<usize, ContainerError> {
        let mut visited = HashSet::new();
        let mut count = 0;
        for source in request.sources {
            count += self.resolve(source, registry, request, &mut visited)?;
        }
        tracing::debug!(sources = request.sources.len(), definitions = count, "Loaded component definitions");
        Ok(count)
    }
}

impl fmt::Debug for SourceCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceCatalog").field("ids", &self.ids()).finish()
    }
}
