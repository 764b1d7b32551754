//! Conversion between environment variants.

use crate::env::environment::{Environment, EnvironmentKind};
use crate::env::property_source::PropertySource;
use crate::env::sources::PropertySources;

/// Convert `environment` to `kind`.
///
/// Variant-specific baseline sources of the old variant are dropped and the
/// target's own are kept; every other source, the profiles and the
/// conversion service carry over unchanged.
pub fn convert(environment: Environment, kind: EnvironmentKind) -> Environment {
    if environment.kind() == kind {
        return environment;
    }

    let mut sources = PropertySources::new();
    for name in kind.specific_sources() {
        let existing = environment.sources().get(name).cloned();
        sources.add_last(existing.unwrap_or_else(|| PropertySource::map(*name, Default::default())));
    }
    for source in environment.sources().iter() {
        if !EnvironmentKind::is_variant_specific(source.name()) {
            sources.add_last(source.clone());
        }
    }

    tracing::debug!(from = ?environment.kind(), to = ?kind, "Converting environment");
    environment.rebuild(kind, sources)
}
