//! Deployment type and its deduction from available markers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// What kind of application a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentType {
    /// No embedded server.
    #[default]
    None,
    /// Blocking embedded server.
    Server,
    /// Reactive embedded server.
    ReactiveServer,
}

/// Markers that must all be present for a `Server` deployment.
pub const SERVER_MARKERS: &[&str] = &["server.runtime", "server.container"];

/// Dispatcher marker of the blocking server stack.
pub const SERVER_DISPATCHER_MARKER: &str = "server.dispatcher";

/// Dispatcher marker of the reactive server stack.
pub const REACTIVE_DISPATCHER_MARKER: &str = "reactive.dispatcher";

/// The set of capability markers available to this build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classpath {
    markers: BTreeSet<String>,
}

impl Classpath {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    /// Markers enabled by this crate's cargo features.
    pub fn current() -> Self {
        let mut markers: Vec<&str> = Vec::new();
        if cfg!(feature = "server") {
            markers.extend_from_slice(SERVER_MARKERS);
            markers.push(SERVER_DISPATCHER_MARKER);
        }
        if cfg!(feature = "reactive-server") {
            markers.push(REACTIVE_DISPATCHER_MARKER);
        }
        Self::new(markers)
    }

    pub fn contains(&self, marker: &str) -> bool {
        self.markers.contains(marker)
    }

    /// Reactive wins only without the blocking dispatcher; `Server` needs
    /// every server marker.
    pub fn deduce(&self) -> DeploymentType {
        if self.contains(REACTIVE_DISPATCHER_MARKER) && !self.contains(SERVER_DISPATCHER_MARKER) {
            return DeploymentType::ReactiveServer;
        }
        if SERVER_MARKERS.iter().all(|marker| self.contains(marker)) {
            return DeploymentType::Server;
        }
        DeploymentType::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_classpath_is_none() {
        assert_eq!(Classpath::default().deduce(), DeploymentType::None);
    }

    #[test]
    fn test_all_server_markers_required() {
        assert_eq!(Classpath::new(["server.runtime"]).deduce(), DeploymentType::None);
        assert_eq!(Classpath::new(SERVER_MARKERS.iter().copied()).deduce(), DeploymentType::Server);
    }

    #[test]
    fn test_reactive_only_without_blocking_dispatcher() {
        assert_eq!(
            Classpath::new([REACTIVE_DISPATCHER_MARKER]).deduce(),
            DeploymentType::ReactiveServer
        );

        let both = Classpath::new(
            SERVER_MARKERS
                .iter()
                .copied()
                .chain([SERVER_DISPATCHER_MARKER, REACTIVE_DISPATCHER_MARKER]),
        );
        assert_eq!(both.deduce(), DeploymentType::Server);
    }
}
