//! Startup step recording.
//!
//! Every step feeds the `liftoff_startup_step_seconds` histogram. A buffering
//! recorder additionally keeps the finished steps so they can be inspected
//! after the run.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::observability::metrics;

/// A finished startup step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub tags: Vec<(String, String)>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

/// Collector for startup steps.
///
/// Cloning shares the buffer.
#[derive(Debug, Clone, Default)]
pub struct StartupRecorder {
    buffer: Option<Arc<Mutex<Vec<StepRecord>>>>,
}

impl StartupRecorder {
    /// A recorder that keeps finished steps in memory.
    pub fn buffering() -> Self {
        Self {
            buffer: Some(Arc::default()),
        }
    }

    pub fn start(&self, name: impl Into<String>) -> StartupStep {
        StartupStep {
            name: name.into(),
            tags: Vec::new(),
            started: Instant::now(),
            buffer: self.buffer.clone(),
        }
    }

    /// Finished steps, oldest first. Empty unless buffering.
    pub fn steps(&self) -> Vec<StepRecord> {
        match &self.buffer {
            Some(buffer) => buffer.lock().unwrap_or_else(|p| p.into_inner()).clone(),
            None => Vec::new(),
        }
    }
}

/// A step in progress; call [`StartupStep::end`] when it completes.
#[must_use = "a step is only recorded when ended"]
pub struct StartupStep {
    name: String,
    tags: Vec<(String, String)>,
    started: Instant,
    buffer: Option<Arc<Mutex<Vec<StepRecord>>>>,
}

impl StartupStep {
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn end(self) {
        let duration = self.started.elapsed();
        metrics::record_startup_step(&self.name, duration);
        tracing::trace!(step = %self.name, elapsed_ms = duration.as_millis() as u64, "Startup step finished");

        if let Some(buffer) = self.buffer {
            buffer
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(StepRecord {
                    name: self.name,
                    tags: self.tags,
                    duration,
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_recorder_keeps_nothing() {
        let recorder = StartupRecorder::default();
        recorder.start("liftoff.starting").end();
        assert!(recorder.steps().is_empty());
    }

    #[test]
    fn test_buffering_recorder_shares_steps_across_clones() {
        let recorder = StartupRecorder::buffering();
        let clone = recorder.clone();
        clone.start("one").tag("failed", "true").end();
        recorder.start("two").end();

        let steps = recorder.steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].name, "one");
        assert_eq!(steps[0].tags, vec![("failed".to_string(), "true".to_string())]);
        assert_eq!(steps[1].name, "two");
    }
}
