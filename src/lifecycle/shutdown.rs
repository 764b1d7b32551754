//! Process shutdown hook.
//!
//! # Responsibilities
//! - Track containers that should be closed when the process is told to stop
//! - Wait for SIGINT/SIGTERM on a dedicated thread
//! - Close every still-active container, then exit
//!
//! # Design Decisions
//! - Containers are held weakly; a dropped container simply disappears
//! - Installation is best-effort: if the thread or the signal handlers cannot
//!   be set up, the run continues without a hook

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use std::thread;

use crate::container::Container;

/// Exit code after SIGINT (128 + 2).
pub const SIGINT_EXIT_CODE: i32 = 130;
/// Exit code after SIGTERM (128 + 15).
pub const SIGTERM_EXIT_CODE: i32 = 143;

/// Closes registered containers on process shutdown.
#[derive(Default)]
pub struct ShutdownHook {
    containers: Mutex<Vec<Weak<Container>>>,
    installed: AtomicBool,
}

static HOOK: OnceLock<ShutdownHook> = OnceLock::new();

/// The process-wide hook.
pub fn shutdown_hook() -> &'static ShutdownHook {
    HOOK.get_or_init(ShutdownHook::default)
}

impl ShutdownHook {
    pub fn new() -> Self {
        Self::default()
    }

    fn containers(&self) -> MutexGuard<'_, Vec<Weak<Container>>> {
        self.containers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Close `container` when the process shuts down.
    pub fn register(&self, container: &Arc<Container>) {
        let mut containers = self.containers();
        containers.retain(|weak| weak.strong_count() > 0);
        containers.push(Arc::downgrade(container));
    }

    /// Stop tracking `container`.
    pub fn deregister(&self, container: &Container) {
        let id = container.id();
        self.containers()
            .retain(|weak| weak.upgrade().is_some_and(|c| c.id() != id));
    }

    /// Number of live containers being tracked.
    pub fn registered(&self) -> usize {
        self.containers().iter().filter(|weak| weak.strong_count() > 0).count()
    }

    /// Close every tracked container that is still open.
    ///
    /// Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let containers: Vec<_> = std::mem::take(&mut *self.containers())
            .into_iter()
            .filter_map(|weak| weak.upgrade())
            .collect();

        let mut closed = 0;
        for container in containers.iter().rev() {
            if container.is_closed() {
                continue;
            }
            if let Err(err) = container.close() {
                tracing::warn!(container = %container.id(), error = %err, "Error closing container on shutdown");
            }
            closed += 1;
        }
        closed
    }

    /// Start the signal thread once. Later calls do nothing.
    pub fn install(&'static self) {
        if self.installed.swap(true, Ordering::SeqCst) {
            return;
        }
        let spawned = thread::Builder::new()
            .name("liftoff-shutdown".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        tracing::debug!(error = %err, "Shutdown hook runtime unavailable");
                        return;
                    }
                };
                let code = runtime.block_on(wait_for_signal());
                tracing::info!(exit_code = code, "Shutdown signal received, closing containers");
                self.close_all();
                std::process::exit(code);
            });

        if let Err(err) = spawned {
            self.installed.store(false, Ordering::SeqCst);
            tracing::debug!(error = %err, "Unable to install shutdown hook");
        }
    }
}

async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> i32 {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => tokio::select! {
            _ = interrupted() => SIGINT_EXIT_CODE,
            _ = terminate.recv() => SIGTERM_EXIT_CODE,
        },
        Err(err) => {
            tracing::debug!(error = %err, "SIGTERM handler unavailable");
            interrupted().await;
            SIGINT_EXIT_CODE
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> i32 {
    interrupted().await;
    SIGINT_EXIT_CODE
}
