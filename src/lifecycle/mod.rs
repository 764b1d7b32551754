//! Run lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! Application::run
//!     → RunListeners (listeners.rs)
//!         starting → environmentPrepared → contextPrepared → contextLoaded
//!         → started → running            (or failed, from any phase)
//!     → EventPublishingRunListener (publishing.rs)
//!         phase → AppEvent → AppListener list / container listeners
//!     → call_runners (runners.rs) between started and running
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → close registered containers → exit
//! ```
//!
//! # Design Decisions
//! - Phases never run in parallel and never skip ahead
//! - A listener error during a forward phase fails the run
//! - `failed` is terminal and tolerant of listener errors

pub mod events;
pub mod listeners;
pub mod publishing;
pub mod runners;
pub mod shutdown;

pub use events::{listener_fn, multicast, AppEvent, AppListener};
pub use listeners::{Phase, RunListener, RunListeners};
pub use publishing::EventPublishingRunListener;
pub use runners::{call_runners, ApplicationRunner, CommandLineRunner, RunnerKind};
pub use shutdown::{shutdown_hook, ShutdownHook};
