//! Failure handling and exit codes.
//!
//! # Data Flow
//! ```text
//! run path:    BootError → handle_run_failure (resolver.rs) → RunFailed
//! exit helper: exit(container, generators) (exit.rs) → i32
//! both:        codes pooled by ExitCodeGenerators (exit_code.rs)
//! ```
//!
//! # Design Decisions
//! - Cleanup never replaces the original failure; secondary errors are logged
//! - Aggregation: largest positive code, else smallest code, else 0

pub mod exit;
pub mod exit_code;
pub mod handler;
pub mod reporter;
pub mod resolver;

pub use exit::exit;
pub use exit_code::{
    aggregate, exit_code_from_chain, ExitCodeError, ExitCodeExceptionMapper, ExitCodeGenerator,
    ExitCodeGenerators,
};
pub use handler::FailureHandler;
pub use reporter::FailureReporter;
pub use resolver::{handle_run_failure, report_failure, FailureScope};
