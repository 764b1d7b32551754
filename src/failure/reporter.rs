//! Failure reporters.

use crate::error::{BoxError, BootError};

/// Offered every run failure before it is logged.
///
/// Return `Ok(true)` when the failure was reported; later reporters are then
/// skipped and the default error log line is not written.
pub trait FailureReporter: Send + Sync {
    fn report(&self, error: &BootError) -> Result<bool, BoxError>;
}
