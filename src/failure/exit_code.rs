//! Exit codes and their aggregation.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::error::BoxError;

/// Something that contributes a process exit code.
pub trait ExitCodeGenerator: Send + Sync {
    fn exit_code(&self) -> i32;
}

impl ExitCodeGenerator for i32 {
    fn exit_code(&self) -> i32 {
        *self
    }
}

/// Maps a run failure to an exit code; 0 means "no opinion".
pub trait ExitCodeExceptionMapper: Send + Sync {
    fn exit_code(&self, error: &(dyn StdError + 'static)) -> i32;
}

/// An error that carries its own exit code.
///
/// Return it (boxed) from a runner or listener and the failed run exits with
/// `code` unless a mapper already produced one.
#[derive(Debug, Error)]
#[error("exiting with code {code}")]
pub struct ExitCodeError {
    pub code: i32,
    #[source]
    pub source: BoxError,
}

impl ExitCodeError {
    pub fn new(code: i32, source: impl Into<BoxError>) -> Self {
        Self {
            code,
            source: source.into(),
        }
    }
}

impl ExitCodeGenerator for ExitCodeError {
    fn exit_code(&self) -> i32 {
        self.code
    }
}

/// Combine exit codes: the largest positive code wins, otherwise the
/// smallest code. No codes gives 0.
pub fn aggregate(codes: impl IntoIterator<Item = i32>) -> i32 {
    let mut max_positive: Option<i32> = None;
    let mut min = 0;
    for code in codes {
        if code > 0 {
            max_positive = Some(max_positive.map_or(code, |current| current.max(code)));
        }
        min = min.min(code);
    }
    max_positive.unwrap_or(min)
}

/// The exit code of the first `ExitCodeError` in `error`'s cause chain, or 0.
pub fn exit_code_from_chain(error: &(dyn StdError + 'static)) -> i32 {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(found) = err.downcast_ref::<ExitCodeError>() {
            return found.code;
        }
        current = err.source();
    }
    0
}

/// A pool of exit-code contributors.
#[derive(Default)]
pub struct ExitCodeGenerators {
    codes: Vec<i32>,
}

impl ExitCodeGenerators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, generator: &dyn ExitCodeGenerator) -> &mut Self {
        self.codes.push(generator.exit_code());
        self
    }

    pub fn add_all<'a, I>(&mut self, generators: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a Arc<dyn ExitCodeGenerator>>,
    {
        for generator in generators {
            self.add(generator.as_ref());
        }
        self
    }

    /// Add the code each mapper assigns to `error`.
    pub fn add_mapped<'a, I>(&mut self, error: &(dyn StdError + 'static), mappers: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a Arc<dyn ExitCodeExceptionMapper>>,
    {
        for mapper in mappers {
            self.codes.push(mapper.exit_code(error));
        }
        self
    }

    pub fn exit_code(&self) -> i32 {
        aggregate(self.codes.iter().copied())
    }
}
