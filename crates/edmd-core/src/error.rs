//! Core error type.
//!
//! Higher crates define their own enums and wrap `CoreError` with `#[from]`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown {what} strategy {name:?} (expected one of: {expected})")]
    UnknownStrategy {
        what:     &'static str,
        name:     String,
        expected: &'static str,
    },
}

/// Shorthand result type for `edmd-core`.
pub type CoreResult<T> = Result<T, CoreError>;
