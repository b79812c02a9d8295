//! Core error type and the client-facing error classification.
//!
//! Sub-crates define their own error enums and expose a [`Fault`] via a
//! `fault()` method, so the (out-of-scope) front end can map any engine
//! error to a transport status without matching crate-specific variants.

use thiserror::Error;

/// Client-facing classification of an engine error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Fault {
    /// Referenced relation does not exist.
    NotFound,
    /// Input relation unsupported, empty, or inconsistent.
    BadInput,
    /// Route calculation exceeded its wall-clock budget.
    Timeout,
    /// Upstream element mutated between fetch and write.
    Conflict,
    /// External service failure after retries.
    Upstream,
    /// Engine invariant violation.
    Internal,
}

impl Fault {
    /// The HTTP-equivalent status code for this fault.
    pub fn http_status(self) -> u16 {
        match self {
            Fault::NotFound => 404,
            Fault::BadInput => 400,
            Fault::Timeout => 408,
            Fault::Conflict => 409,
            Fault::Upstream => 502,
            Fault::Internal => 500,
        }
    }
}

/// Errors produced by `rf-core` itself.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl CoreError {
    pub fn fault(&self) -> Fault {
        match self {
            CoreError::Config(_) => Fault::Internal,
            CoreError::Parse(_) => Fault::BadInput,
        }
    }
}

/// Shorthand result type for `rf-core`.
pub type CoreResult<T> = Result<T, CoreError>;
