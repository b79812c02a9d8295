//! Stop-subsystem error type.

use thiserror::Error;

use rf_core::Fault;

/// Errors produced by `rf-stops`.
#[derive(Debug, Error)]
pub enum StopError {
    #[error("cannot order stops without any segments")]
    NoSegments,
}

impl StopError {
    pub fn fault(&self) -> Fault {
        match self {
            StopError::NoSegments => Fault::BadInput,
        }
    }
}

pub type StopResult<T> = Result<T, StopError>;
