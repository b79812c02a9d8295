//! Change-subsystem error type.

use thiserror::Error;

use rf_core::{ElementId, Fault};

/// Errors produced by `rf-change`.
#[derive(Debug, Error)]
pub enum ChangeError {
    #[error("way {way} was modified upstream; the split no longer applies")]
    SplitConflict { way: i64 },

    #[error("split piece set of way {way} is incomplete")]
    IncompletePieces { way: i64 },

    #[error("no stored document for way {way}")]
    MissingDocument { way: i64 },

    #[error("no segment geometry for {0}")]
    MissingSegment(ElementId),

    #[error("change document parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChangeError {
    pub fn fault(&self) -> Fault {
        match self {
            ChangeError::SplitConflict { .. } => Fault::Conflict,
            ChangeError::Parse(_) | ChangeError::Xml(_) | ChangeError::Io(_) => Fault::BadInput,
            ChangeError::IncompletePieces { .. }
            | ChangeError::MissingDocument { .. }
            | ChangeError::MissingSegment(_) => Fault::Internal,
        }
    }
}

pub type ChangeResult<T> = Result<T, ChangeError>;
