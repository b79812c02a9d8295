//! Search-subsystem error type.

use thiserror::Error;

use rf_core::{ElementId, Fault};
use rf_net::{GraphKey, NetError};

/// Errors produced by `rf-search`.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("route calculation exceeded its deadline")]
    Timeout,

    #[error("segment {0} is not part of the search set")]
    MissingSegment(ElementId),

    #[error("graph key {0} has no entry")]
    MissingKey(GraphKey),

    #[error(transparent)]
    Net(#[from] NetError),
}

impl SearchError {
    pub fn fault(&self) -> Fault {
        match self {
            SearchError::Timeout => Fault::Timeout,
            SearchError::MissingSegment(_) => Fault::BadInput,
            SearchError::MissingKey(_) => Fault::Internal,
            SearchError::Net(e) => e.fault(),
        }
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
