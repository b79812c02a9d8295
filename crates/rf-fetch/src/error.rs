//! Fetch-subsystem error type.

use thiserror::Error;

use rf_core::Fault;

/// Errors produced by `rf-fetch`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("relation {0} does not exist")]
    NotFound(i64),

    #[error("bad input: {0}")]
    BadInput(String),

    #[error("upstream service returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error(transparent)]
    Net(#[from] rf_net::NetError),
}

impl FetchError {
    pub fn fault(&self) -> Fault {
        match self {
            FetchError::NotFound(_) => Fault::NotFound,
            FetchError::BadInput(_) => Fault::BadInput,
            FetchError::Upstream { .. } => Fault::Upstream,
            FetchError::Parse(_) => Fault::Upstream,
            FetchError::Internal(_) => Fault::Internal,
            FetchError::Net(e) => e.fault(),
        }
    }

    /// Only transient upstream failures are worth retrying.
    pub fn retryable(&self) -> bool {
        matches!(self, FetchError::Upstream { status, .. } if *status >= 500 || *status == 429)
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
