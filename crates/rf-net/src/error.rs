//! Network-subsystem error type.

use thiserror::Error;

use rf_core::{ElementId, Fault};

/// Errors produced by `rf-net`.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("oneway={0:?} is not supported on routable ways")]
    ReversedOneway(String),

    #[error("way {way} references node {node} with no known coordinate")]
    MissingNode { way: i64, node: i64 },

    #[error("way {0} has fewer than 2 nodes")]
    DegenerateWay(i64),

    #[error("relation has no way members")]
    NoWayMembers,

    #[error("segments {0} and {1} share no endpoint")]
    Disconnected(ElementId, ElementId),
}

impl NetError {
    pub fn fault(&self) -> Fault {
        match self {
            NetError::ReversedOneway(_)
            | NetError::DegenerateWay(_)
            | NetError::NoWayMembers => Fault::BadInput,
            NetError::MissingNode { .. } | NetError::Disconnected(..) => Fault::Internal,
        }
    }
}

pub type NetResult<T> = Result<T, NetError>;
