//! Download history.
//!
//! Incremental map expansion appends one batch of grid cells per fetch;
//! re-running the whole session replays every batch so the merged element
//! set is reproducible.  A *reload* abandons the history and starts a
//! fresh session with a single batch.

use rand::distributions::Alphanumeric;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::grid::Cell;

/// A session token plus the ordered list of fetched cell batches.
/// Invariant: append-only within a session.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct DownloadHistory {
    pub session: String,
    pub batches: Vec<Vec<Cell>>,
}

impl DownloadHistory {
    /// Start a fresh session with one batch.
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { session: session_token(), batches: vec![cells] }
    }

    /// Append a batch to the running session.
    pub fn append(&mut self, cells: Vec<Cell>) {
        self.batches.push(cells);
    }

    /// Every cell across all batches.
    pub fn all_cells(&self) -> Vec<Cell> {
        self.batches.iter().flatten().copied().collect()
    }
}

/// An opaque per-session token; also the cache key for batch fetches.
fn session_token() -> String {
    SmallRng::from_entropy()
        .sample_iter(&Alphanumeric)
        .take(22)
        .map(char::from)
        .collect()
}
