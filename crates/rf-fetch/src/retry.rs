//! Retry with exponential backoff for idempotent reads.
//!
//! Writes (changeset create/upload/close) must never pass through here —
//! they are single-shot by contract.

use std::time::Duration;

use crate::{FetchError, FetchResult};

/// Attempts per read, including the first.
pub const READ_ATTEMPTS: u32 = 3;

const BASE_BACKOFF: Duration = Duration::from_millis(200);

/// Run `op`, retrying transient upstream failures up to `attempts` times
/// with exponential backoff.  Non-retryable errors surface immediately.
pub fn retry_read<T>(attempts: u32, mut op: impl FnMut() -> FetchResult<T>) -> FetchResult<T> {
    let mut delay = BASE_BACKOFF;

    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(error) if error.retryable() && attempt < attempts => {
                log::warn!("read attempt {attempt}/{attempts} failed, retrying: {error}");
                std::thread::sleep(delay);
                delay *= 2;
            }
            Err(error) => return Err(error),
        }
    }

    unreachable!("loop returns on the final attempt")
}
