//! `rf-stops` — stop clustering and ordering.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`feature`] | `StopFeature`, `StopCollection`, `PtKind`                 |
//! | [`cluster`] | Area/name grouping, fuzzy expansion, platform↔stop pairing|
//! | [`member`]  | Membership flags from an existing relation                |
//! | [`order`]   | `SortedStopEntry`, ordering along the network             |
//! | [`error`]   | `StopError`, `StopResult<T>`                              |

pub mod cluster;
pub mod error;
pub mod feature;
pub mod member;
pub mod order;

#[cfg(test)]
mod tests;

pub use cluster::build_collections;
pub use error::{StopError, StopResult};
pub use feature::{PtKind, StopCollection, StopFeature};
pub use member::assign_member_flags;
pub use order::{by_neighbor, sort_on_path, SortedStopEntry, INTERPOLATE_THRESHOLD_M};
