//! `rf-core` — foundational types for the routeforge engine.
//!
//! This crate is a dependency of every other `rf-*` crate.  It has no
//! `rf-*` dependencies and minimal external ones (`serde`, `thiserror`,
//! `log`).
//!
//! # What lives here
//!
//! | Module     | Contents                                                |
//! |------------|---------------------------------------------------------|
//! | [`geo`]    | `Coord`, `CoordRad`, haversine, interpolation, side-of  |
//! | [`ids`]    | `ElementId`, `ElementKind`, `RelationMember`            |
//! | [`tags`]   | `TagMap` alias and accessors                            |
//! | [`name`]   | Stop-name normalization and number extraction           |
//! | [`config`] | `EngineConfig`, `TAG_MAX_LENGTH`                        |
//! | [`error`]  | `CoreError`, `CoreResult`, the `Fault` classification   |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod name;
pub mod tags;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{EngineConfig, TAG_MAX_LENGTH};
pub use error::{CoreError, CoreResult, Fault};
pub use geo::{Coord, CoordRad, EARTH_RADIUS_M};
pub use ids::{ElementId, ElementKind, RelationMember};
pub use tags::TagMap;
