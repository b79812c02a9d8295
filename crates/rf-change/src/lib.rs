//! `rf-change` — member synthesis, change construction, and auditing.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`members`]  | Member-list synthesis, piece unsplitting                |
//! | [`change`]   | `OsmChange`, id allocation, parent rewriting            |
//! | [`xml`]      | osmChange serialization and parsing                     |
//! | [`warnings`] | `RouteWarning` post-hoc checks                          |
//! | [`error`]    | `ChangeError`, `ChangeResult<T>`                        |

pub mod change;
pub mod error;
pub mod members;
pub mod warnings;
pub mod xml;

#[cfg(test)]
mod tests;

pub use change::{build_change, ChangeInputs, OsmChange};
pub use error::{ChangeError, ChangeResult};
pub use members::{simplify_way_ids, synthesize_members};
pub use warnings::{check_route, RouteWarning, Severity};
pub use xml::{from_xml, to_xml, CREATED_BY};
