//! `rf-search` — parallel bounded route search.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`state`]    | `FrontierElement`                                       |
//! | [`best`]     | `BestPath`, `BestPaths`, the ranking comparator         |
//! | [`dfs`]      | Worker loop, parallel controller, search bounds         |
//! | [`finalize`] | `FinalRoute`, `RouteWay`, path packaging                |
//! | [`error`]    | `SearchError`, `SearchResult<T>`                        |

pub mod best;
pub mod dfs;
pub mod error;
pub mod finalize;
pub mod state;

#[cfg(test)]
mod tests;

pub use best::{BestPath, BestPaths, MAX_EXTRA_DISTANCE_TO_CONVERT_M};
pub use dfs::{
    search, MAX_AFTER_FINISH_LENGTH_M, MAX_LOOP_LENGTH_M, MAX_PATH_LENGTH_FACTOR, VISITED_LIMIT,
};
pub use error::{SearchError, SearchResult};
pub use finalize::{finalize_route, FinalRoute, RouteWay};
pub use state::FrontierElement;
