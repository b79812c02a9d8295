//! `rf-fetch` — tiled ingestion and external data contracts.
//!
//! # Crate layout
//!
//! | Module        | Contents                                               |
//! |---------------|--------------------------------------------------------|
//! | [`grid`]      | `BoundingBox`, `Cell`                                  |
//! | [`merge`]     | Cell-rectangle merge optimization                      |
//! | [`history`]   | `DownloadHistory`, session tokens                      |
//! | [`coverage`]  | `BoundingBoxCollection` point-coverage index           |
//! | [`triggers`]  | Download triggers for incremental expansion            |
//! | [`query`]     | Overpass query programs, `out count` grouping          |
//! | [`element`]   | Raw element records, pre-processing, mode filters      |
//! | [`doc`]       | `WayDoc` / `RelationDoc` element-store documents       |
//! | [`relation`]  | Route-relation validation                              |
//! | [`service`]   | `QueryService` / `ElementStore` traits, `TiledFetcher` |
//! | [`cache`]     | `TtlCache`                                             |
//! | [`retry`]     | Backoff for idempotent reads                           |
//! | [`changeset`] | Changeset placeholder and tag sanitation               |
//! | [`error`]     | `FetchError`, `FetchResult<T>`                         |

pub mod cache;
pub mod changeset;
pub mod coverage;
pub mod doc;
pub mod element;
pub mod error;
pub mod grid;
pub mod history;
pub mod merge;
pub mod query;
pub mod relation;
pub mod retry;
pub mod service;
pub mod triggers;


pub use cache::{TtlCache, CACHE_CAPACITY};
pub use changeset::{apply_changeset_id, changeset_placeholder, sanitize_changeset_tags};
pub use coverage::BoundingBoxCollection;
pub use doc::{MemberDoc, RelationDoc, WayDoc};
pub use element::RawElement;
pub use error::{FetchError, FetchResult};
pub use grid::{BoundingBox, Cell};
pub use history::DownloadHistory;
pub use merge::optimize_cells;
pub use query::split_by_count;
pub use relation::{name_or_ref, route_mode_of};
pub use retry::{retry_read, READ_ATTEMPTS};
pub use service::{ElementStore, ParentsResult, QueryService, RelationFetch, TiledFetcher};
pub use triggers::download_triggers;
