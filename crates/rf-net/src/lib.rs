//! `rf-net` — segment ingestion and the directed route graph.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                 |
//! |---------------|----------------------------------------------------------|
//! | [`classify`]  | `RouteMode`, routability / oneway / roundabout tests     |
//! | [`segment`]   | `RawWay`, `Segment`, `SegmentSet`, `build_segments`      |
//! | [`graph`]     | `GraphKey`, `DirectedGraph`, turn-angle scoring          |
//! | [`endpoints`] | Start/end segment selection for an edited relation       |
//! | [`error`]     | `NetError`, `NetResult<T>`                               |

pub mod classify;
pub mod endpoints;
pub mod error;
pub mod graph;
pub mod segment;


pub use classify::{is_roundabout, is_routable, oneway_of, RouteMode};
pub use endpoints::{select_route_endpoints, WAY_MEMBER_ROLES};
pub use error::{NetError, NetResult};
pub use graph::{angle_between, scored_successors, DirectedGraph, GraphKey, GraphValue};
pub use segment::{build_segments, RawWay, Segment, SegmentSet};
