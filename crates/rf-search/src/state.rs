//! Frontier element state.

use rustc_hash::{FxHashMap, FxHashSet};

use rf_core::ElementId;
use rf_net::GraphKey;

/// One partial path on the search frontier.
///
/// Expansion clones the maps it changes; unchanged maps are cloned cheaply
/// by handle-less value (they stay small — stop and intersection counts,
/// not per-node state).
#[derive(Clone, Debug)]
pub struct FrontierElement {
    /// Ordered graph keys, starting at a start-segment orientation.
    pub path: Vec<GraphKey>,
    /// Stop id → path length at first proper visitation.
    pub visited_stops: FxHashMap<ElementId, usize>,
    /// Stop id → path length at first wrong-side visitation.  A later
    /// proper visit removes the entry (demotion to `visited_stops`).
    pub almost_visited_stops: FxHashMap<ElementId, usize>,
    /// Intersection id → (stop count at first arrival, visit count).
    /// Bounds revisits that make no stop progress.
    pub intersection_snapshot: FxHashMap<u32, (usize, u32)>,
    /// Cumulative traversal length, metres.
    pub length: f64,
    /// Distinct segments traversed.
    pub complete_path: FxHashSet<ElementId>,
    /// Summed length of `complete_path`, metres.
    pub complete_length: f64,
    /// Accumulated deviation-from-straight, degrees.
    pub angle_sum: f64,
    /// Length accumulated while revisiting intersections under a stagnant
    /// stop count; reset when new stops are picked up.
    pub loop_length: f64,
    /// Length accumulated after the end segment was reached.
    pub after_finish_length: f64,
    /// Entry key into the current roundabout; forbids lapping it.
    pub roundabout_enter: Option<GraphKey>,
}
