//! Route finalization: package the winning path for member synthesis and
//! change building.

use rustc_hash::{FxHashMap, FxHashSet};

use rf_core::tags::tag_is;
use rf_core::{Coord, ElementId, RelationMember, TagMap};
use rf_net::Segment;
use rf_stops::StopCollection;

use crate::best::BestPath;

// ── FinalRoute ────────────────────────────────────────────────────────────────

/// One traversed segment of the final route.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct RouteWay {
    pub way: ElementId,
    /// Traversed against its node order.
    pub reversed: bool,
}

/// The finalized route.
#[derive(Clone, Debug)]
pub struct FinalRoute {
    /// Traversed segments in order.
    pub ways: Vec<RouteWay>,
    /// Concatenated polyline; shared endpoints between consecutive
    /// segments appear once.
    pub coords: Vec<Coord>,
    /// Visited stop collections in first-visitation order.
    pub stops: Vec<StopCollection>,
    /// The edited relation's tags.
    pub tags: TagMap,
    /// Pieces of split ways that are not route members but still need
    /// their parent documents rewritten.
    pub extra_ways: Vec<ElementId>,
    /// Member list; empty until member synthesis runs.
    pub members: Vec<RelationMember>,
}

impl FinalRoute {
    /// `roundtrip=yes` routes suppress entry/exit role suffixes and close
    /// the stop ring.
    #[inline]
    pub fn roundtrip(&self) -> bool {
        tag_is(&self.tags, "roundtrip", "yes")
    }

    /// Ids of the traversed segments, deduplicated.
    pub fn way_ids(&self) -> FxHashSet<ElementId> {
        self.ways.iter().map(|w| w.way).collect()
    }
}

// ── Finalization ──────────────────────────────────────────────────────────────

/// Convert the best path into a [`FinalRoute`].
///
/// A paired stop position lying off the final polyline is dropped from its
/// collection (the platform stays); a collection losing both features is
/// dropped entirely.
pub fn finalize_route(
    best: &BestPath,
    segments: &FxHashMap<ElementId, Segment>,
    collections: &[StopCollection],
    tags: TagMap,
) -> FinalRoute {
    let ways: Vec<RouteWay> = best
        .path
        .iter()
        .map(|key| RouteWay { way: key.way, reversed: !key.start })
        .collect();

    let mut coords: Vec<Coord> = Vec::new();
    for route_way in &ways {
        let segment = &segments[&route_way.way];
        let skip = usize::from(!coords.is_empty());

        if route_way.reversed {
            coords.extend(segment.coords.iter().rev().skip(skip));
        } else {
            coords.extend(segment.coords.iter().skip(skip));
        }
    }

    let coord_set: FxHashSet<(u64, u64)> = coords.iter().map(|c| c.bits()).collect();

    let by_best_id: FxHashMap<ElementId, &StopCollection> =
        collections.iter().map(|c| (c.best().id, c)).collect();

    let mut visited: Vec<(ElementId, usize)> = best
        .visited_stops
        .iter()
        .map(|(id, pos)| (*id, *pos))
        .collect();
    visited.sort_by_key(|&(id, pos)| (pos, id));

    let mut stops: Vec<StopCollection> = Vec::new();
    for (stop_id, _) in visited {
        let Some(&collection) = by_best_id.get(&stop_id) else {
            continue;
        };
        let mut collection = collection.clone();

        if let Some(stop) = &collection.stop {
            if !coord_set.contains(&stop.coord.bits()) {
                collection.stop = None;
            }
        }

        if collection.platform.is_none() && collection.stop.is_none() {
            continue;
        }
        stops.push(collection);
    }

    FinalRoute {
        ways,
        coords,
        stops,
        tags,
        extra_ways: Vec::new(),
        members: Vec::new(),
    }
}
