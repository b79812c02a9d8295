//! The directed route graph.
//!
//! # Keys
//!
//! Every segment contributes two [`GraphKey`]s, one per endpoint.  The map
//! entry for `(segment, start)` holds the successors reachable from the
//! *start* endpoint; during a traversal the same key type doubles as a path
//! element, where the flag records the *entered* endpoint (a forward
//! traversal enters at the start and exits at the end, so its successors
//! come from the flipped key).
//!
//! # Intersection ids
//!
//! Endpoints sharing a coordinate receive one dense intersection id, used
//! by the search as a revisit key.  Assignment floods from each unassigned
//! key to its successors; a successor already assigned through another key
//! is overwritten (this merge happens where oneway segments make the
//! successor relation asymmetric).

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use rf_core::{Coord, ElementId};

use crate::segment::Segment;
use crate::{NetError, NetResult};

// ── GraphKey / GraphValue ─────────────────────────────────────────────────────

/// One endpoint of a segment; also a path element (see module docs).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct GraphKey {
    pub way: ElementId,
    pub start: bool,
}

impl GraphKey {
    #[inline]
    pub fn new(way: ElementId, start: bool) -> Self {
        Self { way, start }
    }

    /// The same segment's other endpoint.
    #[inline]
    pub fn flip(self) -> Self {
        Self { way: self.way, start: !self.start }
    }
}

impl std::fmt::Display for GraphKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.way, if self.start { "start" } else { "end" })
    }
}

/// Successor set and intersection id of one graph key.
#[derive(Clone, Debug)]
pub struct GraphValue {
    pub intersection: u32,
    pub successors: Vec<GraphKey>,
}

// ── DirectedGraph ─────────────────────────────────────────────────────────────

/// The directed graph over a set of segments.
pub struct DirectedGraph {
    map: FxHashMap<GraphKey, GraphValue>,
}

impl DirectedGraph {
    /// Build the graph for `segments`, using `adjacency` from ingestion.
    ///
    /// `adjacency` may reference segments absent from `segments` (the
    /// search runs on relation members only, while adjacency covers the
    /// whole download); those references are skipped.
    pub fn build(
        segments: &FxHashMap<ElementId, Segment>,
        adjacency: &FxHashMap<ElementId, Vec<ElementId>>,
    ) -> Self {
        let mut successors: FxHashMap<GraphKey, Vec<GraphKey>> = FxHashMap::default();

        // Deterministic construction order.
        let mut ids: Vec<ElementId> = segments.keys().copied().collect();
        ids.sort_unstable();

        for &id in &ids {
            let segment = &segments[&id];
            let empty = Vec::new();
            let connected = adjacency.get(&id).unwrap_or(&empty);

            for start in [true, false] {
                let at = if start { segment.first_coord() } else { segment.last_coord() };
                successors.insert(
                    GraphKey::new(id, start),
                    neighbors_at(at, connected, segments),
                );
            }
        }

        // Intersection id assignment: flood one hop from each pending key.
        let mut map: FxHashMap<GraphKey, GraphValue> = FxHashMap::default();
        let mut pending: BTreeSet<GraphKey> = successors.keys().copied().collect();
        let mut next_id: u32 = 0;

        while let Some(key) = pending.pop_first() {
            let id = next_id;
            next_id += 1;

            let succ = successors[&key].clone();
            for &neighbor in &succ {
                if pending.remove(&neighbor) {
                    map.insert(
                        neighbor,
                        GraphValue { intersection: id, successors: successors[&neighbor].clone() },
                    );
                } else if let Some(value) = map.get_mut(&neighbor) {
                    // Merge: reachable from two coordinates only through
                    // asymmetric (oneway) successor sets.
                    value.intersection = id;
                }
            }
            map.insert(key, GraphValue { intersection: id, successors: succ });
        }

        Self { map }
    }

    #[inline]
    pub fn get(&self, key: GraphKey) -> Option<&GraphValue> {
        self.map.get(&key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = GraphKey> + '_ {
        self.map.keys().copied()
    }
}

/// Graph keys of connected segments entered at coordinate `at`.
///
/// A connected segment is entered at its start key when its first vertex
/// coincides, or at its end key when its last vertex coincides — the
/// latter only for two-way segments, since entering at the end means
/// traversing against the segment's direction.
fn neighbors_at(
    at: Coord,
    connected: &[ElementId],
    segments: &FxHashMap<ElementId, Segment>,
) -> Vec<GraphKey> {
    let mut keys = Vec::new();

    for &cid in connected {
        let Some(other) = segments.get(&cid) else {
            continue;
        };

        if at == other.first_coord() {
            keys.push(GraphKey::new(cid, true));
        } else if at == other.last_coord() && !other.oneway {
            keys.push(GraphKey::new(cid, false));
        }
        // Connected via a mid-way intersection on some other piece: skip.
    }

    keys
}

// ── Turn angles ───────────────────────────────────────────────────────────────

/// Angle in degrees between two connected segments at their shared
/// endpoint, from the last two vertices of one and the first two of the
/// other, via the law of cosines.
pub fn angle_between(prev: &Segment, next: &Segment) -> NetResult<f64> {
    let p = &prev.coords;
    let n = &next.coords;

    let (a, b, c) = if prev.last_coord() == next.first_coord() {
        (p[p.len() - 2], p[p.len() - 1], n[1])
    } else if prev.last_coord() == next.last_coord() {
        (p[p.len() - 2], p[p.len() - 1], n[n.len() - 2])
    } else if prev.first_coord() == next.first_coord() {
        (p[1], p[0], n[1])
    } else if prev.first_coord() == next.last_coord() {
        (p[1], p[0], n[n.len() - 2])
    } else {
        return Err(NetError::Disconnected(prev.id, next.id));
    };

    let d_ab = a.distance_m(b);
    let d_bc = b.distance_m(c);
    let d_ac = a.distance_m(c);

    let cos_angle = (d_ab * d_ab + d_bc * d_bc - d_ac * d_ac) / (2.0 * d_ab * d_bc);
    Ok(cos_angle.clamp(-1.0, 1.0).acos().to_degrees())
}

/// Score each successor by its deviation from going straight:
/// `90 - |90 - angle|`, so a straight continuation (180°) scores 0 and a
/// right-angle turn scores 90.  A lone successor scores 0 unconditionally.
pub fn scored_successors(
    segment: &Segment,
    successors: &[GraphKey],
    segments: &FxHashMap<ElementId, Segment>,
) -> NetResult<Vec<(GraphKey, f64)>> {
    match successors {
        [] => Ok(Vec::new()),
        [only] => Ok(vec![(*only, 0.0)]),
        _ => successors
            .iter()
            .map(|&key| {
                let angle = angle_between(segment, &segments[&key.way])?;
                Ok((key, 90.0 - (90.0 - angle).abs()))
            })
            .collect(),
    }
}
