//! Segment ingestion: split raw ways at intersections and build adjacency.
//!
//! # Splitting
//!
//! A node referenced by two or more way occurrences is an intersection.
//! Each way is cut at every interior intersection node, producing *pieces*
//! whose ids carry provenance (`ElementId::Piece`).  A way with no interior
//! intersections keeps its native id — the common case, and the one the
//! change builder can publish without allocating new elements.

use rustc_hash::{FxHashMap, FxHashSet};

use rf_core::geo::{polyline_length, polyline_midpoint};
use rf_core::{Coord, ElementId, TagMap};

use crate::classify::{is_roundabout, oneway_of};
use crate::{NetError, NetResult};

// ── Input ─────────────────────────────────────────────────────────────────────

/// A raw routable way as delivered by the fetch layer.
#[derive(Clone, Debug)]
pub struct RawWay {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub tags: TagMap,
    /// `true` if the way is a member of the edited relation.
    pub member: bool,
}

// ── Segment ───────────────────────────────────────────────────────────────────

/// A routable segment: one piece of a split way, or an unsplit way.
#[derive(Clone, Debug)]
pub struct Segment {
    pub id: ElementId,
    pub nodes: Vec<i64>,
    pub coords: Vec<Coord>,
    pub member: bool,
    pub oneway: bool,
    pub roundabout: bool,
    /// Start/end node is pre-marked as turn-in-place (e.g. turning circle).
    pub turn_start: bool,
    pub turn_end: bool,
    /// Cached polyline length in metres.
    pub length_m: f64,
    /// Cached point halfway along the polyline.
    pub midpoint: Coord,
}

impl Segment {
    #[inline]
    pub fn first_coord(&self) -> Coord {
        self.coords[0]
    }

    #[inline]
    pub fn last_coord(&self) -> Coord {
        *self.coords.last().unwrap_or(&self.coords[0])
    }

    #[inline]
    pub fn first_node(&self) -> i64 {
        self.nodes[0]
    }

    #[inline]
    pub fn last_node(&self) -> i64 {
        *self.nodes.last().unwrap_or(&self.nodes[0])
    }

    /// First node equals last node (closed ring, e.g. a roundabout).
    #[inline]
    pub fn is_circular(&self) -> bool {
        self.nodes.len() > 1 && self.first_node() == self.last_node()
    }
}

// ── SegmentSet ────────────────────────────────────────────────────────────────

/// The output of ingestion: split segments, their adjacency, and the
/// native-id → pieces mapping in piece order.
#[derive(Debug, Default)]
pub struct SegmentSet {
    pub segments: FxHashMap<ElementId, Segment>,
    /// Piece id → ids of pieces sharing an intersection node.  Sorted and
    /// deduplicated for deterministic iteration.
    pub adjacency: FxHashMap<ElementId, Vec<ElementId>>,
    /// Native way id → its pieces in piece order.
    pub pieces: FxHashMap<i64, Vec<ElementId>>,
}

impl SegmentSet {
    /// Segments that are members of the edited relation.
    pub fn members(&self) -> FxHashMap<ElementId, Segment> {
        self.segments
            .iter()
            .filter(|(_, s)| s.member)
            .map(|(id, s)| (*id, s.clone()))
            .collect()
    }

    /// Sum of member segment lengths in metres.
    pub fn member_length_m(&self) -> f64 {
        self.segments
            .values()
            .filter(|s| s.member)
            .map(|s| s.length_m)
            .sum()
    }
}

// ── Ingestion ─────────────────────────────────────────────────────────────────

/// Split `ways` at shared nodes and assemble a [`SegmentSet`].
///
/// `node_coords` must cover every referenced node; `turn_nodes` is the set
/// of nodes pre-marked as turn-in-place.  Classification (oneway,
/// roundabout) happens here so the fetch layer stays tag-agnostic.
pub fn build_segments(
    ways: &[RawWay],
    node_coords: &FxHashMap<i64, Coord>,
    turn_nodes: &FxHashSet<i64>,
) -> NetResult<SegmentSet> {
    let node_counts = count_node_occurrences(ways);

    let mut set = SegmentSet::default();
    // Intersection node → piece ids registered there so far.
    let mut node_pieces: FxHashMap<i64, Vec<ElementId>> = FxHashMap::default();

    for way in ways {
        if way.nodes.len() < 2 {
            return Err(NetError::DegenerateWay(way.id));
        }

        let oneway = oneway_of(&way.tags)?;
        let roundabout = is_roundabout(&way.tags);

        let node_runs = split_at_intersections(&way.nodes, &node_counts);
        let piece_count = node_runs.len();

        for (ordinal, nodes) in node_runs.into_iter().enumerate() {
            let id = if piece_count == 1 {
                ElementId::Native(way.id)
            } else {
                ElementId::Piece {
                    native: way.id,
                    index: (ordinal + 1) as u16,
                    of: piece_count as u16,
                }
            };

            let coords = nodes
                .iter()
                .map(|&n| {
                    node_coords
                        .get(&n)
                        .copied()
                        .ok_or(NetError::MissingNode { way: way.id, node: n })
                })
                .collect::<NetResult<Vec<Coord>>>()?;

            let segment = Segment {
                id,
                member: way.member,
                oneway,
                roundabout,
                turn_start: turn_nodes.contains(&nodes[0]),
                turn_end: turn_nodes.contains(&nodes[nodes.len() - 1]),
                length_m: polyline_length(&coords),
                midpoint: polyline_midpoint(&coords),
                nodes,
                coords,
            };

            // Register at every intersection node along the piece and
            // cross-link with pieces already there.
            for &node in &segment.nodes {
                if node_counts[&node] > 1 {
                    let at_node = node_pieces.entry(node).or_default();
                    for &other in at_node.iter() {
                        if other != id {
                            set.adjacency.entry(id).or_default().push(other);
                            set.adjacency.entry(other).or_default().push(id);
                        }
                    }
                    at_node.push(id);
                }
            }

            set.pieces.entry(way.id).or_default().push(id);
            set.segments.insert(id, segment);
        }
    }

    for neighbors in set.adjacency.values_mut() {
        neighbors.sort_unstable();
        neighbors.dedup();
    }

    Ok(set)
}

/// Count node occurrences across the ingested set.  Occurrences, not
/// distinct ways: a closed way contributes its shared endpoint twice, which
/// correctly marks it as an intersection.
fn count_node_occurrences(ways: &[RawWay]) -> FxHashMap<i64, u32> {
    let mut counts: FxHashMap<i64, u32> = FxHashMap::default();
    for way in ways {
        for &node in &way.nodes {
            *counts.entry(node).or_default() += 1;
        }
    }
    counts
}

/// Cut a node list at every interior intersection node.  Each cut node is
/// duplicated as the end of one run and the start of the next, so
/// concatenating the runs (dropping shared endpoints) recovers the input.
fn split_at_intersections(nodes: &[i64], node_counts: &FxHashMap<i64, u32>) -> Vec<Vec<i64>> {
    let mut runs: Vec<Vec<i64>> = Vec::new();
    let mut current: Vec<i64> = Vec::new();

    for &node in nodes {
        current.push(node);

        if node_counts[&node] > 1 && current.len() > 1 {
            runs.push(std::mem::replace(&mut current, vec![node]));
        }
    }

    if current.len() > 1 {
        runs.push(current);
    }

    runs
}
