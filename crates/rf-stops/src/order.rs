//! Stop ordering along the candidate network.
//!
//! Every segment polyline is interpolated to the configured resolution in
//! radian space; the resulting samples, numbered globally in segment
//! order, form a nearest-neighbor index.  A stop's *sort index* is the
//! global index of its nearest sample — stops sorted by it appear in
//! traversal order along the network.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;

use rf_core::geo::{haversine_rad, interpolate_rad, side_of_travel};
use rf_core::{CoordRad, ElementId};

use rf_net::Segment;

use crate::feature::StopCollection;
use crate::{StopError, StopResult};

/// Interpolation resolution along segment polylines, in metres.
pub const INTERPOLATE_THRESHOLD_M: f64 = 60.0;

// ── SortedStopEntry ───────────────────────────────────────────────────────────

/// A stop collection bound to the network.
#[derive(Clone, Debug)]
pub struct SortedStopEntry {
    pub collection: StopCollection,
    /// Global index of the nearest interpolated sample.
    pub sort_index: usize,
    /// Segment owning that sample.
    pub neighbor: ElementId,
    /// Straight-line distance from the stop to the sample, metres.
    pub distance_m: f64,
    /// `Some(true)` = right of travel, `Some(false)` = left,
    /// `None` = ambiguous (degenerate neighbor geometry).
    pub right_hand_side: Option<bool>,
}

// ── Spatial index entry ───────────────────────────────────────────────────────

struct SampleEntry {
    point: [f64; 2], // [lat_rad, lon_rad]
    sample: usize,
}

impl RTreeObject for SampleEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for SampleEntry {
    /// Squared Euclidean distance in radian space — adequate for
    /// nearest-sample queries at network scale; the reported distance is
    /// recomputed with true haversine.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let d_lat = self.point[0] - point[0];
        let d_lon = self.point[1] - point[1];
        d_lat * d_lat + d_lon * d_lon
    }
}

// ── Ordering ──────────────────────────────────────────────────────────────────

/// Bind each collection to its nearest segment sample and order the result
/// along the network.
///
/// `segments` supplies the traversal order that global sample indices are
/// numbered in; pass route ways in route order when re-checking a final
/// route, or the member set in any stable order for the initial sort.
pub fn sort_on_path<'s>(
    collections: &[StopCollection],
    segments: impl IntoIterator<Item = &'s Segment>,
    threshold_m: f64,
) -> StopResult<Vec<SortedStopEntry>> {
    // One radian polyline per segment, kept for the side-of-travel test.
    struct SegmentSamples {
        id: ElementId,
        coords_rad: Vec<CoordRad>,
    }

    let mut polylines: Vec<SegmentSamples> = Vec::new();
    // sample global index → (polyline slot, vertex index, position)
    let mut samples: Vec<(usize, usize, CoordRad)> = Vec::new();

    for segment in segments {
        let coords_rad: Vec<CoordRad> =
            segment.coords.iter().map(|c| c.to_radians()).collect();
        let slot = polylines.len();

        for idx in 0..coords_rad.len() {
            let current = coords_rad[idx];
            // The final vertex pairs with itself and contributes one sample.
            let next = coords_rad[(idx + 1).min(coords_rad.len() - 1)];

            for point in interpolate_rad(current, next, threshold_m) {
                samples.push((slot, idx, point));
            }
        }

        polylines.push(SegmentSamples { id: segment.id, coords_rad });
    }

    if samples.is_empty() {
        return Err(StopError::NoSegments);
    }
    if collections.is_empty() {
        return Ok(Vec::new());
    }

    let tree = RTree::bulk_load(
        samples
            .iter()
            .enumerate()
            .map(|(sample, &(_, _, p))| SampleEntry { point: [p.lat, p.lon], sample })
            .collect(),
    );

    let mut result: Vec<SortedStopEntry> = collections
        .iter()
        .map(|collection| {
            let stop_rad = collection.best().coord.to_radians();

            let entry = tree
                .nearest_neighbor(&[stop_rad.lat, stop_rad.lon])
                .expect("sample tree is non-empty");
            let (slot, vertex_idx, sample_rad) = samples[entry.sample];
            let polyline = &polylines[slot];

            let right_hand_side = if vertex_idx > 0 {
                side_of_travel(polyline.coords_rad[vertex_idx - 1], sample_rad, stop_rad)
            } else if vertex_idx + 1 < polyline.coords_rad.len() {
                side_of_travel(sample_rad, polyline.coords_rad[vertex_idx + 1], stop_rad)
            } else {
                None
            };

            SortedStopEntry {
                collection: collection.clone(),
                sort_index: entry.sample,
                neighbor: polyline.id,
                distance_m: haversine_rad(stop_rad, sample_rad),
                right_hand_side,
            }
        })
        .collect();

    result.sort_by_key(|entry| entry.sort_index);
    Ok(result)
}

/// Group sorted entries by their neighbor segment — the lookup shape the
/// route search consumes.
pub fn by_neighbor(entries: Vec<SortedStopEntry>) -> FxHashMap<ElementId, Vec<SortedStopEntry>> {
    let mut map: FxHashMap<ElementId, Vec<SortedStopEntry>> = FxHashMap::default();
    for entry in entries {
        map.entry(entry.neighbor).or_default().push(entry);
    }
    map
}
