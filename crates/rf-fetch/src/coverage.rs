//! Covered-area index: which points fall inside any fetched bounding box.

use rstar::{RTree, RTreeObject, AABB};

use rf_core::Coord;

use crate::grid::BoundingBox;

#[derive(Clone)]
struct BoxEntry {
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for BoxEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// An R-tree over the fetched bounding boxes.
pub struct BoundingBoxCollection {
    tree: RTree<BoxEntry>,
    bounds: Option<BoundingBox>,
}

impl BoundingBoxCollection {
    pub fn new(boxes: &[BoundingBox]) -> Self {
        let entries: Vec<BoxEntry> = boxes
            .iter()
            .map(|bb| BoxEntry {
                envelope: AABB::from_corners([bb.minlat, bb.minlon], [bb.maxlat, bb.maxlon]),
            })
            .collect();

        let bounds = boxes.iter().copied().reduce(|a, b| BoundingBox {
            minlat: a.minlat.min(b.minlat),
            minlon: a.minlon.min(b.minlon),
            maxlat: a.maxlat.max(b.maxlat),
            maxlon: a.maxlon.max(b.maxlon),
        });

        Self { tree: RTree::bulk_load(entries), bounds }
    }

    /// `true` when any fetched box covers `point`.
    pub fn contains(&self, point: Coord) -> bool {
        let probe = AABB::from_point([point.lat, point.lon]);
        self.tree
            .locate_in_envelope_intersecting(&probe)
            .next()
            .is_some()
    }

    /// The box enclosing everything fetched so far.
    pub fn global_bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }
}
