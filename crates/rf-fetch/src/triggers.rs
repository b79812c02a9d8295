//! Download triggers: where the network runs off the fetched area.

use rustc_hash::{FxHashMap, FxHashSet};

use rf_core::ElementId;
use rf_net::Segment;

use crate::coverage::BoundingBoxCollection;
use crate::grid::{BoundingBox, Cell};

/// For every segment whose polyline leaves the covered area, the 3×3 cell
/// blocks around the escaping points, minus cells already in this batch.
/// The UI offers these as expansion candidates.
pub fn download_triggers(
    bbc: &BoundingBoxCollection,
    batch_cells: &[Cell],
    segments: &FxHashMap<ElementId, Segment>,
    grid_step_deg: f64,
) -> FxHashMap<ElementId, Vec<Cell>> {
    let covered: FxHashSet<Cell> = batch_cells.iter().copied().collect();
    let mut result: FxHashMap<ElementId, Vec<Cell>> = FxHashMap::default();

    for (&id, segment) in segments {
        let mut new_cells: FxHashSet<Cell> = FxHashSet::default();

        for &coord in &segment.coords {
            if bbc.contains(coord) {
                continue;
            }

            let escape_cell = BoundingBox::from_point(coord).min_cell(grid_step_deg);
            new_cells.extend(escape_cell.block(1).filter(|c| !covered.contains(c)));
        }

        if !new_cells.is_empty() {
            let mut cells: Vec<Cell> = new_cells.into_iter().collect();
            cells.sort_unstable();
            result.insert(id, cells);
        }
    }

    result
}
