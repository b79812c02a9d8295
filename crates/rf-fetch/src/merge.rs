//! Cell-rectangle merging.
//!
//! A batch download covers a set of grid cells; issuing one query per cell
//! would be wasteful, so adjacent cells are merged into axis-aligned
//! rectangles.  The greedy merge is order-sensitive, so it runs twice —
//! once sweeping rows first, once columns first — and the cheaper result
//! (fewer rectangles) wins.

use crate::grid::{BoundingBox, Cell};

/// Inclusive cell rectangle `(x0, y0, x1, y1)`.
type CellRect = (i32, i32, i32, i32);

/// Merge `cells` into bounding boxes, returning `(base, expanded)` twins:
/// the base boxes for road queries and the same boxes grown by
/// `expand_deg` for stop queries (stops sit next to roads, possibly in
/// the neighboring cell).
pub fn optimize_cells(
    cells: &[Cell],
    step_deg: f64,
    expand_deg: f64,
) -> (Vec<BoundingBox>, Vec<BoundingBox>) {
    let horizontal = merge_rects(cells, true);
    let vertical = merge_rects(cells, false);

    let rects = if horizontal.len() <= vertical.len() { horizontal } else { vertical };

    let base: Vec<BoundingBox> = rects
        .iter()
        .map(|&(x0, y0, x1, y1)| BoundingBox::from_cell_rect(x0, y0, x1, y1, step_deg))
        .collect();
    let expanded = base.iter().map(|bb| bb.extend_deg(expand_deg)).collect();

    (base, expanded)
}

/// One merge strategy: two passes of the pairwise merge, with sort orders
/// chosen so the first pass joins runs along one axis and the second
/// stacks those runs along the other.
fn merge_rects(cells: &[Cell], start_horizontal: bool) -> Vec<CellRect> {
    if cells.is_empty() {
        return Vec::new();
    }

    let mut rects: Vec<CellRect> = cells.iter().map(|c| (c.x, c.y, c.x, c.y)).collect();

    if start_horizontal {
        rects.sort_unstable_by_key(|r| (r.1, r.0));
    } else {
        rects.sort_unstable_by_key(|r| (r.0, r.1));
    }
    rects = merge_pass(rects);

    if start_horizontal {
        rects.sort_unstable_by_key(|r| (r.0, r.1));
    } else {
        rects.sort_unstable_by_key(|r| (r.1, r.0));
    }
    merge_pass(rects)
}

/// Merge consecutive rectangles that tile exactly, horizontally or
/// vertically.
fn merge_pass(sorted: Vec<CellRect>) -> Vec<CellRect> {
    let mut result = Vec::new();
    let mut iter = sorted.into_iter();
    let mut current = iter.next().expect("merge_pass input is non-empty");

    for next in iter {
        if current.2 + 1 == next.0 && current.1 == next.1 && current.3 == next.3 {
            // Extend to the right.
            current = (current.0, current.1, next.2, current.3);
        } else if current.3 + 1 == next.1 && current.0 == next.0 && current.2 == next.2 {
            // Extend upward.
            current = (current.0, current.1, current.2, next.3);
        } else {
            result.push(current);
            current = next;
        }
    }

    result.push(current);
    result
}
