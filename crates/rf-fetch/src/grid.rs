//! Bounding boxes and the download grid.

use std::collections::BTreeSet;
use std::fmt;

use rf_core::{Coord, EARTH_RADIUS_M};

// ── BoundingBox ───────────────────────────────────────────────────────────────

/// An axis-aligned geographic box.
///
/// `Display` renders the Overpass wire form — `minlat,minlon,maxlat,maxlon`
/// at six-decimal precision.
#[derive(Copy, Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub minlat: f64,
    pub minlon: f64,
    pub maxlat: f64,
    pub maxlon: f64,
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6},{:.6},{:.6},{:.6}",
            self.minlat, self.minlon, self.maxlat, self.maxlon,
        )
    }
}

impl BoundingBox {
    pub fn new(minlat: f64, minlon: f64, maxlat: f64, maxlon: f64) -> Self {
        Self { minlat, minlon, maxlat, maxlon }
    }

    /// The degenerate box covering a single point.
    pub fn from_point(point: Coord) -> Self {
        Self::new(point.lat, point.lon, point.lat, point.lon)
    }

    /// Grow by `meters` on every side.  The longitude delta is scaled by
    /// the latitude so the expansion is metric, not angular.
    pub fn extend_m(self, meters: f64) -> Self {
        let lat_delta = (meters / EARTH_RADIUS_M).to_degrees();
        let lon_delta = (meters / (EARTH_RADIUS_M * self.minlat.to_radians().cos())).to_degrees();

        Self {
            minlat: self.minlat - lat_delta,
            minlon: self.minlon - lon_delta,
            maxlat: self.maxlat + lat_delta,
            maxlon: self.maxlon + lon_delta,
        }
    }

    /// Grow by `degrees` on every side.
    pub fn extend_deg(self, degrees: f64) -> Self {
        Self {
            minlat: self.minlat - degrees,
            minlon: self.minlon - degrees,
            maxlat: self.maxlat + degrees,
            maxlon: self.maxlon + degrees,
        }
    }

    pub fn contains(self, point: Coord) -> bool {
        self.minlat <= point.lat
            && point.lat <= self.maxlat
            && self.minlon <= point.lon
            && point.lon <= self.maxlon
    }

    /// The grid cell of the box's min corner.
    pub fn min_cell(self, step_deg: f64) -> Cell {
        Cell {
            x: (self.minlon / step_deg).floor() as i32,
            y: (self.minlat / step_deg).floor() as i32,
        }
    }

    /// All grid cells the box touches.
    pub fn cells(self, step_deg: f64) -> BTreeSet<Cell> {
        let min = self.min_cell(step_deg);
        let max = Cell {
            x: (self.maxlon / step_deg).floor() as i32,
            y: (self.maxlat / step_deg).floor() as i32,
        };

        let mut cells = BTreeSet::new();
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                cells.insert(Cell { x, y });
            }
        }
        cells
    }

    /// The box covering a rectangle of grid cells (inclusive corners).
    pub fn from_cell_rect(x0: i32, y0: i32, x1: i32, y1: i32, step_deg: f64) -> Self {
        Self {
            minlat: y0 as f64 * step_deg,
            minlon: x0 as f64 * step_deg,
            maxlat: (y1 + 1) as f64 * step_deg,
            maxlon: (x1 + 1) as f64 * step_deg,
        }
    }
}

// ── Cell ──────────────────────────────────────────────────────────────────────

/// One square of the download grid.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, serde::Serialize, serde::Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    /// The `(2r+1) x (2r+1)` block of cells centered here.
    pub fn block(self, radius: i32) -> impl Iterator<Item = Cell> {
        let center = self;
        (-radius..=radius).flat_map(move |dx| {
            (-radius..=radius).map(move |dy| Cell { x: center.x + dx, y: center.y + dy })
        })
    }
}
