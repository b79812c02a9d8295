//! Geographic coordinate types and the geometry kernel.
//!
//! Coordinates use `f64` latitude/longitude.  The side-of-travel test relies
//! on the sign of a cross product of near-parallel vectors a few metres
//! apart, where `f32` rounding flips signs; everything downstream therefore
//! stays in double precision.
//!
//! A parallel radian form ([`CoordRad`]) exists for hot loops — polyline
//! interpolation and nearest-sample queries convert once at the edge and
//! never call `to_radians()` per iteration.

/// Mean Earth radius in metres, shared by every distance computation.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

// ── Coord ─────────────────────────────────────────────────────────────────────

/// A WGS-84 geographic coordinate in degrees.
///
/// Invariant: `-90 <= lat <= 90`, `-180 <= lon <= 180`.  The engine never
/// produces coordinates outside this range; inputs are trusted from the
/// query service.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    #[inline]
    pub fn to_radians(self) -> CoordRad {
        CoordRad {
            lat: self.lat.to_radians(),
            lon: self.lon.to_radians(),
        }
    }

    /// Haversine great-circle distance in metres.
    #[inline]
    pub fn distance_m(self, other: Coord) -> f64 {
        haversine_rad(self.to_radians(), other.to_radians())
    }

    /// Bit-exact key for set membership.  Polyline endpoint matching relies
    /// on exact equality of untouched coordinate values, so the key is the
    /// raw bit pattern rather than a rounded form.
    #[inline]
    pub fn bits(self) -> (u64, u64) {
        (self.lat.to_bits(), self.lon.to_bits())
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

// ── CoordRad ──────────────────────────────────────────────────────────────────

/// A coordinate pre-converted to radians.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CoordRad {
    pub lat: f64,
    pub lon: f64,
}

/// Haversine great-circle distance over radian inputs, in metres.
pub fn haversine_rad(a: CoordRad, b: CoordRad) -> f64 {
    let d_lat = b.lat - a.lat;
    let d_lon = b.lon - a.lon;

    let h = (d_lat * 0.5).sin().powi(2) + a.lat.cos() * b.lat.cos() * (d_lon * 0.5).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Subdivide the segment `a -> b` into evenly spaced radian points no more
/// than `threshold_m` apart.
///
/// Returns `a` plus the interior points; `b` itself is excluded so that
/// chaining consecutive segments never duplicates a shared vertex.  A
/// degenerate segment (`a == b`, or shorter than the threshold) yields
/// just `[a]`.
pub fn interpolate_rad(a: CoordRad, b: CoordRad, threshold_m: f64) -> Vec<CoordRad> {
    let distance = haversine_rad(a, b);
    let steps = (distance / threshold_m) as usize + 1;

    let mut result = Vec::with_capacity(steps);
    result.push(a);

    if steps > 1 {
        // Equirectangular: linear in lat/lon is accurate well below the
        // 60 m default threshold.
        let d_lat = (b.lat - a.lat) / steps as f64;
        let d_lon = (b.lon - a.lon) / steps as f64;

        for i in 1..steps {
            result.push(CoordRad {
                lat: a.lat + d_lat * i as f64,
                lon: a.lon + d_lon * i as f64,
            });
        }
    }

    result
}

// ── Side-of-travel ────────────────────────────────────────────────────────────

/// Which side of the directed edge `a -> b` does `test` lie on?
///
/// `Some(true)` = right-hand side, `Some(false)` = left-hand side, `None`
/// exactly when `test` coincides with `a` or `b`.  The sign comes from the
/// z component of the 2-D cross product of `(b - a)` and `(test - b)`;
/// uniform scaling does not change it, so degree and radian inputs agree.
pub fn side_of_travel(a: CoordRad, b: CoordRad, test: CoordRad) -> Option<bool> {
    if test == a || test == b {
        return None;
    }

    let v1 = (b.lat - a.lat, b.lon - a.lon);
    let v2 = (test.lat - b.lat, test.lon - b.lon);

    let cross_z = v1.0 * v2.1 - v1.1 * v2.0;
    Some(cross_z > 0.0)
}

// ── Polyline helpers ──────────────────────────────────────────────────────────

/// Total haversine length of a polyline in metres.
pub fn polyline_length(coords: &[Coord]) -> f64 {
    coords
        .windows(2)
        .map(|w| w[0].distance_m(w[1]))
        .sum()
}

/// The point halfway along a polyline by accumulated length.
///
/// Walks the vertices until half the total length is covered, then
/// interpolates within the covering edge.  A single-vertex polyline returns
/// that vertex.
pub fn polyline_midpoint(coords: &[Coord]) -> Coord {
    debug_assert!(!coords.is_empty());

    if coords.len() == 1 {
        return coords[0];
    }

    let distances: Vec<f64> = coords.windows(2).map(|w| w[0].distance_m(w[1])).collect();
    let half = distances.iter().sum::<f64>() / 2.0;

    let mut accumulated = 0.0;
    for (w, d) in coords.windows(2).zip(&distances) {
        accumulated += d;
        if accumulated >= half {
            let ratio = if *d > 0.0 { 1.0 - (accumulated - half) / d } else { 0.0 };
            return Coord {
                lat: w[0].lat + (w[1].lat - w[0].lat) * ratio,
                lon: w[0].lon + (w[1].lon - w[0].lon) * ratio,
            };
        }
    }

    // Zero-length polyline (all vertices coincident).
    coords[0]
}
