//! Best-path tracking and the multi-criterion comparator.

use rustc_hash::{FxHashMap, FxHashSet};

use rf_core::ElementId;
use rf_net::GraphKey;

/// Distance below which two float lengths are treated as equal.
const TIE_TOLERANCE_M: f64 = 0.1;

/// Extra distance one additional stop is worth to the comparator.
pub const MAX_EXTRA_DISTANCE_TO_CONVERT_M: f64 = 1_000.0;

// ── BestPath ──────────────────────────────────────────────────────────────────

/// A candidate result: the path plus the aggregates the comparator ranks.
#[derive(Clone, Debug, Default)]
pub struct BestPath {
    pub path: Vec<GraphKey>,
    /// Stop id → path position at first visitation, wrong-side visits
    /// included.
    pub visited_stops: FxHashMap<ElementId, usize>,
    pub stops_count: usize,
    pub almost_stops_count: usize,
    /// Cumulative traversal length, metres.
    pub length: f64,
    /// Distinct segments traversed.
    pub complete_path: FxHashSet<ElementId>,
    /// Summed length of `complete_path`, metres.
    pub complete_length: f64,
    /// Accumulated deviation-from-straight, degrees.
    pub angle_sum: f64,
}

impl BestPath {
    /// The empty candidate every real path beats.
    pub fn zero() -> Self {
        Self::default()
    }

    /// `true` when `challenger` strictly outranks `self`.  Ties keep the
    /// incumbent, which makes worker merges monotone: the earlier worker
    /// wins equal candidates.
    ///
    /// Ranking, lexicographic with sub-decimetre tie tolerance:
    /// 1. larger `complete_length`;
    /// 2. a stop-count delta convertible to extra distance, up to
    ///    [`MAX_EXTRA_DISTANCE_TO_CONVERT_M`] per stop;
    /// 3. larger `stops_count`, then larger `almost_stops_count`;
    /// 4. shorter `length`;
    /// 5. smaller `angle_sum`.
    pub fn loses_to(&self, challenger: &Self) -> bool {
        let mut complete_diff = challenger.complete_length - self.complete_length;
        if complete_diff.abs() < TIE_TOLERANCE_M {
            complete_diff = 0.0;
        }

        if complete_diff > 0.0 {
            return true;
        }
        if complete_diff < 0.0 {
            return false;
        }

        let mut length_diff = challenger.length - self.length;
        if length_diff.abs() < TIE_TOLERANCE_M {
            length_diff = 0.0;
        }

        let stops_diff = challenger.stops_count as i64 - self.stops_count as i64;
        let almost_diff = challenger.almost_stops_count as i64 - self.almost_stops_count as i64;

        // A stop gained from the wrong-side pool may cost extra distance,
        // and a stop lost to it may save some — within the budget.
        if stops_diff != 0 && stops_diff + almost_diff == 0 {
            let max_convert = MAX_EXTRA_DISTANCE_TO_CONVERT_M * stops_diff as f64;

            if length_diff < max_convert && max_convert < 0.0 {
                return true;
            }
            if 0.0 < max_convert && max_convert < length_diff {
                return false;
            }
        }

        if stops_diff > 0 {
            return true;
        }
        if stops_diff < 0 {
            return false;
        }

        if almost_diff > 0 {
            return true;
        }
        if almost_diff < 0 {
            return false;
        }

        if length_diff < 0.0 {
            return true;
        }
        if length_diff > 0.0 {
            return false;
        }

        self.angle_sum > challenger.angle_sum
    }
}

// ── BestPaths ─────────────────────────────────────────────────────────────────

/// The two candidates tracked separately: the best path that reaches the
/// end segment (`valid`) and the best path overall (`invalid`).
#[derive(Clone, Debug)]
pub struct BestPaths {
    pub invalid: BestPath,
    pub valid: BestPath,
}

impl BestPaths {
    pub fn zero() -> Self {
        Self { invalid: BestPath::zero(), valid: BestPath::zero() }
    }

    /// Fold a worker's result in.  `self` is the earlier candidate and
    /// survives ties.
    pub fn merge(self, other: BestPaths) -> BestPaths {
        BestPaths {
            invalid: if self.invalid.loses_to(&other.invalid) { other.invalid } else { self.invalid },
            valid: if self.valid.loses_to(&other.valid) { other.valid } else { self.valid },
        }
    }

    /// The search result: `valid` when any path reached the end, else the
    /// best overall attempt.
    pub fn into_result(self) -> BestPath {
        if self.valid.path.is_empty() { self.invalid } else { self.valid }
    }
}
