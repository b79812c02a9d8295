//! Stop clustering: form one [`StopCollection`] per physical stop.
//!
//! The pipeline, in order:
//!
//! 1. group features into *area components* — transitive closure of
//!    "within the search radius" over a spatial index;
//! 2. inside each area, group by normalized name key and drop the unnamed
//!    group when named groups exist;
//! 3. expand short-name groups into fuzzy-matching long-name groups when
//!    their number sets agree and the groups cover disjoint
//!    public-transport roles;
//! 4. split each surviving group into platforms and stop positions,
//!    prefer explicitly tagged features, and pair the two sides.

use std::collections::BTreeMap;

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashSet;

use rf_core::geo::haversine_rad;
use rf_core::name::extract_numbers;
use rf_core::{CoordRad, EARTH_RADIUS_M};

use crate::feature::{PtKind, StopCollection, StopFeature};

/// Minimum token-ratio similarity (0–1) for name-group expansion.
const EXPAND_SIMILARITY: f64 = 0.89;

// ── Spatial index entry ───────────────────────────────────────────────────────

/// A feature position in radian space with its input index.
#[derive(Clone)]
struct FeatureEntry {
    point: [f64; 2], // [lat_rad, lon_rad]
    idx: usize,
}

impl RTreeObject for FeatureEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for FeatureEntry {
    /// Squared Euclidean distance in radian space.  Queries enlarge their
    /// radius by `1/cos(lat)` and re-check with true haversine, so the
    /// longitude distortion cannot drop neighbors.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let d_lat = self.point[0] - point[0];
        let d_lon = self.point[1] - point[1];
        d_lat * d_lat + d_lon * d_lon
    }
}

// ── Union-find ────────────────────────────────────────────────────────────────

/// Minimal union-find for the area-component grouping.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            self.parent[i] = self.find(self.parent[i]);
        }
        self.parent[i]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Attach the larger root under the smaller, keeping component
            // representatives stable under input order.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

// ── Fuzzy name similarity ─────────────────────────────────────────────────────

/// Token-ratio similarity in `[0, 1]`: the maximum of the token-sort and
/// token-set Levenshtein ratios, over whitespace tokens.
fn token_ratio(a: &str, b: &str) -> f64 {
    let ta: std::collections::BTreeSet<&str> = a.split_whitespace().collect();
    let tb: std::collections::BTreeSet<&str> = b.split_whitespace().collect();

    let join = |tokens: &[&str]| tokens.join(" ");

    let inter: Vec<&str> = ta.intersection(&tb).copied().collect();
    let only_a: Vec<&str> = ta.difference(&tb).copied().collect();
    let only_b: Vec<&str> = tb.difference(&ta).copied().collect();

    let s_inter = join(&inter);
    let s_a = join(&inter.iter().chain(&only_a).copied().collect::<Vec<_>>());
    let s_b = join(&inter.iter().chain(&only_b).copied().collect::<Vec<_>>());

    let sorted_a = join(&ta.iter().copied().collect::<Vec<_>>());
    let sorted_b = join(&tb.iter().copied().collect::<Vec<_>>());

    let token_sort = strsim::normalized_levenshtein(&sorted_a, &sorted_b);
    let token_set = strsim::normalized_levenshtein(&s_inter, &s_a)
        .max(strsim::normalized_levenshtein(&s_inter, &s_b))
        .max(strsim::normalized_levenshtein(&s_a, &s_b));

    token_sort.max(token_set)
}

// ── Clustering ────────────────────────────────────────────────────────────────

/// Group stop features into collections.  `search_radius_m` is the area
/// grouping radius (default 50 m via `EngineConfig::stop_search_m`).
pub fn build_collections(
    mut features: Vec<StopFeature>,
    search_radius_m: f64,
) -> Vec<StopCollection> {
    if features.is_empty() {
        return Vec::new();
    }

    // Deterministic processing order regardless of fetch order.
    features.sort_by_key(|f| (f.kind, f.id));

    let points: Vec<[f64; 2]> = features
        .iter()
        .map(|f| {
            let r = f.coord.to_radians();
            [r.lat, r.lon]
        })
        .collect();

    let tree = RTree::bulk_load(
        points
            .iter()
            .enumerate()
            .map(|(idx, &point)| FeatureEntry { point, idx })
            .collect(),
    );

    // Area components: union everything within the search radius.
    let radius_rad = search_radius_m / EARTH_RADIUS_M;
    let mut areas = UnionFind::new(features.len());

    for (i, &point) in points.iter().enumerate() {
        let query_radius = radius_rad / point[0].cos().abs().max(1e-9);
        for entry in tree.locate_within_distance(point, query_radius * query_radius) {
            if entry.idx == i {
                continue;
            }
            let a = CoordRad { lat: point[0], lon: point[1] };
            let b = CoordRad { lat: entry.point[0], lon: entry.point[1] };
            if haversine_rad(a, b) <= search_radius_m {
                areas.union(i, entry.idx);
            }
        }
    }

    let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..features.len() {
        components.entry(areas.find(i)).or_default().push(i);
    }

    let mut collections = Vec::new();

    for indices in components.into_values() {
        let area_group: Vec<StopFeature> =
            indices.into_iter().map(|i| features[i].clone()).collect();
        cluster_area(area_group, &mut collections);
    }

    collections
}

/// Steps 2–4 for one area component.
fn cluster_area(area_group: Vec<StopFeature>, collections: &mut Vec<StopCollection>) {
    // Group by normalized name key.
    let mut name_groups: BTreeMap<String, Vec<StopFeature>> = BTreeMap::new();
    for feature in area_group {
        name_groups
            .entry(feature.group_key.clone())
            .or_default()
            .push(feature);
    }

    // Unnamed features are noise once a named group exists nearby.
    if name_groups.len() > 1 {
        name_groups.remove("");
    }

    if name_groups.len() > 1 {
        expand_name_groups(&mut name_groups);
    }

    for (key, group) in &name_groups {
        pair_group(key, group, collections);
    }
}

/// Step 3: merge fuzzy-matching name groups.
///
/// Each group key is scored against every other key; keys are processed by
/// descending total similarity (shorter keys first on ties), and a group is
/// folded into every sufficiently similar target whose number set matches
/// (or the source has none) and whose public-transport roles are disjoint
/// from the source's.  Folded sources are dropped.
fn expand_name_groups(name_groups: &mut BTreeMap<String, Vec<StopFeature>>) {
    let keys: Vec<String> = name_groups.keys().cloned().collect();

    // (source key, [(target key, similarity)]) — self-matches contribute
    // to the ordering score but are skipped during application.
    let mut expand_data: Vec<(String, Vec<(String, f64)>)> = keys
        .iter()
        .map(|key| {
            let matches: Vec<(String, f64)> = keys
                .iter()
                .map(|target| (target.clone(), token_ratio(key, target)))
                .filter(|(_, score)| *score >= EXPAND_SIMILARITY)
                .collect();
            (key.clone(), matches)
        })
        .collect();

    expand_data.sort_by_key(|(key, matches)| {
        let total: f64 = matches.iter().map(|(_, s)| s).sum();
        (std::cmp::Reverse((total * 1_000.0) as i64), key.len())
    });

    for (expand_key, targets) in expand_data {
        let Some(expand_group) = name_groups.get(&expand_key).cloned() else {
            continue;
        };

        let expand_numbers = extract_numbers(&expand_key);
        let expand_pts: FxHashSet<PtKind> = expand_group.iter().map(|f| f.pt).collect();
        let mut expanded = false;

        for (target_key, score) in targets {
            if target_key == expand_key {
                continue;
            }

            // Expand non-numeric into numeric, or numeric into numeric
            // only when the number sets agree.
            if !expand_numbers.is_empty() && expand_numbers != extract_numbers(&target_key) {
                continue;
            }

            // Target may have been folded away earlier.
            let Some(target_group) = name_groups.get_mut(&target_key) else {
                continue;
            };
            if target_group.is_empty() {
                continue;
            }

            // Only merge when the source brings roles the target lacks.
            if target_group.iter().any(|f| expand_pts.contains(&f.pt)) {
                continue;
            }

            log::debug!(
                "[{:5.1}] expanded {expand_key:?} into {target_key:?}, id={}",
                score * 100.0,
                expand_group[0].nice_id(),
            );
            target_group.extend(expand_group.iter().cloned());
            expanded = true;
        }

        if expanded {
            name_groups.remove(&expand_key);
        }
    }
}

/// Step 4: split one name group into platforms and stops, then pair.
fn pair_group(key: &str, group: &[StopFeature], collections: &mut Vec<StopCollection>) {
    let mut platforms: Vec<StopFeature> = Vec::new();
    let mut stops: Vec<StopFeature> = Vec::new();

    for feature in group {
        match feature.pt {
            PtKind::Platform => platforms.push(feature.clone()),
            PtKind::StopPosition => stops.push(feature.clone()),
        }
    }

    platforms.sort_by_key(|f| (f.kind, f.id));
    stops.sort_by_key(|f| (f.kind, f.id));

    let (platforms_explicit, platforms_implicit): (Vec<_>, Vec<_>) =
        platforms.iter().cloned().partition(StopFeature::explicit);
    let (stops_explicit, stops_implicit): (Vec<_>, Vec<_>) =
        stops.iter().cloned().partition(StopFeature::explicit);

    if !platforms_explicit.is_empty() && !stops_explicit.is_empty() {
        log::warn!(
            "explicit platforms and explicit stops both present for {key:?}, id={}",
            stops_explicit[0].nice_id(),
        );
    }

    if !platforms_explicit.is_empty() {
        let assigned = assign(&platforms_explicit, &stops, true);
        for (platform, stop) in platforms_explicit.into_iter().zip(assigned) {
            collections.push(StopCollection::new(Some(platform), stop));
        }
    } else if !stops_explicit.is_empty() {
        let assigned = assign(&stops_explicit, &platforms, false);
        for (stop, platform) in stops_explicit.into_iter().zip(assigned) {
            collections.push(StopCollection::new(platform, Some(stop)));
        }
    } else if !platforms_implicit.is_empty() && !stops_implicit.is_empty() {
        let assigned = assign(&platforms_implicit, &stops, true);
        for (platform, stop) in platforms_implicit.into_iter().zip(assigned) {
            collections.push(StopCollection::new(Some(platform), stop));
        }
    } else if !platforms_implicit.is_empty() {
        for platform in platforms_implicit {
            collections.push(StopCollection::new(Some(platform), None));
        }
    } else {
        for stop in stops_implicit {
            collections.push(StopCollection::new(None, Some(stop)));
        }
    }
}

// ── Pairing assignment ────────────────────────────────────────────────────────

/// Assign one element to each primary feature.
///
/// With at least as many elements as primaries the assignment minimizes
/// total pairwise distance (rectangular Kuhn–Munkres); with fewer elements
/// they are shared by nearest neighbor, but only when `element_reuse`
/// permits.  Results are in primary order.
fn assign(
    primary: &[StopFeature],
    elements: &[StopFeature],
    element_reuse: bool,
) -> Vec<Option<StopFeature>> {
    match elements.len() {
        0 => vec![None; primary.len()],

        1 => {
            if !element_reuse && primary.len() > 1 {
                vec![None; primary.len()]
            } else {
                vec![Some(elements[0].clone()); primary.len()]
            }
        }

        _ if elements.len() < primary.len() => {
            if !element_reuse {
                return vec![None; primary.len()];
            }
            primary
                .iter()
                .map(|p| {
                    let nearest = elements
                        .iter()
                        .enumerate()
                        .min_by_key(|(idx, e)| (distance_mm(p, e), *idx))
                        .map(|(_, e)| e.clone());
                    nearest
                })
                .collect()
        }

        _ => {
            // Rectangular assignment: rows = primaries, columns = elements.
            let rows: Vec<Vec<i64>> = primary
                .iter()
                .map(|p| elements.iter().map(|e| distance_mm(p, e)).collect())
                .collect();

            let weights = pathfinding::matrix::Matrix::from_rows(rows)
                .expect("assignment matrix rows share a length");
            let (_, assignment) = pathfinding::kuhn_munkres::kuhn_munkres_min(&weights);

            assignment
                .into_iter()
                .map(|col| Some(elements[col].clone()))
                .collect()
        }
    }
}

/// Integer millimetre distance — `Ord` for deterministic minimization.
#[inline]
fn distance_mm(a: &StopFeature, b: &StopFeature) -> i64 {
    (a.coord.distance_m(b.coord) * 1_000.0) as i64
}
