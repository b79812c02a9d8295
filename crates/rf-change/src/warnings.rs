//! Post-hoc route auditing.
//!
//! Every check is advisory: the route is publishable either way, but the
//! UI surfaces these so the mapper can judge whether the repair did what
//! they meant.

use rustc_hash::{FxHashMap, FxHashSet};

use rf_core::{ElementId, RelationMember};
use rf_net::Segment;
use rf_search::FinalRoute;
use rf_stops::{sort_on_path, StopCollection, INTERPOLATE_THRESHOLD_M};

/// A stop further than this from the route polyline is suspicious.
const FAR_STOP_THRESHOLD_M: f64 = 120.0;

// ── Warning type ──────────────────────────────────────────────────────────────

/// Warning weight; reports sort by descending rank.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Severity {
    Low,
    High,
    /// Not a defect: the member list matches the stored relation, so
    /// uploading would be a no-op.
    Unchanged,
}

impl Severity {
    fn rank(self) -> u8 {
        match self {
            Severity::Low => 0,
            Severity::High => 1,
            Severity::Unchanged => 10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RouteWarning {
    pub severity: Severity,
    pub message: String,
    pub extra: Vec<ElementId>,
}

impl RouteWarning {
    fn new(severity: Severity, message: &str) -> Self {
        Self { severity, message: message.to_owned(), extra: Vec::new() }
    }

    fn with_extra(severity: Severity, message: &str, mut extra: Vec<ElementId>) -> Self {
        extra.sort_unstable();
        Self { severity, message: message.to_owned(), extra }
    }
}

// ── Checks ────────────────────────────────────────────────────────────────────

/// Run every check against the finalized route.  `segments` is the
/// member set the search ran on; `collections` the full input stop set;
/// `relation_members` the stored relation's member list.
pub fn check_route(
    route: &FinalRoute,
    segments: &FxHashMap<ElementId, Segment>,
    end_way: ElementId,
    collections: &[StopCollection],
    relation_members: &[RelationMember],
) -> Vec<RouteWarning> {
    let mut warnings: Vec<RouteWarning> = [
        check_unused_ways(route, segments),
        check_end_not_reached(route, end_way),
        check_far_stops(route, segments, collections),
        check_stops_not_reached(route, collections),
        check_too_few_stops(route),
        check_roundtrip_shape(route),
        check_members_unchanged(route, relation_members),
    ]
    .into_iter()
    .flatten()
    .collect();

    warnings.sort_by_key(|w| std::cmp::Reverse(w.severity.rank()));
    warnings
}

fn check_unused_ways(
    route: &FinalRoute,
    segments: &FxHashMap<ElementId, Segment>,
) -> Option<RouteWarning> {
    let used = route.way_ids();
    let unused: Vec<ElementId> = segments.keys().filter(|id| !used.contains(id)).copied().collect();

    (!unused.is_empty())
        .then(|| RouteWarning::with_extra(Severity::High, "Some ways are not used", unused))
}

fn check_end_not_reached(route: &FinalRoute, end_way: ElementId) -> Option<RouteWarning> {
    (!route.way_ids().contains(&end_way))
        .then(|| RouteWarning::new(Severity::High, "The stop point is not reached"))
}

fn check_far_stops(
    route: &FinalRoute,
    segments: &FxHashMap<ElementId, Segment>,
    collections: &[StopCollection],
) -> Option<RouteWarning> {
    if route.ways.is_empty() || collections.is_empty() {
        return None;
    }

    let route_segments: Vec<&Segment> = route
        .ways
        .iter()
        .filter_map(|w| segments.get(&w.way))
        .collect();

    let sorted = sort_on_path(collections, route_segments, INTERPOLATE_THRESHOLD_M).ok()?;
    let far: Vec<ElementId> = sorted
        .iter()
        .filter(|entry| entry.distance_m > FAR_STOP_THRESHOLD_M)
        .map(|entry| entry.collection.best().id)
        .collect();

    (!far.is_empty())
        .then(|| RouteWarning::with_extra(Severity::Low, "Some stops are far away", far))
}

fn check_stops_not_reached(
    route: &FinalRoute,
    collections: &[StopCollection],
) -> Option<RouteWarning> {
    if route.stops.len() == collections.len() {
        return None;
    }

    let reached: FxHashSet<ElementId> = route.stops.iter().map(|c| c.best().id).collect();
    let missing: Vec<ElementId> = collections
        .iter()
        .map(|c| c.best().id)
        .filter(|id| !reached.contains(id))
        .collect();

    Some(RouteWarning::with_extra(
        Severity::High,
        "Some stops are not reached",
        missing,
    ))
}

fn check_too_few_stops(route: &FinalRoute) -> Option<RouteWarning> {
    (route.stops.len() < 2)
        .then(|| RouteWarning::new(Severity::High, "The route has less than 2 stops"))
}

fn check_roundtrip_shape(route: &FinalRoute) -> Option<RouteWarning> {
    if !route.roundtrip() || route.coords.is_empty() {
        return None;
    }

    (route.coords.first() != route.coords.last())
        .then(|| RouteWarning::new(Severity::Low, "The route is not a valid roundtrip"))
}

fn check_members_unchanged(
    route: &FinalRoute,
    relation_members: &[RelationMember],
) -> Option<RouteWarning> {
    (route.members == relation_members)
        .then(|| RouteWarning::new(Severity::Unchanged, "The route is unchanged"))
}
