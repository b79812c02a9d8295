//! Unit tests for rf-search.
//!
//! Networks are tiny hand-crafted lattices; the search runs with two
//! workers and a generous deadline unless the test is about the deadline.

#[cfg(test)]
mod helpers {
    use std::time::{Duration, Instant};

    use rustc_hash::{FxHashMap, FxHashSet};

    use rf_core::tags::tag_map;
    use rf_core::{Coord, ElementId};
    use rf_net::{build_segments, DirectedGraph, RawWay, Segment, SegmentSet};
    use rf_stops::SortedStopEntry;

    use crate::best::BestPath;
    use crate::dfs::search;

    pub fn way(id: i64, nodes: &[i64], extra: &[(&str, &str)]) -> RawWay {
        let mut tags = tag_map([("highway", "residential")]);
        for (k, v) in extra {
            tags.insert((*k).to_owned(), (*v).to_owned());
        }
        RawWay { id, nodes: nodes.to_vec(), tags, member: true }
    }

    pub fn ingest(ways: &[RawWay], nodes: &[(i64, f64, f64)]) -> SegmentSet {
        let coords: FxHashMap<i64, Coord> = nodes
            .iter()
            .map(|&(n, lat, lon)| (n, Coord::new(lat, lon)))
            .collect();
        build_segments(ways, &coords, &FxHashSet::default()).unwrap()
    }

    pub fn run(
        set: &SegmentSet,
        start: ElementId,
        end: ElementId,
        stop_map: &FxHashMap<ElementId, Vec<SortedStopEntry>>,
    ) -> BestPath {
        let members: FxHashMap<ElementId, Segment> = set.members();
        let graph = DirectedGraph::build(&members, &set.adjacency);
        search(
            &graph,
            &members,
            start,
            end,
            stop_map,
            2,
            Instant::now() + Duration::from_secs(30),
        )
        .unwrap()
    }

    pub fn no_stops() -> FxHashMap<ElementId, Vec<SortedStopEntry>> {
        FxHashMap::default()
    }
}

// ── Comparator ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod comparator {
    use crate::best::BestPath;

    fn candidate(complete: f64, length: f64, stops: usize, almost: usize, angle: f64) -> BestPath {
        BestPath {
            complete_length: complete,
            length,
            stops_count: stops,
            almost_stops_count: almost,
            angle_sum: angle,
            ..BestPath::zero()
        }
    }

    #[test]
    fn reflexive_ties_keep_incumbent() {
        let a = candidate(500.0, 700.0, 3, 1, 45.0);
        assert!(!a.loses_to(&a.clone()));
    }

    #[test]
    fn antisymmetric() {
        let a = candidate(500.0, 700.0, 3, 0, 45.0);
        let b = candidate(600.0, 900.0, 2, 0, 10.0);
        assert!(a.loses_to(&b));
        assert!(!b.loses_to(&a));
    }

    #[test]
    fn completeness_dominates_everything() {
        let short = candidate(500.0, 500.0, 5, 0, 0.0);
        let complete = candidate(600.0, 2_000.0, 0, 0, 360.0);
        assert!(short.loses_to(&complete));
    }

    #[test]
    fn sub_decimetre_completeness_is_a_tie() {
        let a = candidate(500.0, 700.0, 1, 0, 0.0);
        let b = candidate(500.05, 700.0, 0, 0, 0.0);
        // Completeness ties; a has more stops, so b never wins.
        assert!(!a.loses_to(&b));
        assert!(b.loses_to(&a));
    }

    #[test]
    fn extra_stop_converts_to_limited_distance() {
        // Challenger turns a wrong-side stop into a proper one at the cost
        // of 500 m — within the 1 000 m conversion budget.
        let incumbent = candidate(500.0, 700.0, 0, 1, 0.0);
        let cheap = candidate(500.0, 1_200.0, 1, 0, 0.0);
        assert!(incumbent.loses_to(&cheap));

        // The same conversion at 1 500 m extra is too expensive.
        let expensive = candidate(500.0, 2_200.0, 1, 0, 0.0);
        assert!(!incumbent.loses_to(&expensive));
    }

    #[test]
    fn more_stops_then_shorter_then_straighter() {
        let base = candidate(500.0, 700.0, 2, 0, 45.0);

        assert!(base.loses_to(&candidate(500.0, 700.0, 3, 0, 45.0)));
        assert!(base.loses_to(&candidate(500.0, 700.0, 2, 1, 45.0)));
        assert!(base.loses_to(&candidate(500.0, 600.0, 2, 0, 45.0)));
        assert!(base.loses_to(&candidate(500.0, 700.0, 2, 0, 30.0)));

        assert!(!base.loses_to(&candidate(500.0, 800.0, 2, 0, 45.0)));
        assert!(!base.loses_to(&candidate(500.0, 700.0, 1, 0, 45.0)));
    }
}

// ── Search scenarios ──────────────────────────────────────────────────────────

#[cfg(test)]
mod scenarios {
    use rf_core::ElementId;
    use rf_net::GraphKey;

    use super::helpers::{ingest, no_stops, run, way};

    #[test]
    fn single_segment_route() {
        // One linear segment, no intersections: the route is that piece.
        let set = ingest(
            &[way(1, &[1, 2, 3], &[])],
            &[(1, 0.0, 0.0), (2, 0.0, 0.001), (3, 0.0, 0.002)],
        );
        let id = ElementId::Native(1);

        let best = run(&set, id, id, &no_stops());
        assert_eq!(best.path.len(), 1);
        assert_eq!(best.path[0].way, id);
        assert_eq!(best.complete_path.len(), 1);
    }

    #[test]
    fn t_intersection_ignores_the_branch() {
        let set = ingest(
            &[way(1, &[1, 2, 3], &[]), way(2, &[2, 4], &[])],
            &[
                (1, 0.0, 0.0),
                (2, 0.0, 0.001),
                (3, 0.0, 0.002),
                (4, 0.001, 0.001),
            ],
        );

        let p1 = ElementId::Piece { native: 1, index: 1, of: 2 };
        let p2 = ElementId::Piece { native: 1, index: 2, of: 2 };

        let best = run(&set, p1, p2, &no_stops());
        let ways: Vec<ElementId> = best.path.iter().map(|k| k.way).collect();
        assert_eq!(ways, vec![p1, p2]);
    }

    #[test]
    fn oneway_shortcut_taken() {
        // A=[1,2,3,4] two-way, B=[2,3] oneway forward.  Edges ~600 m, so a
        // detour covering both B and A's middle piece exceeds the loop
        // budget and dies; the shortcut path is found first and kept.
        let set = ingest(
            &[way(1, &[1, 2, 3, 4], &[]), way(2, &[2, 3], &[("oneway", "yes")])],
            &[
                (1, 0.0, 0.0),
                (2, 0.0, 0.0054),
                (3, 0.0, 0.0108),
                (4, 0.0, 0.0162),
            ],
        );

        let p1 = ElementId::Piece { native: 1, index: 1, of: 3 };
        let p3 = ElementId::Piece { native: 1, index: 3, of: 3 };
        let b = ElementId::Native(2);

        let best = run(&set, p1, p3, &no_stops());
        let ways: Vec<ElementId> = best.path.iter().map(|k| k.way).collect();
        assert_eq!(ways, vec![p1, b, p3]);
        assert!(best.path.iter().all(|k| k.start), "all traversed forward");
    }

    #[test]
    fn roundabout_exit_choice_and_free_angles() {
        // Ring [10,11,12,10] tagged junction=roundabout, radial A enters
        // at 10, radial C leaves at 12, radial B at 11 is a distractor.
        let roundabout: &[(&str, &str)] = &[("junction", "roundabout")];
        let set = ingest(
            &[
                way(1, &[1, 10], &[]),
                way(2, &[2, 11], &[]),
                way(3, &[3, 12], &[]),
                way(4, &[10, 11, 12, 10], roundabout),
            ],
            &[
                (1, -0.001, -0.001),
                (2, 0.001, 0.002),
                (3, 0.003, 0.0),
                (10, 0.0, 0.0),
                (11, 0.001, 0.001),
                (12, 0.002, 0.0),
            ],
        );

        let a = ElementId::Native(1);
        let c = ElementId::Native(3);
        let r1 = ElementId::Piece { native: 4, index: 1, of: 3 };
        let r2 = ElementId::Piece { native: 4, index: 2, of: 3 };

        let best = run(&set, a, c, &no_stops());
        let ways: Vec<ElementId> = best.path.iter().map(|k| k.way).collect();
        assert_eq!(ways, vec![a, r1, r2, c]);

        // The last segment is entered at its far end (C runs 3 -> 12).
        assert_eq!(*best.path.last().unwrap(), GraphKey::new(c, false));

        // Turns inside and out of the roundabout cost nothing.
        assert_eq!(best.angle_sum, 0.0);
    }

    #[test]
    fn search_prefers_reaching_the_end() {
        // The branch toward node 4 covers more network, but only the path
        // reaching the end segment is a valid result.
        let set = ingest(
            &[way(1, &[1, 2], &[]), way(2, &[2, 3], &[]), way(3, &[2, 4, 5, 6], &[])],
            &[
                (1, 0.0, 0.0),
                (2, 0.0, 0.001),
                (3, 0.0, 0.002),
                (4, 0.001, 0.001),
                (5, 0.002, 0.001),
                (6, 0.003, 0.001),
            ],
        );

        let best = run(&set, ElementId::Native(1), ElementId::Native(2), &no_stops());
        let ways: Vec<ElementId> = best.path.iter().map(|k| k.way).collect();
        assert_eq!(ways, vec![ElementId::Native(1), ElementId::Native(2)]);
    }
}

// ── Stop crediting ────────────────────────────────────────────────────────────

#[cfg(test)]
mod stop_credit {
    use rf_core::tags::tag_map;
    use rf_core::{Coord, ElementId, ElementKind};
    use rf_stops::{by_neighbor, sort_on_path, StopCollection, StopFeature, INTERPOLATE_THRESHOLD_M};

    use super::helpers::{ingest, run, way};

    fn east_stop_collection(lat: f64) -> StopCollection {
        let feature = StopFeature::from_element(
            ElementId::Native(100),
            ElementKind::Node,
            Coord::new(lat, 5.0 / 111_111.0),
            tag_map([("public_transport", "platform"), ("name", "East")]),
        )
        .unwrap();
        StopCollection::new(Some(feature), None)
    }

    #[test]
    fn wrong_side_visit_counts_as_almost() {
        // A runs south->north with a stop on its right (east); the only
        // route from B to A traverses A southbound, so the stop is
        // credited as almost-visited.
        let set = ingest(
            &[way(1, &[1, 2], &[]), way(2, &[2, 3], &[])],
            &[(1, 0.0, 0.0), (2, 0.01, 0.0), (3, 0.02, 0.0)],
        );
        let a = ElementId::Native(1);
        let b = ElementId::Native(2);

        let a_segment = set.segments[&a].clone();
        let sorted = sort_on_path(
            &[east_stop_collection(0.005)],
            [&a_segment],
            INTERPOLATE_THRESHOLD_M,
        )
        .unwrap();
        assert_eq!(sorted[0].right_hand_side, Some(true));
        let stop_map = by_neighbor(sorted);

        let best = run(&set, b, a, &stop_map);
        let ways: Vec<ElementId> = best.path.iter().map(|k| k.way).collect();
        assert_eq!(ways, vec![b, a]);

        assert_eq!(best.stops_count, 0);
        assert_eq!(best.almost_stops_count, 1);
        // The union map still records the visit position.
        assert!(best.visited_stops.contains_key(&ElementId::Native(100)));
    }

    #[test]
    fn proper_side_visit_counts_as_visited() {
        // Same stop, route traversing A northbound.
        let set = ingest(
            &[way(1, &[1, 2], &[]), way(2, &[2, 3], &[])],
            &[(1, 0.0, 0.0), (2, 0.01, 0.0), (3, 0.02, 0.0)],
        );
        let a = ElementId::Native(1);
        let b = ElementId::Native(2);

        let a_segment = set.segments[&a].clone();
        let sorted = sort_on_path(
            &[east_stop_collection(0.005)],
            [&a_segment],
            INTERPOLATE_THRESHOLD_M,
        )
        .unwrap();
        let stop_map = by_neighbor(sorted);

        let best = run(&set, a, b, &stop_map);
        assert_eq!(best.stops_count, 1);
        assert_eq!(best.almost_stops_count, 0);
    }
}

// ── Deadline ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod deadline {
    use std::time::{Duration, Instant};

    use rustc_hash::FxHashMap;

    use rf_core::ElementId;
    use rf_net::DirectedGraph;

    use super::helpers::{ingest, way};
    use crate::dfs::search;
    use crate::SearchError;

    #[test]
    fn elapsed_deadline_times_out() {
        let set = ingest(
            &[way(1, &[1, 2], &[])],
            &[(1, 0.0, 0.0), (2, 0.0, 0.001)],
        );
        let members = set.members();
        let graph = DirectedGraph::build(&members, &set.adjacency);

        let result = search(
            &graph,
            &members,
            ElementId::Native(1),
            ElementId::Native(1),
            &FxHashMap::default(),
            2,
            Instant::now() - Duration::from_secs(1),
        );
        assert!(matches!(result, Err(SearchError::Timeout)));
    }

    #[test]
    fn unknown_start_is_rejected() {
        let set = ingest(
            &[way(1, &[1, 2], &[])],
            &[(1, 0.0, 0.0), (2, 0.0, 0.001)],
        );
        let members = set.members();
        let graph = DirectedGraph::build(&members, &set.adjacency);

        let result = search(
            &graph,
            &members,
            ElementId::Native(99),
            ElementId::Native(1),
            &FxHashMap::default(),
            2,
            Instant::now() + Duration::from_secs(30),
        );
        assert!(matches!(result, Err(SearchError::MissingSegment(_))));
    }
}

// ── Finalization ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod finalize {
    use rustc_hash::FxHashMap;

    use rf_core::tags::tag_map;
    use rf_core::{Coord, ElementId, ElementKind, TagMap};
    use rf_net::GraphKey;
    use rf_stops::{StopCollection, StopFeature};

    use super::helpers::{ingest, way};
    use crate::best::BestPath;
    use crate::finalize::finalize_route;

    fn platform(id: i64, coord: Coord) -> StopFeature {
        StopFeature::from_element(
            ElementId::Native(id),
            ElementKind::Node,
            coord,
            tag_map([("public_transport", "platform"), ("name", "P")]),
        )
        .unwrap()
    }

    fn stop_position(id: i64, coord: Coord) -> StopFeature {
        StopFeature::from_element(
            ElementId::Native(id),
            ElementKind::Node,
            coord,
            tag_map([("public_transport", "stop_position"), ("name", "P")]),
        )
        .unwrap()
    }

    #[test]
    fn polyline_deduplicates_shared_endpoints() {
        let set = ingest(
            &[way(1, &[1, 2], &[]), way(2, &[2, 3], &[])],
            &[(1, 0.0, 0.0), (2, 0.0, 0.001), (3, 0.0, 0.002)],
        );

        let best = BestPath {
            path: vec![
                GraphKey::new(ElementId::Native(1), true),
                GraphKey::new(ElementId::Native(2), true),
            ],
            ..BestPath::zero()
        };

        let route = finalize_route(&best, &set.segments, &[], TagMap::new());
        assert_eq!(route.coords.len(), 3, "shared node 2 appears once");
        assert_eq!(route.ways.len(), 2);
        assert!(!route.ways[0].reversed);
    }

    #[test]
    fn reversed_way_contributes_reversed_coords() {
        let set = ingest(
            &[way(1, &[1, 2], &[])],
            &[(1, 0.0, 0.0), (2, 0.0, 0.001)],
        );

        let best = BestPath {
            path: vec![GraphKey::new(ElementId::Native(1), false)],
            ..BestPath::zero()
        };

        let route = finalize_route(&best, &set.segments, &[], TagMap::new());
        assert!(route.ways[0].reversed);
        assert_eq!(route.coords[0], Coord::new(0.0, 0.001));
        assert_eq!(route.coords[1], Coord::new(0.0, 0.0));
    }

    #[test]
    fn off_polyline_stop_position_dropped_platform_kept() {
        let set = ingest(
            &[way(1, &[1, 2], &[])],
            &[(1, 0.0, 0.0), (2, 0.0, 0.001)],
        );

        // Stop position exactly on node 2 survives; the off-route one is
        // dropped, keeping its platform.
        let on_route = StopCollection::new(
            Some(platform(100, Coord::new(0.00005, 0.0005))),
            Some(stop_position(101, Coord::new(0.0, 0.001))),
        );
        let off_route = StopCollection::new(
            Some(platform(200, Coord::new(0.0001, 0.0008))),
            Some(stop_position(201, Coord::new(0.005, 0.005))),
        );
        // A stop-only collection off the polyline disappears entirely.
        let gone = StopCollection::new(None, Some(stop_position(300, Coord::new(0.01, 0.01))));

        let mut visited: FxHashMap<ElementId, usize> = FxHashMap::default();
        visited.insert(ElementId::Native(100), 1);
        visited.insert(ElementId::Native(200), 2);
        visited.insert(ElementId::Native(300), 3);

        let best = BestPath {
            path: vec![GraphKey::new(ElementId::Native(1), true)],
            visited_stops: visited,
            ..BestPath::zero()
        };

        let route = finalize_route(
            &best,
            &set.segments,
            &[on_route, off_route, gone],
            TagMap::new(),
        );

        assert_eq!(route.stops.len(), 2);
        assert!(route.stops[0].stop.is_some(), "on-polyline stop kept");
        assert!(route.stops[1].stop.is_none(), "off-polyline stop dropped");
        assert!(route.stops[1].platform.is_some());
    }

    #[test]
    fn stops_ordered_by_first_visit() {
        let set = ingest(
            &[way(1, &[1, 2], &[])],
            &[(1, 0.0, 0.0), (2, 0.0, 0.001)],
        );

        let first = StopCollection::new(Some(platform(100, Coord::new(0.0, 0.0))), None);
        let second = StopCollection::new(Some(platform(200, Coord::new(0.0, 0.001))), None);

        let mut visited: FxHashMap<ElementId, usize> = FxHashMap::default();
        visited.insert(ElementId::Native(200), 5);
        visited.insert(ElementId::Native(100), 2);

        let best = BestPath {
            path: vec![GraphKey::new(ElementId::Native(1), true)],
            visited_stops: visited,
            ..BestPath::zero()
        };

        let route = finalize_route(&best, &set.segments, &[second, first], TagMap::new());
        assert_eq!(route.stops[0].best().id, ElementId::Native(100));
        assert_eq!(route.stops[1].best().id, ElementId::Native(200));
    }
}
