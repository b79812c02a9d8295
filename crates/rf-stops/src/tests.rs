//! Unit tests for rf-stops.

#[cfg(test)]
mod helpers {
    use rf_core::tags::tag_map;
    use rf_core::{Coord, ElementId, ElementKind};

    use crate::feature::StopFeature;

    /// Build a stop feature at `(lat, lon)`.  `pt` is the
    /// `public_transport` tag value; `explicit` adds `highway=bus_stop`.
    pub fn feature(id: i64, pt: &str, lat: f64, lon: f64, name: &str, explicit: bool) -> StopFeature {
        let mut tags = tag_map([("public_transport", pt), ("name", name)]);
        if explicit {
            tags.insert("highway".to_owned(), "bus_stop".to_owned());
        }
        StopFeature::from_element(
            ElementId::Native(id),
            ElementKind::Node,
            Coord::new(lat, lon),
            tags,
        )
        .unwrap()
    }

    /// ~1 m in degrees of latitude.
    pub const M: f64 = 1.0 / 111_111.0;
}

// ── Feature construction ──────────────────────────────────────────────────────

#[cfg(test)]
mod feature {
    use rf_core::tags::tag_map;
    use rf_core::{Coord, ElementId, ElementKind};

    use crate::feature::{PtKind, StopFeature};

    fn build(tags: rf_core::TagMap) -> Option<StopFeature> {
        StopFeature::from_element(
            ElementId::Native(1),
            ElementKind::Node,
            Coord::new(0.0, 0.0),
            tags,
        )
    }

    #[test]
    fn unsupported_public_transport_skipped() {
        assert!(build(tag_map([("public_transport", "station")])).is_none());
        assert!(build(tag_map([("name", "X")])).is_none());
    }

    #[test]
    fn local_ref_appended_unless_redundant() {
        let f = build(tag_map([
            ("public_transport", "platform"),
            ("name", "Main St"),
            ("local_ref", "02"),
        ]))
        .unwrap();
        assert_eq!(f.name, "Main St 02");
        assert_eq!(f.group_key, "main st 002");

        let f = build(tag_map([
            ("public_transport", "platform"),
            ("name", "Main St 02"),
            ("local_ref", "02"),
        ]))
        .unwrap();
        assert_eq!(f.name, "Main St 02");
    }

    #[test]
    fn pt_kind_parsed() {
        let p = build(tag_map([("public_transport", "platform")])).unwrap();
        assert_eq!(p.pt, PtKind::Platform);
        let s = build(tag_map([("public_transport", "stop_position")])).unwrap();
        assert_eq!(s.pt, PtKind::StopPosition);
    }
}

// ── Clustering ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod cluster {
    use super::helpers::{feature, M};
    use crate::cluster::build_collections;

    #[test]
    fn platform_and_stop_pair_by_name() {
        let collections = build_collections(
            vec![
                feature(1, "platform", 0.0, 0.0, "Main St", false),
                feature(2, "stop_position", 10.0 * M, 0.0, "Main St", false),
            ],
            50.0,
        );

        assert_eq!(collections.len(), 1);
        let c = &collections[0];
        assert_eq!(c.platform.as_ref().unwrap().id, 1.into());
        assert_eq!(c.stop.as_ref().unwrap().id, 2.into());
    }

    #[test]
    fn distant_features_form_separate_collections() {
        let collections = build_collections(
            vec![
                feature(1, "platform", 0.0, 0.0, "Main St", false),
                feature(2, "platform", 500.0 * M, 0.0, "Main St", false),
            ],
            50.0,
        );
        assert_eq!(collections.len(), 2);
    }

    #[test]
    fn unnamed_dropped_next_to_named() {
        let collections = build_collections(
            vec![
                feature(1, "platform", 0.0, 0.0, "Main St", false),
                feature(2, "platform", 5.0 * M, 0.0, "", false),
            ],
            50.0,
        );

        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].best().id, 1.into());
    }

    #[test]
    fn lone_unnamed_survives() {
        let collections =
            build_collections(vec![feature(1, "platform", 0.0, 0.0, "", false)], 50.0);
        assert_eq!(collections.len(), 1);
    }

    #[test]
    fn explicit_platform_preferred_over_implicit() {
        let collections = build_collections(
            vec![
                feature(1, "platform", 0.0, 0.0, "Main St", false),
                feature(2, "platform", 5.0 * M, 0.0, "Main St", true),
                feature(3, "stop_position", 10.0 * M, 0.0, "Main St", false),
            ],
            50.0,
        );

        assert_eq!(collections.len(), 1);
        let c = &collections[0];
        assert_eq!(c.platform.as_ref().unwrap().id, 2.into(), "explicit wins");
        assert_eq!(c.stop.as_ref().unwrap().id, 3.into());
    }

    #[test]
    fn two_by_two_assignment_minimizes_distance() {
        // Platforms at 0 m and 100 m; stops at 95 m and 5 m.  Nearest
        // pairing is 1↔5, 2↔4, not the id-order pairing.
        let collections = build_collections(
            vec![
                feature(1, "platform", 0.0, 0.0, "Main St", true),
                feature(2, "platform", 30.0 * M, 0.0, "Main St", true),
                feature(4, "stop_position", 28.0 * M, 0.0, "Main St", false),
                feature(5, "stop_position", 2.0 * M, 0.0, "Main St", false),
            ],
            50.0,
        );

        assert_eq!(collections.len(), 2);
        let by_platform = |pid: i64| {
            collections
                .iter()
                .find(|c| c.platform.as_ref().unwrap().id == pid.into())
                .unwrap()
        };
        assert_eq!(by_platform(1).stop.as_ref().unwrap().id, 5.into());
        assert_eq!(by_platform(2).stop.as_ref().unwrap().id, 4.into());
    }

    #[test]
    fn single_stop_shared_across_platforms() {
        let collections = build_collections(
            vec![
                feature(1, "platform", 0.0, 0.0, "Main St", true),
                feature(2, "platform", 20.0 * M, 0.0, "Main St", true),
                feature(3, "stop_position", 10.0 * M, 0.0, "Main St", false),
            ],
            50.0,
        );

        assert_eq!(collections.len(), 2);
        for c in &collections {
            assert_eq!(c.stop.as_ref().unwrap().id, 3.into());
        }
    }

    #[test]
    fn platforms_never_shared_across_explicit_stops() {
        let collections = build_collections(
            vec![
                feature(1, "stop_position", 0.0, 0.0, "Main St", true),
                feature(2, "stop_position", 20.0 * M, 0.0, "Main St", true),
                feature(3, "platform", 10.0 * M, 0.0, "Main St", false),
            ],
            50.0,
        );

        assert_eq!(collections.len(), 2);
        for c in &collections {
            assert!(c.platform.is_none(), "platform reuse is not permitted");
            assert!(c.stop.is_some());
        }
    }

    #[test]
    fn short_name_group_expands_into_numbered_group() {
        // "Dworzec" (stop, no number) folds into "Dworzec 01" (platform):
        // subset token match scores 1.0 and the roles are disjoint.
        let collections = build_collections(
            vec![
                feature(1, "platform", 0.0, 0.0, "Dworzec 01", false),
                feature(2, "stop_position", 5.0 * M, 0.0, "Dworzec", false),
            ],
            50.0,
        );

        assert_eq!(collections.len(), 1);
        let c = &collections[0];
        assert_eq!(c.platform.as_ref().unwrap().id, 1.into());
        assert_eq!(c.stop.as_ref().unwrap().id, 2.into());
    }

    #[test]
    fn numbered_groups_with_different_numbers_stay_apart() {
        let collections = build_collections(
            vec![
                feature(1, "platform", 0.0, 0.0, "Dworzec 01", false),
                feature(2, "stop_position", 5.0 * M, 0.0, "Dworzec 02", false),
            ],
            50.0,
        );
        assert_eq!(collections.len(), 2);
    }

    #[test]
    fn groups_sharing_roles_do_not_merge() {
        // Both groups contain platforms; expansion must not merge them.
        let collections = build_collections(
            vec![
                feature(1, "platform", 0.0, 0.0, "Dworzec 01", false),
                feature(2, "platform", 5.0 * M, 0.0, "Dworzec", false),
            ],
            50.0,
        );
        assert_eq!(collections.len(), 2);
    }

    #[test]
    fn empty_input() {
        assert!(build_collections(Vec::new(), 50.0).is_empty());
    }
}

// ── Membership flags ──────────────────────────────────────────────────────────

#[cfg(test)]
mod member {
    use rf_core::{ElementKind, RelationMember};

    use super::helpers::{feature, M};
    use crate::feature::StopCollection;
    use crate::member::assign_member_flags;

    #[test]
    fn unique_platform_marks_whole_collection() {
        let collections = vec![StopCollection::new(
            Some(feature(1, "platform", 0.0, 0.0, "A", false)),
            Some(feature(2, "stop_position", M, 0.0, "A", false)),
        )];
        let members = vec![RelationMember::new(ElementKind::Node, 1.into(), "platform")];

        let result = assign_member_flags(collections, &members);
        assert_eq!(result[0].platform.as_ref().unwrap().member, Some(true));
        assert_eq!(result[0].stop.as_ref().unwrap().member, Some(true));
    }

    #[test]
    fn shared_stop_is_not_a_membership_signal() {
        let shared = feature(9, "stop_position", 0.0, 0.0, "A", false);
        let collections = vec![
            StopCollection::new(None, Some(shared.clone())),
            StopCollection::new(None, Some(shared)),
        ];
        let members = vec![RelationMember::new(ElementKind::Node, 9.into(), "stop")];

        let result = assign_member_flags(collections, &members);
        for c in &result {
            assert_eq!(c.stop.as_ref().unwrap().member, None);
        }
    }

    #[test]
    fn stop_marks_only_platformless_collections() {
        let collections = vec![StopCollection::new(
            Some(feature(1, "platform", 0.0, 0.0, "A", false)),
            Some(feature(2, "stop_position", M, 0.0, "A", false)),
        )];
        let members = vec![RelationMember::new(ElementKind::Node, 2.into(), "stop")];

        let result = assign_member_flags(collections, &members);
        // The platform was not a member, so the stop alone says nothing.
        assert_eq!(result[0].stop.as_ref().unwrap().member, None);
    }
}

// ── Ordering ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod order {
    use rustc_hash::{FxHashMap, FxHashSet};

    use rf_core::Coord;
    use rf_net::{build_segments, RawWay};

    use super::helpers::feature;
    use crate::feature::StopCollection;
    use crate::order::{sort_on_path, INTERPOLATE_THRESHOLD_M};

    /// One straight south→north segment of the given latitude span.
    fn straight_segment(lat_span: f64) -> rf_net::Segment {
        let tags = rf_core::tags::tag_map([("highway", "residential")]);
        let ways = [RawWay { id: 1, nodes: vec![1, 2], tags, member: true }];
        let coords: FxHashMap<i64, Coord> = [
            (1, Coord::new(0.0, 0.0)),
            (2, Coord::new(lat_span, 0.0)),
        ]
        .into_iter()
        .collect();

        let set = build_segments(&ways, &coords, &FxHashSet::default()).unwrap();
        set.segments.into_values().next().unwrap()
    }

    #[test]
    fn stops_ordered_along_segment() {
        // ~700 m segment; 60 m interpolation gives 12 steps, so the 1/3
        // and 2/3 points land exactly on samples 4 and 8.
        let span = 0.0063;
        let segment = straight_segment(span);

        let first = StopCollection::new(
            Some(feature(10, "platform", span / 3.0, 0.0, "First", false)),
            None,
        );
        let second = StopCollection::new(
            Some(feature(11, "platform", 2.0 * span / 3.0, 0.0, "Second", false)),
            None,
        );

        // Feed them out of order; the sort index restores path order.
        let sorted = sort_on_path(
            &[second.clone(), first.clone()],
            [&segment],
            INTERPOLATE_THRESHOLD_M,
        )
        .unwrap();

        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].collection.best().id, 10.into());
        assert_eq!(sorted[1].collection.best().id, 11.into());
        assert!(sorted[0].sort_index < sorted[1].sort_index);

        for entry in &sorted {
            assert!(entry.distance_m <= 1.0, "distance {}", entry.distance_m);
            assert_eq!(entry.neighbor, segment.id);
        }
    }

    #[test]
    fn east_of_northbound_is_right_hand_side() {
        // A stop 5 m east of a northbound segment sits on the right.
        let segment = straight_segment(0.01);
        let east = StopCollection::new(
            Some(feature(10, "platform", 0.005, 5.0 / 111_111.0, "E", false)),
            None,
        );
        let west = StopCollection::new(
            Some(feature(11, "platform", 0.005, -5.0 / 111_111.0, "W", false)),
            None,
        );

        let sorted =
            sort_on_path(&[east, west], [&segment], INTERPOLATE_THRESHOLD_M).unwrap();

        let by_id = |id: i64| sorted.iter().find(|e| e.collection.best().id == id.into()).unwrap();
        assert_eq!(by_id(10).right_hand_side, Some(true));
        assert_eq!(by_id(11).right_hand_side, Some(false));
    }

    #[test]
    fn no_segments_is_an_error() {
        let c = StopCollection::new(Some(feature(1, "platform", 0.0, 0.0, "A", false)), None);
        let no_segments = std::iter::empty::<&rf_net::Segment>();
        assert!(sort_on_path(&[c], no_segments, INTERPOLATE_THRESHOLD_M).is_err());
    }
}
