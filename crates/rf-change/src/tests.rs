//! Unit tests for rf-change.

#[cfg(test)]
mod helpers {
    use rustc_hash::{FxHashMap, FxHashSet};

    use rf_core::tags::tag_map;
    use rf_core::{Coord, ElementId, ElementKind, TagMap};
    use rf_net::{build_segments, RawWay, SegmentSet};
    use rf_search::{FinalRoute, RouteWay};
    use rf_stops::{StopCollection, StopFeature};

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

    pub fn platform(id: i64, coord: Coord) -> StopFeature {
        StopFeature::from_element(
            ElementId::Native(id),
            ElementKind::Node,
            coord,
            tag_map([("public_transport", "platform"), ("name", "P")]),
        )
        .unwrap()
    }

    pub fn stop_position(id: i64, coord: Coord) -> StopFeature {
        StopFeature::from_element(
            ElementId::Native(id),
            ElementKind::Node,
            coord,
            tag_map([("public_transport", "stop_position"), ("name", "P")]),
        )
        .unwrap()
    }

    pub fn platform_collection(id: i64) -> StopCollection {
        StopCollection::new(Some(platform(id, Coord::new(0.0, 0.0))), None)
    }

    /// A route over the given forward ways with the given stops.
    pub fn route(ways: &[ElementId], stops: Vec<StopCollection>, tags: TagMap) -> FinalRoute {
        FinalRoute {
            ways: ways.iter().map(|&way| RouteWay { way, reversed: false }).collect(),
            coords: Vec::new(),
            stops,
            tags,
            extra_ways: Vec::new(),
            members: Vec::new(),
        }
    }
}

// ── Member synthesis ──────────────────────────────────────────────────────────

#[cfg(test)]
mod members {
    use rf_core::tags::tag_map;
    use rf_core::{Coord, ElementId, ElementKind, RelationMember, TagMap};
    use rf_stops::StopCollection;

    use super::helpers::{platform, platform_collection, route, stop_position};
    use crate::members::synthesize_members;

    #[test]
    fn entry_and_exit_suffixes() {
        let r = route(
            &[ElementId::Native(1)],
            vec![
                platform_collection(10),
                platform_collection(11),
                platform_collection(12),
            ],
            TagMap::new(),
        );

        let members = synthesize_members(&r, &[]);
        let roles: Vec<&str> = members.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["platform_entry_only", "platform", "platform_exit_only", ""]);
        assert_eq!(members[3].kind, ElementKind::Way);
    }

    #[test]
    fn stop_precedes_platform_within_a_collection() {
        let collection = StopCollection::new(
            Some(platform(10, Coord::new(0.0, 0.0))),
            Some(stop_position(20, Coord::new(0.0, 0.0))),
        );
        let r = route(&[ElementId::Native(1)], vec![collection], TagMap::new());

        let members = synthesize_members(&r, &[]);
        assert_eq!(members[0].id, ElementId::Native(20));
        assert!(members[0].role.starts_with("stop"));
        assert_eq!(members[1].id, ElementId::Native(10));
        assert!(members[1].role.starts_with("platform"));
    }

    #[test]
    fn roundtrip_suppresses_suffixes_and_closes_the_ring() {
        let r = route(
            &[ElementId::Native(1)],
            vec![platform_collection(10), platform_collection(11)],
            tag_map([("roundtrip", "yes")]),
        );

        let members = synthesize_members(&r, &[]);
        let ids: Vec<ElementId> = members.iter().map(|m| m.id).collect();
        // Trailing pair leads the list; no suffixes anywhere.
        assert_eq!(
            ids,
            vec![
                ElementId::Native(11),
                ElementId::Native(10),
                ElementId::Native(11),
                ElementId::Native(1),
            ]
        );
        assert!(members.iter().all(|m| !m.role.contains("only")));
    }

    #[test]
    fn extended_roles_preserved() {
        // The stored relation marks the middle platform exit-only; the
        // expected plain role is a prefix, so the stored role survives.
        let r = route(
            &[ElementId::Native(1)],
            vec![
                platform_collection(10),
                platform_collection(11),
                platform_collection(12),
            ],
            TagMap::new(),
        );
        let existing = vec![RelationMember::new(
            ElementKind::Node,
            ElementId::Native(11),
            "platform_exit_only",
        )];

        let members = synthesize_members(&r, &existing);
        assert_eq!(members[1].role, "platform_exit_only");
    }

    #[test]
    fn way_roles_reset_unless_custom() {
        let r = route(
            &[ElementId::Native(1), ElementId::Native(2)],
            vec![],
            TagMap::new(),
        );
        let existing = vec![
            RelationMember::new(ElementKind::Way, ElementId::Native(1), "forward"),
            RelationMember::new(ElementKind::Way, ElementId::Native(2), "hail_and_ride"),
        ];

        let members = synthesize_members(&r, &existing);
        assert_eq!(members[0].role, "", "reserved roles are rewritten");
        assert_eq!(members[1].role, "hail_and_ride", "custom roles survive");
    }
}

// ── Piece unsplitting ─────────────────────────────────────────────────────────

#[cfg(test)]
mod unsplit {
    use rf_core::ElementId;

    use crate::members::simplify_way_ids;

    fn piece(native: i64, index: u16, of: u16) -> ElementId {
        ElementId::Piece { native, index, of }
    }

    #[test]
    fn ascending_run_collapses() {
        let ids = [piece(5, 1, 3), piece(5, 2, 3), piece(5, 3, 3), ElementId::Native(7)];
        assert_eq!(
            simplify_way_ids(&ids),
            vec![ElementId::Native(5), ElementId::Native(7)]
        );
    }

    #[test]
    fn descending_run_collapses() {
        let ids = [piece(5, 3, 3), piece(5, 2, 3), piece(5, 1, 3)];
        assert_eq!(simplify_way_ids(&ids), vec![ElementId::Native(5)]);
    }

    #[test]
    fn partial_runs_stay_split() {
        let ids = [piece(5, 1, 3), ElementId::Native(7), piece(5, 3, 3)];
        assert_eq!(simplify_way_ids(&ids), ids.to_vec());
    }

    #[test]
    fn out_of_order_runs_stay_split() {
        let ids = [piece(5, 1, 3), piece(5, 3, 3), piece(5, 2, 3)];
        assert_eq!(simplify_way_ids(&ids), ids.to_vec());
    }

    #[test]
    fn mid_route_start_stays_split() {
        let ids = [piece(5, 2, 3), piece(5, 3, 3)];
        assert_eq!(simplify_way_ids(&ids), ids.to_vec());
    }

    #[test]
    fn blacklisted_native_never_collapses() {
        // The second occurrence of the pieces is a complete run, but the
        // stray first occurrence blacklists the native id.
        let ids = [
            piece(5, 1, 2),
            ElementId::Native(7),
            piece(5, 1, 2),
            piece(5, 2, 2),
        ];
        assert_eq!(simplify_way_ids(&ids), ids.to_vec());
    }
}

// ── Warnings ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod warnings {
    use rf_core::tags::tag_map;
    use rf_core::{Coord, ElementId, TagMap};
    use rf_stops::StopCollection;

    use super::helpers::{ingest, platform, platform_collection, route, way};
    use crate::warnings::{check_route, Severity};

    #[test]
    fn single_segment_without_stops() {
        let set = ingest(&[way(1, &[1, 2], &[])], &[(1, 0.0, 0.0), (2, 0.0, 0.001)]);
        let id = ElementId::Native(1);
        let r = route(&[id], vec![], TagMap::new());

        let warnings = check_route(&r, &set.segments, id, &[], &[]);
        assert!(warnings
            .iter()
            .any(|w| w.severity == Severity::High && w.message.contains("less than 2 stops")));
        assert!(!warnings.iter().any(|w| w.message.contains("not used")));
        assert!(!warnings.iter().any(|w| w.message.contains("stop point")));
    }

    #[test]
    fn unused_ways_reported_with_ids() {
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
        let r = route(&[p1, p2], vec![], TagMap::new());

        let warnings = check_route(&r, &set.segments, p2, &[], &[]);
        let unused = warnings
            .iter()
            .find(|w| w.message.contains("not used"))
            .expect("unused-way warning");
        assert_eq!(unused.severity, Severity::High);
        assert_eq!(unused.extra, vec![ElementId::Native(2)]);
    }

    #[test]
    fn end_not_reached() {
        let set = ingest(&[way(1, &[1, 2], &[])], &[(1, 0.0, 0.0), (2, 0.0, 0.001)]);
        let r = route(&[ElementId::Native(1)], vec![], TagMap::new());

        let warnings = check_route(&r, &set.segments, ElementId::Native(99), &[], &[]);
        assert!(warnings.iter().any(|w| w.message.contains("stop point")));
    }

    #[test]
    fn far_stops_reported() {
        let set = ingest(&[way(1, &[1, 2], &[])], &[(1, 0.0, 0.0), (2, 0.01, 0.0)]);
        let id = ElementId::Native(1);

        // ~200 m east of the segment.
        let far = StopCollection::new(Some(platform(50, Coord::new(0.005, 0.0018))), None);
        let r = route(&[id], vec![far.clone()], TagMap::new());

        let warnings = check_route(&r, &set.segments, id, &[far], &[]);
        let warning = warnings
            .iter()
            .find(|w| w.message.contains("far away"))
            .expect("far-stop warning");
        assert_eq!(warning.severity, Severity::Low);
        assert_eq!(warning.extra, vec![ElementId::Native(50)]);
    }

    #[test]
    fn missing_stops_reported() {
        let set = ingest(&[way(1, &[1, 2], &[])], &[(1, 0.0, 0.0), (2, 0.0, 0.001)]);
        let id = ElementId::Native(1);
        let r = route(&[id], vec![], TagMap::new());

        let missing = platform_collection(60);
        let warnings = check_route(&r, &set.segments, id, &[missing], &[]);
        let warning = warnings
            .iter()
            .find(|w| w.message.contains("not reached"))
            .expect("missing-stop warning");
        assert_eq!(warning.extra, vec![ElementId::Native(60)]);
    }

    #[test]
    fn roundtrip_with_open_polyline() {
        let set = ingest(&[way(1, &[1, 2], &[])], &[(1, 0.0, 0.0), (2, 0.0, 0.001)]);
        let id = ElementId::Native(1);

        let mut r = route(&[id], vec![], tag_map([("roundtrip", "yes")]));
        r.coords = vec![Coord::new(0.0, 0.0), Coord::new(0.0, 0.001)];

        let warnings = check_route(&r, &set.segments, id, &[], &[]);
        assert!(warnings
            .iter()
            .any(|w| w.severity == Severity::Low && w.message.contains("roundtrip")));
    }

    #[test]
    fn unchanged_members_rank_first() {
        let set = ingest(&[way(1, &[1, 2], &[])], &[(1, 0.0, 0.0), (2, 0.0, 0.001)]);
        let id = ElementId::Native(1);

        let mut r = route(&[id], vec![], TagMap::new());
        r.members = vec![rf_core::RelationMember::new(
            rf_core::ElementKind::Way,
            id,
            "",
        )];
        let stored = r.members.clone();

        let warnings = check_route(&r, &set.segments, id, &[], &stored);
        assert_eq!(warnings[0].severity, Severity::Unchanged);
    }
}

// ── Change builder ────────────────────────────────────────────────────────────

#[cfg(test)]
mod change {
    use rustc_hash::FxHashMap;

    use rf_core::tags::tag_map;
    use rf_core::{ElementId, ElementKind, TagMap};
    use rf_fetch::{MemberDoc, ParentsResult, RelationDoc, WayDoc};

    use super::helpers::{ingest, route, way};
    use crate::change::{build_change, ChangeInputs, OsmChange};
    use crate::members::synthesize_members;
    use crate::ChangeError;

    fn way_doc(id: i64, version: u64, nodes: &[i64]) -> WayDoc {
        WayDoc {
            id,
            version: Some(version),
            tags: tag_map([("highway", "residential")]),
            nodes: nodes.to_vec(),
        }
    }

    fn member(kind: ElementKind, r#ref: i64, role: &str) -> MemberDoc {
        MemberDoc { kind, r#ref, role: role.to_owned() }
    }

    /// The oneway-shortcut fixture: A=[1,2,3,4] split at 2 and 3 by the
    /// oneway B=[2,3]; the route runs p1, B, p3.
    struct Fixture {
        set: rf_net::SegmentSet,
        route: rf_search::FinalRoute,
        relation: RelationDoc,
        way_docs: FxHashMap<i64, WayDoc>,
    }

    fn shortcut_fixture() -> Fixture {
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

        let relation = RelationDoc {
            id: 900,
            version: Some(3),
            tags: tag_map([("type", "route"), ("route", "bus")]),
            members: vec![
                member(ElementKind::Way, 1, ""),
                member(ElementKind::Way, 2, ""),
            ],
        };

        let mut r = route(&[p1, b, p3], vec![], TagMap::new());
        r.members = synthesize_members(&r, &relation.relation_members());

        let way_docs: FxHashMap<i64, WayDoc> =
            [(1, way_doc(1, 5, &[1, 2, 3, 4]))].into_iter().collect();

        Fixture { set, route: r, relation, way_docs }
    }

    fn build(fixture: &Fixture, parents: &ParentsResult) -> Result<OsmChange, ChangeError> {
        build_change(
            &fixture.route,
            &ChangeInputs {
                relation: fixture.relation.clone(),
                way_docs: &fixture.way_docs,
                parents,
                segments: &fixture.set.segments,
                pieces: &fixture.set.pieces,
            },
        )
    }

    #[test]
    fn split_emits_modify_and_consecutive_creates() {
        let fixture = shortcut_fixture();
        let change = build(&fixture, &ParentsResult::default()).unwrap();

        // Piece 1 keeps the native id and its version.
        assert_eq!(change.modify_ways.len(), 1);
        let piece1 = &change.modify_ways[0];
        assert_eq!(piece1.id, 1);
        assert_eq!(piece1.version, Some(5));
        assert_eq!(piece1.nodes, vec![1, 2]);

        // Later pieces take consecutive negative placeholders, unversioned.
        let created: Vec<(i64, &[i64])> = change
            .create_ways
            .iter()
            .map(|w| (w.id, w.nodes.as_slice()))
            .collect();
        assert_eq!(created, vec![(-1, &[2, 3][..]), (-2, &[3, 4][..])]);
        assert!(change.create_ways.iter().all(|w| w.version.is_none()));
    }

    #[test]
    fn negative_member_refs_match_created_elements() {
        let fixture = shortcut_fixture();
        let change = build(&fixture, &ParentsResult::default()).unwrap();

        let created: std::collections::BTreeSet<i64> =
            change.create_ways.iter().map(|w| w.id).collect();
        assert_eq!(created.len(), change.create_ways.len(), "unique create ids");

        for relation in &change.modify_relations {
            for m in relation.members.iter().filter(|m| m.r#ref < 0) {
                assert!(created.contains(&m.r#ref), "dangling placeholder {}", m.r#ref);
            }
        }
    }

    #[test]
    fn edited_relation_members_are_mapped() {
        let fixture = shortcut_fixture();
        let change = build(&fixture, &ParentsResult::default()).unwrap();

        let edited = change.modify_relations.last().unwrap();
        assert_eq!(edited.id, 900);
        assert_eq!(edited.version, Some(3), "version preserved on modify");

        let refs: Vec<i64> = edited.members.iter().map(|m| m.r#ref).collect();
        assert_eq!(refs, vec![1, 2, -2], "piece 1 -> native, B, piece 3 -> placeholder");
    }

    #[test]
    fn parent_relation_rewritten_forward() {
        let fixture = shortcut_fixture();

        let mut parents = ParentsResult::default();
        parents.relations_by_way.insert(
            1,
            vec![RelationDoc {
                id: 901,
                version: Some(8),
                tags: TagMap::new(),
                members: vec![
                    member(ElementKind::Way, 99, "alternate"),
                    member(ElementKind::Way, 1, "alternate"),
                ],
            }],
        );
        // Way 99 ends at node 1 — the chain's first node, forward order.
        parents.ways.insert(99, way_doc(99, 1, &[0, 1]));

        let change = build(&fixture, &parents).unwrap();
        let parent = change
            .modify_relations
            .iter()
            .find(|r| r.id == 901)
            .expect("rewritten parent");

        let refs: Vec<i64> = parent.members.iter().map(|m| m.r#ref).collect();
        assert_eq!(refs, vec![99, 1, -1, -2]);
        assert!(parent.members.iter().skip(1).all(|m| m.role == "alternate"));
    }

    #[test]
    fn parent_relation_rewritten_reversed() {
        let fixture = shortcut_fixture();

        let mut parents = ParentsResult::default();
        parents.relations_by_way.insert(
            1,
            vec![RelationDoc {
                id: 902,
                version: Some(2),
                tags: TagMap::new(),
                members: vec![
                    member(ElementKind::Way, 88, ""),
                    member(ElementKind::Way, 1, ""),
                ],
            }],
        );
        // Way 88 touches node 4 — the chain's last node, so the pieces run
        // backwards through this relation.
        parents.ways.insert(88, way_doc(88, 1, &[4, 9]));

        let change = build(&fixture, &parents).unwrap();
        let parent = change
            .modify_relations
            .iter()
            .find(|r| r.id == 902)
            .expect("rewritten parent");

        let refs: Vec<i64> = parent.members.iter().map(|m| m.r#ref).collect();
        assert_eq!(refs, vec![88, -2, -1, 1]);
    }

    #[test]
    fn insertion_stops_at_the_natural_junction() {
        let fixture = shortcut_fixture();

        let mut parents = ParentsResult::default();
        parents.relations_by_way.insert(
            1,
            vec![RelationDoc {
                id: 903,
                version: Some(1),
                tags: TagMap::new(),
                members: vec![
                    member(ElementKind::Way, 1, ""),
                    member(ElementKind::Way, 55, ""),
                ],
            }],
        );
        // Way 55 starts at node 2 — piece 1 already meets it, so the rest
        // of the chain does not belong in this relation.
        parents.ways.insert(55, way_doc(55, 1, &[2, 9]));

        let change = build(&fixture, &parents).unwrap();
        let parent = change
            .modify_relations
            .iter()
            .find(|r| r.id == 903)
            .expect("rewritten parent");

        let refs: Vec<i64> = parent.members.iter().map(|m| m.r#ref).collect();
        assert_eq!(refs, vec![1, 55]);
    }

    #[test]
    fn upstream_split_is_a_conflict() {
        let mut fixture = shortcut_fixture();
        // The stored way now spans exactly piece 1.
        fixture.way_docs.insert(1, way_doc(1, 6, &[1, 2]));

        let result = build(&fixture, &ParentsResult::default());
        assert!(matches!(result, Err(ChangeError::SplitConflict { way: 1 })));
    }
}

// ── osmChange XML ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod xml {
    use rf_core::tags::tag_map;
    use rf_core::ElementKind;
    use rf_fetch::{apply_changeset_id, changeset_placeholder, MemberDoc, RelationDoc, WayDoc};

    use crate::change::OsmChange;
    use crate::xml::{from_xml, to_xml};

    fn sample_change() -> OsmChange {
        OsmChange {
            create_ways: vec![WayDoc {
                id: -1,
                version: None,
                tags: tag_map([("highway", "residential")]),
                nodes: vec![2, 3],
            }],
            modify_ways: vec![WayDoc {
                id: 1,
                version: Some(5),
                tags: tag_map([("highway", "residential")]),
                nodes: vec![1, 2],
            }],
            modify_relations: vec![RelationDoc {
                id: 900,
                version: Some(3),
                tags: tag_map([("type", "route"), ("route", "bus")]),
                members: vec![
                    MemberDoc { kind: ElementKind::Node, r#ref: 10, role: "platform_entry_only".to_owned() },
                    MemberDoc { kind: ElementKind::Way, r#ref: 1, role: String::new() },
                    MemberDoc { kind: ElementKind::Way, r#ref: -1, role: String::new() },
                ],
            }],
        }
    }

    #[test]
    fn round_trip_preserves_the_model() {
        let change = sample_change();

        let xml = to_xml(&change, false).unwrap();
        let reparsed = from_xml(&xml).unwrap();
        assert_eq!(reparsed, change);

        // Serializing again yields the same model once more.
        let xml2 = to_xml(&reparsed, false).unwrap();
        assert_eq!(from_xml(&xml2).unwrap(), change);
    }

    #[test]
    fn upload_form_carries_the_placeholder() {
        let xml = to_xml(&sample_change(), true).unwrap();
        assert!(xml.contains(changeset_placeholder()));

        let resolved = apply_changeset_id(&xml, 12345);
        assert!(!resolved.contains(changeset_placeholder()));
        assert!(resolved.contains("changeset=\"12345\""));
    }

    #[test]
    fn structure_is_osm_change_shaped() {
        let xml = to_xml(&sample_change(), false).unwrap();
        assert!(xml.contains("<osmChange version=\"0.6\""));
        assert!(xml.contains("<create>"));
        assert!(xml.contains("<modify>"));
        assert!(xml.contains("<nd ref=\"2\"/>"));
        assert!(xml.contains("<member type=\"node\" ref=\"10\" role=\"platform_entry_only\"/>"));
    }

    #[test]
    fn empty_change_round_trips() {
        let change = OsmChange::default();
        let xml = to_xml(&change, false).unwrap();
        assert_eq!(from_xml(&xml).unwrap(), change);
    }
}
