//! Relation member synthesis.
//!
//! Turns a finalized route into the relation's member list: stops and
//! platforms in visitation order with entry/exit role suffixes, then the
//! way members, with split pieces collapsed back to their native id where
//! the split is invisible in the member list.

use rustc_hash::{FxHashMap, FxHashSet};

use rf_core::{ElementId, ElementKind, RelationMember};
use rf_search::FinalRoute;

/// Roles on way members that the synthesizer owns and always rewrites.
const RESERVED_WAY_ROLES: &[&str] = &["route", "forward", "backward"];

/// Build the member list for the edited relation.
///
/// `existing` is the stored relation's member list; a pre-existing role
/// that extends the expected role with a further suffix is preserved
/// (e.g. `stop_exit_only` where plain `stop` is expected mid-route).
pub fn synthesize_members(route: &FinalRoute, existing: &[RelationMember]) -> Vec<RelationMember> {
    let existing_roles: FxHashMap<(ElementKind, ElementId), &str> = existing
        .iter()
        .map(|m| ((m.kind, m.id), m.role.as_str()))
        .collect();

    let roundtrip = route.roundtrip();
    let mut members: Vec<RelationMember> = Vec::new();

    let mut push_stop_members = |members: &mut Vec<RelationMember>, index: usize| {
        let collection = &route.stops[index];

        let suffix = if roundtrip {
            ""
        } else if index == 0 {
            "_entry_only"
        } else if index == route.stops.len() - 1 {
            "_exit_only"
        } else {
            ""
        };

        for (feature, base) in [(&collection.stop, "stop"), (&collection.platform, "platform")] {
            let Some(feature) = feature else {
                continue;
            };

            let expected = format!("{base}{suffix}");
            let role = match existing_roles.get(&(feature.kind, feature.id)) {
                Some(&current) if current.starts_with(&expected) => current.to_owned(),
                _ => expected,
            };

            members.push(RelationMember::new(feature.kind, feature.id, role));
        }
    };

    // A roundtrip closes the ring: the trailing pair also leads the list.
    if roundtrip && route.stops.len() > 1 {
        push_stop_members(&mut members, route.stops.len() - 1);
    }
    for index in 0..route.stops.len() {
        push_stop_members(&mut members, index);
    }

    let way_ids: Vec<ElementId> = route.ways.iter().map(|w| w.way).collect();
    for way_id in simplify_way_ids(&way_ids) {
        let role = match existing_roles.get(&(ElementKind::Way, way_id)) {
            Some(&current) if !RESERVED_WAY_ROLES.contains(&current) => current.to_owned(),
            _ => String::new(),
        };
        members.push(RelationMember::new(ElementKind::Way, way_id, role));
    }

    members
}

// ── Piece unsplitting ─────────────────────────────────────────────────────────

/// Collapse complete, consecutive, monotonic piece runs back to their
/// native way id.
///
/// Two passes: the first blacklists natives whose pieces appear anywhere
/// outside a collapsible run (collapsing only some occurrences would make
/// the list reference the same geometry twice under different ids); the
/// second emits, replacing each surviving run with its native id.
pub fn simplify_way_ids(way_ids: &[ElementId]) -> Vec<ElementId> {
    let mut blacklist: FxHashSet<i64> = FxHashSet::default();

    let mut i = 0;
    while i < way_ids.len() {
        if let Some(len) = collapsible_run(&way_ids[i..]) {
            i += len;
        } else {
            if way_ids[i].is_piece() {
                blacklist.insert(way_ids[i].native());
            }
            i += 1;
        }
    }

    let mut result = Vec::with_capacity(way_ids.len());
    let mut i = 0;
    while i < way_ids.len() {
        let id = way_ids[i];

        if !blacklist.contains(&id.native()) {
            if let Some(len) = collapsible_run(&way_ids[i..]) {
                result.push(ElementId::Native(id.native()));
                i += len;
                continue;
            }
        }

        result.push(id);
        i += 1;
    }

    result
}

/// If `rest` begins with a full monotonic piece run (ascending `1..=n` or
/// descending `n..=1` of one native), its length; otherwise `None`.
fn collapsible_run(rest: &[ElementId]) -> Option<usize> {
    let (index, of) = rest.first()?.piece()?;
    let native = rest[0].native();
    let n = of as usize;

    if rest.len() < n {
        return None;
    }

    let ascending = index == 1;
    let descending = index == of;
    if !ascending && !descending {
        return None;
    }

    let matches = rest[..n].iter().enumerate().all(|(offset, id)| {
        let expected = if ascending {
            offset as u16 + 1
        } else {
            of - offset as u16
        };
        id.native() == native && id.piece() == Some((expected, of))
    });

    matches.then_some(n)
}
