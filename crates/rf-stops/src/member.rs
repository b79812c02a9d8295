//! Membership assignment: mark collection features that already belong to
//! the edited relation.
//!
//! A platform or stop is only a reliable membership indicator when exactly
//! one collection uses it — shared stop positions and duplicated platforms
//! say nothing about which physical stop the relation meant.

use rustc_hash::FxHashMap;

use rf_core::{ElementId, ElementKind, RelationMember};

use crate::feature::StopCollection;

/// Propagate membership flags from the relation's member list onto the
/// collections.  Collections are returned in input order.
pub fn assign_member_flags(
    collections: Vec<StopCollection>,
    members: &[RelationMember],
) -> Vec<StopCollection> {
    type TypedId = (ElementKind, ElementId);

    let mut platform_uses: FxHashMap<TypedId, u32> = FxHashMap::default();
    let mut stop_uses: FxHashMap<TypedId, u32> = FxHashMap::default();

    for collection in &collections {
        if let Some(platform) = &collection.platform {
            let uses = platform_uses.entry(platform.typed_id()).or_default();
            *uses += 1;
            if *uses > 1 {
                log::warn!("platform {} is used by multiple collections", platform.nice_id());
            }
        }
        if let Some(stop) = &collection.stop {
            *stop_uses.entry(stop.typed_id()).or_default() += 1;
        }
    }

    let mut result = collections;

    // Pass 1: a uniquely used platform marks its whole collection.
    for member in members {
        let typed = (member.kind, member.id);
        if platform_uses.get(&typed).copied() != Some(1) {
            continue;
        }

        if let Some(collection) = result.iter_mut().find(|c| {
            c.platform.as_ref().is_some_and(|p| p.typed_id() == typed)
        }) {
            if let Some(platform) = &mut collection.platform {
                platform.member = Some(true);
            }
            if let Some(stop) = &mut collection.stop {
                stop.member = Some(true);
            }
        }
    }

    // Pass 2: a uniquely used stop marks platform-less collections only —
    // a matched platform may belong to a different physical stop than the
    // relation's stop member.
    for member in members {
        let typed = (member.kind, member.id);
        if stop_uses.get(&typed).copied() != Some(1) {
            continue;
        }

        if let Some(collection) = result.iter_mut().find(|c| {
            c.platform.is_none() && c.stop.as_ref().is_some_and(|s| s.typed_id() == typed)
        }) {
            if let Some(stop) = &mut collection.stop {
                stop.member = Some(true);
            }
        }
    }

    result
}
