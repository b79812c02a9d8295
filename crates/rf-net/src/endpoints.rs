//! Start/end segment selection for an edited relation.
//!
//! The relation's way members arrive in document order, but after splitting
//! a member way maps to several pieces.  The route search needs one
//! concrete start piece and one end piece; this module picks them the way
//! a mapper would — the outermost piece that dead-ends among relation
//! members, falling back to the middle piece of an interior way.

use rf_core::ElementId;

use crate::segment::SegmentSet;
use crate::{NetError, NetResult};

/// Member roles that mark ordinary way members of a route.
pub const WAY_MEMBER_ROLES: &[&str] = &["", "forward", "backward", "route"];

/// Pick the start and end segments for the search.
///
/// `member_way_ids` are the relation's way members (route-role only) in
/// document order.  Scans forward for the start and backward for the end;
/// if only one side resolves, both endpoints collapse onto it; if neither
/// does, the smallest segment id is used for both.
pub fn select_route_endpoints(
    set: &SegmentSet,
    member_way_ids: &[i64],
) -> NetResult<(ElementId, ElementId)> {
    if member_way_ids.is_empty() {
        return Err(NetError::NoWayMembers);
    }

    let start = member_way_ids
        .iter()
        .find_map(|&way| endpoint_piece(set, way));
    let end = member_way_ids
        .iter()
        .rev()
        .find_map(|&way| endpoint_piece(set, way));

    match (start, end) {
        (Some(s), Some(e)) => Ok((s, e)),
        (Some(s), None) => Ok((s, s)),
        (None, Some(e)) => Ok((e, e)),
        (None, None) => {
            let fallback = set
                .segments
                .keys()
                .copied()
                .min()
                .ok_or(NetError::NoWayMembers)?;
            log::debug!("no member way resolves to a piece; starting from {fallback}");
            Ok((fallback, fallback))
        }
    }
}

/// The piece of `way` that best represents a route endpoint: an outermost
/// piece with at most one member-connected neighbor, else the middle piece.
fn endpoint_piece(set: &SegmentSet, way: i64) -> Option<ElementId> {
    let pieces = set.pieces.get(&way)?;

    match pieces.as_slice() {
        [] => None,
        [only] => Some(*only),
        [first, .., last] => {
            for &candidate in [first, last] {
                if member_degree(set, candidate) <= 1 {
                    return Some(candidate);
                }
            }
            Some(pieces[pieces.len() / 2])
        }
    }
}

/// Number of relation-member segments connected to `id`.
fn member_degree(set: &SegmentSet, id: ElementId) -> usize {
    set.adjacency.get(&id).map_or(0, |connected| {
        connected
            .iter()
            .filter(|cid| set.segments.get(cid).is_some_and(|s| s.member))
            .count()
    })
}
