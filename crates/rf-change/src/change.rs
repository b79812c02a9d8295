//! Differential change construction.
//!
//! Publishing a split turns one stored way into several: piece 1 keeps
//! the native id (a *modify* shrinking its node list), later pieces
//! become *create* elements under negative placeholder ids.  Every parent
//! relation referencing the split way is rewritten to reference the piece
//! chain instead, oriented by its surrounding members.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use rf_core::{ElementId, ElementKind, RelationMember};
use rf_fetch::{MemberDoc, ParentsResult, RelationDoc, WayDoc};
use rf_net::Segment;
use rf_search::FinalRoute;

use crate::{ChangeError, ChangeResult};

// ── OsmChange document ────────────────────────────────────────────────────────

/// The mutation document: created and modified elements, keyed by kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OsmChange {
    pub create_ways: Vec<WayDoc>,
    pub modify_ways: Vec<WayDoc>,
    pub modify_relations: Vec<RelationDoc>,
}

// ── Inputs ────────────────────────────────────────────────────────────────────

/// Everything the builder needs besides the route itself.
pub struct ChangeInputs<'a> {
    /// The edited relation as currently stored.
    pub relation: RelationDoc,
    /// Stored documents of the split ways, by native id.
    pub way_docs: &'a FxHashMap<i64, WayDoc>,
    /// Parent relations of the split ways.
    pub parents: &'a ParentsResult,
    /// Piece geometry, covering every piece of every split way.
    pub segments: &'a FxHashMap<ElementId, Segment>,
    /// Native id → pieces in piece order, from ingestion.
    pub pieces: &'a FxHashMap<i64, Vec<ElementId>>,
}

// ── Allocation ────────────────────────────────────────────────────────────────

/// Numeric ids for the published pieces of the split ways.
struct PieceAllocation {
    /// Piece id → published numeric id (native for piece 1, negative
    /// placeholders for the rest).
    numeric: FxHashMap<ElementId, i64>,
    /// Negative placeholder → native id, for neighbor resolution.
    native_of_placeholder: FxHashMap<i64, i64>,
    /// Split native id → its full ordered piece list.
    groups: BTreeMap<i64, Vec<ElementId>>,
}

impl PieceAllocation {
    /// Resolve any member reference through the allocation.
    fn numeric_id(&self, id: ElementId) -> i64 {
        self.numeric.get(&id).copied().unwrap_or_else(|| id.native())
    }
}

/// Collect the split ways referenced by the route and allocate ids.
///
/// Groups are completed from the ingestion piece map: a route that uses
/// only some pieces of a split way still publishes the whole split, or
/// the stored geometry would lose coverage.
fn allocate_pieces(route: &FinalRoute, inputs: &ChangeInputs) -> ChangeResult<PieceAllocation> {
    let mut split_natives: Vec<i64> = route
        .members
        .iter()
        .filter(|m| m.kind == ElementKind::Way)
        .map(|m| m.id)
        .chain(route.extra_ways.iter().copied())
        .filter(|id| id.is_piece())
        .map(ElementId::native)
        .collect();
    split_natives.sort_unstable();
    split_natives.dedup();

    let mut allocation = PieceAllocation {
        numeric: FxHashMap::default(),
        native_of_placeholder: FxHashMap::default(),
        groups: BTreeMap::new(),
    };
    let mut next_placeholder: i64 = -1;

    for native in split_natives {
        let group = inputs
            .pieces
            .get(&native)
            .ok_or(ChangeError::IncompletePieces { way: native })?
            .clone();

        let expected = group
            .first()
            .and_then(|id| id.piece())
            .map(|(_, of)| of as usize)
            .unwrap_or(0);
        if expected == 0 || group.len() != expected {
            return Err(ChangeError::IncompletePieces { way: native });
        }

        for &piece in &group {
            let (index, _) = piece.piece().ok_or(ChangeError::IncompletePieces { way: native })?;
            if index == 1 {
                allocation.numeric.insert(piece, native);
            } else {
                allocation.numeric.insert(piece, next_placeholder);
                allocation.native_of_placeholder.insert(next_placeholder, native);
                next_placeholder -= 1;
            }
        }

        allocation.groups.insert(native, group);
    }

    Ok(allocation)
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Build the change document for a finalized route.
///
/// `route.members` must already be synthesized (see
/// [`crate::members::synthesize_members`]).
pub fn build_change(route: &FinalRoute, inputs: &ChangeInputs) -> ChangeResult<OsmChange> {
    let allocation = allocate_pieces(route, inputs)?;
    let mut change = OsmChange::default();

    // Split ways: modify piece 1, create the rest.
    for (&native, group) in &allocation.groups {
        let way_doc = inputs
            .way_docs
            .get(&native)
            .ok_or(ChangeError::MissingDocument { way: native })?;

        let piece1 = segment_of(inputs, group[0])?;
        if way_doc.first_node() == piece1.nodes.first().copied()
            && way_doc.last_node() == piece1.nodes.last().copied()
        {
            // The stored way already spans exactly piece 1: somebody split
            // it upstream between our fetch and this write.
            return Err(ChangeError::SplitConflict { way: native });
        }

        for &piece in group {
            let segment = segment_of(inputs, piece)?;
            let numeric = allocation.numeric_id(piece);

            let doc = WayDoc {
                id: numeric,
                version: (numeric == native).then_some(way_doc.version).flatten(),
                tags: way_doc.tags.clone(),
                nodes: segment.nodes.clone(),
            };

            if numeric == native {
                change.modify_ways.push(doc);
            } else {
                change.create_ways.push(doc);
            }
        }
    }

    // Parent relations (except the edited one) re-reference the pieces.
    let mut rewritten: BTreeMap<i64, RelationDoc> = BTreeMap::new();
    for (&native, group) in &allocation.groups {
        for parent in inputs
            .parents
            .relations_by_way
            .get(&native)
            .map_or(&[][..], Vec::as_slice)
        {
            if parent.id == inputs.relation.id {
                continue;
            }
            let doc = rewritten.entry(parent.id).or_insert_with(|| parent.clone());
            rewrite_parent_members(doc, native, group, inputs, &allocation)?;
        }
    }
    change.modify_relations.extend(rewritten.into_values());

    // The edited relation itself, with the synthesized member list.
    let mut relation = inputs.relation.clone();
    relation.members = route
        .members
        .iter()
        .map(|m| MemberDoc {
            kind: m.kind,
            r#ref: allocation.numeric_id(m.id),
            role: m.role.clone(),
        })
        .collect();
    change.modify_relations.push(relation);

    Ok(change)
}

fn segment_of<'i>(inputs: &'i ChangeInputs, piece: ElementId) -> ChangeResult<&'i Segment> {
    inputs
        .segments
        .get(&piece)
        .ok_or(ChangeError::MissingSegment(piece))
}

// ── Parent rewriting ──────────────────────────────────────────────────────────

/// Replace the reference to `native` in a parent relation's member list
/// with its piece chain.
///
/// Orientation comes from the surrounding way members: a neighbor tying
/// to the far end of the chain means the pieces run backwards through
/// this relation.  Insertion stops early at the natural junction with the
/// following neighbor.  When no surrounding member validates an
/// orientation, all pieces go in forward at the original position.
fn rewrite_parent_members(
    relation: &mut RelationDoc,
    native: i64,
    group: &[ElementId],
    inputs: &ChangeInputs,
    allocation: &PieceAllocation,
) -> ChangeResult<()> {
    let Some(position) = relation
        .members
        .iter()
        .position(|m| m.kind == ElementKind::Way && m.r#ref == native)
    else {
        log::warn!("relation {} no longer references way {native}", relation.id);
        return Ok(());
    };

    let chain_first = segment_of(inputs, group[0])?.first_node();
    let chain_last = segment_of(inputs, group[group.len() - 1])?.last_node();

    let way_doc = inputs.way_docs.get(&native);
    let circular = way_doc.is_some_and(WayDoc::is_circular);

    let neighbor_nodes = |offset: isize| -> Option<(i64, i64)> {
        let index = position.checked_add_signed(offset)?;
        let member = relation.members.get(index)?;
        if member.kind != ElementKind::Way {
            return None;
        }
        // A neighbor may itself be a freshly allocated piece placeholder.
        let resolved = allocation
            .native_of_placeholder
            .get(&member.r#ref)
            .copied()
            .unwrap_or(member.r#ref);
        let doc = inputs.parents.ways.get(&resolved)?;
        Some((doc.first_node()?, doc.last_node()?))
    };

    let mut validated = false;
    let mut reversed = false;

    if !circular {
        if let Some((first, last)) = neighbor_nodes(-1) {
            validated = true;
            reversed = first == chain_last || last == chain_last;
        } else if let Some((first, last)) = neighbor_nodes(1) {
            validated = true;
            reversed = first == chain_first || last == chain_first;
        }
    }

    if !validated && !circular {
        log::warn!(
            "relation {}: no insertion point validates for way {native}; inserting all pieces",
            relation.id,
        );
    }

    let role = relation.members[position].role.clone();
    let following = neighbor_nodes(1);
    relation.members.remove(position);

    let ordered: Vec<ElementId> = if reversed {
        group.iter().rev().copied().collect()
    } else {
        group.to_vec()
    };

    let mut inserted = 0usize;
    for &piece in &ordered {
        relation.members.insert(
            position + inserted,
            MemberDoc {
                kind: ElementKind::Way,
                r#ref: allocation.numeric_id(piece),
                role: role.clone(),
            },
        );
        inserted += 1;

        // Stop once the chain meets the following neighbor.
        if validated {
            if let Some((first, last)) = following {
                let segment = segment_of(inputs, piece)?;
                let far = if reversed { segment.first_node() } else { segment.last_node() };
                if inserted < ordered.len() && (far == first || far == last) {
                    break;
                }
            }
        }
    }

    Ok(())
}
