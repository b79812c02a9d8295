//! Element-store document models.
//!
//! Typed way/relation documents as read from the element store (JSON).
//! Authorship attributes (timestamp, user, uid) are not modeled — parsing
//! strips them, which is what the change builder requires of every
//! rewritten document.  Version tags are preserved for optimistic locking.

use rf_core::{ElementId, ElementKind, RelationMember, TagMap};

use crate::element::RawElement;
use crate::{FetchError, FetchResult};

// ── Documents ─────────────────────────────────────────────────────────────────

/// A way as stored upstream.
#[derive(Clone, Debug, PartialEq)]
pub struct WayDoc {
    pub id: i64,
    pub version: Option<u64>,
    pub tags: TagMap,
    pub nodes: Vec<i64>,
}

impl WayDoc {
    #[inline]
    pub fn first_node(&self) -> Option<i64> {
        self.nodes.first().copied()
    }

    #[inline]
    pub fn last_node(&self) -> Option<i64> {
        self.nodes.last().copied()
    }

    /// First node equals last node.
    pub fn is_circular(&self) -> bool {
        self.nodes.len() > 1 && self.nodes.first() == self.nodes.last()
    }
}

/// One member entry of a stored relation.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberDoc {
    pub kind: ElementKind,
    pub r#ref: i64,
    pub role: String,
}

/// A relation as stored upstream.
#[derive(Clone, Debug, PartialEq)]
pub struct RelationDoc {
    pub id: i64,
    pub version: Option<u64>,
    pub tags: TagMap,
    pub members: Vec<MemberDoc>,
}

impl RelationDoc {
    /// The member list as engine-typed members.
    pub fn relation_members(&self) -> Vec<RelationMember> {
        self.members
            .iter()
            .map(|m| RelationMember::new(m.kind, ElementId::Native(m.r#ref), m.role.clone()))
            .collect()
    }

    /// Native ids of way members carrying an ordinary route role.
    pub fn route_way_ids(&self) -> Vec<i64> {
        self.members
            .iter()
            .filter(|m| {
                m.kind == ElementKind::Way
                    && rf_net::WAY_MEMBER_ROLES.contains(&m.role.as_str())
            })
            .map(|m| m.r#ref)
            .collect()
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl TryFrom<RawElement> for WayDoc {
    type Error = FetchError;

    fn try_from(raw: RawElement) -> FetchResult<Self> {
        if raw.kind != "way" {
            return Err(FetchError::Parse(format!("expected a way, got {}", raw.kind)));
        }
        Ok(WayDoc {
            id: raw.id,
            version: raw.version,
            tags: raw.tags,
            nodes: raw.nodes,
        })
    }
}

impl TryFrom<RawElement> for RelationDoc {
    type Error = FetchError;

    fn try_from(raw: RawElement) -> FetchResult<Self> {
        if raw.kind != "relation" {
            return Err(FetchError::Parse(format!(
                "expected a relation, got {}",
                raw.kind,
            )));
        }

        let members = raw
            .members
            .into_iter()
            .map(|m| {
                let kind = ElementKind::parse(&m.kind)
                    .ok_or_else(|| FetchError::Parse(format!("unknown member kind {}", m.kind)))?;
                Ok(MemberDoc { kind, r#ref: m.r#ref, role: m.role })
            })
            .collect::<FetchResult<Vec<MemberDoc>>>()?;

        Ok(RelationDoc {
            id: raw.id,
            version: raw.version,
            tags: raw.tags,
            members,
        })
    }
}

/// Parse an element-store JSON read (`{"elements": [...]}`) into way
/// documents.
pub fn parse_way_docs(body: &str) -> FetchResult<Vec<WayDoc>> {
    crate::element::parse_elements(body)?
        .into_iter()
        .map(WayDoc::try_from)
        .collect()
}

/// Parse an element-store JSON read into relation documents.
pub fn parse_relation_docs(body: &str) -> FetchResult<Vec<RelationDoc>> {
    crate::element::parse_elements(body)?
        .into_iter()
        .map(RelationDoc::try_from)
        .collect()
}
