//! Element identities.
//!
//! # Piece provenance
//!
//! Splitting a way at intersection nodes produces *pieces* whose identity
//! must survive a round trip through the UI and back into the change
//! builder.  [`ElementId`] carries that provenance as a tagged value — a
//! plain native id, or `{native, index, of}` for the k-th of n pieces.
//! The underscore-joined string form (`123456_2_3`) exists only for the
//! wire; hot loops compare and hash the tagged value directly.

use std::fmt;
use std::str::FromStr;

// ── ElementId ─────────────────────────────────────────────────────────────────

/// Identity of an element, optionally carrying split-piece provenance.
///
/// Ordering sorts pieces of the same native id by piece index, with the
/// unsplit form first — so a sorted list of ids groups a split way's pieces
/// in their natural order.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ElementId {
    /// An element as it exists upstream.
    Native(i64),
    /// Piece `index` (1-based) of `of` total, split from way `native`.
    Piece { native: i64, index: u16, of: u16 },
}

impl ElementId {
    /// The upstream id this element originates from.
    #[inline]
    pub fn native(self) -> i64 {
        match self {
            ElementId::Native(id) => id,
            ElementId::Piece { native, .. } => native,
        }
    }

    /// `(index, of)` for pieces, `None` for native ids.
    #[inline]
    pub fn piece(self) -> Option<(u16, u16)> {
        match self {
            ElementId::Native(_) => None,
            ElementId::Piece { index, of, .. } => Some((index, of)),
        }
    }

    #[inline]
    pub fn is_piece(self) -> bool {
        matches!(self, ElementId::Piece { .. })
    }

    #[inline]
    fn sort_key(self) -> (i64, u16) {
        match self {
            ElementId::Native(id) => (id, 0),
            ElementId::Piece { native, index, .. } => (native, index),
        }
    }
}

impl Ord for ElementId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for ElementId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for ElementId {
    #[inline]
    fn from(id: i64) -> Self {
        ElementId::Native(id)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::Native(id) => write!(f, "{id}"),
            ElementId::Piece { native, index, of } => write!(f, "{native}_{index}_{of}"),
        }
    }
}

impl FromStr for ElementId {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || crate::CoreError::Parse(format!("malformed element id: {s:?}"));

        let mut parts = s.split('_');
        let native: i64 = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;

        match (parts.next(), parts.next(), parts.next()) {
            (None, _, _) => Ok(ElementId::Native(native)),
            (Some(index), Some(of), None) => {
                let index: u16 = index.parse().map_err(|_| bad())?;
                let of: u16 = of.parse().map_err(|_| bad())?;
                if index == 0 || index > of {
                    return Err(bad());
                }
                Ok(ElementId::Piece { native, index, of })
            }
            _ => Err(bad()),
        }
    }
}

// The wire form is the string form; serde never sees the tagged layout.
impl serde::Serialize for ElementId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ElementId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── ElementKind ───────────────────────────────────────────────────────────────

/// The three element kinds of the upstream data model.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "node" => Some(ElementKind::Node),
            "way" => Some(ElementKind::Way),
            "relation" => Some(ElementKind::Relation),
            _ => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── RelationMember ────────────────────────────────────────────────────────────

/// One member of a route relation: an element reference plus its role.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct RelationMember {
    pub kind: ElementKind,
    pub id: ElementId,
    pub role: String,
}

impl RelationMember {
    pub fn new(kind: ElementKind, id: ElementId, role: impl Into<String>) -> Self {
        Self { kind, id, role: role.into() }
    }
}
