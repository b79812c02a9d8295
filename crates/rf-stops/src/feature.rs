//! Stop feature and stop collection types.

use rf_core::name::{normalize_display_name, normalize_group_key};
use rf_core::{Coord, ElementId, ElementKind, TagMap};

// ── PtKind ────────────────────────────────────────────────────────────────────

/// The two public-transport roles a stop feature can play.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum PtKind {
    /// Where passengers wait (`public_transport=platform`).
    Platform,
    /// Where the vehicle halts (`public_transport=stop_position`).
    StopPosition,
}

impl PtKind {
    pub fn from_tags(tags: &TagMap) -> Option<Self> {
        match tags.get("public_transport")?.as_str() {
            "platform" => Some(PtKind::Platform),
            "stop_position" => Some(PtKind::StopPosition),
            _ => None,
        }
    }
}

// ── StopFeature ───────────────────────────────────────────────────────────────

/// One candidate platform or stop-position feature.
#[derive(Clone, Debug)]
pub struct StopFeature {
    pub id: ElementId,
    pub kind: ElementKind,
    /// `Some(true)` once recognized as a member of the edited relation;
    /// `None` until membership assignment runs.
    pub member: Option<bool>,
    pub coord: Coord,
    pub tags: TagMap,
    /// Display name (whitespace-normalized, case preserved).
    pub name: String,
    /// Clustering key from [`rf_core::name::normalize_group_key`].
    pub group_key: String,
    pub highway: Option<String>,
    pub pt: PtKind,
}

impl StopFeature {
    /// Build a feature from raw element data.  Returns `None` when the
    /// `public_transport` tag is absent or names an unsupported role.
    pub fn from_element(id: ElementId, kind: ElementKind, coord: Coord, tags: TagMap) -> Option<Self> {
        let pt = PtKind::from_tags(&tags)?;

        let name_tag = tags.get("name").map_or("", |s| s.trim());
        let mut local_ref = tags.get("local_ref").map_or("", |s| s.trim());

        // A local_ref already embedded in the name would otherwise repeat.
        if !name_tag.is_empty() && !local_ref.is_empty() && name_tag.ends_with(local_ref) {
            local_ref = "";
        }

        let name = normalize_display_name(&format!("{name_tag} {local_ref}"));
        let group_key = normalize_group_key(&name);

        Some(Self {
            id,
            kind,
            member: None,
            coord,
            highway: tags.get("highway").cloned(),
            tags,
            name,
            group_key,
            pt,
        })
    }

    /// Explicitly tagged as a roadside bus stop, preferred over features
    /// that are platforms/stops only by public-transport classification.
    #[inline]
    pub fn explicit(&self) -> bool {
        self.highway.as_deref() == Some("bus_stop")
    }

    /// Kind-qualified identity — plain ids collide across element kinds.
    #[inline]
    pub fn typed_id(&self) -> (ElementKind, ElementId) {
        (self.kind, self.id)
    }

    /// `node/123456`-style identifier for log messages.
    pub fn nice_id(&self) -> String {
        format!("{}/{}", self.kind, self.id)
    }
}

// ── StopCollection ────────────────────────────────────────────────────────────

/// A physical stop: a platform paired with its stop position, either of
/// which may be absent (never both).
#[derive(Clone, Debug)]
pub struct StopCollection {
    pub platform: Option<StopFeature>,
    pub stop: Option<StopFeature>,
}

impl StopCollection {
    pub fn new(platform: Option<StopFeature>, stop: Option<StopFeature>) -> Self {
        debug_assert!(platform.is_some() || stop.is_some());
        Self { platform, stop }
    }

    /// The representative feature: the platform when present, else the
    /// stop position.
    #[inline]
    pub fn best(&self) -> &StopFeature {
        self.platform
            .as_ref()
            .or(self.stop.as_ref())
            .expect("collection with neither platform nor stop")
    }
}
