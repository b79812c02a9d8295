//! Raw query-service elements.
//!
//! The duck-typed JSON from the query service is consumed once here and
//! becomes typed records; nothing downstream touches raw JSON again.

use rustc_hash::FxHashMap;

use rf_core::{Coord, TagMap};

use crate::{FetchError, FetchResult};

// ── Wire records ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawElement {
    /// `node` / `way` / `relation`, or `count` for group markers.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub tags: TagMap,
    #[serde(default)]
    pub nodes: Vec<i64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub center: Option<RawCenter>,
    pub bounds: Option<RawBounds>,
    #[serde(default)]
    pub members: Vec<RawMember>,
    pub version: Option<u64>,
}

#[derive(Copy, Clone, Debug, serde::Deserialize)]
pub struct RawCenter {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Copy, Clone, Debug, serde::Deserialize)]
pub struct RawBounds {
    pub minlat: f64,
    pub minlon: f64,
    pub maxlat: f64,
    pub maxlon: f64,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawMember {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "ref")]
    pub r#ref: i64,
    #[serde(default)]
    pub role: String,
}

impl RawElement {
    /// The element position: its own coordinate, or the area center.
    pub fn coord(&self) -> Option<Coord> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coord::new(lat, lon)),
            _ => self.center.map(|c| Coord::new(c.lat, c.lon)),
        }
    }
}

/// Parse a query-service response body into its `elements` array.
pub fn parse_elements(body: &str) -> FetchResult<Vec<RawElement>> {
    #[derive(serde::Deserialize)]
    struct Response {
        elements: Vec<RawElement>,
    }

    let response: Response =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(response.elements)
}

// ── Pre-processing ────────────────────────────────────────────────────────────

/// Deduplicate by `(kind, id)` (batched cell queries overlap at their
/// seams) and lift area centers into the element coordinate.
pub fn preprocess_elements(elements: Vec<RawElement>) -> Vec<RawElement> {
    let mut seen: FxHashMap<(String, i64), ()> = FxHashMap::default();
    let mut result = Vec::with_capacity(elements.len());

    for mut element in elements {
        if seen.insert((element.kind.clone(), element.id), ()).is_some() {
            continue;
        }
        if element.lat.is_none() {
            if let Some(center) = element.center {
                element.lat = Some(center.lat);
                element.lon = Some(center.lon);
            }
        }
        result.push(element);
    }

    result
}

/// Merge stop-area relation tags under their members' own tags, forcing
/// the member's `public_transport` role.
///
/// Members named by a stop area inherit its name and operator, which makes
/// otherwise-unnamed platforms clusterable.
pub fn merge_stop_area_tags(
    relations: &[RawElement],
    elements: &mut [RawElement],
    role: &str,
    public_transport: &str,
) {
    let mut index: FxHashMap<(String, i64), usize> = FxHashMap::default();
    for (i, e) in elements.iter().enumerate() {
        index.insert((e.kind.clone(), e.id), i);
    }

    let mut sorted: Vec<&RawElement> = relations.iter().collect();
    sorted.sort_by_key(|r| r.id);

    for relation in sorted {
        for member in relation.members.iter().filter(|m| m.role == role) {
            let Some(&slot) = index.get(&(member.kind.clone(), member.r#ref)) else {
                log::warn!(
                    "stop-area member {}/{} not present in response",
                    member.kind,
                    member.r#ref,
                );
                continue;
            };

            let element = &mut elements[slot];
            let mut merged = relation.tags.clone();
            merged.extend(element.tags.clone());
            merged.insert("public_transport".to_owned(), public_transport.to_owned());
            element.tags = merged;
        }
    }
}

// ── Mode filters ──────────────────────────────────────────────────────────────

/// Explicitly serves buses.
pub fn is_bus_related(tags: &TagMap) -> bool {
    tags.get("bus").is_some_and(|v| v == "yes")
}

/// Belongs to the rail network (by class or by served mode).
pub fn is_rail_related(tags: &TagMap) -> bool {
    tags.contains_key("railway")
        || ["train", "subway", "tram"]
            .iter()
            .any(|k| tags.get(*k).is_some_and(|v| v == "yes"))
}
