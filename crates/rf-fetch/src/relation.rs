//! Route-relation validation.

use rf_core::tags::tag_or_empty;
use rf_net::RouteMode;

use crate::doc::RelationDoc;
use crate::{FetchError, FetchResult};

/// Check that the relation is an editable route and pick the vehicle
/// class its graph should be built for.
///
/// Supported: `type=route` + `route=bus|trolleybus` (bus graph) or
/// `route=tram` (tram graph), tagged `public_transport:version=2`.
pub fn route_mode_of(relation: &RelationDoc) -> FetchResult<RouteMode> {
    if tag_or_empty(&relation.tags, "type") != "route" {
        return Err(FetchError::BadInput(format!(
            "relation {} is not a route relation",
            relation.id,
        )));
    }

    if tag_or_empty(&relation.tags, "public_transport:version") != "2" {
        return Err(FetchError::BadInput(format!(
            "relation {} is not tagged public_transport:version=2",
            relation.id,
        )));
    }

    match tag_or_empty(&relation.tags, "route") {
        "bus" | "trolleybus" => Ok(RouteMode::Bus),
        "tram" => Ok(RouteMode::Tram),
        other => Err(FetchError::BadInput(format!(
            "unsupported route type {other:?} on relation {}",
            relation.id,
        ))),
    }
}

/// The display name of a route: `name`, falling back to `ref`.
pub fn name_or_ref(relation: &RelationDoc) -> String {
    relation
        .tags
        .get("name")
        .or_else(|| relation.tags.get("ref"))
        .map(|s| s.trim().to_owned())
        .unwrap_or_default()
}
