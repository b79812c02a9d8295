//! Tag classification: which raw ways are routable, oneway, roundabouts.

use rf_core::tags::{tag_is, tag_or_empty};
use rf_core::TagMap;

use crate::{NetError, NetResult};

/// Vehicle class the route graph is built for.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RouteMode {
    Bus,
    Tram,
}

/// Highway classes a bus may use without explicit access tagging.
const BUS_HIGHWAY: &[&str] = &[
    "residential",
    "service",
    "unclassified",
    "tertiary",
    "tertiary_link",
    "secondary",
    "secondary_link",
    "primary",
    "primary_link",
    "living_street",
    "trunk",
    "trunk_link",
    "motorway",
    "motorway_link",
    "motorway_junction",
    "road",
    "busway",
    "bus_guideway",
];

/// Service roads excluded unless bus access is explicit.
const SERVICE_BLACKLIST: &[&str] = &["driveway", "parking_aisle", "alley", "emergency_access"];

/// `true` if this way may carry the given vehicle class.
///
/// For buses: the highway class must be in [`BUS_HIGHWAY`], or
/// `highway=pedestrian` with explicitly designated bus/psv access.
/// Blacklisted `service` values need explicit access too, `area=yes` is
/// never routable, and general access restrictions apply unless a
/// bus/psv tag overrides them.
///
/// For trams: every railway-class way reaching the fetcher is routable;
/// the fetch query already restricts the rail network.
pub fn is_routable(mode: RouteMode, tags: &TagMap) -> bool {
    match mode {
        RouteMode::Tram => tags.contains_key("railway"),
        RouteMode::Bus => is_routable_road(tags),
    }
}

fn is_routable_road(tags: &TagMap) -> bool {
    // Explicit bus/psv access both designates and permits.
    let mut access_designated = false;
    let mut access_valid = true;

    if let Some(bus) = tags.get("bus") {
        access_designated = bus != "no";
        access_valid = access_designated;
    } else if let Some(psv) = tags.get("psv") {
        access_designated = psv != "no";
        access_valid = access_designated;
    } else if let Some(motor_vehicle) = tags.get("motor_vehicle") {
        access_valid = !matches!(motor_vehicle.as_str(), "private" | "customers" | "no");
    } else if let Some(access) = tags.get("access") {
        access_valid = !matches!(access.as_str(), "private" | "customers" | "no");
    }

    let highway = tag_or_empty(tags, "highway");
    let highway_valid =
        BUS_HIGHWAY.contains(&highway) || (highway == "pedestrian" && access_designated);

    let service_valid = !SERVICE_BLACKLIST.contains(&tag_or_empty(tags, "service"));

    let no_area = !tag_is(tags, "area", "yes");

    highway_valid && (service_valid || access_designated) && access_valid && no_area
}

/// Oneway classification with bus-specific precedence:
/// `oneway:bus` > `oneway:psv` > `oneway` > `junction=roundabout`.
///
/// Reversed values (`-1`) are rejected: honoring them would require
/// flipping node order before splitting, silently changing the piece
/// provenance the change builder depends on.
pub fn oneway_of(tags: &TagMap) -> NetResult<bool> {
    for key in ["oneway:bus", "oneway:psv", "oneway"] {
        if let Some(value) = tags.get(key) {
            if value == "-1" {
                return Err(NetError::ReversedOneway(value.clone()));
            }
            return Ok(value == "yes");
        }
    }

    Ok(is_roundabout(tags))
}

/// `junction=roundabout` marks a roundabout carriageway.
#[inline]
pub fn is_roundabout(tags: &TagMap) -> bool {
    tag_is(tags, "junction", "roundabout")
}
