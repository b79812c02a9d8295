//! Overpass query programs and response grouping.
//!
//! The grouped network query interleaves `out count` markers so the flat
//! `elements` array partitions into logical groups.  Group order:
//!
//! | # | Contents                                   |
//! |---|--------------------------------------------|
//! | 0 | routable way candidates                    |
//! | 1 | their nodes                                |
//! | 2 | turn-in-place nodes (turning circles)      |
//! | 3 | stop features                              |
//! | 4 | stop-area relations                        |
//! | 5 | stop-area members with role `platform`     |
//! | 6 | stop-area members with role `stop`         |

use std::fmt::Write;

use crate::element::RawElement;
use crate::grid::BoundingBox;
use crate::{FetchError, FetchResult};

/// Number of `out count`-delimited groups in the network query response.
pub const NETWORK_QUERY_GROUPS: usize = 7;

/// Way bounding boxes of a relation's members — the seed for cell
/// gathering.
pub fn bounding_box_query(relation_id: i64, timeout_s: u32) -> String {
    format!(
        "[out:json][timeout:{timeout_s}];\
         rel({relation_id});\
         way(r);\
         out ids bb qt;"
    )
}

/// The grouped network query over merged cell rectangles.
///
/// `cell_bbs` bound the road search; `cell_bbs_expanded` are the same
/// boxes grown by the cell expansion so border stops are not missed.
pub fn network_query(
    cell_bbs: &[BoundingBox],
    cell_bbs_expanded: &[BoundingBox],
    timeout_s: u32,
) -> String {
    let mut q = format!("[out:json][timeout:{timeout_s}];");

    q.push('(');
    for bb in cell_bbs {
        let _ = write!(q, "way[highway][!footway]({bb});");
    }
    q.push_str(");out body qt;out count;");
    q.push_str(">;out skel qt;out count;");

    q.push('(');
    for bb in cell_bbs {
        let _ = write!(
            q,
            "node[highway~\"^(turning_circle|turning_loop)$\"]({bb});"
        );
    }
    q.push_str(");out ids qt;out count;");

    q.push('(');
    for bb in cell_bbs_expanded {
        let _ = write!(
            q,
            "node[highway=bus_stop][public_transport=platform]({bb});\
             nwr[highway=platform][public_transport=platform]({bb});\
             node[public_transport=stop_position]({bb});"
        );
    }
    q.push_str(");out tags center qt;out count;");

    q.push('(');
    for bb in cell_bbs_expanded {
        let _ = write!(q, "rel[public_transport=stop_area]({bb});");
    }
    q.push_str(")->.r;.r out body qt;.r out count;");

    q.push_str(
        "(node(r.r:platform);way(r.r:platform);rel(r.r:platform););\
         out tags center qt;out count;",
    );
    q.push_str("(node(r.r:stop););out tags center qt;out count;");

    q
}

/// Parent relations of the given ways, plus the node lists of every way
/// those relations reference (needed for orientation checks when
/// rewriting member lists).
pub fn parents_query(way_ids: impl IntoIterator<Item = i64>, timeout_s: u32) -> String {
    let mut q = format!("[out:json][timeout:{timeout_s}];._->.r;");

    for way_id in way_ids {
        let _ = write!(q, "way({way_id});(rel(bw);.r;)->.r;");
    }

    q.push_str(".r out body qt;way(r.r);out skel qt;");
    q
}

/// Split a flat `elements` array at its `count` markers.
///
/// Every group must be terminated by a marker — trailing elements without
/// one indicate a truncated response.
pub fn split_by_count(elements: Vec<RawElement>) -> FetchResult<Vec<Vec<RawElement>>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();

    for element in elements {
        if element.kind == "count" {
            groups.push(std::mem::take(&mut current));
        } else {
            current.push(element);
        }
    }

    if !current.is_empty() {
        return Err(FetchError::Parse(
            "response not terminated by a count marker".to_owned(),
        ));
    }

    Ok(groups)
}
