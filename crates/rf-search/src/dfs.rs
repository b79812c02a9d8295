//! The bounded depth-first search.
//!
//! # Shape
//!
//! A frontier of partial paths is expanded LIFO.  Every pop ranks the
//! element against the current best pair, then pushes its surviving
//! successors.  Branches die by exceeding the length bound, looping too
//! long without picking up stops, wandering past the end segment, or
//! re-entering a roundabout where they entered it.
//!
//! # Parallelism
//!
//! The controller runs a warmup chunk inline to grow the frontier, then
//! repeatedly slices it into near-equal parts, expands the slices on a
//! rayon pool, and merges the returned sub-frontiers and bests in
//! submission order (earlier worker wins ties).  The wall-clock deadline
//! is checked between chunks only — the inner loop never suspends.

use std::time::Instant;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use rf_core::ElementId;
use rf_net::{scored_successors, DirectedGraph, GraphKey, Segment};
use rf_stops::SortedStopEntry;

use crate::best::{BestPath, BestPaths};
use crate::state::FrontierElement;
use crate::{SearchError, SearchResult};

// ── Bounds ────────────────────────────────────────────────────────────────────

/// Revisits of one intersection tolerated while the stop count stagnates.
pub const VISITED_LIMIT: u32 = 2;
/// Length accumulated while looping before the branch dies, metres.
pub const MAX_LOOP_LENGTH_M: f64 = 1_000.0;
/// Length tolerated after the end segment was reached, metres.
pub const MAX_AFTER_FINISH_LENGTH_M: f64 = 1_000.0;
/// Total length bound as a multiple of the summed segment lengths.
pub const MAX_PATH_LENGTH_FACTOR: f64 = 2.2;

/// Iterations expanded inline before fanning out to workers.
const WARMUP_ITERATIONS: u32 = 3_000;
/// Iterations per worker chunk.
const WORKER_ITERATIONS: u32 = 10_000;

// ── Stop crediting ────────────────────────────────────────────────────────────

/// Split the stops bound to `key`'s segment into properly visited and
/// wrong-side ("almost") visited, in traversal order.
///
/// A stop with an unset side flag always counts as visited; otherwise the
/// flag must match the traversal direction (`key.start` = forward).
fn stops_at<'m>(
    key: GraphKey,
    stop_map: &'m FxHashMap<ElementId, Vec<SortedStopEntry>>,
) -> (Vec<&'m SortedStopEntry>, Vec<&'m SortedStopEntry>) {
    let forward = key.start;

    let mut visited = Vec::new();
    let mut almost = Vec::new();

    for entry in stop_map.get(&key.way).map_or(&[][..], Vec::as_slice) {
        match entry.right_hand_side {
            None => visited.push(entry),
            Some(rhs) if rhs == forward => visited.push(entry),
            Some(_) => almost.push(entry),
        }
    }

    if !forward {
        visited.reverse();
        almost.reverse();
    }

    (visited, almost)
}

// ── Worker ────────────────────────────────────────────────────────────────────

/// Expand up to `max_iter` frontier elements, updating `best`.
///
/// Returns the remaining frontier and the (possibly improved) best pair.
#[allow(clippy::too_many_arguments)]
fn dfs_worker(
    graph: &DirectedGraph,
    segments: &FxHashMap<ElementId, Segment>,
    end_way: ElementId,
    stop_map: &FxHashMap<ElementId, Vec<SortedStopEntry>>,
    mut stack: Vec<FrontierElement>,
    mut best: BestPaths,
    max_length: f64,
    max_iter: u32,
) -> SearchResult<(Vec<FrontierElement>, BestPaths)> {
    for _ in 0..max_iter {
        let Some(element) = stack.pop() else {
            break;
        };

        let current_key = *element.path.last().expect("frontier paths are never empty");
        let exit_key = current_key.flip();

        let candidate = BestPath {
            path: element.path.clone(),
            visited_stops: {
                let mut union = element.visited_stops.clone();
                union.extend(element.almost_visited_stops.iter().map(|(k, v)| (*k, *v)));
                union
            },
            stops_count: element.visited_stops.len(),
            almost_stops_count: element.almost_visited_stops.len(),
            length: element.length,
            complete_path: element.complete_path.clone(),
            complete_length: element.complete_length,
            angle_sum: element.angle_sum,
        };

        if current_key.way == end_way {
            if best.valid.loses_to(&candidate) {
                best.valid = candidate;
            }
        } else if best.invalid.loses_to(&candidate) {
            best.invalid = candidate;
        }

        let current_segment = &segments[&current_key.way];
        let exit_value = graph.get(exit_key).ok_or(SearchError::MissingKey(exit_key))?;
        let successors = scored_successors(current_segment, &exit_value.successors, segments)?;

        // Intersection revisit accounting.
        let stop_total = element.visited_stops.len() + element.almost_visited_stops.len();
        let snapshot = element.intersection_snapshot.get(&exit_value.intersection).copied();

        let mut new_snapshot = element.intersection_snapshot.clone();
        let visit_count = match snapshot {
            Some((seen_stops, visits)) if seen_stops >= stop_total => {
                if visits >= VISITED_LIMIT {
                    continue; // stuck: revisiting with no stop progress
                }
                new_snapshot.insert(exit_value.intersection, (seen_stops, visits + 1));
                visits + 1
            }
            _ => {
                new_snapshot.insert(exit_value.intersection, (stop_total, 1));
                1
            }
        };

        for (neighbor, neighbor_angle) in successors {
            let neighbor_segment = &segments[&neighbor.way];

            let mut new_path = element.path.clone();
            new_path.push(neighbor);

            let (visited_here, almost_here) = stops_at(neighbor, stop_map);

            let (new_visited, new_almost) = if !visited_here.is_empty() || !almost_here.is_empty() {
                let mut visited = element.visited_stops.clone();
                let mut almost = element.almost_visited_stops.clone();

                for entry in visited_here {
                    visited
                        .entry(entry.collection.best().id)
                        .or_insert(new_path.len());
                }
                for entry in almost_here {
                    almost
                        .entry(entry.collection.best().id)
                        .or_insert(new_path.len());
                }
                // A proper visit demotes any earlier wrong-side credit.
                almost.retain(|id, _| !visited.contains_key(id));

                (visited, almost)
            } else {
                (element.visited_stops.clone(), element.almost_visited_stops.clone())
            };

            let new_length = element.length + neighbor_segment.length_m;
            if new_length > max_length {
                continue;
            }

            let (new_complete, new_complete_length) =
                if element.complete_path.contains(&neighbor.way) {
                    (element.complete_path.clone(), element.complete_length)
                } else {
                    let mut complete = element.complete_path.clone();
                    complete.insert(neighbor.way);
                    (complete, element.complete_length + neighbor_segment.length_m)
                };

            // Roundabout looping and exits are free.
            let new_angle_sum = if current_segment.roundabout {
                element.angle_sum
            } else {
                element.angle_sum + neighbor_angle
            };

            let new_loop_length = if visit_count > 1 {
                element.loop_length + neighbor_segment.length_m
            } else {
                0.0
            };
            if new_loop_length > MAX_LOOP_LENGTH_M {
                continue;
            }

            let new_after_finish = if element.after_finish_length > 0.0 || neighbor.way == end_way {
                element.after_finish_length + neighbor_segment.length_m
            } else {
                0.0
            };
            if new_after_finish > MAX_AFTER_FINISH_LENGTH_M {
                continue;
            }

            let new_roundabout_enter = if neighbor_segment.roundabout {
                match element.roundabout_enter {
                    // Completing a lap of the roundabout is forbidden.
                    Some(enter) if enter == neighbor => continue,
                    Some(enter) => Some(enter),
                    None => Some(neighbor),
                }
            } else {
                None
            };

            stack.push(FrontierElement {
                path: new_path,
                visited_stops: new_visited,
                almost_visited_stops: new_almost,
                intersection_snapshot: new_snapshot.clone(),
                length: new_length,
                complete_path: new_complete,
                complete_length: new_complete_length,
                angle_sum: new_angle_sum,
                loop_length: new_loop_length,
                after_finish_length: new_after_finish,
                roundabout_enter: new_roundabout_enter,
            });
        }
    }

    Ok((stack, best))
}

// ── Controller ────────────────────────────────────────────────────────────────

/// Run the bounded search from `start_way` toward `end_way`.
///
/// `segments` must be the relation-member set the search may traverse;
/// `n_workers` sizes the rayon fan-out; `deadline` is the wall-clock
/// budget checked between iteration chunks.
pub fn search(
    graph: &DirectedGraph,
    segments: &FxHashMap<ElementId, Segment>,
    start_way: ElementId,
    end_way: ElementId,
    stop_map: &FxHashMap<ElementId, Vec<SortedStopEntry>>,
    n_workers: usize,
    deadline: Instant,
) -> SearchResult<BestPath> {
    if !segments.contains_key(&start_way) {
        return Err(SearchError::MissingSegment(start_way));
    }
    if !segments.contains_key(&end_way) {
        return Err(SearchError::MissingSegment(end_way));
    }

    let max_length = MAX_PATH_LENGTH_FACTOR * segments.values().map(|s| s.length_m).sum::<f64>();

    // Both orientations of the start segment seed the frontier.
    let mut stack = vec![
        seed_element(GraphKey::new(start_way, true), graph, segments, stop_map)?,
        seed_element(GraphKey::new(start_way, false), graph, segments, stop_map)?,
    ];
    let mut best = BestPaths::zero();

    if Instant::now() >= deadline {
        return Err(SearchError::Timeout);
    }

    // Inline warmup grows the frontier enough to slice meaningfully.
    (stack, best) = dfs_worker(
        graph, segments, end_way, stop_map, stack, best, max_length, WARMUP_ITERATIONS,
    )?;

    while !stack.is_empty() {
        if Instant::now() >= deadline {
            return Err(SearchError::Timeout);
        }

        let slices = slice_frontier(&mut stack, n_workers);
        log::debug!(
            "distributing frontier: {:?}",
            slices.iter().map(Vec::len).collect::<Vec<_>>(),
        );

        let results: Vec<SearchResult<(Vec<FrontierElement>, BestPaths)>> = slices
            .into_par_iter()
            .map(|slice| {
                dfs_worker(
                    graph,
                    segments,
                    end_way,
                    stop_map,
                    slice,
                    best.clone(),
                    max_length,
                    WORKER_ITERATIONS,
                )
            })
            .collect();

        // Merge in submission order so equal candidates resolve to the
        // earliest worker.
        for result in results {
            let (sub_frontier, sub_best) = result?;
            stack.extend(sub_frontier);
            best = best.merge(sub_best);
        }
    }

    Ok(best.into_result())
}

/// The initial frontier element for one start orientation.
fn seed_element(
    key: GraphKey,
    graph: &DirectedGraph,
    segments: &FxHashMap<ElementId, Segment>,
    stop_map: &FxHashMap<ElementId, Vec<SortedStopEntry>>,
) -> SearchResult<FrontierElement> {
    let value = graph.get(key).ok_or(SearchError::MissingKey(key))?;
    let (visited, almost) = stops_at(key, stop_map);
    let segment = &segments[&key.way];

    let visited_stops: FxHashMap<ElementId, usize> =
        visited.iter().map(|e| (e.collection.best().id, 1)).collect();
    let almost_visited_stops: FxHashMap<ElementId, usize> =
        almost.iter().map(|e| (e.collection.best().id, 1)).collect();

    let mut snapshot = FxHashMap::default();
    snapshot.insert(
        value.intersection,
        (visited_stops.len() + almost_visited_stops.len(), 1),
    );

    Ok(FrontierElement {
        path: vec![key],
        visited_stops,
        almost_visited_stops,
        intersection_snapshot: snapshot,
        length: segment.length_m,
        complete_path: [key.way].into_iter().collect(),
        complete_length: segment.length_m,
        angle_sum: 0.0,
        loop_length: 0.0,
        after_finish_length: 0.0,
        roundabout_enter: None,
    })
}

/// Split the frontier into up to `n` near-equal slices, draining it.
fn slice_frontier(stack: &mut Vec<FrontierElement>, n: usize) -> Vec<Vec<FrontierElement>> {
    let total = stack.len();
    let base = total / n.max(1);
    let remainder = total % n.max(1);

    let mut slices = Vec::new();
    let mut drain = stack.drain(..);

    for i in 0..n.max(1) {
        let size = base + usize::from(i < remainder);
        if size == 0 {
            break;
        }
        slices.push(drain.by_ref().take(size).collect());
    }
    drop(drain);

    debug_assert!(stack.is_empty(), "frontier fully distributed");
    slices
}
