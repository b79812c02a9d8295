//! Transport traits and the tiled fetch controller.
//!
//! The actual HTTP clients live in the front end; the core sees two
//! narrow traits and is tested against in-memory doubles.  Everything
//! else here — cell gathering, history, batch merging, element grouping,
//! graph and stop assembly — is the controller's own work.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};

use rf_core::{Coord, ElementId, EngineConfig};
use rf_net::{build_segments, is_routable, RawWay, RouteMode, SegmentSet};
use rf_stops::{build_collections, StopCollection, StopFeature};

use crate::cache::{TtlCache, CACHE_CAPACITY};
use crate::coverage::BoundingBoxCollection;
use crate::doc::{parse_relation_docs, parse_way_docs, RelationDoc, WayDoc};
use crate::element::{
    is_bus_related, is_rail_related, parse_elements, preprocess_elements, merge_stop_area_tags,
    RawElement,
};
use crate::grid::{BoundingBox, Cell};
use crate::history::DownloadHistory;
use crate::merge::optimize_cells;
use crate::query::{
    bounding_box_query, network_query, parents_query, split_by_count, NETWORK_QUERY_GROUPS,
};
use crate::retry::{retry_read, READ_ATTEMPTS};
use crate::triggers::download_triggers;
use crate::{FetchError, FetchResult};

// ── Transport traits ──────────────────────────────────────────────────────────

/// The geographic query service (Overpass-style): post a query program,
/// receive a response body.
pub trait QueryService: Send + Sync {
    fn query(&self, program: &str, timeout: Duration) -> FetchResult<String>;
}

/// The element store (OSM-style), JSON reads only — mutations go through
/// the uploader, which is a front-end collaborator.
pub trait ElementStore: Send + Sync {
    fn get_json(&self, path: &str) -> FetchResult<String>;

    /// Fetch one relation document.
    fn relation(&self, id: i64) -> FetchResult<RelationDoc> {
        let body = retry_read(READ_ATTEMPTS, || {
            self.get_json(&format!("/0.6/relations.json?relations={id}"))
        })?;
        parse_relation_docs(&body)?
            .into_iter()
            .next()
            .ok_or(FetchError::NotFound(id))
    }

    /// Fetch several way documents.
    fn ways(&self, ids: &[i64]) -> FetchResult<Vec<WayDoc>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let list = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let body =
            retry_read(READ_ATTEMPTS, || self.get_json(&format!("/0.6/ways.json?ways={list}")))?;
        parse_way_docs(&body)
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Everything one relation ingest produces.
pub struct RelationFetch {
    /// The box enclosing all fetched area, when anything was fetched.
    pub bounds: Option<BoundingBox>,
    pub history: DownloadHistory,
    /// Segment → candidate expansion cells where its polyline escapes the
    /// covered area.
    pub triggers: FxHashMap<ElementId, Vec<Cell>>,
    pub segments: SegmentSet,
    pub collections: Vec<StopCollection>,
    /// Native way ids that are members of the edited relation (empty in
    /// merge mode, where the client owns membership).
    pub member_way_ids: FxHashSet<i64>,
}

/// Parent relations of a set of ways, plus the node lists of every way
/// those relations reference.
#[derive(Clone, Default)]
pub struct ParentsResult {
    pub relations_by_way: FxHashMap<i64, Vec<RelationDoc>>,
    pub ways: FxHashMap<i64, WayDoc>,
}

// ── TiledFetcher ──────────────────────────────────────────────────────────────

const SEED_TIMEOUT_S: u32 = 60;
const NETWORK_TIMEOUT_S: u32 = 180;
const PARENTS_TIMEOUT_S: u32 = 60;

const SESSION_TTL: Duration = Duration::from_secs(2 * 3600);
const INGEST_TTL: Duration = Duration::from_secs(60);

/// Drives tiled ingestion against a [`QueryService`].
pub struct TiledFetcher<Q> {
    config: EngineConfig,
    service: Q,
    /// (session, query) → grouped elements; a session replays batches
    /// verbatim, so these stay valid for its whole lifetime.
    batch_cache: Mutex<TtlCache<(String, String), Vec<Vec<RawElement>>>>,
    /// relation id → seed bounding-box elements.
    seed_cache: Mutex<TtlCache<i64, Vec<RawElement>>>,
    /// sorted way ids → parents result.
    parents_cache: Mutex<TtlCache<Vec<i64>, ParentsResult>>,
}

impl<Q: QueryService> TiledFetcher<Q> {
    pub fn new(config: EngineConfig, service: Q) -> Self {
        Self {
            config,
            service,
            batch_cache: Mutex::new(TtlCache::new(CACHE_CAPACITY, SESSION_TTL)),
            seed_cache: Mutex::new(TtlCache::new(CACHE_CAPACITY, INGEST_TTL)),
            parents_cache: Mutex::new(TtlCache::new(CACHE_CAPACITY, INGEST_TTL)),
        }
    }

    /// The underlying transport — mainly for tests against doubles.
    pub fn service(&self) -> &Q {
        &self.service
    }

    /// Ingest the network around a relation.
    ///
    /// With `history = None` a fresh session starts (this is also the
    /// reload path: the previous history collapses into one new batch).
    /// With `targets = Some(cells)` the client drives expansion ("merge
    /// mode") and relation membership stays client-owned.
    pub fn query_relation(
        &self,
        relation_id: i64,
        history: Option<DownloadHistory>,
        targets: Option<Vec<Cell>>,
        mode: RouteMode,
    ) -> FetchResult<RelationFetch> {
        let (member_way_ids, batch_cells) = match targets {
            Some(cells) => (FxHashSet::default(), cells),
            None => self.gather_seed_cells(relation_id)?,
        };

        if batch_cells.is_empty() {
            return Err(FetchError::BadInput("no grid cells to download".to_owned()));
        }

        let history = match history {
            None => DownloadHistory::new(batch_cells.clone()),
            Some(mut h) => {
                h.append(batch_cells.clone());
                h
            }
        };

        // Replay every batch; groups merge index-wise.
        let mut groups: Vec<Vec<RawElement>> = vec![Vec::new(); NETWORK_QUERY_GROUPS];
        let mut all_bbs: Vec<BoundingBox> = Vec::new();

        for batch in &history.batches {
            let (bbs, bbs_expanded) =
                optimize_cells(batch, self.config.grid_step_deg, self.config.cell_expand_deg);
            log::debug!(
                "downloading {} cell rectangles for relation {relation_id}",
                bbs.len(),
            );

            let batch_groups = self.fetch_network_batch(&history.session, &bbs, &bbs_expanded)?;
            for (merged, batch_group) in groups.iter_mut().zip(batch_groups) {
                merged.extend(batch_group);
            }
            all_bbs.extend(bbs);
        }

        let bbc = BoundingBoxCollection::new(&all_bbs);

        let [way_els, node_els, turn_els, stop_els, sa_relations, sa_platforms, sa_stops]: [Vec<RawElement>; NETWORK_QUERY_GROUPS] =
            groups
                .try_into()
                .map_err(|_| FetchError::Internal("network group arity".to_owned()))?;

        let segments =
            self.assemble_segments(way_els, node_els, turn_els, &member_way_ids, mode)?;

        let collections = assemble_collections(
            stop_els,
            sa_relations,
            sa_platforms,
            sa_stops,
            mode,
            self.config.stop_search_m,
        );
        let collections: Vec<StopCollection> = collections
            .into_iter()
            .filter(|c| bbc.contains(c.best().coord))
            .collect();

        let triggers = download_triggers(
            &bbc,
            &batch_cells,
            &segments.segments,
            self.config.grid_step_deg,
        );

        Ok(RelationFetch {
            bounds: bbc.global_bounds(),
            history,
            triggers,
            segments,
            collections,
            member_way_ids,
        })
    }

    /// Parent relations of the given ways (for member-list rewriting
    /// after a split).
    pub fn query_parents(&self, way_ids: &[i64]) -> FetchResult<ParentsResult> {
        let mut key: Vec<i64> = way_ids.to_vec();
        key.sort_unstable();
        key.dedup();

        if let Some(cached) = lock(&self.parents_cache).get(&key) {
            return Ok(cached);
        }

        let program = parents_query(key.iter().copied(), PARENTS_TIMEOUT_S);
        let body = retry_read(READ_ATTEMPTS, || {
            self.service
                .query(&program, Duration::from_secs(2 * PARENTS_TIMEOUT_S as u64))
        })?;

        let id_set: FxHashSet<i64> = key.iter().copied().collect();
        let mut result = ParentsResult::default();

        for element in parse_elements(&body)? {
            match element.kind.as_str() {
                "relation" => {
                    let doc = RelationDoc::try_from(element)?;
                    // Single-member relations cannot need orientation fixes.
                    if doc.members.len() <= 1 {
                        continue;
                    }
                    for way_id in doc
                        .members
                        .iter()
                        .filter(|m| m.kind == rf_core::ElementKind::Way)
                        .map(|m| m.r#ref)
                        .filter(|r| id_set.contains(r))
                        .collect::<FxHashSet<i64>>()
                    {
                        result
                            .relations_by_way
                            .entry(way_id)
                            .or_default()
                            .push(doc.clone());
                    }
                }
                "way" => {
                    let doc = WayDoc::try_from(element)?;
                    result.ways.insert(doc.id, doc);
                }
                other => {
                    return Err(FetchError::Parse(format!(
                        "unexpected element kind {other:?} in parents response",
                    )));
                }
            }
        }

        lock(&self.parents_cache).insert(key, result.clone());
        Ok(result)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Seed mode: fetch the relation's way bounding boxes, expand, and
    /// gather the covering cells.
    fn gather_seed_cells(&self, relation_id: i64) -> FetchResult<(FxHashSet<i64>, Vec<Cell>)> {
        let elements = if let Some(cached) = lock(&self.seed_cache).get(&relation_id) {
            cached
        } else {
            let program = bounding_box_query(relation_id, SEED_TIMEOUT_S);
            let body = retry_read(READ_ATTEMPTS, || {
                self.service
                    .query(&program, Duration::from_secs(2 * SEED_TIMEOUT_S as u64))
            })?;
            let elements = parse_elements(&body)?;
            lock(&self.seed_cache).insert(relation_id, elements.clone());
            elements
        };

        let member_way_ids: FxHashSet<i64> = elements.iter().map(|e| e.id).collect();

        let mut cells: std::collections::BTreeSet<Cell> = std::collections::BTreeSet::new();
        for element in &elements {
            if let Some(bounds) = element.bounds {
                let bb = BoundingBox::new(bounds.minlat, bounds.minlon, bounds.maxlat, bounds.maxlon)
                    .extend_m(self.config.way_bb_expand_m);
                cells.extend(bb.cells(self.config.grid_step_deg));
            }
        }

        Ok((member_way_ids, cells.into_iter().collect()))
    }

    fn fetch_network_batch(
        &self,
        session: &str,
        bbs: &[BoundingBox],
        bbs_expanded: &[BoundingBox],
    ) -> FetchResult<Vec<Vec<RawElement>>> {
        let program = network_query(bbs, bbs_expanded, NETWORK_TIMEOUT_S);
        let cache_key = (session.to_owned(), program.clone());

        if let Some(cached) = lock(&self.batch_cache).get(&cache_key) {
            return Ok(cached);
        }

        let body = retry_read(READ_ATTEMPTS, || {
            self.service
                .query(&program, Duration::from_secs(2 * NETWORK_TIMEOUT_S as u64))
        })?;

        let groups = split_by_count(parse_elements(&body)?)?;
        if groups.len() != NETWORK_QUERY_GROUPS {
            return Err(FetchError::Parse(format!(
                "expected {NETWORK_QUERY_GROUPS} response groups, got {}",
                groups.len(),
            )));
        }

        lock(&self.batch_cache).insert(cache_key, groups.clone());
        Ok(groups)
    }

    fn assemble_segments(
        &self,
        way_els: Vec<RawElement>,
        node_els: Vec<RawElement>,
        turn_els: Vec<RawElement>,
        member_way_ids: &FxHashSet<i64>,
        mode: RouteMode,
    ) -> FetchResult<SegmentSet> {
        let node_coords: FxHashMap<i64, Coord> = preprocess_elements(node_els)
            .into_iter()
            .filter_map(|e| e.coord().map(|c| (e.id, c)))
            .collect();

        let turn_nodes: FxHashSet<i64> = turn_els.into_iter().map(|e| e.id).collect();

        let raw_ways: Vec<RawWay> = preprocess_elements(way_els)
            .into_iter()
            .filter(|e| is_routable(mode, &e.tags))
            .map(|e| RawWay {
                id: e.id,
                member: member_way_ids.contains(&e.id),
                nodes: e.nodes,
                tags: e.tags,
            })
            .collect();

        Ok(build_segments(&raw_ways, &node_coords, &turn_nodes)?)
    }
}

/// Stop-feature assembly: merge stop-area tags, deduplicate, filter by
/// vehicle class, cluster.
fn assemble_collections(
    stop_els: Vec<RawElement>,
    sa_relations: Vec<RawElement>,
    mut sa_platforms: Vec<RawElement>,
    mut sa_stops: Vec<RawElement>,
    mode: RouteMode,
    search_radius_m: f64,
) -> Vec<StopCollection> {
    merge_stop_area_tags(&sa_relations, &mut sa_platforms, "platform", "platform");
    merge_stop_area_tags(&sa_relations, &mut sa_stops, "stop", "stop_position");

    // Stop-area-merged versions come first so deduplication keeps them.
    let mut candidates = sa_platforms;
    candidates.extend(sa_stops);
    candidates.extend(stop_els);

    let features: Vec<StopFeature> = preprocess_elements(candidates)
        .into_iter()
        .filter(|e| match mode {
            RouteMode::Bus => is_bus_related(&e.tags) || !is_rail_related(&e.tags),
            RouteMode::Tram => is_rail_related(&e.tags) || !is_bus_related(&e.tags),
        })
        .filter_map(|e| {
            let kind = rf_core::ElementKind::parse(&e.kind)?;
            let coord = e.coord()?;
            StopFeature::from_element(ElementId::Native(e.id), kind, coord, e.tags)
        })
        .collect();

    build_collections(features, search_radius_m)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
