//! Engine configuration.
//!
//! Typically constructed once at startup from the environment and passed
//! down by reference.  Every knob has a documented default, so tests can
//! use `EngineConfig::default()` and override a field or two.

use std::time::Duration;

use crate::{CoreError, CoreResult};

/// Changeset tag values longer than this are truncated with an ellipsis.
pub const TAG_MAX_LENGTH: usize = 255;

/// Top-level engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Geographic query service endpoint (`OVERPASS_ENDPOINT`).
    pub overpass_endpoint: String,

    /// OAuth client id / secret for the element store
    /// (`OSM_CLIENT` / `OSM_SECRET`).  Absent in read-only deployments.
    pub osm_client: Option<String>,
    pub osm_secret: Option<String>,

    /// Logical CPU count used for worker sizing (`CPU_COUNT`).
    pub cpu_count: usize,

    /// Tiled-fetch grid step in degrees (`GRID_STEP_DEG`).  Default 0.01.
    pub grid_step_deg: f64,

    /// Way bounding-box expansion before cell gathering, in metres
    /// (`WAY_BB_EXPAND_M`).  Default 250.
    pub way_bb_expand_m: f64,

    /// Stop clustering search radius in metres (`STOP_SEARCH_M`).
    /// Default 50.
    pub stop_search_m: f64,

    /// Cell expansion for stop queries, in degrees (`CELL_EXPAND_DEG`).
    /// Default 0.001.  Must satisfy
    /// `cell_expand_deg * 111_111 > 2 * stop_search_m` so that a stop near
    /// a cell border is always fetched by the cell covering its road.
    pub cell_expand_deg: f64,

    /// Wall-clock budget for one route calculation.  Default 3 s.
    pub calc_deadline: Duration,

    /// Concurrent route-calculation requests admitted by the host.
    pub max_concurrent_calcs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overpass_endpoint: "https://overpass-api.de/api/interpreter".to_owned(),
            osm_client: None,
            osm_secret: None,
            cpu_count: std::thread::available_parallelism().map_or(1, |n| n.get()),
            grid_step_deg: 0.01,
            way_bb_expand_m: 250.0,
            stop_search_m: 50.0,
            cell_expand_deg: 0.001,
            calc_deadline: Duration::from_secs(3),
            max_concurrent_calcs: 3,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from the process environment, falling back to
    /// defaults for unset variables.
    pub fn from_env() -> CoreResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("OVERPASS_ENDPOINT") {
            config.overpass_endpoint = v;
        }
        config.osm_client = std::env::var("OSM_CLIENT").ok().filter(|v| !v.is_empty());
        config.osm_secret = std::env::var("OSM_SECRET").ok().filter(|v| !v.is_empty());

        if config.osm_client.is_none() || config.osm_secret.is_none() {
            log::warn!("OSM_CLIENT and/or OSM_SECRET unset; uploads will be unavailable");
        }

        fn parse_env<T: std::str::FromStr>(key: &str, into: &mut T) -> CoreResult<()> {
            if let Ok(raw) = std::env::var(key) {
                *into = raw
                    .parse()
                    .map_err(|_| CoreError::Config(format!("invalid {key}: {raw:?}")))?;
            }
            Ok(())
        }

        parse_env("CPU_COUNT", &mut config.cpu_count)?;
        parse_env("GRID_STEP_DEG", &mut config.grid_step_deg)?;
        parse_env("WAY_BB_EXPAND_M", &mut config.way_bb_expand_m)?;
        parse_env("STOP_SEARCH_M", &mut config.stop_search_m)?;
        parse_env("CELL_EXPAND_DEG", &mut config.cell_expand_deg)?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> CoreResult<()> {
        if self.cpu_count == 0 {
            return Err(CoreError::Config("CPU_COUNT must be positive".to_owned()));
        }
        if self.grid_step_deg <= 0.0 {
            return Err(CoreError::Config("GRID_STEP_DEG must be positive".to_owned()));
        }
        if self.cell_expand_deg * 111_111.0 <= 2.0 * self.stop_search_m {
            return Err(CoreError::Config(format!(
                "CELL_EXPAND_DEG * 111111 ({:.0} m) must exceed 2 * STOP_SEARCH_M ({:.0} m)",
                self.cell_expand_deg * 111_111.0,
                2.0 * self.stop_search_m,
            )));
        }
        Ok(())
    }

    /// DFS workers per route calculation: `max(1, cpu / 4)`.
    #[inline]
    pub fn n_workers(&self) -> usize {
        (self.cpu_count / 4).max(1)
    }

    /// Worker-pool size covering all concurrent calculations.
    #[inline]
    pub fn max_workers(&self) -> usize {
        self.n_workers() * self.max_concurrent_calcs
    }
}
