use std::fs;
use std::path::{Path, PathBuf};

use engine::sim::{FlatArea, HazardZone};
use engine::{ContentDatabase, MobId, SimContext, SimError, Vec2};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_TICKS: u32 = 600;
const DEFAULT_DELTA_T: f32 = 1.0 / 60.0;

/// One area as described on disk: where mobs start and how long to run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AreaFile {
    #[serde(default)]
    pub(crate) floor_z: f32,
    #[serde(default)]
    pub(crate) hazard_zones: Vec<HazardZoneFile>,
    #[serde(default)]
    pub(crate) placements: Vec<Placement>,
    /// Index into `placements` of the mob that starts as the active leader.
    #[serde(default)]
    pub(crate) active_leader: Option<usize>,
    #[serde(default = "default_ticks")]
    pub(crate) ticks: u32,
    #[serde(default = "default_delta_t")]
    pub(crate) delta_t: f32,
    /// Log a full snapshot every this many frames; 0 disables.
    #[serde(default)]
    pub(crate) snapshot_every: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct HazardZoneFile {
    pub(crate) hazard: String,
    pub(crate) center: Vec2,
    pub(crate) radius: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Placement {
    pub(crate) mob_type: String,
    pub(crate) pos: Vec2,
    #[serde(default)]
    pub(crate) angle: f32,
}

fn default_ticks() -> u32 {
    DEFAULT_TICKS
}

fn default_delta_t() -> f32 {
    DEFAULT_DELTA_T
}

#[derive(Debug, Error)]
pub(crate) enum AreaLoadError {
    #[error("failed to read area file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse area file {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("area delta_t must be finite and > 0, got {0}")]
    InvalidDeltaTime(f32),
    #[error("hazard zone references unknown hazard '{0}'")]
    UnknownHazard(String),
    #[error("active leader index {index} is out of range for {count} placements")]
    LeaderOutOfRange { index: usize, count: usize },
    #[error("failed to place mob: {0}")]
    Spawn(#[from] SimError),
}

pub(crate) fn area_file_path(areas_dir: &Path, name: &str) -> PathBuf {
    areas_dir.join(format!("{name}.json"))
}

pub(crate) fn load_area_file(path: &Path) -> Result<AreaFile, AreaLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| AreaLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_area_file(path, &raw)
}

pub(crate) fn parse_area_file(path: &Path, raw: &str) -> Result<AreaFile, AreaLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let area = serde_path_to_error::deserialize::<_, AreaFile>(&mut deserializer).map_err(
        |error| AreaLoadError::Parse {
            path: path.to_path_buf(),
            json_path: error.path().to_string(),
            source: error.into_inner(),
        },
    )?;
    if !area.delta_t.is_finite() || area.delta_t <= 0.0 {
        return Err(AreaLoadError::InvalidDeltaTime(area.delta_t));
    }
    Ok(area)
}

/// Resolves hazard names against the loaded content.
pub(crate) fn build_geometry(
    area: &AreaFile,
    content: &ContentDatabase,
) -> Result<FlatArea, AreaLoadError> {
    let mut hazard_zones = Vec::with_capacity(area.hazard_zones.len());
    for zone in &area.hazard_zones {
        let Some(hazard) = content.hazard_id_by_name(&zone.hazard) else {
            return Err(AreaLoadError::UnknownHazard(zone.hazard.clone()));
        };
        hazard_zones.push(HazardZone {
            center: zone.center,
            radius: zone.radius,
            hazard,
        });
    }
    Ok(FlatArea {
        floor_z: area.floor_z,
        hazard_zones,
    })
}

/// Places every mob of the area and joins them before the first frame.
pub(crate) fn populate(sim: &mut SimContext, area: &AreaFile) -> Result<Vec<MobId>, AreaLoadError> {
    if let Some(index) = area.active_leader {
        if index >= area.placements.len() {
            return Err(AreaLoadError::LeaderOutOfRange {
                index,
                count: area.placements.len(),
            });
        }
    }

    let mut placed = Vec::with_capacity(area.placements.len());
    for placement in &area.placements {
        let id = sim.spawn_mob(&placement.mob_type, placement.pos, placement.angle)?;
        debug!(mob = id.index, mob_type = %placement.mob_type, "mob_placed");
        placed.push(id);
    }
    sim.apply_pending();

    if let Some(index) = area.active_leader {
        sim.set_active_leader(placed.get(index).copied());
    }

    info!(mobs = placed.len(), ticks = area.ticks, delta_t = area.delta_t, "area_populated");
    Ok(placed)
}
