use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use engine::{
    compile_content, resolve_app_paths, ContentCompileError, ContentRequest, SimConfig,
    SimConfigError, SimContext, StartupError,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::area::{self, AreaFile, AreaLoadError};

const ENABLED_MODS_ENV_VAR: &str = "MOBSIM_ENABLED_MODS";
const AREA_ENV_VAR: &str = "MOBSIM_AREA";
const DEFAULT_AREA: &str = "demo";
const SIM_CONFIG_FILE: &str = "sim.json";

pub(crate) struct AppWiring {
    pub(crate) sim: SimContext,
    pub(crate) area_name: String,
    pub(crate) ticks: u32,
    pub(crate) delta_t: f32,
    pub(crate) snapshot_every: u32,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Content(#[from] ContentCompileError),
    #[error("failed to read sim config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] SimConfigError),
    #[error("area '{name}': {source}")]
    Area {
        name: String,
        #[source]
        source: AreaLoadError,
    },
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    info!("=== Mob Sim Startup ===");
    let app_paths = resolve_app_paths()?;
    info!(root = %app_paths.root.display(), "root_resolved");

    let request = ContentRequest::from_mod_list(&env_or_default(ENABLED_MODS_ENV_VAR, ""));
    let compiled = compile_content(&app_paths, &request)?;
    if !compiled.diagnostics.is_empty() {
        warn!(
            count = compiled.diagnostics.len(),
            "content_loaded_with_diagnostics"
        );
    }
    let content = Arc::new(compiled.database);

    let config = load_sim_config(&app_paths.config_dir)?;

    let area_name = env_or_default(AREA_ENV_VAR, DEFAULT_AREA);
    let area_error = |source| BootstrapError::Area {
        name: area_name.clone(),
        source,
    };
    let area_file = area::load_area_file(&area::area_file_path(&app_paths.areas_dir, &area_name))
        .map_err(area_error)?;
    let sim = build_sim(content, config, &area_file).map_err(area_error)?;

    Ok(AppWiring {
        sim,
        ticks: area_file.ticks,
        delta_t: area_file.delta_t,
        snapshot_every: area_file.snapshot_every,
        area_name,
    })
}

pub(crate) fn build_sim(
    content: Arc<engine::ContentDatabase>,
    config: SimConfig,
    area_file: &AreaFile,
) -> Result<SimContext, AreaLoadError> {
    let geometry = area::build_geometry(area_file, &content)?;
    let mut sim = SimContext::new(content, config).with_area(geometry);
    area::populate(&mut sim, area_file)?;
    Ok(sim)
}

/// Reads `sim.json` from the config directory; defaults when absent.
pub(crate) fn load_sim_config(config_dir: &Path) -> Result<SimConfig, BootstrapError> {
    let path = config_dir.join(SIM_CONFIG_FILE);
    if !path.is_file() {
        info!(path = %path.display(), "sim_config_default");
        return Ok(SimConfig::default());
    }
    let raw = fs::read_to_string(&path).map_err(|source| BootstrapError::ConfigRead {
        path: path.clone(),
        source,
    })?;
    let config = SimConfig::from_json_str(&raw)?;
    info!(path = %path.display(), "sim_config_loaded");
    Ok(config)
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn env_or_default(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .unwrap_or_else(|| default.to_string())
}
