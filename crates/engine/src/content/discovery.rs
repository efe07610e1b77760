use std::collections::HashSet;
use std::path::PathBuf;

use crate::AppPaths;

use super::types::{ContentDiscoveryError, ContentRequest};

pub const BASE_MOD_ID: &str = "base";

#[derive(Debug, Clone)]
pub(crate) struct ModSource {
    pub mod_id: String,
    pub dir: PathBuf,
}

/// Base content first, then every enabled mod in request order.
pub(crate) fn discover_mod_sources(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<Vec<ModSource>, ContentDiscoveryError> {
    if !app_paths.base_content_dir.is_dir() {
        return Err(ContentDiscoveryError::BaseContentMissing {
            path: app_paths.base_content_dir.clone(),
        });
    }

    let mut seen = HashSet::<String>::new();
    let mut sources = vec![ModSource {
        mod_id: BASE_MOD_ID.to_string(),
        dir: app_paths.base_content_dir.clone(),
    }];

    for mod_id in &request.enabled_mods {
        let trimmed = mod_id.trim();
        if trimmed.is_empty() {
            return Err(ContentDiscoveryError::EmptyEnabledMod);
        }
        if !seen.insert(trimmed.to_string()) {
            return Err(ContentDiscoveryError::DuplicateEnabledMod {
                mod_id: trimmed.to_string(),
            });
        }
        let dir = app_paths.mods_dir.join(trimmed);
        if !dir.is_dir() {
            return Err(ContentDiscoveryError::EnabledModMissing {
                mod_id: trimmed.to_string(),
                expected_dir: dir,
            });
        }
        sources.push(ModSource {
            mod_id: trimmed.to_string(),
            dir,
        });
    }

    Ok(sources)
}
