use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::schema::FestaConfig;

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["festa.toml", "festa.json"];

/// Load config from the given path (TOML or JSON by extension).
pub fn load_config(path: &Path) -> anyhow::Result<FestaConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("parse {}: {e}", path.display()))
    } else {
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parse {}: {e}", path.display()))
    }
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./festa.{toml,json}` (project-local)
/// 2. `~/.config/festa/festa.{toml,json}` (user-global)
///
/// Returns `FestaConfig::default()` if no config file is found.
pub fn discover_and_load() -> FestaConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    FestaConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/festa/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "festa") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}
