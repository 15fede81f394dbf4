pub mod attach;
pub mod delete;
pub mod diff;
pub mod log;
pub mod restore;
pub mod serve;
pub mod show;
pub mod sync;
pub mod write;

use anyhow::{Context, Result};
use gitvault_core::{EngineConfig, EntityId, VersionStore};
use std::path::{Path, PathBuf};

/// Config file first, then flag overrides.
pub fn load_config(config: Option<PathBuf>, root: Option<PathBuf>) -> Result<EngineConfig> {
    let mut config = match config {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(root) = root {
        config = config.with_root(root);
    }

    Ok(config)
}

pub fn open_store(config: EngineConfig) -> Result<VersionStore> {
    VersionStore::new(config).context("opening version store")
}

pub fn parse_entity(entity: &str) -> Result<EntityId> {
    entity
        .parse::<EntityId>()
        .with_context(|| format!("expected <project|model|universal>:<id>, got {:?}", entity))
}

pub fn default_db_path(root: &Path) -> PathBuf {
    root.parent().unwrap_or(root).join("gitvault.db")
}
