//! Run configuration, read from `<home>/.lexisync/config.yaml`.
//!
//! Every field has a default, so a missing file or a partial file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::paths::{config_path, default_source_dir, ensure_root, home, set_file_permissions};
use crate::types::DeleteMode;

/// Dashboard page size used by the remote source.
pub const DEFAULT_PAGE_LIMIT: u32 = 4;
/// Upper bound on concurrently fetched level pages.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// Which identity the level diff keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelKeying {
    /// `(course_id, number)`; works before the source has assigned ids.
    #[default]
    Position,
    /// The level id; both sides must carry one.
    Id,
}

/// Per-tier delete behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePolicy {
    pub courses: DeleteMode,
    pub levels: DeleteMode,
    pub words: DeleteMode,
}

impl Default for DeletePolicy {
    fn default() -> Self {
        Self {
            courses: DeleteMode::Soft,
            levels: DeleteMode::Hard,
            words: DeleteMode::Hard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Root of the fixture-backed remote source. `None` means
    /// `<home>/.lexisync/source`.
    pub source_dir: Option<PathBuf>,
    pub page_limit: u32,
    pub max_concurrent_fetches: usize,
    pub level_keying: LevelKeying,
    /// Whether `is_learned` participates in word equality (and is written on update).
    pub compare_word_learned: bool,
    pub delete: DeletePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            page_limit: DEFAULT_PAGE_LIMIT,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            level_keying: LevelKeying::default(),
            compare_word_learned: false,
            delete: DeletePolicy::default(),
        }
    }
}

impl SyncConfig {
    /// The configured source directory, or the default one under `home`.
    pub fn source_dir_at(&self, home: &Path) -> PathBuf {
        self.source_dir
            .clone()
            .unwrap_or_else(|| default_source_dir(home))
    }
}

/// Load `<home>/.lexisync/config.yaml`, falling back to defaults when absent.
pub fn load_at(home: &Path) -> Result<SyncConfig, StoreError> {
    let path = config_path(home);
    if !path.exists() {
        return Ok(SyncConfig::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SyncConfig, StoreError> {
    load_at(&home()?)
}

/// Write `config` atomically to `<home>/.lexisync/config.yaml`.
pub fn save_at(home: &Path, config: &SyncConfig) -> Result<PathBuf, StoreError> {
    ensure_root(home)?;
    let path = config_path(home);
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml)?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path)?;
    Ok(path)
}
