//! Error types for lexisync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Tier;

/// All errors that can arise from store and config operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.lexisync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A row the caller expected is absent.
    #[error("{tier} {id} not found")]
    NotFound { tier: Tier, id: String },

    /// An insert collided with an existing row.
    #[error("{tier} {id} already exists")]
    Duplicate { tier: Tier, id: String },

    /// An insert referenced a parent row that does not exist.
    #[error("{tier} {id} references missing parent {parent}")]
    MissingParent {
        tier: Tier,
        id: String,
        parent: String,
    },

    /// A row cannot be stored without a source-assigned id.
    #[error("{tier} has no identity: {detail}")]
    MissingIdentity { tier: Tier, detail: String },
}

impl StoreError {
    pub fn not_found(tier: Tier, id: impl ToString) -> Self {
        StoreError::NotFound {
            tier,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
