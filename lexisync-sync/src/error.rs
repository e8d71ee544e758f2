//! Error types for lexisync-sync.

use thiserror::Error;

use lexisync_core::{StoreError, Tier};

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local store rejected a read or a batch.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Remote I/O failed for a dashboard page or a level page.
    #[error("fetch failed for {target}: {reason}")]
    Fetch { target: String, reason: String },

    /// A remote payload could not be turned into entities.
    #[error("cannot parse {target}: {reason}")]
    Parse { target: String, reason: String },

    /// The persisted side of a diff holds two entities with the same key.
    #[error("ambiguous {tier} key {key}: more than one persisted entity matches")]
    AmbiguousMatch { tier: Tier, key: String },

    /// The run was cancelled before it finished.
    #[error("sync cancelled")]
    Cancelled,

    /// A fetch task panicked or was aborted.
    #[error("task failed: {0}")]
    Task(String),
}

impl SyncError {
    pub fn fetch(target: impl Into<String>, reason: impl ToString) -> Self {
        SyncError::Fetch {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(target: impl Into<String>, reason: impl ToString) -> Self {
        SyncError::Parse {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether a run may continue with the next course after this error.
    ///
    /// Ambiguous keys and cancellation always stop the run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SyncError::Store(_) | SyncError::Fetch { .. } | SyncError::Parse { .. } => true,
            SyncError::Task(_) => true,
            SyncError::AmbiguousMatch { .. } | SyncError::Cancelled => false,
        }
    }
}
