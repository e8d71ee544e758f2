//! # lexisync-sync
//!
//! Three-tier reconciliation between a remote course dashboard and the local
//! store.
//!
//! Build an [`UpdateManager`] from a fresh-data [`Repository`] (usually a
//! [`RemoteRepository`]) and a [`LocalRepository`], then call
//! [`UpdateManager::update`] once per run.

pub mod actions;
pub mod audit;
pub mod diff;
pub mod error;
pub mod fixture;
pub mod loader;
pub mod manager;
pub mod remote;
pub mod report;
pub mod repository;
pub mod selectors;

pub use actions::{Actions, DispatchMode, Persist, UpdateFields};
pub use audit::{AuditAction, AuditRecord, AuditSink, RecordingAudit, TracingAudit};
pub use tokio_util::sync::CancellationToken;
pub use diff::{match_entities, DiffContainer};
pub use error::SyncError;
pub use fixture::FixtureClient;
pub use loader::{Dashboard, DashboardLoader};
pub use manager::UpdateManager;
pub use remote::{
    DashboardCursor, DashboardPage, JsonLevelParser, LevelParser, RawCourse, RemoteClient,
    RemoteRepository,
};
pub use report::{CourseFailure, SyncReport, TierCounts};
pub use repository::{LocalRepository, Repository};
pub use selectors::{CourseSelector, LevelKey, LevelSelector, Selector, WordSelector};
