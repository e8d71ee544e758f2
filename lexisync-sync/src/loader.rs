//! One-shot snapshot of the remote tree.
//!
//! [`DashboardLoader::load`] fetches every course and its levels once; later
//! calls return the same [`Dashboard`] until [`DashboardLoader::refresh`] is
//! called. A course whose levels could not be fetched stays in the snapshot
//! with no levels and a recorded failure.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use lexisync_core::{CourseEntity, CourseId, LevelEntity};
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;
use crate::repository::Repository;

/// Fresh course tree, with levels nested under each course.
#[derive(Debug, Clone)]
pub struct Dashboard {
    courses: Vec<CourseEntity>,
    failures: BTreeMap<CourseId, String>,
    loaded_at: DateTime<Utc>,
}

impl Dashboard {
    pub fn courses(&self) -> &[CourseEntity] {
        &self.courses
    }

    pub fn course(&self, id: CourseId) -> Option<&CourseEntity> {
        self.courses.iter().find(|c| c.id == id)
    }

    /// Fresh levels of a course, or the reason they could not be fetched.
    ///
    /// A course missing from the snapshot has no levels.
    pub fn levels_of(&self, id: CourseId) -> Result<&[LevelEntity], &str> {
        if let Some(reason) = self.failures.get(&id) {
            return Err(reason.as_str());
        }
        Ok(self.course(id).map(|c| c.levels.as_slice()).unwrap_or(&[]))
    }

    pub fn failures(&self) -> &BTreeMap<CourseId, String> {
        &self.failures
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

pub struct DashboardLoader {
    remote: Arc<dyn Repository>,
    snapshot: Option<Dashboard>,
}

impl DashboardLoader {
    pub fn new(remote: Arc<dyn Repository>) -> Self {
        Self {
            remote,
            snapshot: None,
        }
    }

    /// The cached snapshot, if `load` has completed.
    pub fn snapshot(&self) -> Option<&Dashboard> {
        self.snapshot.as_ref()
    }

    /// Load the snapshot once, racing the fetch against `cancel`.
    ///
    /// Cancelling drops the in-flight fetch, which aborts its level tasks.
    pub async fn load(&mut self, cancel: &CancellationToken) -> Result<&Dashboard, SyncError> {
        if self.snapshot.is_none() {
            let remote = Arc::clone(&self.remote);
            let dashboard = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                res = fetch(remote) => res?,
            };
            self.snapshot = Some(dashboard);
        }
        self.snapshot.as_ref().ok_or(SyncError::Cancelled)
    }

    /// Drop the cached snapshot and load a new one.
    pub async fn refresh(&mut self, cancel: &CancellationToken) -> Result<&Dashboard, SyncError> {
        self.snapshot = None;
        self.load(cancel).await
    }
}

async fn fetch(remote: Arc<dyn Repository>) -> Result<Dashboard, SyncError> {
    let mut courses = remote.get_courses().await?;
    let mut failures = BTreeMap::new();

    for course in &mut courses {
        course.make_level_urls();
        match remote.get_levels(course).await {
            Ok(levels) => course.levels = levels,
            Err(e) if e.is_recoverable() => {
                tracing::warn!(course_id = %course.id, error = %e, "levels unavailable");
                failures.insert(course.id, e.to_string());
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        courses = courses.len(),
        failed = failures.len(),
        "dashboard loaded"
    );
    Ok(Dashboard {
        courses,
        failures,
        loaded_at: Utc::now(),
    })
}
