//! A [`RemoteClient`] that serves the platform from files on disk.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   dashboard.json              {"courses": [RawCourse, ...]}
//!   course/5/spanish/1.json     level page for "/course/5/spanish/1"
//! ```
//!
//! Dashboard pages are cut from the full course list with the same inclusive
//! window the live endpoint uses.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::SyncError;
use crate::remote::{DashboardCursor, DashboardPage, RawCourse, RemoteClient};

pub const DASHBOARD_FILE: &str = "dashboard.json";

#[derive(Debug, Deserialize)]
struct DashboardFile {
    #[serde(default)]
    courses: Vec<RawCourse>,
}

#[derive(Debug, Clone)]
pub struct FixtureClient {
    root: PathBuf,
}

impl FixtureClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing the level page at `url`; `None` for URLs that would
    /// escape the root.
    pub fn level_path(&self, url: &str) -> Option<PathBuf> {
        let relative = Path::new(url.trim_matches('/'));
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        let mut path = self.root.join(relative);
        let file_name = format!("{}.json", path.file_name()?.to_string_lossy());
        path.set_file_name(file_name);
        Some(path)
    }

    async fn read(&self, path: &Path, target: &str) -> Result<String, SyncError> {
        tokio::fs::read_to_string(path).await.map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::NotFound => format!("{} does not exist", path.display()),
                _ => e.to_string(),
            };
            SyncError::fetch(target, reason)
        })
    }
}

#[async_trait]
impl RemoteClient for FixtureClient {
    async fn fetch_dashboard_page(
        &self,
        cursor: DashboardCursor,
    ) -> Result<DashboardPage, SyncError> {
        let path = self.root.join(DASHBOARD_FILE);
        let raw = self.read(&path, "dashboard").await?;
        let file: DashboardFile =
            serde_json::from_str(&raw).map_err(|e| SyncError::parse(DASHBOARD_FILE, e))?;

        let total = file.courses.len();
        let start = (cursor.offset as usize).min(total);
        let end = (cursor.offset as usize + cursor.limit as usize + 1).min(total);
        Ok(DashboardPage {
            courses: file.courses[start..end].to_vec(),
            has_more: end < total,
        })
    }

    async fn fetch_level_page(&self, url: &str) -> Result<String, SyncError> {
        let path = self
            .level_path(url)
            .ok_or_else(|| SyncError::fetch(url, "not a level url"))?;
        self.read(&path, url).await
    }
}
