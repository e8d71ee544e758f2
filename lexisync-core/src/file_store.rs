//! YAML-file backed store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.lexisync/
//!   store.yaml      (all tables, mode 0600)
//!   store.yaml.tmp  (transient, during a save)
//! ```
//!
//! Each mutating call runs against a copy of the tables; the copy is written to
//! `store.yaml.tmp`, renamed over `store.yaml`, and only then swapped in. A
//! rejected batch or a failed write leaves both disk and memory unchanged.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LevelKeying;
use crate::error::StoreError;
use crate::paths::{ensure_root, home, set_file_permissions, store_path};
use crate::store::{MemoryStore, Store, Tables, WordFields};
use crate::types::{CourseEntity, CourseId, LevelEntity, LevelId, WordEntity, WordId};

/// On-disk payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFile {
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tables: Tables,
}

/// Load the store file at `path`; an absent file is an empty store.
pub fn load_file(path: &Path) -> Result<StoreFile, StoreError> {
    if !path.exists() {
        return Ok(StoreFile::default());
    }
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Atomically save `file` to `path`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_file(path: &Path, file: &StoreFile) -> Result<(), StoreError> {
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(file)?;
    std::fs::write(&tmp, yaml)?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// A [`Store`] persisted to `<home>/.lexisync/store.yaml`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
    saved_at: Option<DateTime<Utc>>,
}

impl FileStore {
    /// Open (or start) the store under `home`.
    pub fn open_at(home: &Path) -> Result<Self, StoreError> {
        ensure_root(home)?;
        let path = store_path(home);
        let file = load_file(&path)?;
        Ok(Self {
            path,
            inner: MemoryStore::from_tables(file.tables),
            saved_at: file.saved_at,
        })
    }

    /// `open_at` convenience wrapper.
    pub fn open() -> Result<Self, StoreError> {
        Self::open_at(&home()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the last successful write happened, if ever.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }

    fn commit<F>(&mut self, op: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut MemoryStore) -> Result<(), StoreError>,
    {
        let mut next = self.inner.clone();
        op(&mut next)?;
        let now = Utc::now();
        let file = StoreFile {
            saved_at: Some(now),
            tables: next.tables().clone(),
        };
        save_file(&self.path, &file)?;
        tracing::debug!(path = %self.path.display(), "store saved");
        self.inner = next;
        self.saved_at = Some(now);
        Ok(())
    }
}

impl Store for FileStore {
    fn all_courses(&self) -> Result<Vec<CourseEntity>, StoreError> {
        self.inner.all_courses()
    }

    fn course(&self, id: CourseId) -> Result<CourseEntity, StoreError> {
        self.inner.course(id)
    }

    fn levels_of(&self, course_id: CourseId) -> Result<Vec<LevelEntity>, StoreError> {
        self.inner.levels_of(course_id)
    }

    fn words_of(&self, level_id: LevelId) -> Result<Vec<WordEntity>, StoreError> {
        self.inner.words_of(level_id)
    }

    fn insert_courses(&mut self, courses: &[CourseEntity]) -> Result<(), StoreError> {
        self.commit(|s| s.insert_courses(courses))
    }

    fn update_courses(&mut self, courses: &[CourseEntity]) -> Result<(), StoreError> {
        self.commit(|s| s.update_courses(courses))
    }

    fn disable_courses(&mut self, ids: &[CourseId]) -> Result<(), StoreError> {
        self.commit(|s| s.disable_courses(ids))
    }

    fn remove_courses(&mut self, ids: &[CourseId]) -> Result<(), StoreError> {
        self.commit(|s| s.remove_courses(ids))
    }

    fn insert_levels(&mut self, levels: &[LevelEntity]) -> Result<(), StoreError> {
        self.commit(|s| s.insert_levels(levels))
    }

    fn update_levels(
        &mut self,
        levels: &[LevelEntity],
        keying: LevelKeying,
    ) -> Result<(), StoreError> {
        self.commit(|s| s.update_levels(levels, keying))
    }

    fn remove_levels(&mut self, levels: &[LevelEntity]) -> Result<(), StoreError> {
        self.commit(|s| s.remove_levels(levels))
    }

    fn insert_words(&mut self, words: &[WordEntity]) -> Result<(), StoreError> {
        self.commit(|s| s.insert_words(words))
    }

    fn update_words(
        &mut self,
        words: &[WordEntity],
        fields: WordFields,
    ) -> Result<(), StoreError> {
        self.commit(|s| s.update_words(words, fields))
    }

    fn remove_words(&mut self, ids: &[WordId]) -> Result<(), StoreError> {
        self.commit(|s| s.remove_words(ids))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
