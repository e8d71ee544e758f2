//! Uniform read access to both sides of a sync.
//!
//! [`Repository`] is what the loader and the update manager read through;
//! [`crate::remote::RemoteRepository`] serves fresh data and
//! [`LocalRepository`] serves the persisted tree and owns the writes.

use std::sync::Arc;

use async_trait::async_trait;

use lexisync_core::{
    CourseEntity, CourseId, DeletePolicy, LevelEntity, LevelKeying, Store, WordEntity, WordFields,
};

use crate::actions::{Actions, DispatchMode, UpdateFields};
use crate::audit::{AuditSink, TracingAudit};
use crate::diff::DiffContainer;
use crate::error::SyncError;
use crate::report::TierCounts;

#[async_trait]
pub trait Repository: Send + Sync {
    /// Every course, sorted by id.
    async fn get_courses(&self) -> Result<Vec<CourseEntity>, SyncError>;

    /// Levels of `course` with their words, or a not-found error when the
    /// course is unknown to this side.
    async fn get_levels(&self, course: &CourseEntity) -> Result<Vec<LevelEntity>, SyncError>;
}

/// The persisted side, backed by any [`Store`].
pub struct LocalRepository<S> {
    store: S,
    audit: Arc<dyn AuditSink>,
    mode: DispatchMode,
    delete: DeletePolicy,
    fields: UpdateFields,
}

impl<S: Store> LocalRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            audit: Arc::new(TracingAudit),
            mode: DispatchMode::Apply,
            delete: DeletePolicy::default(),
            fields: UpdateFields::default(),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_delete_policy(mut self, delete: DeletePolicy) -> Self {
        self.delete = delete;
        self
    }

    pub fn with_word_fields(mut self, words: WordFields) -> Self {
        self.fields.words = words;
        self
    }

    /// Must agree with the keying of the level selector feeding `save_levels`.
    pub fn with_level_keying(mut self, keying: LevelKeying) -> Self {
        self.fields.level_keying = keying;
        self
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn courses(&self) -> Result<Vec<CourseEntity>, SyncError> {
        Ok(self.store.all_courses()?)
    }

    pub fn levels_of(&self, course_id: CourseId) -> Result<Vec<LevelEntity>, SyncError> {
        Ok(self.store.levels_of(course_id)?)
    }

    fn actions(&mut self) -> Actions<'_, S> {
        Actions::new(&mut self.store, self.audit.as_ref())
            .with_mode(self.mode)
            .with_delete_policy(self.delete)
            .with_update_fields(self.fields)
    }

    pub fn save_courses(
        &mut self,
        diff: &DiffContainer<CourseEntity>,
    ) -> Result<TierCounts, SyncError> {
        self.actions().apply(diff)
    }

    pub fn save_levels(
        &mut self,
        diff: &DiffContainer<LevelEntity>,
    ) -> Result<TierCounts, SyncError> {
        self.actions().apply(diff)
    }

    pub fn save_words(&mut self, diff: &DiffContainer<WordEntity>) -> Result<TierCounts, SyncError> {
        self.actions().apply(diff)
    }

    /// Only the `delete` bucket of a word diff.
    pub fn delete_words(&mut self, words: &[WordEntity]) -> Result<usize, SyncError> {
        self.actions().delete(words)
    }

    /// Every bucket of a word diff except `delete`.
    pub fn save_words_keeping(
        &mut self,
        diff: &DiffContainer<WordEntity>,
    ) -> Result<TierCounts, SyncError> {
        let mut actions = self.actions();
        let updated = actions.update(&diff.update)?;
        let created = actions.create(&diff.create)?;
        let unchanged = actions.equal(&diff.equal)?;
        Ok(TierCounts {
            created,
            updated,
            deleted: 0,
            unchanged,
        })
    }
}

#[async_trait]
impl<S: Store + Send + Sync> Repository for LocalRepository<S> {
    async fn get_courses(&self) -> Result<Vec<CourseEntity>, SyncError> {
        self.courses()
    }

    async fn get_levels(&self, course: &CourseEntity) -> Result<Vec<LevelEntity>, SyncError> {
        self.levels_of(course.id)
    }
}
