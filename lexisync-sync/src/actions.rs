//! The action dispatcher: applies a [`DiffContainer`] to a [`Store`].
//!
//! One [`Actions`] value is built per save call and borrows the store and the
//! audit sink for that call only. Each batch is audited once per parent before
//! the store is touched, and in [`DispatchMode::DryRun`] the store is never
//! touched at all.

use std::collections::BTreeMap;

use lexisync_core::{
    CourseEntity, DeleteMode, DeletePolicy, LevelEntity, LevelKeying, Store, StoreError, Tier,
    WordEntity, WordFields, WordId,
};

use crate::audit::{AuditAction, AuditRecord, AuditSink};
use crate::diff::DiffContainer;
use crate::error::SyncError;
use crate::report::TierCounts;

/// Whether batches reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    #[default]
    Apply,
    /// Audit only.
    DryRun,
}

/// Tier settings that shape an update write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateFields {
    pub words: WordFields,
    /// How an updated level finds the row it was matched against.
    pub level_keying: LevelKeying,
}

// ---------------------------------------------------------------------------
// Persist
// ---------------------------------------------------------------------------

/// How an entity type maps onto the [`Store`] calls for its tier.
pub trait Persist: Sized {
    const TIER: Tier;

    /// Identity shown in audit records.
    fn audit_id(&self) -> String;

    /// Audit grouping: the owning parent, `None` at the top tier.
    fn parent(&self) -> Option<String>;

    fn insert<S: Store + ?Sized>(store: &mut S, batch: &[Self]) -> Result<(), StoreError>;

    fn update<S: Store + ?Sized>(
        store: &mut S,
        batch: &[Self],
        fields: UpdateFields,
    ) -> Result<(), StoreError>;

    fn remove<S: Store + ?Sized>(
        store: &mut S,
        batch: &[Self],
        mode: DeleteMode,
    ) -> Result<(), StoreError>;
}

impl Persist for CourseEntity {
    const TIER: Tier = Tier::Course;

    fn audit_id(&self) -> String {
        self.id.to_string()
    }

    fn parent(&self) -> Option<String> {
        None
    }

    fn insert<S: Store + ?Sized>(store: &mut S, batch: &[Self]) -> Result<(), StoreError> {
        store.insert_courses(batch)
    }

    fn update<S: Store + ?Sized>(
        store: &mut S,
        batch: &[Self],
        _fields: UpdateFields,
    ) -> Result<(), StoreError> {
        store.update_courses(batch)
    }

    fn remove<S: Store + ?Sized>(
        store: &mut S,
        batch: &[Self],
        mode: DeleteMode,
    ) -> Result<(), StoreError> {
        let ids: Vec<_> = batch.iter().map(|c| c.id).collect();
        match mode {
            DeleteMode::Soft => store.disable_courses(&ids),
            DeleteMode::Hard => store.remove_courses(&ids),
        }
    }
}

impl Persist for LevelEntity {
    const TIER: Tier = Tier::Level;

    fn audit_id(&self) -> String {
        self.label()
    }

    fn parent(&self) -> Option<String> {
        Some(format!("course {}", self.course_id))
    }

    fn insert<S: Store + ?Sized>(store: &mut S, batch: &[Self]) -> Result<(), StoreError> {
        store.insert_levels(batch)
    }

    fn update<S: Store + ?Sized>(
        store: &mut S,
        batch: &[Self],
        fields: UpdateFields,
    ) -> Result<(), StoreError> {
        store.update_levels(batch, fields.level_keying)
    }

    fn remove<S: Store + ?Sized>(
        store: &mut S,
        batch: &[Self],
        mode: DeleteMode,
    ) -> Result<(), StoreError> {
        match mode {
            // levels carry no disabled flag
            DeleteMode::Soft => Ok(()),
            DeleteMode::Hard => store.remove_levels(batch),
        }
    }
}

impl Persist for WordEntity {
    const TIER: Tier = Tier::Word;

    fn audit_id(&self) -> String {
        self.id.to_string()
    }

    fn parent(&self) -> Option<String> {
        Some(format!("level {}", self.level_id))
    }

    fn insert<S: Store + ?Sized>(store: &mut S, batch: &[Self]) -> Result<(), StoreError> {
        store.insert_words(batch)
    }

    fn update<S: Store + ?Sized>(
        store: &mut S,
        batch: &[Self],
        fields: UpdateFields,
    ) -> Result<(), StoreError> {
        store.update_words(batch, fields.words)
    }

    fn remove<S: Store + ?Sized>(
        store: &mut S,
        batch: &[Self],
        mode: DeleteMode,
    ) -> Result<(), StoreError> {
        match mode {
            DeleteMode::Soft => Ok(()),
            DeleteMode::Hard => {
                let ids: Vec<WordId> = batch.iter().map(|w| w.id).collect();
                store.remove_words(&ids)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Dispatcher bound to one store and one audit sink.
pub struct Actions<'a, S: Store + ?Sized> {
    store: &'a mut S,
    audit: &'a dyn AuditSink,
    mode: DispatchMode,
    delete: DeletePolicy,
    fields: UpdateFields,
}

impl<'a, S: Store + ?Sized> Actions<'a, S> {
    pub fn new(store: &'a mut S, audit: &'a dyn AuditSink) -> Self {
        Self {
            store,
            audit,
            mode: DispatchMode::Apply,
            delete: DeletePolicy::default(),
            fields: UpdateFields::default(),
        }
    }

    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_delete_policy(mut self, delete: DeletePolicy) -> Self {
        self.delete = delete;
        self
    }

    pub fn with_update_fields(mut self, fields: UpdateFields) -> Self {
        self.fields = fields;
        self
    }

    fn delete_mode(&self, tier: Tier) -> DeleteMode {
        match tier {
            Tier::Course => self.delete.courses,
            Tier::Level => self.delete.levels,
            Tier::Word => self.delete.words,
        }
    }

    fn dry_run(&self) -> bool {
        self.mode == DispatchMode::DryRun
    }

    fn audit_batch<T: Persist>(&self, action: AuditAction, batch: &[T]) {
        let mut groups: BTreeMap<Option<String>, Vec<String>> = BTreeMap::new();
        for entity in batch {
            groups
                .entry(entity.parent())
                .or_default()
                .push(entity.audit_id());
        }
        for (parent, ids) in groups {
            self.audit.record(AuditRecord {
                tier: T::TIER,
                action,
                parent,
                count: ids.len(),
                ids,
                dry_run: self.dry_run(),
            });
        }
    }

    /// Insert `batch`. Identity always comes from the source.
    pub fn create<T: Persist>(&mut self, batch: &[T]) -> Result<usize, SyncError> {
        if batch.is_empty() {
            return Ok(0);
        }
        self.audit_batch(AuditAction::Create, batch);
        if !self.dry_run() {
            T::insert(&mut *self.store, batch)?;
        }
        Ok(batch.len())
    }

    /// Write the compared fields of `batch` over the matching rows.
    pub fn update<T: Persist>(&mut self, batch: &[T]) -> Result<usize, SyncError> {
        if batch.is_empty() {
            return Ok(0);
        }
        self.audit_batch(AuditAction::Update, batch);
        if !self.dry_run() {
            let fields = self.fields;
            T::update(&mut *self.store, batch, fields)?;
        }
        Ok(batch.len())
    }

    /// Delete `batch` according to the tier's [`DeleteMode`].
    pub fn delete<T: Persist>(&mut self, batch: &[T]) -> Result<usize, SyncError> {
        if batch.is_empty() {
            return Ok(0);
        }
        self.audit_batch(AuditAction::Delete, batch);
        if !self.dry_run() {
            let mode = self.delete_mode(T::TIER);
            T::remove(&mut *self.store, batch, mode)?;
        }
        Ok(batch.len())
    }

    /// Audit only.
    pub fn equal<T: Persist>(&mut self, batch: &[T]) -> Result<usize, SyncError> {
        if !batch.is_empty() {
            self.audit_batch(AuditAction::Equal, batch);
        }
        Ok(batch.len())
    }

    /// Apply every bucket of `diff`: delete, update, create, then equal.
    ///
    /// Deletes run first so a row that moved position cannot collide with its
    /// own replacement.
    pub fn apply<T: Persist>(&mut self, diff: &DiffContainer<T>) -> Result<TierCounts, SyncError> {
        let deleted = self.delete(&diff.delete)?;
        let updated = self.update(&diff.update)?;
        let created = self.create(&diff.create)?;
        let unchanged = self.equal(&diff.equal)?;
        Ok(TierCounts {
            created,
            updated,
            deleted,
            unchanged,
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
