//! The update manager: load, reconcile courses, then levels and words per
//! course.
//!
//! ## Run phases
//!
//! 1. **Load** the fresh tree once through the [`DashboardLoader`].
//! 2. **Courses**: diff fresh against persisted courses and apply. Any error
//!    here ends the run.
//! 3. **Levels**, one enabled course at a time: diff and apply the course's
//!    levels, diff every level's words against the persisted level they
//!    belong to, and apply the word deletes.
//! 4. **Words**: apply the remaining word buckets of every course that got
//!    through phase 3. Running all deletes first lets a word move between
//!    levels or courses in one run.
//!
//! A recoverable error in phase 3 or 4 is recorded against the course and the
//! run moves on. The cancel token is checked before every save call, so a
//! cancelled run never leaves a batch half-written.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use lexisync_core::{
    CourseEntity, CourseId, LevelEntity, Store, SyncConfig, WordEntity, WordFields,
};
use tokio_util::sync::CancellationToken;

use crate::actions::DispatchMode;
use crate::audit::AuditSink;
use crate::diff::DiffContainer;
use crate::error::SyncError;
use crate::loader::{Dashboard, DashboardLoader};
use crate::report::{SyncReport, TierCounts};
use crate::repository::{LocalRepository, Repository};
use crate::selectors::{CourseSelector, LevelKey, LevelSelector, Selector, WordSelector};

pub struct UpdateManager<S> {
    loader: DashboardLoader,
    local: LocalRepository<S>,
    courses: CourseSelector,
    levels: LevelSelector,
    words: WordSelector,
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), SyncError> {
    if cancel.is_cancelled() {
        Err(SyncError::Cancelled)
    } else {
        Ok(())
    }
}

impl<S: Store> UpdateManager<S> {
    pub fn new(remote: Arc<dyn Repository>, local: LocalRepository<S>) -> Self {
        Self {
            loader: DashboardLoader::new(remote),
            local,
            courses: CourseSelector,
            levels: LevelSelector::default(),
            words: WordSelector::default(),
        }
    }

    /// Wire a manager from configuration: selectors, delete policy and the
    /// word columns written on update.
    pub fn from_config(
        remote: Arc<dyn Repository>,
        store: S,
        audit: Arc<dyn AuditSink>,
        config: &SyncConfig,
        mode: DispatchMode,
    ) -> Self {
        let local = LocalRepository::new(store)
            .with_audit(audit)
            .with_mode(mode)
            .with_delete_policy(config.delete)
            .with_word_fields(WordFields {
                learned: config.compare_word_learned,
            })
            .with_level_keying(config.level_keying);
        Self::new(remote, local)
            .with_level_selector(LevelSelector::new(config.level_keying))
            .with_word_selector(WordSelector::new(config.compare_word_learned))
    }

    /// Also points level updates at rows matched under the same keying.
    pub fn with_level_selector(mut self, levels: LevelSelector) -> Self {
        self.local = self.local.with_level_keying(levels.keying);
        self.levels = levels;
        self
    }

    pub fn with_word_selector(mut self, words: WordSelector) -> Self {
        self.words = words;
        self
    }

    pub fn local(&self) -> &LocalRepository<S> {
        &self.local
    }

    pub fn into_local(self) -> LocalRepository<S> {
        self.local
    }

    /// The fresh snapshot of the last run, if one was loaded.
    pub fn dashboard(&self) -> Option<&Dashboard> {
        self.loader.snapshot()
    }

    /// Run one full sync.
    pub async fn update(&mut self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let dry_run = self.local.mode() == DispatchMode::DryRun;
        let mut report = SyncReport {
            dry_run,
            ..SyncReport::default()
        };

        let dashboard = self.loader.load(cancel).await?;

        // Phase 2: courses. Errors are fatal.
        let actual = self.local.courses()?;
        let mut diff = self.courses.select(dashboard.courses(), &actual)?;
        diff.delete.retain(|c| !c.is_disabled);
        checkpoint(cancel)?;
        report.courses = self.local.save_courses(&diff)?;
        tracing::info!(counts = %report.courses, "courses reconciled");

        // Phase 3: levels and word deletes of every enabled course.
        let targets: Vec<CourseEntity> = if dry_run {
            dashboard.courses().iter().map(CourseEntity::detached).collect()
        } else {
            self.local
                .courses()?
                .into_iter()
                .filter(|c| !c.is_disabled)
                .collect()
        };

        let mut pending = Vec::with_capacity(targets.len());
        for course in &targets {
            let fresh = match dashboard.levels_of(course.id) {
                Ok(levels) => levels,
                Err(reason) => {
                    report.fail(course.id, reason);
                    continue;
                }
            };
            let outcome = reconcile_levels(
                &mut self.local,
                &self.levels,
                &self.words,
                course.id,
                fresh,
                cancel,
                &mut report,
            );
            match outcome {
                Ok(words) => pending.push(words),
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(course_id = %course.id, error = %e, "course not reconciled");
                    report.fail(course.id, e);
                }
                Err(e) => return Err(e),
            }
        }

        // Phase 4: word creates and updates, after every course's deletes.
        for words in &pending {
            checkpoint(cancel)?;
            match apply_pending_words(&mut self.local, words) {
                Ok(counts) => {
                    report.words += counts;
                    tracing::debug!(
                        course_id = %words.course_id,
                        words = %counts,
                        "course reconciled"
                    );
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(
                        course_id = %words.course_id,
                        error = %e,
                        "course words not saved"
                    );
                    report.fail(words.course_id, e);
                }
                Err(e) => return Err(e),
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            courses = %report.courses,
            levels = %report.levels,
            words = %report.words,
            failed = report.failures.len(),
            dry_run,
            duration_ms = report.duration_ms,
            "sync finished"
        );
        Ok(report)
    }
}

/// Word diffs of one course whose deletes are already applied.
struct PendingWords {
    course_id: CourseId,
    diffs: Vec<DiffContainer<WordEntity>>,
}

fn reconcile_levels<S: Store>(
    local: &mut LocalRepository<S>,
    levels: &LevelSelector,
    words: &WordSelector,
    course_id: CourseId,
    fresh: &[LevelEntity],
    cancel: &CancellationToken,
    report: &mut SyncReport,
) -> Result<PendingWords, SyncError> {
    let actual = match local.levels_of(course_id) {
        Ok(levels) => levels,
        // a course that does not exist yet (dry run) has no levels
        Err(SyncError::Store(e)) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e),
    };

    let level_diff = levels.select(fresh, &actual)?;
    checkpoint(cancel)?;
    let level_counts = local.save_levels(&level_diff)?;
    report.levels += level_counts;
    tracing::debug!(%course_id, levels = %level_counts, "levels reconciled");

    let persisted = if local.mode() == DispatchMode::DryRun {
        actual
    } else {
        local.levels_of(course_id)?
    };
    let by_key: HashMap<LevelKey, &LevelEntity> =
        persisted.iter().map(|l| (levels.key(l), l)).collect();

    let mut diffs = Vec::with_capacity(fresh.len());
    for level in fresh {
        let (level_id, actual_words) = match by_key.get(&levels.key(level)) {
            Some(stored) => (stored.id.or(level.id), stored.words.as_slice()),
            None => (level.id, &[][..]),
        };
        let fresh_words: Vec<WordEntity> = level
            .words
            .iter()
            .cloned()
            .map(|mut w| {
                if let Some(id) = level_id {
                    w.level_id = id;
                }
                w
            })
            .collect();
        diffs.push(words.select(&fresh_words, actual_words)?);
    }

    checkpoint(cancel)?;
    for diff in &diffs {
        report.words.deleted += local.delete_words(&diff.delete)?;
    }
    Ok(PendingWords { course_id, diffs })
}

fn apply_pending_words<S: Store>(
    local: &mut LocalRepository<S>,
    pending: &PendingWords,
) -> Result<TierCounts, SyncError> {
    let mut counts = TierCounts::default();
    for diff in &pending.diffs {
        counts += local.save_words_keeping(diff)?;
    }
    Ok(counts)
}
