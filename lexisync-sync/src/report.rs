//! Aggregate outcome of one sync run.

use std::fmt;
use std::ops::AddAssign;

use serde::Serialize;

use lexisync_core::{CourseId, Tier};

/// Per-tier counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl TierCounts {
    /// Whether anything was (or in a dry run, would be) written.
    pub fn has_changes(&self) -> bool {
        self.created + self.updated + self.deleted > 0
    }
}

impl AddAssign for TierCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.created += rhs.created;
        self.updated += rhs.updated;
        self.deleted += rhs.deleted;
        self.unchanged += rhs.unchanged;
    }
}

impl fmt::Display for TierCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} ~{} -{} ={}",
            self.created, self.updated, self.deleted, self.unchanged
        )
    }
}

/// A course whose levels or words could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseFailure {
    pub course_id: CourseId,
    pub reason: String,
}

/// Summary of one run: counts per tier and every per-course failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub courses: TierCounts,
    pub levels: TierCounts,
    pub words: TierCounts,
    pub failures: Vec<CourseFailure>,
    pub dry_run: bool,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn counts(&self, tier: Tier) -> &TierCounts {
        match tier {
            Tier::Course => &self.courses,
            Tier::Level => &self.levels,
            Tier::Word => &self.words,
        }
    }

    pub(crate) fn fail(&mut self, course_id: CourseId, reason: impl ToString) {
        self.failures.push(CourseFailure {
            course_id,
            reason: reason.to_string(),
        });
    }

    /// True when every course was reconciled.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether the run wrote (or would write) anything.
    pub fn has_changes(&self) -> bool {
        self.courses.has_changes() || self.levels.has_changes() || self.words.has_changes()
    }
}
