//! Per-tier identity and equality rules plugged into [`match_entities`].
//!
//! | tier   | key                                   | compared fields                        |
//! |--------|---------------------------------------|----------------------------------------|
//! | course | `id`                                  | every scalar field, `is_disabled` too  |
//! | level  | `(course_id, number)` or `id`         | `course_id`, `number`, `name`, `id` when the fresh level has one |
//! | word   | `id`                                  | `id`, `level_id`, both terms, optionally `is_learned` |

use std::fmt;
use std::hash::Hash;

use lexisync_core::{
    CourseEntity, CourseId, LevelEntity, LevelId, LevelKeying, Tier, WordEntity, WordId,
};

use crate::diff::{match_entities, DiffContainer};
use crate::error::SyncError;

/// Identity and equality rules for one tier.
pub trait Selector {
    type Entity: Clone;
    type Key: Hash + Eq + fmt::Display;
    type Projection: PartialEq;

    const TIER: Tier;

    fn key(&self, entity: &Self::Entity) -> Self::Key;

    /// The subset of fields that decides `update` versus `equal`.
    fn project(&self, entity: &Self::Entity) -> Self::Projection;

    /// Whether a matched pair needs no write.
    fn unchanged(&self, fresh: &Self::Entity, actual: &Self::Entity) -> bool {
        self.project(fresh) == self.project(actual)
    }

    fn select(
        &self,
        fresh: &[Self::Entity],
        actual: &[Self::Entity],
    ) -> Result<DiffContainer<Self::Entity>, SyncError> {
        match_entities(
            Self::TIER,
            fresh,
            actual,
            |e| self.key(e),
            |f, a| self.unchanged(f, a),
        )
    }
}

// ---------------------------------------------------------------------------
// Course
// ---------------------------------------------------------------------------

/// Courses are keyed by id; `levels` and `levels_urls` never take part in
/// equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct CourseSelector;

#[derive(Debug, PartialEq, Eq)]
pub struct CourseProjection {
    name: String,
    url: String,
    difficult: u32,
    num_words: u32,
    num_levels: u32,
    difficult_url: String,
    is_disabled: bool,
}

impl Selector for CourseSelector {
    type Entity = CourseEntity;
    type Key = CourseId;
    type Projection = CourseProjection;

    const TIER: Tier = Tier::Course;

    fn key(&self, entity: &CourseEntity) -> CourseId {
        entity.id
    }

    fn project(&self, c: &CourseEntity) -> CourseProjection {
        CourseProjection {
            name: c.name.clone(),
            url: c.url.clone(),
            difficult: c.difficult,
            num_words: c.num_words,
            num_levels: c.num_levels,
            difficult_url: c.difficult_url.clone(),
            is_disabled: c.is_disabled,
        }
    }
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Level identity under the configured keying.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LevelKey {
    Position(CourseId, u32),
    Id(LevelId),
    /// Id keying was requested but the level has no id yet. Never equal to a
    /// persisted key, so such a level always lands in `create`.
    Unassigned(CourseId, u32),
}

impl fmt::Display for LevelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelKey::Position(course, number) => write!(f, "{course}:{number}"),
            LevelKey::Id(id) => write!(f, "{id}"),
            LevelKey::Unassigned(course, number) => write!(f, "{course}:{number} (no id)"),
        }
    }
}

/// Levels are keyed by position or by id for a whole invocation. `words` never
/// take part in equality; `id` does once the source has assigned one.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelSelector {
    pub keying: LevelKeying,
}

impl LevelSelector {
    pub fn new(keying: LevelKeying) -> Self {
        Self { keying }
    }
}

impl Selector for LevelSelector {
    type Entity = LevelEntity;
    type Key = LevelKey;
    type Projection = (CourseId, u32, String);

    const TIER: Tier = Tier::Level;

    fn key(&self, level: &LevelEntity) -> LevelKey {
        match (self.keying, level.id) {
            (LevelKeying::Position, _) => LevelKey::Position(level.course_id, level.number),
            (LevelKeying::Id, Some(id)) => LevelKey::Id(id),
            (LevelKeying::Id, None) => LevelKey::Unassigned(level.course_id, level.number),
        }
    }

    fn project(&self, level: &LevelEntity) -> Self::Projection {
        (level.course_id, level.number, level.name.clone())
    }

    fn unchanged(&self, fresh: &LevelEntity, actual: &LevelEntity) -> bool {
        self.project(fresh) == self.project(actual)
            && fresh.id.map_or(true, |id| actual.id == Some(id))
    }
}

// ---------------------------------------------------------------------------
// Word
// ---------------------------------------------------------------------------

/// Words are keyed by id and compared on every field; `is_learned` counts
/// only when `compare_learned` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordSelector {
    pub compare_learned: bool,
}

impl WordSelector {
    pub fn new(compare_learned: bool) -> Self {
        Self { compare_learned }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct WordProjection {
    id: WordId,
    level_id: LevelId,
    word_a: String,
    word_b: String,
    is_learned: Option<bool>,
}

impl Selector for WordSelector {
    type Entity = WordEntity;
    type Key = WordId;
    type Projection = WordProjection;

    const TIER: Tier = Tier::Word;

    fn key(&self, word: &WordEntity) -> WordId {
        word.id
    }

    fn project(&self, w: &WordEntity) -> WordProjection {
        WordProjection {
            id: w.id,
            level_id: w.level_id,
            word_a: w.word_a.clone(),
            word_b: w.word_b.clone(),
            is_learned: self.compare_learned.then_some(w.is_learned),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
