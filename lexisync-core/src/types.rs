//! Entity model for the course → level → word tree.
//!
//! Entities are plain values rebuilt on every fetch or store read; nothing
//! here talks to a backend. Identity is remote-assigned (`CourseId`,
//! `LevelId`, `WordId`); a freshly parsed level may not know its id yet and is
//! then identified by `(course_id, number)`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Relative endpoint of a course's difficult-words page.
pub const DIFFICULT_ITEMS_PATH: &str = "difficult-items/";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Remote-assigned course identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CourseId(pub u64);

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for CourseId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Remote-assigned level identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LevelId(pub u64);

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for LevelId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Remote-assigned word identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WordId(pub u64);

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for WordId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// One level of the entity hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Course,
    Level,
    Word,
}

impl Tier {
    pub fn plural(self) -> &'static str {
        match self {
            Tier::Course => "courses",
            Tier::Level => "levels",
            Tier::Word => "words",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Course => write!(f, "course"),
            Tier::Level => write!(f, "level"),
            Tier::Word => write!(f, "word"),
        }
    }
}

/// How a tier's `delete` bucket is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Keep the row. Courses get `is_disabled = true`; levels and words carry
    /// no flag and are left untouched.
    Soft,
    /// Physically remove the row and its children.
    Hard,
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A single vocabulary item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntity {
    pub id: WordId,
    pub level_id: LevelId,
    /// Term in the source language.
    pub word_a: String,
    /// Translation.
    pub word_b: String,
    #[serde(default)]
    pub is_learned: bool,
}

/// A numbered level inside a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelEntity {
    /// `None` until the source has assigned one.
    #[serde(default)]
    pub id: Option<LevelId>,
    /// 1-based position within the course.
    pub number: u32,
    pub course_id: CourseId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub words: Vec<WordEntity>,
}

impl LevelEntity {
    pub fn new(course_id: CourseId, number: u32, name: impl Into<String>) -> Self {
        Self {
            id: None,
            number,
            course_id,
            name: name.into(),
            words: vec![],
        }
    }

    pub fn with_id(mut self, id: LevelId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn add_word(&mut self, word: WordEntity) {
        self.words.push(word);
    }

    /// Copy of the level without its words.
    pub fn detached(&self) -> Self {
        Self {
            words: vec![],
            ..self.clone()
        }
    }

    /// Human-readable identity: the id when known, else `course:number`.
    pub fn label(&self) -> String {
        match self.id {
            Some(id) => id.to_string(),
            None => format!("{}:{}", self.course_id, self.number),
        }
    }
}

/// A course from the learner's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEntity {
    pub id: CourseId,
    pub name: String,
    pub url: String,
    /// Number of words marked difficult.
    pub difficult: u32,
    pub num_words: u32,
    pub num_levels: u32,
    pub difficult_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<LevelEntity>,
    #[serde(default)]
    pub is_disabled: bool,
}

impl CourseEntity {
    /// Rebuild `levels_urls` from `url` and `num_levels`.
    ///
    /// The list is replaced, never appended to, so calling this twice leaves
    /// exactly `num_levels` entries.
    pub fn make_level_urls(&mut self) {
        self.levels_urls = (1..=self.num_levels)
            .map(|n| join_url(&self.url, &n.to_string()))
            .collect();
    }

    pub fn add_level(&mut self, level: LevelEntity) {
        self.levels.push(level);
    }

    /// Copy of the course without derived and child fields.
    pub fn detached(&self) -> Self {
        Self {
            levels_urls: vec![],
            levels: vec![],
            ..self.clone()
        }
    }
}

/// Resolve `segment` against `base` the way a browser resolves a relative
/// link: a base ending in `/` is a directory, otherwise its last segment is
/// replaced.
pub fn join_url(base: &str, segment: &str) -> String {
    if base.ends_with('/') || base.is_empty() {
        return format!("{base}{segment}");
    }
    match base.rfind('/') {
        Some(idx) => format!("{}{segment}", &base[..=idx]),
        None => segment.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
