//! Shared builders and fakes for the integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::io;

use async_trait::async_trait;

use lexisync_core::{
    CourseEntity, CourseId, LevelEntity, LevelId, LevelKeying, MemoryStore, Store, StoreError,
    WordEntity, WordFields, WordId,
};
use lexisync_sync::{Repository, SyncError};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn course(id: u64, name: &str) -> CourseEntity {
    let url = format!("/course/{id}/c/");
    CourseEntity {
        id: CourseId(id),
        name: name.to_string(),
        difficult_url: format!("{url}difficult-items/"),
        url,
        difficult: 0,
        num_words: 0,
        num_levels: 0,
        levels_urls: vec![],
        levels: vec![],
        is_disabled: false,
    }
}

pub fn level(course_id: u64, number: u32, id: Option<u64>, name: &str) -> LevelEntity {
    let mut level = LevelEntity::new(CourseId(course_id), number, name);
    level.id = id.map(LevelId);
    level
}

pub fn word(id: u64, level_id: u64, a: &str, b: &str) -> WordEntity {
    WordEntity {
        id: WordId(id),
        level_id: LevelId(level_id),
        word_a: a.to_string(),
        word_b: b.to_string(),
        is_learned: false,
    }
}

/// A course with its levels nested, `num_levels` kept in step.
pub fn tree(mut course: CourseEntity, levels: Vec<LevelEntity>) -> CourseEntity {
    course.num_levels = levels.len() as u32;
    course.num_words = levels.iter().map(|l| l.words.len() as u32).sum();
    course.levels = levels;
    course
}

pub fn with_words(mut level: LevelEntity, words: Vec<WordEntity>) -> LevelEntity {
    level.words = words;
    level
}

/// Persist a full tree straight into a store.
pub fn seed(store: &mut MemoryStore, courses: &[CourseEntity]) {
    store.insert_courses(courses).expect("seed courses");
    for course in courses {
        store.insert_levels(&course.levels).expect("seed levels");
        for level in &course.levels {
            store.insert_words(&level.words).expect("seed words");
        }
    }
}

// ---------------------------------------------------------------------------
// FakeRemote
// ---------------------------------------------------------------------------

/// Fresh-data repository serving a fixed tree.
#[derive(Debug, Clone, Default)]
pub struct FakeRemote {
    pub courses: Vec<CourseEntity>,
    pub failing: HashSet<CourseId>,
}

impl FakeRemote {
    pub fn new(courses: Vec<CourseEntity>) -> Self {
        Self {
            courses,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, id: u64) -> Self {
        self.failing.insert(CourseId(id));
        self
    }
}

#[async_trait]
impl Repository for FakeRemote {
    async fn get_courses(&self) -> Result<Vec<CourseEntity>, SyncError> {
        let mut courses: Vec<_> = self.courses.iter().map(CourseEntity::detached).collect();
        courses.sort_by_key(|c| c.id);
        Ok(courses)
    }

    async fn get_levels(&self, course: &CourseEntity) -> Result<Vec<LevelEntity>, SyncError> {
        if self.failing.contains(&course.id) {
            return Err(SyncError::fetch(
                format!("{}1", course.url),
                "connection reset",
            ));
        }
        self.courses
            .iter()
            .find(|c| c.id == course.id)
            .map(|c| c.levels.clone())
            .ok_or_else(|| SyncError::fetch(course.url.clone(), "404"))
    }
}

// ---------------------------------------------------------------------------
// FlakyStore
// ---------------------------------------------------------------------------

/// A [`MemoryStore`] that rejects level inserts for one course.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub reject_levels_of: Option<CourseId>,
}

impl Store for FlakyStore {
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
        self.inner.insert_courses(courses)
    }

    fn update_courses(&mut self, courses: &[CourseEntity]) -> Result<(), StoreError> {
        self.inner.update_courses(courses)
    }

    fn disable_courses(&mut self, ids: &[CourseId]) -> Result<(), StoreError> {
        self.inner.disable_courses(ids)
    }

    fn remove_courses(&mut self, ids: &[CourseId]) -> Result<(), StoreError> {
        self.inner.remove_courses(ids)
    }

    fn insert_levels(&mut self, levels: &[LevelEntity]) -> Result<(), StoreError> {
        if levels
            .iter()
            .any(|l| Some(l.course_id) == self.reject_levels_of)
        {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.insert_levels(levels)
    }

    fn update_levels(
        &mut self,
        levels: &[LevelEntity],
        keying: LevelKeying,
    ) -> Result<(), StoreError> {
        self.inner.update_levels(levels, keying)
    }

    fn remove_levels(&mut self, levels: &[LevelEntity]) -> Result<(), StoreError> {
        self.inner.remove_levels(levels)
    }

    fn insert_words(&mut self, words: &[WordEntity]) -> Result<(), StoreError> {
        self.inner.insert_words(words)
    }

    fn update_words(&mut self, words: &[WordEntity], fields: WordFields) -> Result<(), StoreError> {
        self.inner.update_words(words, fields)
    }

    fn remove_words(&mut self, ids: &[WordId]) -> Result<(), StoreError> {
        self.inner.remove_words(ids)
    }
}
