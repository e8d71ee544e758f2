//! The local store capability and its in-memory backend.
//!
//! Rows live in one table per tier, keyed by id, the way a relational schema
//! would hold them: levels reference courses, words reference levels, and a
//! hard delete cascades to children.
//!
//! Every mutating call validates the whole batch before touching a table, so a
//! rejected batch leaves the store exactly as it was.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::LevelKeying;
use crate::error::StoreError;
use crate::types::{CourseEntity, CourseId, LevelEntity, LevelId, Tier, WordEntity, WordId};

/// Which optional word columns an update writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordFields {
    /// Write `is_learned` as well as the text columns.
    pub learned: bool,
}

/// Persistence backend for the local side of a sync.
pub trait Store {
    /// All courses, disabled ones included, sorted by id.
    fn all_courses(&self) -> Result<Vec<CourseEntity>, StoreError>;

    /// A single course, or `NotFound`.
    fn course(&self, id: CourseId) -> Result<CourseEntity, StoreError>;

    /// Levels of a course with their words nested, sorted by id.
    ///
    /// Returns `NotFound` when the course itself is absent.
    fn levels_of(&self, course_id: CourseId) -> Result<Vec<LevelEntity>, StoreError>;

    /// Words of a level sorted by id, or `NotFound` when the level is absent.
    fn words_of(&self, level_id: LevelId) -> Result<Vec<WordEntity>, StoreError>;

    fn insert_courses(&mut self, courses: &[CourseEntity]) -> Result<(), StoreError>;
    fn update_courses(&mut self, courses: &[CourseEntity]) -> Result<(), StoreError>;
    /// Flag courses as disabled; rows and children are kept.
    fn disable_courses(&mut self, ids: &[CourseId]) -> Result<(), StoreError>;
    /// Remove courses together with their levels and words.
    fn remove_courses(&mut self, ids: &[CourseId]) -> Result<(), StoreError>;

    fn insert_levels(&mut self, levels: &[LevelEntity]) -> Result<(), StoreError>;
    /// Overwrite the rows `levels` matched under `keying`.
    ///
    /// Under position keying a level carrying a new id re-keys its row, and
    /// the row's words follow. The batch is rejected when the resulting table
    /// would hold two rows with the same id or the same `(course_id, number)`.
    fn update_levels(
        &mut self,
        levels: &[LevelEntity],
        keying: LevelKeying,
    ) -> Result<(), StoreError>;
    /// Remove levels together with their words.
    fn remove_levels(&mut self, levels: &[LevelEntity]) -> Result<(), StoreError>;

    fn insert_words(&mut self, words: &[WordEntity]) -> Result<(), StoreError>;
    fn update_words(&mut self, words: &[WordEntity], fields: WordFields)
        -> Result<(), StoreError>;
    fn remove_words(&mut self, ids: &[WordId]) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// A level row: the level without its words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRow {
    pub id: LevelId,
    pub number: u32,
    pub course_id: CourseId,
    pub name: String,
}

impl LevelRow {
    fn to_entity(&self, words: Vec<WordEntity>) -> LevelEntity {
        LevelEntity {
            id: Some(self.id),
            number: self.number,
            course_id: self.course_id,
            name: self.name.clone(),
            words,
        }
    }
}

/// Serializable snapshot of every table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub courses: BTreeMap<CourseId, CourseEntity>,
    #[serde(default)]
    pub levels: BTreeMap<LevelId, LevelRow>,
    #[serde(default)]
    pub words: BTreeMap<WordId, WordEntity>,
}

impl Tables {
    fn level_at(&self, course_id: CourseId, number: u32) -> Option<LevelId> {
        self.levels
            .values()
            .find(|row| row.course_id == course_id && row.number == number)
            .map(|row| row.id)
    }

    /// Find a level row by id, falling back to its position in the course.
    fn find_level(&self, level: &LevelEntity) -> Option<LevelId> {
        level
            .id
            .filter(|id| self.levels.contains_key(id))
            .or_else(|| self.level_at(level.course_id, level.number))
    }

    /// Find the row a level was matched against under `keying`.
    fn matched_level(&self, level: &LevelEntity, keying: LevelKeying) -> Option<LevelId> {
        match keying {
            LevelKeying::Position => self.level_at(level.course_id, level.number),
            LevelKeying::Id => level.id.filter(|id| self.levels.contains_key(id)),
        }
    }

    fn words_sorted(&self, level_id: LevelId) -> Vec<WordEntity> {
        // BTreeMap iteration is already ordered by word id.
        self.words
            .values()
            .filter(|w| w.level_id == level_id)
            .cloned()
            .collect()
    }

    fn cascade_level(&mut self, level_id: LevelId) {
        self.levels.remove(&level_id);
        self.words.retain(|_, w| w.level_id != level_id);
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory [`Store`]. Also the working copy behind the file-backed store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Tables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn into_tables(self) -> Tables {
        self.tables
    }
}

impl Store for MemoryStore {
    fn all_courses(&self) -> Result<Vec<CourseEntity>, StoreError> {
        Ok(self.tables.courses.values().cloned().collect())
    }

    fn course(&self, id: CourseId) -> Result<CourseEntity, StoreError> {
        self.tables
            .courses
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Tier::Course, id))
    }

    fn levels_of(&self, course_id: CourseId) -> Result<Vec<LevelEntity>, StoreError> {
        if !self.tables.courses.contains_key(&course_id) {
            return Err(StoreError::not_found(Tier::Course, course_id));
        }
        Ok(self
            .tables
            .levels
            .values()
            .filter(|row| row.course_id == course_id)
            .map(|row| row.to_entity(self.tables.words_sorted(row.id)))
            .collect())
    }

    fn words_of(&self, level_id: LevelId) -> Result<Vec<WordEntity>, StoreError> {
        if !self.tables.levels.contains_key(&level_id) {
            return Err(StoreError::not_found(Tier::Level, level_id));
        }
        Ok(self.tables.words_sorted(level_id))
    }

    fn insert_courses(&mut self, courses: &[CourseEntity]) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        for course in courses {
            if self.tables.courses.contains_key(&course.id) || !seen.insert(course.id) {
                return Err(StoreError::Duplicate {
                    tier: Tier::Course,
                    id: course.id.to_string(),
                });
            }
        }
        for course in courses {
            self.tables.courses.insert(course.id, course.detached());
        }
        Ok(())
    }

    fn update_courses(&mut self, courses: &[CourseEntity]) -> Result<(), StoreError> {
        for course in courses {
            if !self.tables.courses.contains_key(&course.id) {
                return Err(StoreError::not_found(Tier::Course, course.id));
            }
        }
        for course in courses {
            if let Some(row) = self.tables.courses.get_mut(&course.id) {
                row.name = course.name.clone();
                row.url = course.url.clone();
                row.difficult = course.difficult;
                row.num_words = course.num_words;
                row.num_levels = course.num_levels;
                row.difficult_url = course.difficult_url.clone();
                row.is_disabled = course.is_disabled;
            }
        }
        Ok(())
    }

    fn disable_courses(&mut self, ids: &[CourseId]) -> Result<(), StoreError> {
        for id in ids {
            if !self.tables.courses.contains_key(id) {
                return Err(StoreError::not_found(Tier::Course, id));
            }
        }
        for id in ids {
            if let Some(row) = self.tables.courses.get_mut(id) {
                row.is_disabled = true;
            }
        }
        Ok(())
    }

    fn remove_courses(&mut self, ids: &[CourseId]) -> Result<(), StoreError> {
        for id in ids {
            if !self.tables.courses.contains_key(id) {
                return Err(StoreError::not_found(Tier::Course, id));
            }
        }
        for id in ids {
            self.tables.courses.remove(id);
            let level_ids: Vec<LevelId> = self
                .tables
                .levels
                .values()
                .filter(|row| row.course_id == *id)
                .map(|row| row.id)
                .collect();
            for level_id in level_ids {
                self.tables.cascade_level(level_id);
            }
        }
        Ok(())
    }

    fn insert_levels(&mut self, levels: &[LevelEntity]) -> Result<(), StoreError> {
        let mut seen_ids = HashSet::new();
        let mut seen_positions = HashSet::new();
        let mut rows = Vec::with_capacity(levels.len());
        for level in levels {
            let Some(id) = level.id else {
                return Err(StoreError::MissingIdentity {
                    tier: Tier::Level,
                    detail: format!("level {} of course {}", level.number, level.course_id),
                });
            };
            if !self.tables.courses.contains_key(&level.course_id) {
                return Err(StoreError::MissingParent {
                    tier: Tier::Level,
                    id: id.to_string(),
                    parent: format!("course {}", level.course_id),
                });
            }
            let position_taken = self
                .tables
                .levels
                .values()
                .any(|row| row.course_id == level.course_id && row.number == level.number);
            if self.tables.levels.contains_key(&id)
                || position_taken
                || !seen_ids.insert(id)
                || !seen_positions.insert((level.course_id, level.number))
            {
                return Err(StoreError::Duplicate {
                    tier: Tier::Level,
                    id: level.label(),
                });
            }
            rows.push(LevelRow {
                id,
                number: level.number,
                course_id: level.course_id,
                name: level.name.clone(),
            });
        }
        for row in rows {
            self.tables.levels.insert(row.id, row);
        }
        Ok(())
    }

    fn update_levels(
        &mut self,
        levels: &[LevelEntity],
        keying: LevelKeying,
    ) -> Result<(), StoreError> {
        let mut rekeyed: HashMap<LevelId, LevelId> = HashMap::with_capacity(levels.len());
        let mut rows = Vec::with_capacity(levels.len());
        for level in levels {
            let old = self
                .tables
                .matched_level(level, keying)
                .ok_or_else(|| StoreError::not_found(Tier::Level, level.label()))?;
            if !self.tables.courses.contains_key(&level.course_id) {
                return Err(StoreError::MissingParent {
                    tier: Tier::Level,
                    id: old.to_string(),
                    parent: format!("course {}", level.course_id),
                });
            }
            let id = level.id.unwrap_or(old);
            if rekeyed.insert(old, id).is_some() {
                return Err(StoreError::Duplicate {
                    tier: Tier::Level,
                    id: old.to_string(),
                });
            }
            rows.push(LevelRow {
                id,
                number: level.number,
                course_id: level.course_id,
                name: level.name.clone(),
            });
        }

        let mut next = self.tables.levels.clone();
        for old in rekeyed.keys() {
            next.remove(old);
        }
        for row in rows {
            let id = row.id;
            if next.insert(id, row).is_some() {
                return Err(StoreError::Duplicate {
                    tier: Tier::Level,
                    id: id.to_string(),
                });
            }
        }
        let mut positions = HashSet::with_capacity(next.len());
        for row in next.values() {
            if !positions.insert((row.course_id, row.number)) {
                return Err(StoreError::Duplicate {
                    tier: Tier::Level,
                    id: format!("{}:{}", row.course_id, row.number),
                });
            }
        }

        self.tables.levels = next;
        for word in self.tables.words.values_mut() {
            if let Some(&id) = rekeyed.get(&word.level_id) {
                word.level_id = id;
            }
        }
        Ok(())
    }

    fn remove_levels(&mut self, levels: &[LevelEntity]) -> Result<(), StoreError> {
        let mut ids = Vec::with_capacity(levels.len());
        for level in levels {
            let id = self
                .tables
                .find_level(level)
                .ok_or_else(|| StoreError::not_found(Tier::Level, level.label()))?;
            ids.push(id);
        }
        for id in ids {
            self.tables.cascade_level(id);
        }
        Ok(())
    }

    fn insert_words(&mut self, words: &[WordEntity]) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        for word in words {
            if self.tables.words.contains_key(&word.id) || !seen.insert(word.id) {
                return Err(StoreError::Duplicate {
                    tier: Tier::Word,
                    id: word.id.to_string(),
                });
            }
            if !self.tables.levels.contains_key(&word.level_id) {
                return Err(StoreError::MissingParent {
                    tier: Tier::Word,
                    id: word.id.to_string(),
                    parent: format!("level {}", word.level_id),
                });
            }
        }
        for word in words {
            self.tables.words.insert(word.id, word.clone());
        }
        Ok(())
    }

    fn update_words(
        &mut self,
        words: &[WordEntity],
        fields: WordFields,
    ) -> Result<(), StoreError> {
        for word in words {
            if !self.tables.words.contains_key(&word.id) {
                return Err(StoreError::not_found(Tier::Word, word.id));
            }
            if !self.tables.levels.contains_key(&word.level_id) {
                return Err(StoreError::MissingParent {
                    tier: Tier::Word,
                    id: word.id.to_string(),
                    parent: format!("level {}", word.level_id),
                });
            }
        }
        for word in words {
            if let Some(row) = self.tables.words.get_mut(&word.id) {
                row.level_id = word.level_id;
                row.word_a = word.word_a.clone();
                row.word_b = word.word_b.clone();
                if fields.learned {
                    row.is_learned = word.is_learned;
                }
            }
        }
        Ok(())
    }

    fn remove_words(&mut self, ids: &[WordId]) -> Result<(), StoreError> {
        for id in ids {
            if !self.tables.words.contains_key(id) {
                return Err(StoreError::not_found(Tier::Word, id));
            }
        }
        for id in ids {
            self.tables.words.remove(id);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: u64) -> CourseEntity {
        CourseEntity {
            id: CourseId(id),
            name: format!("course {id}"),
            url: format!("/course/{id}/c/"),
            difficult: 0,
            num_words: 2,
            num_levels: 1,
            difficult_url: format!("/course/{id}/c/difficult-items/"),
            levels_urls: vec![],
            levels: vec![],
            is_disabled: false,
        }
    }

    fn level(course_id: u64, number: u32, id: u64) -> LevelEntity {
        LevelEntity::new(CourseId(course_id), number, format!("level {number}"))
            .with_id(LevelId(id))
    }

    fn word(id: u64, level_id: u64, a: &str, b: &str) -> WordEntity {
        WordEntity {
            id: WordId(id),
            level_id: LevelId(level_id),
            word_a: a.into(),
            word_b: b.into(),
            is_learned: false,
        }
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_courses(&[course(1), course(2)]).unwrap();
        store
            .insert_levels(&[level(1, 1, 10), level(1, 2, 11), level(2, 1, 20)])
            .unwrap();
        store
            .insert_words(&[word(100, 10, "cat", "кот"), word(101, 11, "dog", "пёс")])
            .unwrap();
        store
    }

    #[test]
    fn levels_of_missing_course_is_not_found() {
        let store = MemoryStore::new();
        let err = store.levels_of(CourseId(9)).unwrap_err();
        assert!(err.is_not_found(), "got: {err}");
    }

    #[test]
    fn levels_of_nests_words() {
        let store = seeded();
        let levels = store.levels_of(CourseId(1)).unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].id, Some(LevelId(10)));
        assert_eq!(levels[0].words.len(), 1);
        assert_eq!(levels[0].words[0].word_a, "cat");
    }

    #[test]
    fn rejected_batch_leaves_store_untouched() {
        let mut store = seeded();
        let before = store.tables().clone();
        // second course is a duplicate, so the first must not be inserted either
        let err = store.insert_courses(&[course(3), course(1)]).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(store.tables(), &before);
    }

    #[test]
    fn disable_keeps_row_count() {
        let mut store = seeded();
        store.disable_courses(&[CourseId(2)]).unwrap();
        let courses = store.all_courses().unwrap();
        assert_eq!(courses.len(), 2);
        assert!(courses[1].is_disabled);
        assert_eq!(store.levels_of(CourseId(2)).unwrap().len(), 1);
    }

    #[test]
    fn remove_course_cascades() {
        let mut store = seeded();
        store.remove_courses(&[CourseId(1)]).unwrap();
        assert!(store.tables().levels.values().all(|l| l.course_id == CourseId(2)));
        assert!(store.tables().words.is_empty());
    }

    #[test]
    fn level_without_id_is_rejected() {
        let mut store = seeded();
        let err = store
            .insert_levels(&[LevelEntity::new(CourseId(2), 2, "new")])
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingIdentity { .. }));
    }

    #[test]
    fn level_insert_requires_course() {
        let mut store = seeded();
        let err = store.insert_levels(&[level(9, 1, 90)]).unwrap_err();
        assert!(matches!(err, StoreError::MissingParent { .. }));
    }

    #[test]
    fn level_update_by_position_keeps_id_when_none_given() {
        let mut store = seeded();
        let renamed = LevelEntity::new(CourseId(1), 2, "renamed");
        store.update_levels(&[renamed], LevelKeying::Position).unwrap();
        let levels = store.levels_of(CourseId(1)).unwrap();
        assert_eq!(levels[1].id, Some(LevelId(11)));
        assert_eq!(levels[1].name, "renamed");
    }

    #[test]
    fn level_update_by_position_writes_the_matched_row() {
        let mut store = seeded();
        // ids shift down one position: 11 now sits at 1, 12 is new at 2
        let batch = [level(1, 1, 11), level(1, 2, 12)];
        store.update_levels(&batch, LevelKeying::Position).unwrap();

        let levels = store.levels_of(CourseId(1)).unwrap();
        let rows: Vec<_> = levels.iter().map(|l| (l.id, l.number)).collect();
        assert_eq!(rows, vec![(Some(LevelId(11)), 1), (Some(LevelId(12)), 2)]);
        // words follow their row, not the old id
        assert_eq!(levels[0].words[0].id, WordId(100));
        assert_eq!(levels[1].words[0].id, WordId(101));
    }

    #[test]
    fn level_update_by_id_renumbers_without_touching_other_rows() {
        let mut store = seeded();
        let swapped = [level(1, 2, 10), level(1, 1, 11)];
        store.update_levels(&swapped, LevelKeying::Id).unwrap();
        let levels = store.levels_of(CourseId(1)).unwrap();
        assert_eq!(levels[0].number, 2);
        assert_eq!(levels[1].number, 1);
    }

    #[test]
    fn level_update_rejects_colliding_positions() {
        let mut store = seeded();
        let before = store.tables().clone();
        let err = store
            .update_levels(&[level(1, 2, 10)], LevelKeying::Id)
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { tier: Tier::Level, .. }), "got: {err}");
        assert_eq!(store.tables(), &before);
    }

    #[test]
    fn level_update_rejects_id_taken_by_another_row() {
        let mut store = seeded();
        let err = store
            .update_levels(&[level(1, 1, 11)], LevelKeying::Position)
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }), "got: {err}");
    }

    #[test]
    fn update_words_respects_learned_field() {
        let mut store = seeded();
        let mut w = word(100, 10, "cat", "кошка");
        w.is_learned = true;

        store.update_words(&[w.clone()], WordFields::default()).unwrap();
        let stored = &store.words_of(LevelId(10)).unwrap()[0];
        assert_eq!(stored.word_b, "кошка");
        assert!(!stored.is_learned);

        store.update_words(&[w], WordFields { learned: true }).unwrap();
        assert!(store.words_of(LevelId(10)).unwrap()[0].is_learned);
    }

    #[test]
    fn remove_missing_word_is_not_found() {
        let mut store = seeded();
        let err = store.remove_words(&[WordId(999)]).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.tables().words.len(), 2);
    }
}
