//! Partition, idempotence and emptiness properties of the diff engine, plus
//! the per-tier classification scenarios.

mod common;

use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;

use lexisync_core::{LevelId, WordEntity, WordId};
use lexisync_sync::{CourseSelector, LevelSelector, Selector, WordSelector};

use common::{course, level, word};

fn words(map: &BTreeMap<u64, u8>) -> Vec<WordEntity> {
    map.iter()
        .map(|(id, label)| word(*id, 1, "a", &format!("b{label}")))
        .collect()
}

fn ids(words: &[WordEntity]) -> Vec<WordId> {
    words.iter().map(|w| w.id).collect()
}

fn id_map() -> impl Strategy<Value = BTreeMap<u64, u8>> {
    prop::collection::btree_map(0u64..30, 0u8..3, 0..15)
}

proptest! {
    #[test]
    fn fresh_and_actual_are_partitioned(fresh in id_map(), actual in id_map()) {
        let fresh = words(&fresh);
        let actual = words(&actual);
        let diff = WordSelector::default().select(&fresh, &actual).unwrap();

        prop_assert_eq!(diff.create.len() + diff.update.len() + diff.equal.len(), fresh.len());
        prop_assert_eq!(diff.update.len() + diff.equal.len() + diff.delete.len(), actual.len());

        let fresh_ids: HashSet<WordId> = ids(&fresh).into_iter().collect();
        let actual_ids: HashSet<WordId> = ids(&actual).into_iter().collect();
        for id in ids(&diff.create) {
            prop_assert!(!actual_ids.contains(&id));
        }
        for id in ids(&diff.update).into_iter().chain(ids(&diff.equal)) {
            prop_assert!(actual_ids.contains(&id));
        }
        let expected_delete: Vec<WordId> = ids(&actual)
            .into_iter()
            .filter(|id| !fresh_ids.contains(id))
            .collect();
        prop_assert_eq!(ids(&diff.delete), expected_delete);
    }

    #[test]
    fn persisting_fresh_makes_the_next_diff_all_equal(fresh in id_map(), actual in id_map()) {
        let fresh = words(&fresh);
        let actual = words(&actual);
        let selector = WordSelector::default();
        selector.select(&fresh, &actual).unwrap();

        let persisted = fresh.clone();
        let second = selector.select(&fresh, &persisted).unwrap();
        prop_assert!(second.is_unchanged());
        prop_assert_eq!(second.equal, fresh);
    }

    #[test]
    fn empty_sides_are_symmetric(entities in id_map()) {
        let entities = words(&entities);
        let selector = WordSelector::default();

        let all_deleted = selector.select(&[], &entities).unwrap();
        prop_assert_eq!(&all_deleted.delete, &entities);
        prop_assert!(all_deleted.create.is_empty() && all_deleted.update.is_empty() && all_deleted.equal.is_empty());

        let all_created = selector.select(&entities, &[]).unwrap();
        prop_assert_eq!(&all_created.create, &entities);
        prop_assert!(all_created.update.is_empty() && all_created.equal.is_empty() && all_created.delete.is_empty());
    }
}

#[test]
fn course_scenario_create_update_delete() {
    let fresh = vec![course(1987730, "Spanish 1"), course(1234, "German")];
    let actual = vec![course(1987730, "Spanish (old name)"), course(99, "Latin")];

    let diff = CourseSelector.select(&fresh, &actual).unwrap();
    let id_of = |c: &lexisync_core::CourseEntity| c.id.0;
    assert_eq!(diff.create.iter().map(id_of).collect::<Vec<_>>(), vec![1234]);
    assert_eq!(diff.update.iter().map(id_of).collect::<Vec<_>>(), vec![1987730]);
    assert_eq!(diff.delete.iter().map(id_of).collect::<Vec<_>>(), vec![99]);
    assert!(diff.equal.is_empty());
}

#[test]
fn level_without_id_matches_by_position() {
    let fresh = vec![level(5, 1, None, "Y")];
    let actual = vec![level(5, 1, Some(42), "X")];

    let diff = LevelSelector::default().select(&fresh, &actual).unwrap();
    assert_eq!(diff.update.len(), 1);
    assert!(diff.create.is_empty());
    assert!(diff.delete.is_empty());
}

#[test]
fn word_translation_change_is_update() {
    let selector = WordSelector::default();
    let fresh = vec![word(7, 42, "cat", "кот")];

    let changed = selector
        .select(&fresh, &[word(7, 42, "cat", "кошка")])
        .unwrap();
    assert_eq!(changed.update, fresh);

    let same = selector.select(&fresh, &[word(7, 42, "cat", "кот")]).unwrap();
    assert_eq!(same.equal, fresh);
}

#[test]
fn word_moved_to_another_level_is_update() {
    let diff = WordSelector::default()
        .select(&[word(7, 43, "cat", "кот")], &[word(7, 42, "cat", "кот")])
        .unwrap();
    assert_eq!(diff.update[0].level_id, LevelId(43));
}
