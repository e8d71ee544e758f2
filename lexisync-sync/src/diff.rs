//! The diff engine: one matching pass between fresh and persisted entities.
//!
//! [`match_entities`] is generic over the entity type. Each tier supplies a key
//! extractor and an equality test on matched pairs (see [`crate::selectors`]),
//! so the matching algorithm exists exactly once.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use lexisync_core::Tier;

use crate::error::SyncError;

/// Outcome of a fresh-vs-actual comparison.
///
/// `create`, `update` and `equal` hold fresh entities; `delete` holds persisted
/// ones. Every bucket keeps the relative order of its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffContainer<T> {
    pub create: Vec<T>,
    pub update: Vec<T>,
    pub equal: Vec<T>,
    pub delete: Vec<T>,
}

impl<T> Default for DiffContainer<T> {
    fn default() -> Self {
        Self {
            create: Vec::new(),
            update: Vec::new(),
            equal: Vec::new(),
            delete: Vec::new(),
        }
    }
}

impl<T> DiffContainer<T> {
    /// True when nothing needs to be written.
    pub fn is_unchanged(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    /// Number of entities across all four buckets.
    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.equal.len() + self.delete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classify `fresh` against `actual`.
///
/// A fresh entity whose key is unknown goes to `create`; a matched pair goes to
/// `equal` when `unchanged(fresh, actual)` holds and to `update` otherwise. Persisted
/// entities left unmatched go to `delete` in the order they were stored.
///
/// Keys must be unique within `actual`; a repeated key is reported as
/// [`SyncError::AmbiguousMatch`]. A fresh key seen twice matches only once,
/// the second occurrence lands in `create`.
pub fn match_entities<T, K>(
    tier: Tier,
    fresh: &[T],
    actual: &[T],
    key_of: impl Fn(&T) -> K,
    unchanged: impl Fn(&T, &T) -> bool,
) -> Result<DiffContainer<T>, SyncError>
where
    T: Clone,
    K: Hash + Eq + Display,
{
    let mut by_key: HashMap<K, usize> = HashMap::with_capacity(actual.len());
    for (idx, entity) in actual.iter().enumerate() {
        let key = key_of(entity);
        if by_key.contains_key(&key) {
            return Err(SyncError::AmbiguousMatch {
                tier,
                key: key.to_string(),
            });
        }
        by_key.insert(key, idx);
    }

    let mut matched = vec![false; actual.len()];
    let mut diff = DiffContainer::default();

    for entity in fresh {
        match by_key.remove(&key_of(entity)) {
            None => diff.create.push(entity.clone()),
            Some(idx) => {
                matched[idx] = true;
                if unchanged(entity, &actual[idx]) {
                    diff.equal.push(entity.clone());
                } else {
                    diff.update.push(entity.clone());
                }
            }
        }
    }

    diff.delete = actual
        .iter()
        .zip(&matched)
        .filter(|(_, hit)| !**hit)
        .map(|(entity, _)| entity.clone())
        .collect();

    tracing::debug!(
        %tier,
        create = diff.create.len(),
        update = diff.update.len(),
        equal = diff.equal.len(),
        delete = diff.delete.len(),
        "diff computed"
    );
    Ok(diff)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        label: &'static str,
    }

    fn item(id: u32, label: &'static str) -> Item {
        Item { id, label }
    }

    fn run(fresh: &[Item], actual: &[Item]) -> DiffContainer<Item> {
        match_entities(Tier::Word, fresh, actual, |i| i.id, |f, a| f.label == a.label)
            .expect("diff")
    }

    #[test]
    fn buckets_preserve_input_order() {
        let fresh = [item(3, "c"), item(1, "a2"), item(5, "e"), item(2, "b")];
        let actual = [item(9, "z"), item(1, "a"), item(2, "b"), item(8, "y")];
        let diff = run(&fresh, &actual);

        assert_eq!(diff.create, vec![item(3, "c"), item(5, "e")]);
        assert_eq!(diff.update, vec![item(1, "a2")]);
        assert_eq!(diff.equal, vec![item(2, "b")]);
        assert_eq!(diff.delete, vec![item(9, "z"), item(8, "y")]);
        assert!(!diff.is_unchanged());
        assert_eq!(diff.len(), 6);
    }

    #[test]
    fn update_carries_the_fresh_value() {
        let diff = run(&[item(1, "new")], &[item(1, "old")]);
        assert_eq!(diff.update[0].label, "new");
    }

    #[test]
    fn duplicate_actual_key_is_ambiguous() {
        let err = match_entities(
            Tier::Level,
            &[item(1, "a")],
            &[item(1, "a"), item(1, "b")],
            |i| i.id,
            |f, a| f.label == a.label,
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::AmbiguousMatch { tier: Tier::Level, ref key } if key == "1"));
    }

    #[test]
    fn repeated_fresh_key_matches_once() {
        let diff = run(&[item(1, "a"), item(1, "a")], &[item(1, "a")]);
        assert_eq!(diff.equal.len(), 1);
        assert_eq!(diff.create.len(), 1);
        assert!(diff.delete.is_empty());
    }

    #[test]
    fn both_empty_is_empty() {
        let diff = run(&[], &[]);
        assert!(diff.is_empty());
        assert!(diff.is_unchanged());
    }
}
