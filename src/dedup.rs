//! Run-scoped duplicate tracking.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Set of composite listing keys seen during one batch run.
///
/// Clones share the same set. Check-and-insert happens under one lock so
/// two workers racing on the same listing cannot both keep it.
#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composite key: `title-url`, or the title alone when there is no url.
    pub fn key(title: &str, url: &str) -> String {
        if url.is_empty() {
            title.to_string()
        } else {
            format!("{}-{}", title, url)
        }
    }

    /// Insert `key`, returning `true` if it was not present.
    pub fn insert_if_absent(&self, key: String) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every key; called at the start of a run.
    pub fn reset(&self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shapes() {
        assert_eq!(DedupIndex::key("Engineer", "https://a.com/1"), "Engineer-https://a.com/1");
        assert_eq!(DedupIndex::key("Engineer", ""), "Engineer");
    }

    #[test]
    fn insert_is_check_and_set() {
        let index = DedupIndex::new();
        assert!(index.insert_if_absent("a".into()));
        assert!(!index.insert_if_absent("a".into()));

        let shared = index.clone();
        assert!(!shared.insert_if_absent("a".into()));
        assert_eq!(index.len(), 1);

        index.reset();
        assert!(shared.is_empty());
    }

    #[test]
    fn concurrent_inserts_keep_one_winner() {
        let index = DedupIndex::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = index.clone();
                std::thread::spawn(move || index.insert_if_absent("same".into()))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
