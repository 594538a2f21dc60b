use super::{CompositionKey, Dataset};
use crate::errors::ComposeResult;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type Slot = Arc<OnceCell<Arc<Dataset>>>;

/// Composed datasets by key.
///
/// Each key owns a write-once slot. Concurrent callers composing the same key
/// block on that slot, so the composition runs once and every caller gets the
/// same `Arc`. A composition that fails leaves the slot empty for a retry.
/// The map lock is only held to find or create a slot, never while composing.
#[derive(Debug, Default)]
pub struct CompositionCache {
    slots: Mutex<HashMap<CompositionKey, Slot>>,
}

impl CompositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CompositionKey) -> Option<Arc<Dataset>> {
        self.slots.lock().get(key)?.get().cloned()
    }

    /// Store `dataset` unless the key already holds one; returns what the
    /// cache holds afterwards.
    pub fn put(&self, key: &CompositionKey, dataset: Arc<Dataset>) -> Arc<Dataset> {
        self.slot(key).get_or_init(|| dataset).clone()
    }

    pub fn get_or_try_insert_with<F>(&self, key: &CompositionKey, compose: F) -> ComposeResult<Arc<Dataset>>
    where
        F: FnOnce() -> ComposeResult<Dataset>,
    {
        let slot = self.slot(key);
        if let Some(dataset) = slot.get() {
            debug!(key = %key, "composition cache hit");
            return Ok(dataset.clone());
        }
        slot.get_or_try_init(|| compose().map(Arc::new)).cloned()
    }

    /// Number of keys holding a dataset.
    pub fn len(&self) -> usize {
        self.slots.lock().values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots.get_mut().clear();
    }

    fn slot(&self, key: &CompositionKey) -> Slot {
        self.slots.lock().entry(key.clone()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layer;
    use crate::tests::common::gen;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn empty_dataset(key: &CompositionKey) -> Dataset {
        Dataset::finalize(key.clone(), Layer::new("empty"))
    }

    #[test]
    fn test_get_on_empty_cache() {
        let cache = CompositionCache::new();
        assert!(cache.get(&CompositionKey::new(gen(7))).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_keeps_first_dataset() {
        let cache = CompositionCache::new();
        let key = CompositionKey::new(gen(7));
        let first = Arc::new(empty_dataset(&key));
        let stored = cache.put(&key, first.clone());
        let again = cache.put(&key, Arc::new(empty_dataset(&key)));

        assert!(Arc::ptr_eq(&stored, &first));
        assert!(Arc::ptr_eq(&again, &first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failure_leaves_slot_empty() {
        let cache = CompositionCache::new();
        let key = CompositionKey::new(gen(4));
        let result = cache.get_or_try_insert_with(&key, || {
            Err(crate::errors::ComposeError::UnknownGeneration(gen(4)))
        });
        assert!(result.is_err());
        assert!(cache.get(&key).is_none());

        let dataset = cache
            .get_or_try_insert_with(&key, || Ok(empty_dataset(&key)))
            .unwrap();
        assert!(Arc::ptr_eq(&dataset, &cache.get(&key).unwrap()));
    }

    #[test]
    fn test_concurrent_callers_share_one_composition() {
        let cache = Arc::new(CompositionCache::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let key = CompositionKey::new(gen(3));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let runs = Arc::clone(&runs);
                let key = key.clone();
                thread::spawn(move || {
                    cache
                        .get_or_try_insert_with(&key, || {
                            runs.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(20));
                            Ok(empty_dataset(&key))
                        })
                        .unwrap()
                })
            })
            .collect();

        let datasets: Vec<Arc<Dataset>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(datasets.iter().all(|d| Arc::ptr_eq(d, &datasets[0])));
    }
}
