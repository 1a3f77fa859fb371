//! Load-once cache of decoded partitions.
//!
//! Each partition code owns a slot guarded by its own mutex. The first caller
//! for a code loads while holding the slot lock, so concurrent first access
//! decodes once and nobody observes a half-built list. Other codes load in
//! parallel. Entries live as long as the cache; there is no eviction.

use crate::error::Result;
use crate::index::store::{DirectoryStore, PartitionSource};
use crate::index::types::MunicipalRecord;
use ahash::AHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared, immutable contents of one partition
pub type PartitionRecords = Arc<[MunicipalRecord]>;

type Slot = Arc<Mutex<Option<PartitionRecords>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of what the cache holds
#[derive(Debug, Clone, Default)]
pub struct CacheStatus {
    /// Loaded partitions and their record counts, sorted by code
    pub partitions: Vec<(String, usize)>,
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
}

impl CacheStatus {
    pub fn total_records(&self) -> usize {
        self.partitions.iter().map(|(_, n)| n).sum()
    }

    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }
}

/// Partition cache over a [`PartitionSource`]
pub struct PartitionCache<S = DirectoryStore> {
    source: S,
    slots: Mutex<AHashMap<String, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
}

impl<S: PartitionSource> PartitionCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            slots: Mutex::new(AHashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Records of a partition, loading it on first access.
    ///
    /// `Ok(None)` when the partition has no data; that answer is not cached,
    /// so a partition built later is picked up.
    pub fn get(&self, code: &str) -> Result<Option<PartitionRecords>> {
        let code = code.to_uppercase();

        let slot = {
            let mut slots = lock(&self.slots);
            Arc::clone(slots.entry(code.clone()).or_default())
        };

        let loaded = {
            let mut entry = lock(&slot);
            if let Some(records) = entry.as_ref() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(partition = %code, "partition cache hit");
                return Ok(Some(Arc::clone(records)));
            }

            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(partition = %code, "partition cache miss, loading");

            match self.source.load(&code) {
                Ok(Some(records)) => {
                    self.loads.fetch_add(1, Ordering::Relaxed);
                    let records: PartitionRecords = records.into();
                    *entry = Some(Arc::clone(&records));
                    return Ok(Some(records));
                }
                other => other,
            }
        };

        self.release_empty_slot(&code, slot);
        loaded.map(|_| None)
    }

    /// Forget the slot of a code that produced no data, unless another caller
    /// is still waiting on it or has filled it since.
    fn release_empty_slot(&self, code: &str, slot: Slot) {
        let mut slots = lock(&self.slots);
        // One reference in the map plus ours; clones are only taken under the map lock
        let idle = slots.get(code).is_some_and(|current| Arc::ptr_eq(current, &slot))
            && Arc::strong_count(&slot) == 2
            && lock(&slot).is_none();
        if idle {
            slots.remove(code);
        }
        // Dropped before the map lock so the next caller sees an exact count
        drop(slot);
    }

    /// Number of codes the cache is tracking, loaded or not
    pub fn tracked_partitions(&self) -> usize {
        lock(&self.slots).len()
    }

    /// Codes of every partition the source can provide
    pub fn available(&self) -> Result<Vec<String>> {
        self.source.list()
    }

    /// True if the partition is already in memory
    pub fn is_cached(&self, code: &str) -> bool {
        let slot = lock(&self.slots).get(&code.to_uppercase()).cloned();
        slot.is_some_and(|slot| lock(&slot).is_some())
    }

    pub fn status(&self) -> CacheStatus {
        let slots: Vec<(String, Slot)> = lock(&self.slots)
            .iter()
            .map(|(code, slot)| (code.clone(), Arc::clone(slot)))
            .collect();

        let mut partitions: Vec<(String, usize)> = slots
            .into_iter()
            .filter_map(|(code, slot)| {
                let len = lock(&slot).as_ref().map(|r| r.len());
                len.map(|n| (code, n))
            })
            .collect();
        partitions.sort();

        CacheStatus {
            partitions,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
        }
    }
}
