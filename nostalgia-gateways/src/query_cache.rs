use nostalgia_core::{
    entities::*,
    gateways::query_cache::{Cached, QueryCache, QueryFilter, QueryKey},
};
use parking_lot::RwLock;
use std::{collections::HashMap, time::Duration};

pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
enum CachedValue {
    Pins(Vec<Pin>),
    LocationDetail(LocationDetail),
}

#[derive(Debug, Clone)]
struct Entry {
    value: CachedValue,
    fetched_at: TimestampMs,
    invalidated: bool,
}

impl Entry {
    const fn new(value: CachedValue, fetched_at: TimestampMs) -> Self {
        Self {
            value,
            fetched_at,
            invalidated: false,
        }
    }

    fn cached<T>(&self, value: T) -> Cached<T> {
        Cached {
            value,
            fetched_at: self.fetched_at,
            invalidated: self.invalidated,
        }
    }
}

/// Process-local query cache.
///
/// Entries are dropped on eviction or by [`InMemoryQueryCache::collect_garbage`]
/// once they have been stored for longer than the configured GC time.
#[derive(Debug)]
pub struct InMemoryQueryCache {
    gc_time: Duration,
    entries: RwLock<HashMap<QueryKey, Entry>>,
}

impl Default for InMemoryQueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_GC_TIME)
    }
}

impl InMemoryQueryCache {
    pub fn new(gc_time: Duration) -> Self {
        Self {
            gc_time,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drops outdated entries and returns how many were dropped.
    pub fn collect_garbage(&self, now: TimestampMs) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.fetched_at) < self.gc_time);
        let dropped = before - entries.len();
        if dropped > 0 {
            log::debug!("Dropped {dropped} outdated queries from the cache");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.read().contains_key(key)
    }
}

impl QueryCache for InMemoryQueryCache {
    fn pins(&self, key: &CacheKey) -> Option<Cached<Vec<Pin>>> {
        let entries = self.entries.read();
        let entry = entries.get(&QueryKey::Pins(key.clone()))?;
        match &entry.value {
            CachedValue::Pins(pins) => Some(entry.cached(pins.clone())),
            CachedValue::LocationDetail(_) => None,
        }
    }

    fn store_pins(&self, key: &CacheKey, pins: Vec<Pin>, fetched_at: TimestampMs) {
        self.entries.write().insert(
            QueryKey::Pins(key.clone()),
            Entry::new(CachedValue::Pins(pins), fetched_at),
        );
    }

    fn location_detail(&self, id: PinId) -> Option<Cached<LocationDetail>> {
        let entries = self.entries.read();
        let entry = entries.get(&QueryKey::LocationDetail(id))?;
        match &entry.value {
            CachedValue::LocationDetail(detail) => Some(entry.cached(detail.clone())),
            CachedValue::Pins(_) => None,
        }
    }

    fn store_location_detail(&self, detail: LocationDetail, fetched_at: TimestampMs) {
        self.entries.write().insert(
            QueryKey::LocationDetail(detail.id),
            Entry::new(CachedValue::LocationDetail(detail), fetched_at),
        );
    }

    fn invalidate(&self, filter: &QueryFilter) -> usize {
        let mut count = 0;
        for (key, entry) in self.entries.write().iter_mut() {
            if filter.matches(key) {
                entry.invalidated = true;
                count += 1;
            }
        }
        count
    }

    fn remove(&self, key: &QueryKey) {
        if self.entries.write().remove(key).is_some() {
            log::debug!("Removed {key} from the query cache");
        }
    }
}
