use std::{collections::HashMap, time::Duration};

use crate::entities::*;

pub const DEFAULT_MAX_ENTRIES: usize = 3;
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(1_500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSettings {
    /// Maximum number of simultaneously tracked viewport queries (at least 1)
    pub max_entries: usize,
    /// Repeated activity of a key within this period is ignored
    pub throttle: Duration,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            throttle: DEFAULT_THROTTLE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ViewportEntry {
    last_activity: TimestampMs,
    inserted: u64,
}

/// Keeps the number of cached viewport queries bounded.
///
/// Eviction is strict LRU over the tracked keys. Ties of the last
/// activity are broken by insertion order (oldest first).
///
/// The limiter takes `&mut self` for every mutation. Hosts that share it
/// between threads must wrap the whole limiter into a single mutex so that
/// checking the size, evicting and inserting happen as one unit.
#[derive(Debug, Clone)]
pub struct ViewportCacheLimiter {
    settings: LimiterSettings,
    entries: HashMap<CacheKey, ViewportEntry>,
    insertions: u64,
}

impl ViewportCacheLimiter {
    pub fn new(settings: LimiterSettings) -> Self {
        debug_assert!(settings.max_entries > 0);
        let settings = LimiterSettings {
            max_entries: settings.max_entries.max(1),
            ..settings
        };
        Self {
            settings,
            entries: HashMap::with_capacity(settings.max_entries),
            insertions: 0,
        }
    }

    /// Records activity of `key` at `now`.
    ///
    /// Returns the evicted key if tracking `key` exceeded the capacity.
    /// The caller is responsible for dropping the stored result of
    /// the evicted key from the query cache.
    #[must_use = "the evicted key must be dropped from the query cache"]
    pub fn track_activity(&mut self, key: &CacheKey, now: TimestampMs) -> Option<CacheKey> {
        if let Some(entry) = self.entries.get_mut(key) {
            if now.duration_since(entry.last_activity) >= self.settings.throttle {
                entry.last_activity = now;
            }
            return None;
        }
        let evicted = if self.entries.len() >= self.settings.max_entries {
            self.evict_least_recently_used()
        } else {
            None
        };
        let inserted = self.insertions;
        self.insertions += 1;
        self.entries.insert(
            key.clone(),
            ViewportEntry {
                last_activity: now,
                inserted,
            },
        );
        evicted
    }

    fn evict_least_recently_used(&mut self) -> Option<CacheKey> {
        let lru_key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.last_activity, entry.inserted))
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&lru_key);
        log::debug!("Evicted viewport query {lru_key}");
        Some(lru_key)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn last_activity(&self, key: &CacheKey) -> Option<TimestampMs> {
        self.entries.get(key).map(|entry| entry.last_activity)
    }

    pub const fn settings(&self) -> &LimiterSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> ViewportCacheLimiter {
        ViewportCacheLimiter::new(LimiterSettings {
            max_entries: 3,
            throttle: Duration::from_millis(1_500),
        })
    }

    fn ts(millis: i64) -> TimestampMs {
        TimestampMs::from_millis(millis)
    }

    #[test]
    fn evict_least_recently_used_key() {
        let mut limiter = limiter();
        let (a, b, c, d) = ("A".into(), "B".into(), "C".into(), "D".into());
        assert_eq!(limiter.track_activity(&a, ts(1_000)), None);
        assert_eq!(limiter.track_activity(&b, ts(2_000)), None);
        assert_eq!(limiter.track_activity(&c, ts(3_000)), None);
        assert_eq!(limiter.size(), 3);

        assert_eq!(limiter.track_activity(&d, ts(4_000)), Some(a.clone()));
        assert_eq!(limiter.size(), 3);
        assert!(!limiter.contains(&a));
        assert!(limiter.contains(&b));
        assert!(limiter.contains(&c));
        assert!(limiter.contains(&d));
    }

    #[test]
    fn evict_exactly_the_first_of_max_entries_plus_one() {
        let mut limiter = ViewportCacheLimiter::new(LimiterSettings {
            max_entries: 5,
            throttle: Duration::ZERO,
        });
        let keys: Vec<CacheKey> = (0..6).map(|i| format!("k{i}").into()).collect();
        let evicted: Vec<_> = keys
            .iter()
            .enumerate()
            .filter_map(|(i, key)| limiter.track_activity(key, ts(i as i64 * 10)))
            .collect();
        assert_eq!(evicted, vec![keys[0].clone()]);
        assert!(keys[1..].iter().all(|key| limiter.contains(key)));
    }

    #[test]
    fn recent_activity_protects_from_eviction() {
        let mut limiter = limiter();
        let (a, b, c, d) = ("A".into(), "B".into(), "C".into(), "D".into());
        let _ = limiter.track_activity(&a, ts(1_000));
        let _ = limiter.track_activity(&b, ts(2_000));
        let _ = limiter.track_activity(&c, ts(3_000));
        // A becomes the most recently used key
        assert_eq!(limiter.track_activity(&a, ts(5_000)), None);
        assert_eq!(limiter.track_activity(&d, ts(6_000)), Some(b));
        assert!(limiter.contains(&a));
    }

    #[test]
    fn ties_are_broken_by_insertion_order() {
        let mut limiter = limiter();
        let (a, b, c, d) = ("A".into(), "B".into(), "C".into(), "D".into());
        let _ = limiter.track_activity(&b, ts(1_000));
        let _ = limiter.track_activity(&a, ts(1_000));
        let _ = limiter.track_activity(&c, ts(1_000));
        assert_eq!(limiter.track_activity(&d, ts(1_000)), Some(b));
    }

    #[test]
    fn throttle_repeated_activity() {
        let mut limiter = limiter();
        let a = "A".into();
        let _ = limiter.track_activity(&a, ts(1_000));
        assert_eq!(limiter.track_activity(&a, ts(2_499)), None);
        assert_eq!(limiter.last_activity(&a), Some(ts(1_000)));
        assert_eq!(limiter.track_activity(&a, ts(2_500)), None);
        assert_eq!(limiter.last_activity(&a), Some(ts(2_500)));
    }

    #[test]
    fn repeated_access_never_evicts() {
        let mut limiter = limiter();
        let (a, b, c) = ("A".into(), "B".into(), "C".into());
        let _ = limiter.track_activity(&a, ts(0));
        let _ = limiter.track_activity(&b, ts(0));
        let _ = limiter.track_activity(&c, ts(0));
        for i in 1..20 {
            assert_eq!(limiter.track_activity(&a, ts(i * 2_000)), None);
        }
        assert_eq!(limiter.size(), 3);
    }

    #[test]
    fn capacity_of_at_least_one() {
        let mut limiter = ViewportCacheLimiter {
            settings: LimiterSettings {
                max_entries: 1,
                throttle: Duration::ZERO,
            },
            entries: HashMap::new(),
            insertions: 0,
        };
        let (a, b) = ("A".into(), "B".into());
        assert_eq!(limiter.track_activity(&a, ts(0)), None);
        assert_eq!(limiter.track_activity(&b, ts(1)), Some(a));
        assert_eq!(limiter.size(), 1);
    }
}
