use std::{fmt, time::Duration};

use crate::entities::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Pins,
    LocationDetail,
}

/// Identity of a cached query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Pins(CacheKey),
    LocationDetail(PinId),
}

impl QueryKey {
    pub const fn kind(&self) -> QueryKind {
        match self {
            Self::Pins(_) => QueryKind::Pins,
            Self::LocationDetail(_) => QueryKind::LocationDetail,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Pins(key) => key.fmt(f),
            Self::LocationDetail(id) => write!(f, "loc:{id}"),
        }
    }
}

/// Selects the entries affected by an invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFilter {
    Exact(QueryKey),
    Kind(QueryKind),
    All,
}

impl QueryFilter {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Self::Exact(exact) => exact == key,
            Self::Kind(kind) => *kind == key.kind(),
            Self::All => true,
        }
    }
}

/// How long results of each kind of query are considered fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub pins: Duration,
    pub location_detail: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            pins: Duration::from_secs(60),
            location_detail: Duration::from_secs(15 * 60),
        }
    }
}

/// A cached query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub fetched_at: TimestampMs,
    pub invalidated: bool,
}

impl<T> Cached<T> {
    pub fn is_fresh(&self, now: TimestampMs, stale_time: Duration) -> bool {
        !self.invalidated && now.duration_since(self.fetched_at) < stale_time
    }
}

/// The asynchronous request cache that stores query results.
///
/// Implementations use interior mutability, all methods take `&self`.
pub trait QueryCache {
    fn pins(&self, key: &CacheKey) -> Option<Cached<Vec<Pin>>>;
    fn store_pins(&self, key: &CacheKey, pins: Vec<Pin>, fetched_at: TimestampMs);

    fn location_detail(&self, id: PinId) -> Option<Cached<LocationDetail>>;
    fn store_location_detail(&self, detail: LocationDetail, fetched_at: TimestampMs);

    /// Marks the matching entries as stale, returns how many were affected.
    fn invalidate(&self, filter: &QueryFilter) -> usize;

    /// Drops the stored result of `key`.
    fn remove(&self, key: &QueryKey);
}
