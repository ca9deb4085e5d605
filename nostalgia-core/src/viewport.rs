use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
    bbox::{self, DEFAULT_FETCH_PRECISION, DEFAULT_KEY_PRECISION},
    entities::*,
    gateways::{
        api,
        query_cache::{QueryCache, QueryKey},
    },
    limiter::{LimiterSettings, ViewportCacheLimiter},
    pins, RequestId,
};

pub const DEFAULT_MIN_ZOOM_FOR_PINS: f64 = 10.0;
pub const DEFAULT_PINS_LIMIT: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSettings {
    /// Decimal digits of the bounds sent to the API
    pub fetch_precision: u8,
    /// Decimal digits of the cache keys
    pub key_precision: u8,
    pub min_zoom_for_pins: f64,
    pub pins_limit: usize,
    pub pins_stale_time: Duration,
    pub limiter: LimiterSettings,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            fetch_precision: DEFAULT_FETCH_PRECISION,
            key_precision: DEFAULT_KEY_PRECISION,
            min_zoom_for_pins: DEFAULT_MIN_ZOOM_FOR_PINS,
            pins_limit: DEFAULT_PINS_LIMIT,
            pins_stale_time: Duration::from_secs(60),
            limiter: LimiterSettings::default(),
        }
    }
}

/// Outcome of comparing fetched pins with the current snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum PinSetUpdate {
    /// Consumers must render the new snapshot.
    Changed(Arc<PinSetSnapshot>),
    Unchanged,
}

impl PinSetUpdate {
    pub const fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }
}

/// Pins that have been accepted for the current viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPins {
    pub key: CacheKey,
    pub update: PinSetUpdate,
    /// Viewport query that had to make room
    pub evicted: Option<CacheKey>,
}

/// A fetch the host has to perform.
#[derive(Debug, Clone, PartialEq)]
pub struct PinsRequest {
    pub id: RequestId,
    pub key: CacheKey,
    pub bounds: RoundedBounds,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    /// Zoomed out too far, pins are not displayed at all.
    BelowMinZoom,
    InvalidBounds,
    /// A fresh result was found in the query cache.
    Cached(AppliedPins),
    /// A stale result is shown until the refetch completes.
    ///
    /// The request is `None` if the refetch is already in flight.
    Revalidate {
        applied: AppliedPins,
        request: Option<PinsRequest>,
    },
    /// The same query is already in flight.
    Pending(CacheKey),
    Fetch(PinsRequest),
}

#[derive(Debug)]
pub enum Completion {
    Applied(AppliedPins),
    /// Canceled or superseded by a newer viewport.
    Discarded,
    /// The previous snapshot stays authoritative.
    Failed(api::Error),
}

/// Turns settled viewports into bounded, cacheable pin queries.
#[derive(Debug)]
pub struct ViewportQueries {
    settings: ViewportSettings,
    limiter: ViewportCacheLimiter,
    current_key: Option<CacheKey>,
    snapshot: Option<Arc<PinSetSnapshot>>,
    in_flight: HashMap<RequestId, CacheKey>,
    next_request_id: RequestId,
}

impl ViewportQueries {
    pub fn new(settings: ViewportSettings) -> Self {
        Self {
            limiter: ViewportCacheLimiter::new(settings.limiter),
            settings,
            current_key: None,
            snapshot: None,
            in_flight: HashMap::new(),
            next_request_id: RequestId::first(),
        }
    }

    /// Handles a settled viewport.
    pub fn settle<C>(
        &mut self,
        cache: &C,
        bounds: &MapBounds,
        zoom: f64,
        now: TimestampMs,
    ) -> Settled
    where
        C: QueryCache + ?Sized,
    {
        if zoom.is_nan() || zoom < self.settings.min_zoom_for_pins {
            log::debug!(
                "Zoom {zoom} is below {}, not fetching pins",
                self.settings.min_zoom_for_pins
            );
            self.current_key = None;
            return Settled::BelowMinZoom;
        }
        if !bounds.is_valid() {
            log::warn!("Ignoring invalid viewport bounds {bounds}");
            return Settled::InvalidBounds;
        }
        let rounded = bbox::round_bounds(bounds, self.settings.fetch_precision);
        let key = bbox::derive_key(&rounded, self.settings.key_precision);
        self.current_key = Some(key.clone());

        let stale = match cache.pins(&key) {
            Some(cached) if cached.is_fresh(now, self.settings.pins_stale_time) => {
                log::debug!("Using cached pins of {key}");
                return Settled::Cached(self.apply(cache, key, cached.value, now));
            }
            Some(cached) => {
                log::debug!("Showing stale pins of {key} while refetching");
                Some(self.apply(cache, key.clone(), cached.value, now))
            }
            None => None,
        };
        let request = if self.in_flight.values().any(|pending| *pending == key) {
            log::debug!("Pins of {key} are already being fetched");
            None
        } else {
            let id = self.next_request_id.next();
            self.in_flight.insert(id, key.clone());
            Some(PinsRequest {
                id,
                key: key.clone(),
                bounds: rounded,
                limit: self.settings.pins_limit,
            })
        };
        match (stale, request) {
            (Some(applied), request) => Settled::Revalidate { applied, request },
            (None, Some(request)) => Settled::Fetch(request),
            (None, None) => Settled::Pending(key),
        }
    }

    /// Handles the outcome of a [`PinsRequest`].
    ///
    /// Results for anything but the current viewport are dropped
    /// without touching the cache, the limiter or the snapshot.
    pub fn complete<C>(
        &mut self,
        cache: &C,
        id: RequestId,
        result: api::Result<Vec<Pin>>,
        now: TimestampMs,
    ) -> Completion
    where
        C: QueryCache + ?Sized,
    {
        let Some(key) = self.in_flight.remove(&id) else {
            log::debug!("Discarding completion of unknown request {id}");
            return Completion::Discarded;
        };
        if self.current_key.as_ref() != Some(&key) {
            log::debug!("Discarding out-of-order completion for {key}");
            return Completion::Discarded;
        }
        match result {
            Ok(pins) => {
                cache.store_pins(&key, pins.clone(), now);
                Completion::Applied(self.apply(cache, key, pins, now))
            }
            Err(err) => {
                log::warn!("Unable to fetch pins of {key}: {err}");
                Completion::Failed(err)
            }
        }
    }

    /// Silently abandons a request.
    pub fn cancel(&mut self, id: RequestId) {
        if let Some(key) = self.in_flight.remove(&id) {
            log::debug!("Canceled fetching pins of {key}");
        }
    }

    fn apply<C>(&mut self, cache: &C, key: CacheKey, pins: Vec<Pin>, now: TimestampMs) -> AppliedPins
    where
        C: QueryCache + ?Sized,
    {
        let evicted = self.limiter.track_activity(&key, now);
        if let Some(evicted) = &evicted {
            cache.remove(&QueryKey::Pins(evicted.clone()));
        }
        let update = if pins::has_changed(self.snapshot.as_deref(), &pins) {
            log::debug!("Pins of {key} changed ({} pins)", pins.len());
            let snapshot = Arc::new(PinSetSnapshot::new(pins));
            self.snapshot = Some(Arc::clone(&snapshot));
            PinSetUpdate::Changed(snapshot)
        } else {
            log::debug!("Pins of {key} did not change");
            PinSetUpdate::Unchanged
        };
        AppliedPins {
            key,
            update,
            evicted,
        }
    }

    pub fn snapshot(&self) -> Option<&Arc<PinSetSnapshot>> {
        self.snapshot.as_ref()
    }

    pub fn current_key(&self) -> Option<&CacheKey> {
        self.current_key.as_ref()
    }

    pub const fn limiter(&self) -> &ViewportCacheLimiter {
        &self.limiter
    }

    pub const fn settings(&self) -> &ViewportSettings {
        &self.settings
    }

    pub fn pending_requests(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gateways::query_cache::QueryFilter, tests::MockQueryCache};
    use nostalgia_entities::builders::*;

    fn pin(id: u64, business: &str) -> Pin {
        Pin::build()
            .id(id)
            .pos(MapPoint::from_lat_lng_deg(47.6, -122.33))
            .address("Pike St")
            .current_business(Some(business))
            .finish()
    }

    fn ts(millis: i64) -> TimestampMs {
        TimestampMs::from_millis(millis)
    }

    fn viewport(offset: f64) -> MapBounds {
        MapBounds::new(-122.4 + offset, 47.5, -122.2 + offset, 47.7)
    }

    fn fetch(settled: Settled) -> PinsRequest {
        match settled {
            Settled::Fetch(request) => request,
            other => panic!("Expected a fetch request, got {other:?}"),
        }
    }

    fn revalidate(settled: Settled) -> (AppliedPins, Option<PinsRequest>) {
        match settled {
            Settled::Revalidate { applied, request } => (applied, request),
            other => panic!("Expected a revalidation, got {other:?}"),
        }
    }

    fn applied(completion: Completion) -> AppliedPins {
        match completion {
            Completion::Applied(applied) => applied,
            other => panic!("Expected applied pins, got {other:?}"),
        }
    }

    #[test]
    fn below_min_zoom_never_derives_a_key() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let zoom = DEFAULT_MIN_ZOOM_FOR_PINS - 1.0;
        assert_eq!(
            queries.settle(&cache, &viewport(0.0), zoom, ts(0)),
            Settled::BelowMinZoom
        );
        assert!(queries.current_key().is_none());
        assert_eq!(queries.limiter().size(), 0);
        assert_eq!(queries.pending_requests(), 0);
        assert!(cache.pins.borrow().is_empty());
    }

    #[test]
    fn invalid_bounds() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let upside_down = MapBounds::new(-122.4, 47.7, -122.2, 47.5);
        assert_eq!(
            queries.settle(&cache, &upside_down, 12.0, ts(0)),
            Settled::InvalidBounds
        );
    }

    #[test]
    fn fetch_and_apply_pins() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let request = fetch(queries.settle(&cache, &viewport(0.0), 12.0, ts(0)));
        assert_eq!(request.limit, DEFAULT_PINS_LIMIT);
        assert_eq!(request.bounds.precision(), DEFAULT_FETCH_PRECISION);
        assert_eq!(
            request.key.as_str(),
            "bbox:-122.40000:47.50000:-122.20000:47.70000"
        );

        let applied = applied(queries.complete(&cache, request.id, Ok(vec![pin(1, "Cafe")]), ts(10)));
        assert!(applied.update.is_changed());
        assert_eq!(applied.evicted, None);
        assert_eq!(queries.snapshot().unwrap().len(), 1);
        assert!(queries.limiter().contains(&request.key));
        assert!(cache.pins.borrow().contains_key(&request.key));
    }

    #[test]
    fn identical_refetch_keeps_the_snapshot() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let request = fetch(queries.settle(&cache, &viewport(0.0), 12.0, ts(0)));
        queries.complete(&cache, request.id, Ok(vec![pin(1, "A"), pin(2, "B")]), ts(0));
        let first = Arc::clone(queries.snapshot().unwrap());

        // stale after a minute
        let (stale, request) = revalidate(queries.settle(&cache, &viewport(0.0), 12.0, ts(61_000)));
        assert_eq!(stale.update, PinSetUpdate::Unchanged);
        let request = request.unwrap();
        let applied = applied(queries.complete(
            &cache,
            request.id,
            Ok(vec![pin(2, "B"), pin(1, "A")]),
            ts(61_000),
        ));
        assert_eq!(applied.update, PinSetUpdate::Unchanged);
        assert!(Arc::ptr_eq(&first, queries.snapshot().unwrap()));
    }

    #[test]
    fn fresh_cache_entries_are_used() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let request = fetch(queries.settle(&cache, &viewport(0.0), 12.0, ts(0)));
        queries.complete(&cache, request.id, Ok(vec![pin(1, "A")]), ts(0));
        let request = fetch(queries.settle(&cache, &viewport(1.0), 12.0, ts(1_000)));
        queries.complete(&cache, request.id, Ok(vec![pin(2, "B")]), ts(1_000));

        match queries.settle(&cache, &viewport(0.0), 12.0, ts(5_000)) {
            Settled::Cached(applied) => {
                assert!(applied.update.is_changed());
                assert_eq!(queries.snapshot().unwrap().pins()[0].id, 1.into());
            }
            other => panic!("Expected cached pins, got {other:?}"),
        }
        assert_eq!(queries.pending_requests(), 0);
    }

    #[test]
    fn invalidated_cache_entries_are_refetched() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let request = fetch(queries.settle(&cache, &viewport(0.0), 12.0, ts(0)));
        queries.complete(&cache, request.id, Ok(vec![]), ts(0));
        cache.invalidate(&QueryFilter::All);
        let (_, request) = revalidate(queries.settle(&cache, &viewport(0.0), 12.0, ts(1)));
        assert!(request.is_some());
    }

    #[test]
    fn stale_pins_are_shown_while_refetching() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let first = fetch(queries.settle(&cache, &viewport(0.0), 12.0, ts(0)));
        queries.complete(&cache, first.id, Ok(vec![pin(1, "A")]), ts(0));
        let second = fetch(queries.settle(&cache, &viewport(1.0), 12.0, ts(1)));
        queries.complete(&cache, second.id, Ok(vec![pin(2, "B")]), ts(1));

        // panning back after both results went stale
        let (stale, request) =
            revalidate(queries.settle(&cache, &viewport(0.0), 12.0, ts(120_000)));
        assert_eq!(stale.key, first.key);
        assert!(stale.update.is_changed());
        assert_eq!(queries.snapshot().unwrap().pins()[0].id, 1.into());
        assert_eq!(
            queries.limiter().last_activity(&first.key),
            Some(ts(120_000))
        );
        let refetch = request.unwrap();
        assert_eq!(refetch.key, first.key);

        // leaving and returning while the refetch is in flight
        fetch(queries.settle(&cache, &viewport(2.0), 12.0, ts(120_001)));
        let (stale, request) =
            revalidate(queries.settle(&cache, &viewport(0.0), 12.0, ts(120_002)));
        assert_eq!(stale.key, first.key);
        assert!(request.is_none());

        let refreshed = applied(queries.complete(
            &cache,
            refetch.id,
            Ok(vec![pin(1, "A2")]),
            ts(120_003),
        ));
        assert!(refreshed.update.is_changed());
        assert!(cache.pins(&first.key).unwrap().is_fresh(ts(120_003), Duration::from_secs(60)));
    }

    #[test]
    fn nan_zoom_never_derives_a_key() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        assert_eq!(
            queries.settle(&cache, &viewport(0.0), f64::NAN, ts(0)),
            Settled::BelowMinZoom
        );
        assert!(queries.current_key().is_none());
        assert_eq!(queries.pending_requests(), 0);
    }

    #[test]
    fn deduplicate_in_flight_queries() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let request = fetch(queries.settle(&cache, &viewport(0.0), 12.0, ts(0)));
        // nearly identical bounds yield the same key
        let nudged = MapBounds::new(-122.4001, 47.5001, -122.2001, 47.7001);
        assert_eq!(
            queries.settle(&cache, &nudged, 12.0, ts(1)),
            Settled::Pending(request.key)
        );
        assert_eq!(queries.pending_requests(), 1);
    }

    #[test]
    fn out_of_order_completions_are_discarded() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let old = fetch(queries.settle(&cache, &viewport(0.0), 12.0, ts(0)));
        let new = fetch(queries.settle(&cache, &viewport(1.0), 12.0, ts(1)));

        applied(queries.complete(&cache, new.id, Ok(vec![pin(2, "New")]), ts(2)));
        assert!(matches!(
            queries.complete(&cache, old.id, Ok(vec![pin(1, "Old")]), ts(3)),
            Completion::Discarded
        ));
        let snapshot = queries.snapshot().unwrap();
        assert_eq!(snapshot.pins()[0].id, 2.into());
        assert!(!queries.limiter().contains(&old.key));
        assert!(!cache.pins.borrow().contains_key(&old.key));
    }

    #[test]
    fn canceled_fetches_leave_no_trace() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let request = fetch(queries.settle(&cache, &viewport(0.0), 12.0, ts(0)));
        queries.cancel(request.id);
        assert!(matches!(
            queries.complete(&cache, request.id, Ok(vec![pin(1, "A")]), ts(1)),
            Completion::Discarded
        ));
        assert!(queries.snapshot().is_none());
        assert_eq!(queries.limiter().size(), 0);
    }

    #[test]
    fn failures_keep_the_previous_snapshot() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let request = fetch(queries.settle(&cache, &viewport(0.0), 12.0, ts(0)));
        queries.complete(&cache, request.id, Ok(vec![pin(1, "A")]), ts(0));

        let request = fetch(queries.settle(&cache, &viewport(1.0), 12.0, ts(1)));
        let completion = queries.complete(
            &cache,
            request.id,
            Err(api::Error::Fetch("connection refused".into())),
            ts(2),
        );
        assert!(matches!(completion, Completion::Failed(api::Error::Fetch(_))));
        assert_eq!(queries.snapshot().unwrap().pins()[0].id, 1.into());
        assert!(!queries.limiter().contains(&request.key));
    }

    #[test]
    fn evicted_queries_are_removed_from_the_cache() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let mut keys = vec![];
        for i in 0..4 {
            let now = ts(i * 10_000);
            let request = fetch(queries.settle(&cache, &viewport(i as f64), 12.0, now));
            let applied = applied(queries.complete(&cache, request.id, Ok(vec![]), now));
            keys.push(request.key);
            if i < 3 {
                assert_eq!(applied.evicted, None);
            } else {
                assert_eq!(applied.evicted.as_ref(), Some(&keys[0]));
            }
        }
        assert_eq!(queries.limiter().size(), 3);
        assert_eq!(
            *cache.removed.borrow(),
            vec![QueryKey::Pins(keys[0].clone())]
        );
        assert!(!cache.pins.borrow().contains_key(&keys[0]));
    }

    #[test]
    fn zooming_out_abandons_the_current_viewport() {
        let cache = MockQueryCache::default();
        let mut queries = ViewportQueries::new(ViewportSettings::default());
        let request = fetch(queries.settle(&cache, &viewport(0.0), 12.0, ts(0)));
        queries.settle(&cache, &viewport(0.0), 4.0, ts(1));
        assert!(matches!(
            queries.complete(&cache, request.id, Ok(vec![pin(1, "A")]), ts(2)),
            Completion::Discarded
        ));
    }
}
