use std::time::Duration;

use crate::{
    entities::*,
    gateways::{api, query_cache::QueryCache},
    RequestId,
};

pub const DEFAULT_LOCATION_DETAIL_STALE_TIME: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailRequest {
    pub id: RequestId,
    pub location_id: PinId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailOpened {
    Cached(LocationDetail),
    Pending,
    Fetch(DetailRequest),
}

#[derive(Debug)]
pub enum DetailCompletion {
    Applied(LocationDetail),
    /// The detail view was closed or switched to another location.
    Discarded,
    Failed(api::Error),
}

/// Timeline of the single location that is currently opened.
///
/// Detail queries are keyed by the location id and only expire
/// by time. At most one of them is in flight.
#[derive(Debug)]
pub struct LocationDetailQueries {
    stale_time: Duration,
    opened: Option<PinId>,
    in_flight: Option<DetailRequest>,
    next_request_id: RequestId,
}

impl Default for LocationDetailQueries {
    fn default() -> Self {
        Self::new(DEFAULT_LOCATION_DETAIL_STALE_TIME)
    }
}

impl LocationDetailQueries {
    pub const fn new(stale_time: Duration) -> Self {
        Self {
            stale_time,
            opened: None,
            in_flight: None,
            next_request_id: RequestId::first(),
        }
    }

    pub fn open<C>(&mut self, cache: &C, location_id: PinId, now: TimestampMs) -> DetailOpened
    where
        C: QueryCache + ?Sized,
    {
        self.opened = Some(location_id);
        if let Some(cached) = cache.location_detail(location_id) {
            if cached.is_fresh(now, self.stale_time) {
                return DetailOpened::Cached(cached.value);
            }
        }
        if self
            .in_flight
            .is_some_and(|request| request.location_id == location_id)
        {
            return DetailOpened::Pending;
        }
        let request = DetailRequest {
            id: self.next_request_id.next(),
            location_id,
        };
        if let Some(previous) = self.in_flight.replace(request) {
            log::debug!(
                "Abandoned timeline request {} of location {}",
                previous.id,
                previous.location_id
            );
        }
        DetailOpened::Fetch(request)
    }

    pub fn complete<C>(
        &mut self,
        cache: &C,
        id: RequestId,
        result: api::Result<LocationDetail>,
        now: TimestampMs,
    ) -> DetailCompletion
    where
        C: QueryCache + ?Sized,
    {
        let Some(request) = self.in_flight.filter(|request| request.id == id) else {
            log::debug!("Discarding timeline of abandoned request {id}");
            return DetailCompletion::Discarded;
        };
        self.in_flight = None;
        match result {
            Ok(detail) => {
                cache.store_location_detail(detail.clone(), now);
                if self.opened == Some(request.location_id) {
                    DetailCompletion::Applied(detail)
                } else {
                    DetailCompletion::Discarded
                }
            }
            Err(err) => {
                log::warn!(
                    "Unable to fetch the timeline of location {}: {err}",
                    request.location_id
                );
                DetailCompletion::Failed(err)
            }
        }
    }

    pub fn close(&mut self) {
        self.opened = None;
        self.in_flight = None;
    }

    pub const fn opened(&self) -> Option<PinId> {
        self.opened
    }
}
