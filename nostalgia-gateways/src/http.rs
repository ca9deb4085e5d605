use nostalgia_boundary as json;
use nostalgia_core::{
    entities::*,
    gateways::api::{Error, PinsApi, Result},
};
use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    header::RETRY_AFTER,
};
use serde::de::DeserializeOwned;
use std::{thread, time::Duration};
use time::{macros::format_description, OffsetDateTime, PrimitiveDateTime};
use url::Url;

/// Status codes of responses that are worth another attempt.
const RETRY_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Servers asking for a longer pause are not retried.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Pause between two attempts unless the server requests another one
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay: Duration::from_millis(300),
        }
    }
}

/// Parses the value of a `Retry-After` header.
///
/// The value is either a number of seconds or an HTTP date.
/// Dates in the past yield a zero duration.
pub fn parse_retry_after(value: &str, now: OffsetDateTime) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let http_date = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    let date = PrimitiveDateTime::parse(value, http_date).ok()?.assume_utc();
    Some(Duration::try_from(date - now).unwrap_or(Duration::ZERO))
}

/// Blocking client of the Nostalgia HTTP API.
///
/// Queries are retried according to the [`RetryPolicy`],
/// submissions are sent exactly once.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl HttpApi {
    pub fn try_new(base_url: Url, timeout: Duration, retry: RetryPolicy) -> anyhow::Result<Self> {
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid API base URL: {base_url}");
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            retry,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn pins_url(&self, bounds: &RoundedBounds, limit: usize) -> Url {
        let mut url = self.endpoint(&["locations"]);
        url.query_pairs_mut()
            .append_pair("bbox", &bounds.to_string())
            .append_pair("limit", &limit.to_string());
        url
    }

    fn query<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.execute(self.client.get(url), self.retry.max_retries)
    }

    fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, max_retries: u32) -> Result<T> {
        let mut attempt = 0;
        loop {
            let Some(request) = request.try_clone() else {
                return Err(Error::Fetch("Unable to clone the request".into()));
            };
            let err = match request.send() {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json()
                        .map_err(|err| Error::Response(err.to_string()));
                }
                Ok(response) => api_error(response),
                Err(err) if err.is_timeout() => Error::Timeout(err.to_string()),
                Err(err) => Error::Fetch(err.to_string()),
            };
            let retryable = match &err {
                Error::Api { status, .. } => RETRY_STATUS_CODES.contains(status),
                Error::Timeout(_) | Error::Fetch(_) => true,
                Error::Response(_) => false,
            };
            let delay = err.retry_after().unwrap_or(self.retry.delay);
            if attempt >= max_retries || !retryable || delay > MAX_RETRY_AFTER {
                return Err(err);
            }
            attempt += 1;
            log::debug!("Retrying request ({err}) in {delay:?}");
            thread::sleep(delay);
        }
    }
}

fn api_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_retry_after(value, OffsetDateTime::now_utc()));
    let message = match response.text() {
        Ok(text) => serde_json::from_str::<json::Error>(&text)
            .map(|err| err.error)
            .unwrap_or(text),
        Err(err) => err.to_string(),
    };
    Error::Api {
        status,
        message,
        retry_after,
    }
}

impl PinsApi for HttpApi {
    fn fetch_pins(&self, bounds: &RoundedBounds, limit: usize) -> Result<Vec<Pin>> {
        let url = self.pins_url(bounds, limit);
        log::debug!("Fetching pins: {url}");
        let response: json::PinsResponse = self.query(url)?;
        response
            .locations
            .into_iter()
            .map(|pin| Pin::try_from(pin).map_err(|err| Error::Response(err.to_string())))
            .collect()
    }

    fn fetch_location_detail(&self, id: PinId) -> Result<LocationDetail> {
        let url = self.endpoint(&["locations", &id.to_string()]);
        log::debug!("Fetching location detail: {url}");
        let detail: json::LocationDetail = self.query(url)?;
        LocationDetail::try_from(detail).map_err(|err| Error::Response(err.to_string()))
    }

    fn submit_memory(&self, submission: &MemorySubmission) -> Result<Receipt> {
        let url = self.endpoint(&["memories"]);
        let new_memory = json::NewMemory::from(submission.clone());
        // submissions are not idempotent
        let receipt: json::MemoryReceipt =
            self.execute(self.client.post(url).json(&new_memory), 0)?;
        Receipt::try_from(receipt).map_err(|err| Error::Response(err.to_string()))
    }
}
