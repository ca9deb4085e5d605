use std::time::Duration;

use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::entities::*;

/// Classification of failed API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ValidationError,
    RateLimited,
    ServerError,
    NetworkError,
    Timeout,
}

impl ErrorCode {
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            422 => Self::ValidationError,
            429 => Self::RateLimited,
            500.. => Self::ServerError,
            _ => Self::NetworkError,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Request failed: {0}")]
    Fetch(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("The API responded with status {status}: {message}")]
    Api {
        status: u16,
        message: String,
        /// Time to wait before the next attempt as requested by the server
        retry_after: Option<Duration>,
    },
    #[error("Unexpected response: {0}")]
    Response(String),
}

impl Error {
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Fetch(_) => ErrorCode::NetworkError,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Api { status, .. } => ErrorCode::from_status(*status),
            Self::Response(_) => ErrorCode::ServerError,
        }
    }

    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// HTTP API of the Nostalgia backend.
pub trait PinsApi {
    fn fetch_pins(&self, bounds: &RoundedBounds, limit: usize) -> Result<Vec<Pin>>;
    fn fetch_location_detail(&self, id: PinId) -> Result<LocationDetail>;
    fn submit_memory(&self, submission: &MemorySubmission) -> Result<Receipt>;
}
