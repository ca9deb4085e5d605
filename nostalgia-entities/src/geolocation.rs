use strum::{AsRefStr, Display, EnumString};

use crate::{geo::MapPoint, time::TimestampMs};

/// Persisted decision whether the app may access the device location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConsentState {
    Granted,
    Denied,
    #[default]
    Unset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum GeolocationState {
    #[default]
    Idle,
    Requesting,
    Granted,
    Denied,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorReason {
    Timeout,
    Denied,
    PositionUnavailable,
    InsecureOrigin,
}

/// The last location failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeolocationError {
    pub reason: ErrorReason,
    pub message: String,
}

impl GeolocationError {
    pub fn new(reason: ErrorReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// A device reported coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub pos: MapPoint,
    pub ts: TimestampMs,
    /// Accuracy radius in meters
    pub accuracy: Option<f64>,
}
