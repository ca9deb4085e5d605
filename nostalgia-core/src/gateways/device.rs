use std::time::Duration;

use thiserror::Error;

/// Parameters of a single-shot position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub timeout: Duration,
    /// Maximum age of a position the device may return from its own cache
    pub max_age: Duration,
    pub high_accuracy: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(4),
            max_age: Duration::from_secs(120),
            high_accuracy: false,
        }
    }
}

/// A fix as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPosition {
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Option<f64>,
}

/// Failure codes reported by the device.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Position unavailable")]
    PositionUnavailable,
    #[error("Timeout")]
    Timeout,
    #[error("Unknown device error (code {0})")]
    Other(u16),
}

/// Location capability of the device.
pub trait LocationDevice {
    fn has_location_capability(&self) -> bool;

    /// Performs a single-shot position request.
    fn current_position(&self, options: &PositionOptions) -> Result<RawPosition, DeviceError>;
}
