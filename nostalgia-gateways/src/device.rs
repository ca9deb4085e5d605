use nostalgia_core::gateways::device::{DeviceError, LocationDevice, PositionOptions, RawPosition};

/// A device that always answers with the same outcome.
///
/// Without an outcome the device has no location capability at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocationDevice {
    outcome: Option<Result<RawPosition, DeviceError>>,
}

impl FixedLocationDevice {
    pub const fn without_capability() -> Self {
        Self { outcome: None }
    }

    pub const fn with_fix(position: RawPosition) -> Self {
        Self {
            outcome: Some(Ok(position)),
        }
    }

    pub const fn failing(err: DeviceError) -> Self {
        Self {
            outcome: Some(Err(err)),
        }
    }
}

impl LocationDevice for FixedLocationDevice {
    fn has_location_capability(&self) -> bool {
        self.outcome.is_some()
    }

    fn current_position(&self, options: &PositionOptions) -> Result<RawPosition, DeviceError> {
        log::debug!(
            "Requesting position (timeout: {:?}, max. age: {:?}, high accuracy: {})",
            options.timeout,
            options.max_age,
            options.high_accuracy
        );
        self.outcome.unwrap_or(Err(DeviceError::PositionUnavailable))
    }
}
