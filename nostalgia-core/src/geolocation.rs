use std::net::IpAddr;

use url::{Host, Url};

use crate::{
    entities::*,
    gateways::device::{DeviceError, LocationDevice, PositionOptions, RawPosition},
    repositories::ConsentRepo,
    RequestId,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeolocationSettings {
    pub options: PositionOptions,
    /// Request a fresh fix on initialization if consent was granted before
    pub auto_request: bool,
}

/// Where the map is centered if no better information is available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapDefaults {
    pub center: MapPoint,
    pub zoom: f64,
    /// Zoom level when centering on the user's position
    pub user_zoom: f64,
}

impl Default for MapDefaults {
    fn default() -> Self {
        Self {
            center: MapPoint::from_lat_lng_deg(47.6062, -122.3321),
            zoom: 12.0,
            user_zoom: 15.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapFocus {
    pub center: MapPoint,
    pub zoom: f64,
}

/// A pending single-shot position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub id: RequestId,
    pub options: PositionOptions,
}

/// Geolocation is only available in secure contexts:
/// HTTPS or a loopback host.
pub fn is_secure_origin(origin: &Url) -> bool {
    if origin.scheme() == "https" {
        return true;
    }
    match origin.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => IpAddr::from(ip).is_loopback(),
        Some(Host::Ipv6(ip)) => IpAddr::from(ip).is_loopback(),
        None => false,
    }
}

/// Manages the location permission lifecycle.
///
/// The in-memory [`GeolocationState`] is tracked separately from the
/// persisted [`ConsentState`] that outlives the process.
#[derive(Debug)]
pub struct GeolocationConsent<R> {
    repo: R,
    origin: Url,
    settings: GeolocationSettings,
    state: GeolocationState,
    consent: ConsentState,
    position: Option<Position>,
    error: Option<GeolocationError>,
    initialized: bool,
    in_flight: Option<RequestId>,
    next_request_id: RequestId,
}

impl<R> GeolocationConsent<R>
where
    R: ConsentRepo,
{
    pub fn new(repo: R, origin: Url, settings: GeolocationSettings) -> Self {
        Self {
            repo,
            origin,
            settings,
            state: GeolocationState::Idle,
            consent: ConsentState::Unset,
            position: None,
            error: None,
            initialized: false,
            in_flight: None,
            next_request_id: RequestId::first(),
        }
    }

    /// Restores the persisted consent.
    ///
    /// Only the first invocation has an effect. Returns a request
    /// if consent was granted before and auto requests are enabled.
    pub fn init<D>(&mut self, device: &D) -> Option<PositionRequest>
    where
        D: LocationDevice + ?Sized,
    {
        if self.initialized {
            return None;
        }
        self.initialized = true;
        self.consent = self.repo.consent().unwrap_or_else(|err| {
            log::warn!("Unable to read the stored geolocation consent: {err}");
            ConsentState::Unset
        });
        match self.consent {
            ConsentState::Granted => {
                match self.repo.last_position() {
                    Ok(Some(position)) => {
                        log::info!(
                            "Using cached position: {{lat: {:.6}, lon: {:.6}}}",
                            position.pos.lat(),
                            position.pos.lng()
                        );
                        self.position = Some(position);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        log::warn!("Unable to read the last known position: {err}");
                    }
                }
                self.state = GeolocationState::Granted;
                if self.settings.auto_request {
                    return self.request_location(device);
                }
            }
            ConsentState::Denied => {
                log::info!("Geolocation consent previously denied, skipping request");
                self.state = GeolocationState::Denied;
            }
            ConsentState::Unset => {}
        }
        None
    }

    /// Starts a position request.
    ///
    /// Returns `None` if a request is already in flight or if one of
    /// the guards failed. The host must perform the returned request
    /// and report the outcome with [`Self::position_received`] or
    /// [`Self::position_failed`].
    pub fn request_location<D>(&mut self, device: &D) -> Option<PositionRequest>
    where
        D: LocationDevice + ?Sized,
    {
        if self.state == GeolocationState::Requesting {
            log::debug!("Geolocation request already in flight");
            return None;
        }
        if !is_secure_origin(&self.origin) {
            self.fail(GeolocationError::new(
                ErrorReason::InsecureOrigin,
                "Geolocation requires HTTPS or localhost",
            ));
            return None;
        }
        if !device.has_location_capability() {
            self.fail(GeolocationError::new(
                ErrorReason::PositionUnavailable,
                "Geolocation not supported",
            ));
            return None;
        }
        log::info!("Geolocation request started");
        self.state = GeolocationState::Requesting;
        self.error = None;
        let id = self.next_request_id.next();
        self.in_flight = Some(id);
        Some(PositionRequest {
            id,
            options: self.settings.options,
        })
    }

    /// Applies a successful fix.
    ///
    /// Returns `false` if the request is no longer pending.
    pub fn position_received(&mut self, id: RequestId, raw: RawPosition, now: TimestampMs) -> bool {
        if !self.finish_request(id) {
            return false;
        }
        let pos = match MapPoint::try_from_lat_lng_deg(raw.lat, raw.lng) {
            Ok(pos) => pos,
            Err(err) => {
                self.fail(GeolocationError::new(
                    ErrorReason::PositionUnavailable,
                    format!("Invalid position: {err}"),
                ));
                return true;
            }
        };
        let ts = self.position.map_or(now, |previous| previous.ts.max(now));
        let position = Position {
            pos,
            ts,
            accuracy: raw.accuracy,
        };
        log::info!(
            "Geolocation succeeded: {{lat: {:.6}, lon: {:.6}, accuracy: {:?}m}}",
            pos.lat(),
            pos.lng(),
            position.accuracy
        );
        if let Err(err) = self.repo.set_last_position(&position) {
            log::warn!("Unable to store the last known position: {err}");
        }
        self.persist_consent(ConsentState::Granted);
        self.position = Some(position);
        self.state = GeolocationState::Granted;
        self.error = None;
        true
    }

    /// Applies a failed request.
    ///
    /// The last known position is kept. Returns `false` if the
    /// request is no longer pending.
    pub fn position_failed(&mut self, id: RequestId, device_error: DeviceError) -> bool {
        if !self.finish_request(id) {
            return false;
        }
        let error = match device_error {
            DeviceError::PermissionDenied => {
                self.persist_consent(ConsentState::Denied);
                GeolocationError::new(ErrorReason::Denied, "User denied geolocation permission")
            }
            DeviceError::Timeout => {
                GeolocationError::new(ErrorReason::Timeout, "Geolocation request timed out")
            }
            DeviceError::PositionUnavailable | DeviceError::Other(_) => {
                GeolocationError::new(ErrorReason::PositionUnavailable, "Position unavailable")
            }
        };
        self.fail(error);
        true
    }

    /// Requests a position and waits for the device to answer.
    pub fn locate<D>(&mut self, device: &D, now: TimestampMs) -> GeolocationState
    where
        D: LocationDevice + ?Sized,
    {
        if let Some(request) = self.request_location(device) {
            let outcome = device.current_position(&request.options);
            self.complete_request(request.id, outcome, now);
        }
        self.state
    }

    /// Reports the outcome of a [`PositionRequest`].
    pub fn complete_request(
        &mut self,
        id: RequestId,
        outcome: Result<RawPosition, DeviceError>,
        now: TimestampMs,
    ) -> bool {
        match outcome {
            Ok(raw) => self.position_received(id, raw, now),
            Err(err) => self.position_failed(id, err),
        }
    }

    /// Forgets the persisted consent decision.
    ///
    /// The last known position stays in storage. A pending request
    /// is abandoned and its outcome will be ignored.
    pub fn reset_consent(&mut self) {
        log::info!("Resetting geolocation consent");
        self.persist_consent(ConsentState::Unset);
        self.error = None;
        self.in_flight = None;
        self.state = GeolocationState::Idle;
    }

    pub fn map_focus(&self, defaults: &MapDefaults) -> MapFocus {
        match self.position {
            Some(position) => MapFocus {
                center: position.pos,
                zoom: defaults.user_zoom,
            },
            None => MapFocus {
                center: defaults.center,
                zoom: defaults.zoom,
            },
        }
    }

    pub const fn state(&self) -> GeolocationState {
        self.state
    }

    pub const fn consent(&self) -> ConsentState {
        self.consent
    }

    pub const fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub const fn error(&self) -> Option<&GeolocationError> {
        self.error.as_ref()
    }

    pub fn is_requesting(&self) -> bool {
        self.state == GeolocationState::Requesting
    }

    fn finish_request(&mut self, id: RequestId) -> bool {
        if self.in_flight != Some(id) {
            log::debug!("Ignoring outcome of abandoned geolocation request {id}");
            return false;
        }
        self.in_flight = None;
        true
    }

    fn fail(&mut self, error: GeolocationError) {
        log::info!("Geolocation failed: {{reason: {}}}", error.reason);
        self.error = Some(error);
        self.state = GeolocationState::Error;
    }

    fn persist_consent(&mut self, consent: ConsentState) {
        self.consent = consent;
        if let Err(err) = self.repo.set_consent(consent) {
            log::warn!("Unable to store the geolocation consent: {err}");
        }
    }
}
