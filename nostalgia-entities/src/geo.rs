use itertools::Itertools;
use std::{fmt, str::FromStr};
use thiserror::Error;

const LAT_DEG_MIN: f64 = -90.0;
const LAT_DEG_MAX: f64 = 90.0;
const LNG_DEG_MIN: f64 = -180.0;
const LNG_DEG_MAX: f64 = 180.0;

/// Largest supported number of decimal digits for quantized coordinates.
///
/// 180 * 10^9 still fits into the 53 bit mantissa of an `f64`,
/// i.e. scaling a coordinate by `10^MAX_PRECISION` is exact
/// up to the last representable digit.
pub const MAX_PRECISION: u8 = 9;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum CoordRangeError {
    #[error("Latitude out of range: {0}")]
    Latitude(f64),
    #[error("Longitude out of range: {0}")]
    Longitude(f64),
}

fn is_valid_lat_deg(deg: f64) -> bool {
    (LAT_DEG_MIN..=LAT_DEG_MAX).contains(&deg)
}

fn is_valid_lng_deg(deg: f64) -> bool {
    (LNG_DEG_MIN..=LNG_DEG_MAX).contains(&deg)
}

/// A geographical location on a (flat) map in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MapPoint {
    lat: f64,
    lng: f64,
}

impl MapPoint {
    pub fn from_lat_lng_deg<LAT: Into<f64>, LNG: Into<f64>>(lat: LAT, lng: LNG) -> Self {
        let (lat, lng) = (lat.into(), lng.into());
        debug_assert!(is_valid_lat_deg(lat));
        debug_assert!(is_valid_lng_deg(lng));
        Self { lat, lng }
    }

    pub fn try_from_lat_lng_deg<LAT: Into<f64>, LNG: Into<f64>>(
        lat: LAT,
        lng: LNG,
    ) -> Result<Self, CoordRangeError> {
        let (lat, lng) = (lat.into(), lng.into());
        if !is_valid_lat_deg(lat) {
            return Err(CoordRangeError::Latitude(lat));
        }
        if !is_valid_lng_deg(lng) {
            return Err(CoordRangeError::Longitude(lng));
        }
        Ok(Self { lat, lng })
    }

    pub const fn lat(self) -> f64 {
        self.lat
    }

    pub const fn lng(self) -> f64 {
        self.lng
    }

    pub fn is_valid(self) -> bool {
        is_valid_lat_deg(self.lat) && is_valid_lng_deg(self.lng)
    }

    pub const fn to_lat_lng_deg(self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

impl fmt::Display for MapPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParsePointError {
    #[error("Invalid number '{0}'")]
    Number(String),
    #[error(transparent)]
    Range(#[from] CoordRangeError),
    #[error("Expected 'lat,lng' but got '{0}'")]
    Format(String),
}

fn parse_deg(s: &str) -> Result<f64, ParsePointError> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| ParsePointError::Number(s.to_owned()))
}

impl FromStr for MapPoint {
    type Err = ParsePointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((lat, lng)) = s.split(',').collect_tuple() else {
            return Err(ParsePointError::Format(s.to_owned()));
        };
        Ok(Self::try_from_lat_lng_deg(parse_deg(lat)?, parse_deg(lng)?)?)
    }
}

/// The visible map rectangle in degrees.
///
/// West and east may wrap around the antimeridian,
/// i.e. `west > east` is allowed and not normalized.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MapBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl MapBounds {
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    pub fn is_valid(&self) -> bool {
        let Self {
            north,
            south,
            east,
            west,
        } = *self;
        is_valid_lat_deg(south)
            && is_valid_lat_deg(north)
            && is_valid_lng_deg(west)
            && is_valid_lng_deg(east)
            && south < north
    }

    pub fn center(&self) -> MapPoint {
        let lat = (self.south + self.north) / 2.0;
        let mut lng = (self.west + self.east) / 2.0;
        if self.west > self.east {
            // wrap around
            lng += if lng > 0.0 { -LNG_DEG_MAX } else { LNG_DEG_MAX };
        }
        MapPoint { lat, lng }
    }

    pub fn contains_point(&self, pt: MapPoint) -> bool {
        debug_assert!(self.is_valid());
        if pt.lat < self.south || pt.lat > self.north {
            return false;
        }
        if self.west <= self.east {
            // regular (inclusive)
            pt.lng >= self.west && pt.lng <= self.east
        } else {
            // inverse (exclusive)
            !(pt.lng > self.east && pt.lng < self.west)
        }
    }
}

impl fmt::Display for MapBounds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseBoundsError {
    #[error("Expected 'west,south,east,north' but got '{0}'")]
    Format(String),
    #[error(transparent)]
    Coord(#[from] ParsePointError),
    #[error("South ({south}) must be less than north ({north})")]
    Order { south: f64, north: f64 },
}

impl FromStr for MapBounds {
    type Err = ParseBoundsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((west, south, east, north)) = s.split(',').collect_tuple() else {
            return Err(ParseBoundsError::Format(s.to_owned()));
        };
        let sw = MapPoint::try_from_lat_lng_deg(parse_deg(south)?, parse_deg(west)?)
            .map_err(ParsePointError::from)?;
        let ne = MapPoint::try_from_lat_lng_deg(parse_deg(north)?, parse_deg(east)?)
            .map_err(ParsePointError::from)?;
        if sw.lat >= ne.lat {
            return Err(ParseBoundsError::Order {
                south: sw.lat,
                north: ne.lat,
            });
        }
        Ok(Self::new(sw.lng, sw.lat, ne.lng, ne.lat))
    }
}

/// Map bounds quantized to a fixed number of decimal digits.
///
/// Each coordinate is stored as an integer multiple of `10^-precision`
/// degrees. Two values with equal units are textually and numerically
/// identical, which makes them suitable for keying.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RoundedBounds {
    precision: u8,
    west: i64,
    south: i64,
    east: i64,
    north: i64,
}

impl RoundedBounds {
    pub fn from_units(precision: u8, west: i64, south: i64, east: i64, north: i64) -> Self {
        debug_assert!(precision <= MAX_PRECISION);
        Self {
            precision,
            west,
            south,
            east,
            north,
        }
    }

    pub const fn precision(&self) -> u8 {
        self.precision
    }

    /// Units in the order `(west, south, east, north)`.
    pub const fn units(&self) -> (i64, i64, i64, i64) {
        (self.west, self.south, self.east, self.north)
    }

    fn scale(&self) -> f64 {
        10_f64.powi(i32::from(self.precision))
    }

    pub fn to_bounds(&self) -> MapBounds {
        let scale = self.scale();
        MapBounds::new(
            self.west as f64 / scale,
            self.south as f64 / scale,
            self.east as f64 / scale,
            self.north as f64 / scale,
        )
    }
}

impl fmt::Display for RoundedBounds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.to_bounds().fmt(f)
    }
}

/// Opaque identity of a viewport query.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for CacheKey {
    fn from(from: String) -> Self {
        Self(from)
    }
}

impl From<&str> for CacheKey {
    fn from(from: &str) -> Self {
        from.to_owned().into()
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
