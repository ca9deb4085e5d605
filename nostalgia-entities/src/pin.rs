use std::{fmt, str::FromStr};

use crate::geo::MapPoint;

/// Stable identifier of a location across fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinId(u64);

impl PinId {
    pub const fn to_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for PinId {
    fn from(from: u64) -> Self {
        Self(from)
    }
}

impl From<PinId> for u64 {
    fn from(from: PinId) -> Self {
        from.0
    }
}

impl FromStr for PinId {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point of interest on the map.
#[rustfmt::skip]
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub id               : PinId,
    pub pos              : MapPoint,
    pub address          : String,
    pub current_business : Option<String>,
    pub current_category : Option<String>,
}

impl Pin {
    /// Compares all displayed properties, ignoring the id.
    pub fn same_content(&self, other: &Self) -> bool {
        self.address == other.address
            && self.current_business == other.current_business
            && self.current_category == other.current_category
            && self.pos.lat() == other.pos.lat()
            && self.pos.lng() == other.pos.lng()
    }
}

/// The last pin collection that has been rendered.
///
/// Snapshots are replaced wholesale and never mutated in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinSetSnapshot(Vec<Pin>);

impl PinSetSnapshot {
    pub const fn new(pins: Vec<Pin>) -> Self {
        Self(pins)
    }

    pub fn pins(&self) -> &[Pin] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: PinId) -> Option<&Pin> {
        self.0.iter().find(|p| p.id == id)
    }

    /// Finds the pin closest to `pt`.
    ///
    /// Uses an equirectangular approximation which is good enough
    /// for picking a pin within a single viewport.
    pub fn nearest(&self, pt: MapPoint) -> Option<&Pin> {
        let cos_lat = pt.lat().to_radians().cos();
        let dist = |p: &Pin| {
            let dlat = p.pos.lat() - pt.lat();
            let mut dlng = (p.pos.lng() - pt.lng()).abs();
            if dlng > 180.0 {
                dlng = 360.0 - dlng;
            }
            let dlng = dlng * cos_lat;
            dlat * dlat + dlng * dlng
        };
        self.0
            .iter()
            .min_by(|a, b| dist(a).total_cmp(&dist(b)))
    }
}

impl From<Vec<Pin>> for PinSetSnapshot {
    fn from(from: Vec<Pin>) -> Self {
        Self(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::*;

    #[test]
    fn parse_pin_id() {
        assert_eq!("42".parse::<PinId>().unwrap(), PinId::from(42));
        assert!("-1".parse::<PinId>().is_err());
        assert_eq!(PinId::from(7).to_string(), "7");
    }

    #[test]
    fn nearest_pin() {
        let snapshot = PinSetSnapshot::new(vec![
            Pin::build().id(1).pos(MapPoint::from_lat_lng_deg(47.60, -122.33)).finish(),
            Pin::build().id(2).pos(MapPoint::from_lat_lng_deg(47.61, -122.34)).finish(),
            Pin::build().id(3).pos(MapPoint::from_lat_lng_deg(47.70, -122.30)).finish(),
        ]);
        let nearest = snapshot
            .nearest(MapPoint::from_lat_lng_deg(47.611, -122.339))
            .unwrap();
        assert_eq!(nearest.id, PinId::from(2));
        assert!(PinSetSnapshot::default()
            .nearest(MapPoint::from_lat_lng_deg(0.0, 0.0))
            .is_none());
    }

    #[test]
    fn nearest_pin_across_antimeridian() {
        let snapshot = PinSetSnapshot::new(vec![
            Pin::build().id(1).pos(MapPoint::from_lat_lng_deg(0.0, 170.0)).finish(),
            Pin::build().id(2).pos(MapPoint::from_lat_lng_deg(0.0, -179.5)).finish(),
        ]);
        let nearest = snapshot
            .nearest(MapPoint::from_lat_lng_deg(0.0, 179.5))
            .unwrap();
        assert_eq!(nearest.id, PinId::from(2));
    }

    #[test]
    fn same_content_ignores_id() {
        let a = Pin::build().id(1).address("1 Pike St").finish();
        let b = Pin::build().id(2).address("1 Pike St").finish();
        assert!(a.same_content(&b));
        let c = Pin::build()
            .id(1)
            .address("1 Pike St")
            .current_business(Some("Cafe"))
            .finish();
        assert!(!a.same_content(&c));
    }
}
