use ::time::Date;

use crate::{geo::MapPoint, pin::PinId};

/// One business that occupied a location during a period of time.
#[rustfmt::skip]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub business_name : String,
    pub category      : Option<String>,
    pub start_date    : Option<Date>,
    pub end_date      : Option<Date>,
    pub is_current    : bool,
}

/// The history of a single location.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationDetail {
    pub id: PinId,
    pub pos: MapPoint,
    pub address: String,
    pub timeline: Vec<TimelineEntry>,
}

impl LocationDetail {
    pub fn current(&self) -> Option<&TimelineEntry> {
        self.timeline.iter().find(|e| e.is_current)
    }
}
