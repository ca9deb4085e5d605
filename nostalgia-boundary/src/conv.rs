use super::*;
use nostalgia_entities as e;
use std::convert::TryFrom;
use thiserror::Error;
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Date, OffsetDateTime,
};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Coord(#[from] e::geo::CoordRangeError),
    #[error("Invalid date '{0}'")]
    Date(String),
    #[error("Invalid timestamp '{0}'")]
    Timestamp(String),
}

fn parse_date(date: Option<String>) -> Result<Option<Date>, ConversionError> {
    date.map(|d| Date::parse(&d, DATE_FORMAT).map_err(|_| ConversionError::Date(d)))
        .transpose()
}

fn format_date(date: Option<Date>) -> Option<String> {
    date.and_then(|d| d.format(DATE_FORMAT).ok())
}

impl TryFrom<Pin> for e::pin::Pin {
    type Error = ConversionError;

    fn try_from(from: Pin) -> Result<Self, Self::Error> {
        let Pin {
            id,
            lat,
            lon,
            address,
            current_business,
            current_category,
        } = from;
        Ok(Self {
            id: id.into(),
            pos: e::geo::MapPoint::try_from_lat_lng_deg(lat, lon)?,
            address,
            current_business,
            current_category,
        })
    }
}

impl From<e::pin::Pin> for Pin {
    fn from(from: e::pin::Pin) -> Self {
        let e::pin::Pin {
            id,
            pos,
            address,
            current_business,
            current_category,
        } = from;
        Self {
            id: id.into(),
            lat: pos.lat(),
            lon: pos.lng(),
            address,
            current_business,
            current_category,
        }
    }
}

impl TryFrom<TimelineEntry> for e::location::TimelineEntry {
    type Error = ConversionError;

    fn try_from(from: TimelineEntry) -> Result<Self, Self::Error> {
        let TimelineEntry {
            business_name,
            category,
            start_date,
            end_date,
            is_current,
        } = from;
        Ok(Self {
            business_name,
            category,
            start_date: parse_date(start_date)?,
            end_date: parse_date(end_date)?,
            is_current,
        })
    }
}

impl From<e::location::TimelineEntry> for TimelineEntry {
    fn from(from: e::location::TimelineEntry) -> Self {
        let e::location::TimelineEntry {
            business_name,
            category,
            start_date,
            end_date,
            is_current,
        } = from;
        Self {
            business_name,
            category,
            start_date: format_date(start_date),
            end_date: format_date(end_date),
            is_current,
        }
    }
}

impl TryFrom<LocationDetail> for e::location::LocationDetail {
    type Error = ConversionError;

    fn try_from(from: LocationDetail) -> Result<Self, Self::Error> {
        let LocationDetail {
            id,
            lat,
            lon,
            address,
            timeline,
        } = from;
        let timeline = timeline
            .into_iter()
            .map(TryFrom::try_from)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            id: id.into(),
            pos: e::geo::MapPoint::try_from_lat_lng_deg(lat, lon)?,
            address,
            timeline,
        })
    }
}

impl From<e::location::LocationDetail> for LocationDetail {
    fn from(from: e::location::LocationDetail) -> Self {
        let e::location::LocationDetail {
            id,
            pos,
            address,
            timeline,
        } = from;
        Self {
            id: id.into(),
            lat: pos.lat(),
            lon: pos.lng(),
            address,
            timeline: timeline.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<e::memory::MemorySubmission> for NewMemory {
    fn from(from: e::memory::MemorySubmission) -> Self {
        let e::memory::MemorySubmission {
            location_id,
            business_name,
            start_year,
            end_year,
            note,
            proof_url,
        } = from;
        Self {
            location_id: location_id.into(),
            business_name,
            start_year,
            end_year,
            note,
            proof_url,
        }
    }
}

impl From<ReviewStatus> for e::memory::ReviewStatus {
    fn from(from: ReviewStatus) -> Self {
        use e::memory::ReviewStatus as E;
        match from {
            ReviewStatus::Pending => E::Pending,
            ReviewStatus::Approved => E::Approved,
            ReviewStatus::Rejected => E::Rejected,
        }
    }
}

impl TryFrom<MemoryReceipt> for e::memory::Receipt {
    type Error = ConversionError;

    fn try_from(from: MemoryReceipt) -> Result<Self, Self::Error> {
        let MemoryReceipt {
            id,
            location_id,
            status,
            created_at,
            message: _,
        } = from;
        let created_at = created_at
            .map(|ts| OffsetDateTime::parse(&ts, &Rfc3339).map_err(|_| ConversionError::Timestamp(ts)))
            .transpose()?;
        Ok(Self {
            id,
            location_id: location_id.into(),
            status: status.into(),
            created_at,
        })
    }
}
