use ::time::OffsetDateTime;
use strum::{AsRefStr, Display, EnumString};

use crate::pin::PinId;

/// A user contributed memory of a former business at a location.
#[rustfmt::skip]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySubmission {
    pub location_id   : PinId,
    pub business_name : String,
    pub start_year    : Option<i32>,
    pub end_year      : Option<i32>,
    pub note          : Option<String>,
    pub proof_url     : Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

/// Acknowledgement of an accepted memory submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub id: u64,
    pub location_id: PinId,
    pub status: ReviewStatus,
    pub created_at: Option<OffsetDateTime>,
}
