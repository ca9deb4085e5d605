use serde::{Deserialize, Serialize};

#[rustfmt::skip]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "extra-derive", derive(Debug, Clone, PartialEq))]
pub struct Pin {
    pub id               : u64,
    pub lat              : f64,
    pub lon              : f64,
    pub address          : String,
    pub current_business : Option<String>,
    pub current_category : Option<String>,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "extra-derive", derive(Debug, Clone, PartialEq))]
pub struct PinsResponse {
    pub locations: Vec<Pin>,
    pub count: usize,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[rustfmt::skip]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "extra-derive", derive(Debug, Clone, PartialEq))]
pub struct TimelineEntry {
    pub business_name : String,
    pub category      : Option<String>,
    /// `YYYY-MM-DD`
    pub start_date    : Option<String>,
    /// `YYYY-MM-DD`
    pub end_date      : Option<String>,
    pub is_current    : bool,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "extra-derive", derive(Debug, Clone, PartialEq))]
pub struct LocationDetail {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
    pub address: String,
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "extra-derive", derive(Debug, Clone, PartialEq))]
pub struct NewMemory {
    pub location_id: u64,
    pub business_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_url: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "extra-derive", derive(Debug, Clone, PartialEq))]
pub struct MemoryReceipt {
    pub id: u64,
    pub location_id: u64,
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Error {
    pub error: String,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

#[cfg(feature = "entity-conversions")]
mod conv;

#[cfg(feature = "entity-conversions")]
pub use conv::ConversionError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_pins_response() {
        let json = r#"{
            "locations": [
                {"id": 1, "lat": 47.6, "lon": -122.3, "address": "1st Ave",
                 "current_business": "Cafe", "current_category": null}
            ],
            "count": 1,
            "cursor": null
        }"#;
        let response: PinsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.locations[0].current_business.as_deref(), Some("Cafe"));
        assert!(response.locations[0].current_category.is_none());
    }

    #[test]
    fn omit_empty_memory_fields() {
        let memory = NewMemory {
            location_id: 3,
            business_name: "Tower Records".into(),
            start_year: Some(1970),
            end_year: None,
            note: None,
            proof_url: None,
        };
        assert_eq!(
            serde_json::to_string(&memory).unwrap(),
            r#"{"location_id":3,"business_name":"Tower Records","start_year":1970}"#
        );
    }

    #[test]
    fn deserialize_receipt_without_timestamp() {
        let json = r#"{"id": 9, "location_id": 3, "business_name": "Tower Records",
            "status": "pending", "message": "Memory submission received and pending review"}"#;
        let receipt: MemoryReceipt = serde_json::from_str(json).unwrap();
        assert_eq!(receipt.status, ReviewStatus::Pending);
        assert!(receipt.created_at.is_none());
    }

    #[test]
    fn deserialize_error() {
        let json = r#"{"error": "Location not found", "correlation_id": "abc"}"#;
        let err: Error = serde_json::from_str(json).unwrap();
        assert_eq!(err.error, "Location not found");
        assert_eq!(err.correlation_id.as_deref(), Some("abc"));
    }
}
