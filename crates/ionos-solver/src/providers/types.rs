//! Wire types of the IONOS DNS API

use serde::{Deserialize, Serialize};

/// Record type of every challenge record
pub const TXT_RECORD_TYPE: &str = "TXT";

/// TTL of challenge records in seconds
pub const CHALLENGE_TTL: u32 = 120;

/// A provider-managed DNS zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub zone_type: String,
}

/// A DNS record held by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub name: String,
    #[serde(default)]
    pub root_name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub change_date: String,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub disabled: bool,
    pub id: String,
}

/// Zone with its (filtered) records, as returned by `GET /zones/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordResponse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub zone_type: String,
    #[serde(default)]
    pub records: Vec<Record>,
}

/// One record to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCreate {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    pub ttl: u32,
    pub prio: u16,
    pub disabled: bool,
}

/// Batch of records sent in one `POST /zones/{id}/records`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordCreateRequest(pub Vec<RecordCreate>);

impl RecordCreateRequest {
    /// Single enabled TXT record
    pub fn txt(name: &str, content: &str, ttl: u32) -> Self {
        Self(vec![RecordCreate {
            name: name.to_string(),
            record_type: TXT_RECORD_TYPE.to_string(),
            content: content.to_string(),
            ttl,
            prio: 0,
            disabled: false,
        }])
    }

    pub fn records(&self) -> &[RecordCreate] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
