//! Solver error types

use hickory_proto::rr::RecordType;
use hickory_proto::ProtoError;
use thiserror::Error;

/// Errors raised while presenting or cleaning up a challenge record
#[derive(Error, Debug)]
pub enum DnsError {
    #[error("error decoding solver config: {0}")]
    InvalidConfig(String),

    #[error("config missing")]
    MissingConfig,

    #[error("failed to load secret \"{namespace}/{name}\"")]
    SecretNotFound { namespace: String, name: String },

    #[error("key not found \"{key}\" in secret '{namespace}/{name}'")]
    SecretKeyNotFound {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("invalid secret data: {0}")]
    InvalidSecret(String),

    #[error("Error calling API status: {status} url: {url} method: {method}")]
    Api {
        method: String,
        url: String,
        status: String,
    },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unable to unmarshal response: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unable to find zone {0}")]
    ZoneNotFound(String),

    #[error("unable to find record {0}")]
    RecordNotFound(String),

    #[error("record `{record}` is outside zone `{zone}`")]
    InvalidRecord { record: String, zone: String },

    #[error("unimplemented record type {0}")]
    UnsupportedRecordType(RecordType),

    #[error("DNS protocol error: {0}")]
    Proto(#[from] ProtoError),

    #[error("unable to init client `{namespace}`: {source}")]
    ClientInit {
        namespace: String,
        #[source]
        source: Box<DnsError>,
    },

    #[error("unable to find id for zone name `{zone}`: {source}")]
    ZoneLookup {
        zone: String,
        #[source]
        source: Box<DnsError>,
    },

    #[error("unable to get DNS records for `{record}`: {source}")]
    RecordLookup {
        record: String,
        #[source]
        source: Box<DnsError>,
    },

    #[error("unable to create TXT record `{record}`: {source}")]
    RecordCreate {
        record: String,
        #[source]
        source: Box<DnsError>,
    },

    #[error("unable to delete record with id `{record_id}`: {source}")]
    RecordDelete {
        record_id: String,
        #[source]
        source: Box<DnsError>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DnsError {
    /// The innermost error beneath any operation context.
    pub fn root(&self) -> &DnsError {
        match self {
            DnsError::ClientInit { source, .. }
            | DnsError::ZoneLookup { source, .. }
            | DnsError::RecordLookup { source, .. }
            | DnsError::RecordCreate { source, .. }
            | DnsError::RecordDelete { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            DnsError::ZoneNotFound(_)
                | DnsError::RecordNotFound(_)
                | DnsError::SecretNotFound { .. }
                | DnsError::SecretKeyNotFound { .. }
        )
    }
}
