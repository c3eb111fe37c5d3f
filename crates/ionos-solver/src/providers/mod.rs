//! DNS provider implementations
//!
//! This module contains the provider trait and its two backends: the IONOS
//! HTTP client and the in-memory double.

pub mod ionos;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use ionos::IonosClient;
pub use memory::MemoryProvider;
pub use traits::{shared, DnsProvider, ProviderHandle};
pub use types::{
    Record, RecordCreate, RecordCreateRequest, RecordResponse, Zone, CHALLENGE_TTL,
    TXT_RECORD_TYPE,
};
