//! DNS provider trait definitions
//!
//! The solver and the conformance responder talk to the DNS hosting service
//! through [`DnsProvider`]. Two backends implement it: the HTTP client for
//! the live API and an in-memory double used by tests and conformance runs.
//!
//! Operations that change provider state take `&mut self`. A provider shared
//! through a [`ProviderHandle`] can therefore only be mutated while holding
//! the exclusive lock, and readers such as the DNS responder take the shared
//! lock.
//!
//! Cancellation follows the async model: dropping an operation's future
//! aborts the in-flight request.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::types::RecordCreateRequest;
use crate::config::Config;
use crate::errors::DnsError;

/// Shared, lock-guarded access to one provider instance
pub type ProviderHandle<P> = Arc<RwLock<P>>;

/// Wrap a provider for sharing between the solver and the responder.
pub fn shared<P: DnsProvider>(provider: P) -> ProviderHandle<P> {
    Arc::new(RwLock::new(provider))
}

/// Capability contract over the DNS hosting API
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Bind credentials and base URL for subsequent calls.
    ///
    /// Must be called before any other operation.
    fn configure(&mut self, config: &Config);

    /// Id of the zone whose name matches `zone_name` exactly
    async fn find_zone_id(&self, zone_name: &str) -> Result<String, DnsError>;

    /// Id of the TXT record named `record_name` within `zone_id`
    async fn find_record_id(&self, zone_id: &str, record_name: &str)
        -> Result<String, DnsError>;

    /// Content of a record addressed by name or id
    async fn get_record_value(
        &self,
        zone_id: &str,
        record_name_or_id: &str,
    ) -> Result<String, DnsError>;

    /// Create a batch of records.
    ///
    /// Duplicate suppression is not guaranteed.
    async fn create_records(
        &mut self,
        zone_id: &str,
        records: &RecordCreateRequest,
    ) -> Result<(), DnsError>;

    /// Delete a record by id; an unknown id is an error.
    async fn delete_record(&mut self, zone_id: &str, record_id: &str) -> Result<(), DnsError>;
}
