//! IONOS DNS-01 challenge solver
//!
//! This crate proves domain control for ACME issuers by publishing
//! `_acme-challenge` TXT records through the IONOS DNS API.
//!
//! # Components
//!
//! - **Provider client**: the [`DnsProvider`] capability contract, with the
//!   live HTTP backend ([`IonosClient`]) and an in-memory double
//!   ([`MemoryProvider`])
//! - **Zone resolver**: finds the most specific provider zone for a record name
//! - **Lifecycle manager**: [`IonosSolver::present`] and [`IonosSolver::cleanup`]
//! - **Conformance responder**: a small authoritative DNS server that answers
//!   from the same provider state, so records can be checked without a real
//!   DNS deployment
//!
//! # Usage
//!
//! ```ignore
//! use ionos_solver::{ChallengeRequest, IonosSolver, MemorySecretStore};
//! use tokio_util::sync::CancellationToken;
//!
//! let solver = IonosSolver::mock(Arc::new(MemorySecretStore::new()), &[("example.com", "Z1")]);
//! let request = ChallengeRequest::new("_acme-challenge.example.com.", "token");
//!
//! solver.present(&request, &CancellationToken::new()).await?;
//! solver.cleanup(&request, &CancellationToken::new()).await?;
//! ```

pub mod challenge;
pub mod config;
pub mod errors;
pub mod providers;
pub mod resolver;
pub mod responder;
pub mod secrets;
pub mod solver;

#[cfg(test)]
mod testing;

// Re-export main types
pub use challenge::{un_fqdn, ChallengeAction, ChallengeRequest};
pub use config::{load_config, Config, ProviderConfig, SecretKeySelector, DEFAULT_API_URL};
pub use errors::DnsError;
pub use providers::{
    shared, DnsProvider, IonosClient, MemoryProvider, ProviderHandle, Record,
    RecordCreateRequest, Zone,
};
pub use resolver::find_zone_name;
pub use responder::DnsResponder;
pub use secrets::{FileSecretStore, MemorySecretStore, SecretStore};
pub use solver::{IonosSolver, SOLVER_NAME};
