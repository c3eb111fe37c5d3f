//! Challenge lifecycle manager
//!
//! [`IonosSolver`] is the entry point the ACME orchestration layer drives.
//! Each `present`/`cleanup` call builds its configuration from scratch:
//! - decode the solver config attached to the request
//! - read both API key halves from the secret store
//! - bind the config into the provider and find the zone
//!
//! and then creates or deletes exactly one TXT record. Nothing is retried at
//! this layer.

use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::challenge::ChallengeRequest;
use crate::config::{load_config, Config};
use crate::errors::DnsError;
use crate::providers::{
    shared, DnsProvider, IonosClient, MemoryProvider, ProviderHandle, RecordCreateRequest,
    CHALLENGE_TTL,
};
use crate::resolver::find_zone_name;
use crate::responder::DnsResponder;
use crate::secrets::{read_secret_string, SecretStore};

/// Name under which the solver registers with the issuer
pub const SOLVER_NAME: &str = "ionos";

pub struct IonosSolver<P> {
    name: String,
    provider: ProviderHandle<P>,
    secrets: Arc<dyn SecretStore>,
}

impl<P> Clone for IonosSolver<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            provider: Arc::clone(&self.provider),
            secrets: Arc::clone(&self.secrets),
        }
    }
}

impl IonosSolver<IonosClient> {
    /// Solver backed by the live IONOS API
    pub fn ionos(secrets: Arc<dyn SecretStore>) -> Result<Self, DnsError> {
        Ok(Self::new(IonosClient::new()?, secrets))
    }
}

impl IonosSolver<MemoryProvider> {
    /// Solver backed by the in-memory provider with the given `(name, id)` zones
    pub fn mock(secrets: Arc<dyn SecretStore>, zones: &[(&str, &str)]) -> Self {
        let provider = zones
            .iter()
            .fold(MemoryProvider::new(), |provider, (name, id)| {
                provider.with_zone(name, id)
            });
        Self::new(provider, secrets)
    }
}

impl<P: DnsProvider + 'static> IonosSolver<P> {
    pub fn new(provider: P, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            name: SOLVER_NAME.to_string(),
            provider: shared(provider),
            secrets,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle to the provider, shared with the responder
    pub fn provider_handle(&self) -> ProviderHandle<P> {
        Arc::clone(&self.provider)
    }

    /// Run the conformance responder on `socket` in the background.
    pub fn spawn_responder(
        &self,
        socket: UdpSocket,
        shutdown: CancellationToken,
    ) -> JoinHandle<Result<(), DnsError>> {
        let responder = DnsResponder::new(self.provider_handle());
        tokio::spawn(responder.serve(socket, shutdown))
    }

    /// Publish the challenge key as a TXT record.
    pub async fn present(
        &self,
        request: &ChallengeRequest,
        cancel: &CancellationToken,
    ) -> Result<(), DnsError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DnsError::Cancelled),
            result = self.do_present(request) => result,
        }
    }

    /// Remove the TXT record created by [`present`](Self::present) for the same request.
    pub async fn cleanup(
        &self,
        request: &ChallengeRequest,
        cancel: &CancellationToken,
    ) -> Result<(), DnsError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DnsError::Cancelled),
            result = self.do_cleanup(request) => result,
        }
    }

    async fn do_present(&self, request: &ChallengeRequest) -> Result<(), DnsError> {
        let config = self.client_init(request).await?;
        let record_name = request.record_name();

        let mut provider = self.provider.write().await;
        let zone_id = Self::bind_zone(&mut *provider, &config, request).await?;

        let records = RecordCreateRequest::txt(record_name, &request.key, CHALLENGE_TTL);
        if let Err(e) = provider.create_records(&zone_id, &records).await {
            error!("Failed to create TXT record {}: {}", record_name, e);
            return Err(DnsError::RecordCreate {
                record: record_name.to_string(),
                source: Box::new(e),
            });
        }

        info!("Presented TXT record {} in zone {}", record_name, zone_id);
        Ok(())
    }

    async fn do_cleanup(&self, request: &ChallengeRequest) -> Result<(), DnsError> {
        let config = self.client_init(request).await?;
        let record_name = request.record_name();

        let mut provider = self.provider.write().await;
        let zone_id = Self::bind_zone(&mut *provider, &config, request).await?;

        let record_id = provider
            .find_record_id(&zone_id, record_name)
            .await
            .map_err(|e| DnsError::RecordLookup {
                record: record_name.to_string(),
                source: Box::new(e),
            })?;

        provider
            .delete_record(&zone_id, &record_id)
            .await
            .map_err(|e| DnsError::RecordDelete {
                record_id: record_id.clone(),
                source: Box::new(e),
            })?;

        info!("Cleaned up TXT record {} in zone {}", record_name, zone_id);
        Ok(())
    }

    /// Build the per-operation config from the request and the secret store.
    async fn client_init(&self, request: &ChallengeRequest) -> Result<Config, DnsError> {
        let provider_config = load_config(request.config.as_ref())?;
        let namespace = request.resource_namespace.as_str();

        let wrap = |e: DnsError| DnsError::ClientInit {
            namespace: namespace.to_string(),
            source: Box::new(e),
        };

        let public_key = read_secret_string(
            self.secrets.as_ref(),
            namespace,
            &provider_config.public_key_secret_ref,
        )
        .await
        .map_err(wrap)?;
        let secret_key = read_secret_string(
            self.secrets.as_ref(),
            namespace,
            &provider_config.secret_key_secret_ref,
        )
        .await
        .map_err(wrap)?;

        let config = Config::new(&provider_config, &public_key, &secret_key);
        debug!("Solver config for {}: {:?}", request.resolved_fqdn, config);
        Ok(config)
    }

    /// Bind `config` into the provider and return the id of the target zone.
    async fn bind_zone(
        provider: &mut P,
        config: &Config,
        request: &ChallengeRequest,
    ) -> Result<String, DnsError> {
        provider.configure(config);

        let zone_name = match &config.zone_name {
            Some(zone) => zone.clone(),
            None => find_zone_name(&*provider, &request.resolved_fqdn).await?,
        };

        provider
            .find_zone_id(&zone_name)
            .await
            .map_err(|e| DnsError::ZoneLookup {
                zone: zone_name.clone(),
                source: Box::new(e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecretKeySelector;
    use crate::secrets::MemorySecretStore;
    use crate::testing::{query_message, txt_answer, MockProvider};
    use hickory_proto::op::ResponseCode;
    use hickory_proto::rr::RecordType;
    use serde_json::json;

    const NAMESPACE: &str = "cert-manager";

    fn secrets() -> Arc<dyn SecretStore> {
        Arc::new(
            MemorySecretStore::new()
                .with_secret(NAMESPACE, "ionos-secret", "IONOS_PUBLIC_PREFIX", "pub\n")
                .with_secret(NAMESPACE, "ionos-secret", "IONOS_SECRET", "sec"),
        )
    }

    fn solver_config() -> serde_json::Value {
        json!({
            "publicKeySecretRef": { "name": "ionos-secret", "key": "IONOS_PUBLIC_PREFIX" },
            "secretKeySecretRef": { "name": "ionos-secret", "key": "IONOS_SECRET" }
        })
    }

    fn challenge(fqdn: &str, key: &str) -> ChallengeRequest {
        ChallengeRequest::new(fqdn, key)
            .with_namespace(NAMESPACE)
            .with_config(solver_config())
    }

    fn mock_solver() -> IonosSolver<MemoryProvider> {
        IonosSolver::mock(secrets(), &[("example.com", "Z1")])
    }

    #[test]
    fn test_solver_name() {
        assert_eq!(mock_solver().name(), "ionos");
    }

    #[tokio::test]
    async fn test_present_then_cleanup_scenario() {
        let solver = mock_solver();
        let responder = DnsResponder::new(solver.provider_handle());
        let cancel = CancellationToken::new();
        let request = challenge("_acme-challenge.example.com.", "abc123");

        solver.present(&request, &cancel).await.unwrap();

        {
            let provider = solver.provider_handle();
            let provider = provider.read().await;
            let records: Vec<_> = provider.records().values().collect();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].name, "_acme-challenge.example.com");
            assert_eq!(records[0].content, "abc123");
            assert_eq!(records[0].record_type, "TXT");
            assert_eq!(records[0].ttl, CHALLENGE_TTL);
        }

        let query = query_message("_acme-challenge.example.com.", RecordType::TXT);
        let response = responder.handle_request(&query).await;
        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert_eq!(response.answers().len(), 1);
        assert_eq!(txt_answer(&response.answers()[0]).as_deref(), Some("abc123"));

        solver.cleanup(&request, &cancel).await.unwrap();

        let response = responder.handle_request(&query).await;
        assert_eq!(response.response_code(), ResponseCode::NXDomain);
        assert!(response.answers().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_restores_record_set() {
        let solver = IonosSolver::new(
            MemoryProvider::new()
                .with_zone("example.com", "Z1")
                .with_record("Z1", "www.example.com", "unrelated"),
            secrets(),
        );
        let cancel = CancellationToken::new();
        let request = challenge("_acme-challenge.www.example.com.", "token");

        let before = solver.provider_handle().read().await.records().clone();

        solver.present(&request, &cancel).await.unwrap();
        solver.cleanup(&request, &cancel).await.unwrap();

        let after = solver.provider_handle().read().await.records().clone();
        assert_eq!(before, after);
        assert_eq!(after["www.example.com.Z1"].content, "unrelated");
    }

    #[tokio::test]
    async fn test_present_uses_most_specific_zone() {
        let solver = IonosSolver::mock(
            secrets(),
            &[("example.com", "Z1"), ("b.example.com", "Z2")],
        );
        let request = challenge("_acme-challenge.a.b.example.com.", "k");

        solver
            .present(&request, &CancellationToken::new())
            .await
            .unwrap();

        let provider = solver.provider_handle();
        let provider = provider.read().await;
        assert!(provider
            .records()
            .contains_key("_acme-challenge.a.b.example.com.Z2"));
    }

    #[tokio::test]
    async fn test_cleanup_without_record_does_not_delete() {
        let mut provider = MockProvider::new();
        provider.expect_configure().return_const(());
        provider
            .expect_find_zone_id()
            .returning(|name| match name {
                "example.com" => Ok("Z1".to_string()),
                other => Err(DnsError::ZoneNotFound(other.to_string())),
            });
        provider
            .expect_find_record_id()
            .times(1)
            .returning(|_, name| Err(DnsError::RecordNotFound(name.to_string())));
        provider.expect_delete_record().times(0);

        let solver = IonosSolver::new(provider, secrets());
        let err = solver
            .cleanup(
                &challenge("_acme-challenge.example.com.", "abc123"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DnsError::RecordLookup { .. }));
        assert!(matches!(err.root(), DnsError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn test_cleanup_delete_failure_is_fatal() {
        let mut provider = MockProvider::new();
        provider.expect_configure().return_const(());
        provider
            .expect_find_zone_id()
            .returning(|_| Ok("Z1".to_string()));
        provider
            .expect_find_record_id()
            .returning(|_, _| Ok("rec-1".to_string()));
        provider
            .expect_delete_record()
            .withf(|zone_id: &str, record_id: &str| zone_id == "Z1" && record_id == "rec-1")
            .times(1)
            .returning(|_, _| {
                Err(DnsError::Api {
                    method: "DELETE".to_string(),
                    url: "https://api.example.test/zones/Z1/records/rec-1".to_string(),
                    status: "500 Internal Server Error".to_string(),
                })
            });

        let solver = IonosSolver::new(provider, secrets());
        let err = solver
            .cleanup(
                &challenge("_acme-challenge.example.com.", "abc123"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DnsError::RecordDelete { ref record_id, .. } if record_id == "rec-1"));
    }

    #[tokio::test]
    async fn test_create_failure_is_fatal() {
        let mut provider = MockProvider::new();
        provider.expect_configure().return_const(());
        provider
            .expect_find_zone_id()
            .returning(|_| Ok("Z1".to_string()));
        provider
            .expect_create_records()
            .times(1)
            .returning(|_, _| {
                Err(DnsError::Api {
                    method: "POST".to_string(),
                    url: "https://api.example.test/zones/Z1/records".to_string(),
                    status: "400 Bad Request".to_string(),
                })
            });

        let solver = IonosSolver::new(provider, secrets());
        let err = solver
            .present(
                &challenge("_acme-challenge.example.com.", "abc123"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(err, DnsError::RecordCreate { ref record, .. } if record == "_acme-challenge.example.com")
        );
        assert!(matches!(err.root(), DnsError::Api { .. }));
    }

    #[tokio::test]
    async fn test_present_sends_composed_key_and_record() {
        let mut provider = MockProvider::new();
        provider
            .expect_configure()
            .withf(|config: &Config| {
                config.api_key == "pub.sec" && config.api_url == crate::config::DEFAULT_API_URL
            })
            .times(1)
            .return_const(());
        provider
            .expect_find_zone_id()
            .returning(|name| match name {
                "example.com" => Ok("Z1".to_string()),
                other => Err(DnsError::ZoneNotFound(other.to_string())),
            });
        provider
            .expect_create_records()
            .withf(|zone_id: &str, records: &RecordCreateRequest| {
                let record = &records.records()[0];
                zone_id == "Z1"
                    && records.len() == 1
                    && record.name == "_acme-challenge.example.com"
                    && record.record_type == "TXT"
                    && record.content == "abc123"
                    && record.ttl == CHALLENGE_TTL
                    && !record.disabled
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let solver = IonosSolver::new(provider, secrets());
        solver
            .present(
                &challenge("_acme-challenge.example.com.", "abc123"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_zone_override_skips_probing() {
        let mut provider = MockProvider::new();
        provider
            .expect_configure()
            .withf(|config: &Config| config.zone_name.as_deref() == Some("example.com"))
            .return_const(());
        provider
            .expect_find_zone_id()
            .withf(|name: &str| name == "example.com")
            .times(1)
            .returning(|_| Ok("Z1".to_string()));
        provider
            .expect_create_records()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut config = solver_config();
        config["zoneName"] = json!("example.com");
        let request = ChallengeRequest::new("_acme-challenge.a.b.example.com.", "k")
            .with_namespace(NAMESPACE)
            .with_config(config);

        let solver = IonosSolver::new(provider, secrets());
        solver
            .present(&request, &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_zone_override_outside_record_fails_present() {
        let solver = IonosSolver::mock(
            secrets(),
            &[("example.com", "Z1"), ("example.org", "Z2")],
        );
        let mut config = solver_config();
        config["zoneName"] = json!("example.org");
        let request = ChallengeRequest::new("_acme-challenge.example.com.", "abc123")
            .with_namespace(NAMESPACE)
            .with_config(config);

        let err = solver
            .present(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DnsError::RecordCreate { .. }));
        assert!(matches!(
            err.root(),
            DnsError::InvalidRecord { zone, .. } if zone == "example.org"
        ));
        assert!(solver.provider_handle().read().await.records().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_zone_fails_present() {
        let solver = IonosSolver::mock(secrets(), &[("example.org", "Z1")]);
        let err = solver
            .present(
                &challenge("_acme-challenge.example.com.", "abc123"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DnsError::ZoneNotFound(_)));
        assert!(solver.provider_handle().read().await.records().is_empty());
    }

    #[tokio::test]
    async fn test_missing_secret_key_fails_client_init() {
        let store: Arc<dyn SecretStore> = Arc::new(MemorySecretStore::new().with_secret(
            NAMESPACE,
            "ionos-secret",
            "IONOS_PUBLIC_PREFIX",
            "pub",
        ));
        let solver = IonosSolver::mock(store, &[("example.com", "Z1")]);

        let err = solver
            .present(
                &challenge("_acme-challenge.example.com.", "abc123"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DnsError::ClientInit { ref namespace, .. } if namespace == NAMESPACE));
        assert!(matches!(
            err.root(),
            DnsError::SecretKeyNotFound { key, .. } if key == "IONOS_SECRET"
        ));
    }

    #[tokio::test]
    async fn test_malformed_config_fails() {
        let solver = mock_solver();
        let request = ChallengeRequest::new("_acme-challenge.example.com.", "abc123")
            .with_namespace(NAMESPACE)
            .with_config(json!({ "publicKeySecretRef": "not-an-object" }));

        let err = solver
            .present(&request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DnsError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_cancelled_operation() {
        let solver = mock_solver();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = solver
            .present(&challenge("_acme-challenge.example.com.", "abc123"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, DnsError::Cancelled));
        assert!(solver.provider_handle().read().await.records().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_presents() {
        let solver = IonosSolver::mock(
            secrets(),
            &[("example.com", "Z1"), ("example.org", "Z2")],
        );
        let cancel = CancellationToken::new();
        let first = challenge("_acme-challenge.example.com.", "one");
        let second = challenge("_acme-challenge.example.org.", "two");

        let (a, b) = tokio::join!(
            solver.present(&first, &cancel),
            solver.present(&second, &cancel)
        );
        a.unwrap();
        b.unwrap();

        let provider = solver.provider_handle();
        let provider = provider.read().await;
        assert_eq!(provider.records().len(), 2);
        assert_eq!(
            provider.records()["_acme-challenge.example.org.Z2"].content,
            "two"
        );
    }

    #[tokio::test]
    async fn test_spawned_responder_serves_presented_record() {
        let solver = mock_solver();
        let shutdown = CancellationToken::new();
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let server = solver.spawn_responder(socket, shutdown.clone());

        solver
            .present(
                &challenge("_acme-challenge.example.com.", "abc123"),
                &shutdown,
            )
            .await
            .unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let query = query_message("_acme-challenge.example.com.", RecordType::TXT);
        client.send_to(&query.to_vec().unwrap(), addr).await.unwrap();

        let mut buf = vec![0u8; 4096];
        let (len, _) = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            client.recv_from(&mut buf),
        )
        .await
        .expect("response before timeout")
        .unwrap();
        let response = hickory_proto::op::Message::from_vec(&buf[..len]).unwrap();
        assert_eq!(txt_answer(&response.answers()[0]).as_deref(), Some("abc123"));

        shutdown.cancel();
        server.await.unwrap().unwrap();
    }

    #[test]
    fn test_secret_selectors_decode() {
        let config = load_config(Some(&solver_config())).unwrap();
        assert_eq!(
            config.public_key_secret_ref,
            SecretKeySelector {
                name: "ionos-secret".to_string(),
                key: "IONOS_PUBLIC_PREFIX".to_string(),
            }
        );
    }
}
