//! ACME DNS-01 challenge request

use serde::{Deserialize, Serialize};

/// What the caller wants done with the challenge record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeAction {
    Present,
    CleanUp,
}

/// One DNS-01 challenge instance, as handed to the solver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    #[serde(default)]
    pub uid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ChallengeAction>,

    #[serde(default, rename = "type")]
    pub challenge_type: String,

    /// Domain being validated, without the `_acme-challenge` label
    #[serde(default)]
    pub dns_name: String,

    /// Key material to publish in the TXT record
    pub key: String,

    /// Namespace used for secret lookups
    #[serde(default)]
    pub resource_namespace: String,

    /// Fully-qualified record name, e.g. `_acme-challenge.example.com.`
    #[serde(rename = "resolvedFQDN")]
    pub resolved_fqdn: String,

    /// Zone the caller believes owns the record, e.g. `example.com.`
    #[serde(default)]
    pub resolved_zone: String,

    #[serde(default)]
    pub allow_ambient_credentials: bool,

    /// Solver-specific configuration blob
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl ChallengeRequest {
    pub fn new(resolved_fqdn: impl Into<String>, key: impl Into<String>) -> Self {
        let resolved_fqdn = resolved_fqdn.into();
        let resolved_zone = resolved_fqdn
            .split_once('.')
            .map(|(_, zone)| zone.to_string())
            .unwrap_or_default();

        Self {
            uid: String::new(),
            action: None,
            challenge_type: "dns-01".to_string(),
            dns_name: String::new(),
            key: key.into(),
            resource_namespace: String::new(),
            resolved_fqdn,
            resolved_zone,
            allow_ambient_credentials: false,
            config: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.resource_namespace = namespace.into();
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Record name sent to the provider
    pub fn record_name(&self) -> &str {
        un_fqdn(&self.resolved_fqdn)
    }
}

/// Strip the trailing label separator from a fully-qualified name.
pub fn un_fqdn(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}
