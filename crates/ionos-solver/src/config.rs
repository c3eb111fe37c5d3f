//! Solver configuration
//!
//! Each challenge carries a JSON configuration blob (the issuer's webhook
//! `config` field). It names the secrets holding the API key halves and may
//! override the zone and the API base URL. [`Config`] is the resolved form
//! bound into a provider for the duration of one operation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::DnsError;

/// Base URL of the IONOS DNS API used when the config does not set one
pub const DEFAULT_API_URL: &str = "https://api.hosting.ionos.com/dns/v1";

/// Separator between the public prefix and the secret part of an API key
pub const API_KEY_SEPARATOR: &str = ".";

/// Reference to one key inside a named secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeySelector {
    /// Secret name
    #[serde(default)]
    pub name: String,
    /// Key within the secret's data
    #[serde(default)]
    pub key: String,
}

/// Provider configuration as written on the issuer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub public_key_secret_ref: SecretKeySelector,

    #[serde(default)]
    pub secret_key_secret_ref: SecretKeySelector,

    /// Zone that receives the record; searched for when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

/// Decode the solver configuration attached to a challenge.
///
/// A challenge without configuration yields the defaults.
pub fn load_config(raw: Option<&serde_json::Value>) -> Result<ProviderConfig, DnsError> {
    match raw {
        None | Some(serde_json::Value::Null) => Ok(ProviderConfig::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| DnsError::InvalidConfig(e.to_string())),
    }
}

/// Resolved credentials and target for one operation
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub zone_name: Option<String>,
    pub api_url: String,
}

impl Config {
    /// Build the per-operation config from the decoded blob and the two key halves.
    pub fn new(provider_config: &ProviderConfig, public_key: &str, secret_key: &str) -> Self {
        let zone_name = provider_config
            .zone_name
            .as_deref()
            .map(str::trim)
            .filter(|zone| !zone.is_empty())
            .map(str::to_string);

        let api_url = provider_config
            .api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();

        Self {
            api_key: Self::compose_api_key(public_key, secret_key),
            zone_name,
            api_url,
        }
    }

    pub fn compose_api_key(public_key: &str, secret_key: &str) -> String {
        format!("{}{}{}", public_key, API_KEY_SEPARATOR, secret_key)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("zone_name", &self.zone_name)
            .field("api_url", &self.api_url)
            .finish()
    }
}
