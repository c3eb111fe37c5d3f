//! IONOS DNS provider implementation
//!
//! This provider uses the IONOS Hosting DNS API. Requests authenticate with an
//! API key composed of the public prefix and the secret, sent in the
//! `X-API-Key` header.
//!
//! Create keys at: https://developer.hosting.ionos.com/keys

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use tracing::{debug, error};

use super::traits::DnsProvider;
use super::types::{RecordCreateRequest, RecordResponse, Record, Zone, TXT_RECORD_TYPE};
use crate::config::Config;
use crate::errors::DnsError;

const API_KEY_HEADER: &str = "X-API-Key";

/// HTTP client for the IONOS DNS API
pub struct IonosClient {
    client: Client,
    config: Option<Config>,
}

impl IonosClient {
    /// Create an unconfigured client
    pub fn new() -> Result<Self, DnsError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self::with_http_client(client))
    }

    /// Create a client around an existing HTTP client
    pub fn with_http_client(client: Client) -> Self {
        Self {
            client,
            config: None,
        }
    }

    fn config(&self) -> Result<&Config, DnsError> {
        self.config.as_ref().ok_or(DnsError::MissingConfig)
    }

    /// Make an authenticated request and return the raw response body
    async fn call_dns_api(
        &self,
        method: Method,
        url: &str,
        body: Option<&impl Serialize>,
    ) -> Result<String, DnsError> {
        let config = self.config()?;

        debug!("IONOS API request: {} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(API_KEY_HEADER, &config.api_key);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(response.text().await?);
        }

        let err = DnsError::Api {
            method: method.to_string(),
            url: url.to_string(),
            status: status.to_string(),
        };
        error!("{}", err);
        Err(err)
    }

    /// TXT records named `record_name` within a zone
    async fn find_txt_records(
        &self,
        zone_id: &str,
        record_name: &str,
    ) -> Result<Vec<Record>, DnsError> {
        let url = format!(
            "{}/zones/{}?recordName={}&recordType={}",
            self.config()?.api_url,
            zone_id,
            urlencoding::encode(record_name),
            TXT_RECORD_TYPE
        );

        let body = self.call_dns_api(Method::GET, &url, None::<&()>).await?;
        let response: RecordResponse = serde_json::from_str(&body)?;
        Ok(response.records)
    }
}

#[async_trait]
impl DnsProvider for IonosClient {
    fn configure(&mut self, config: &Config) {
        self.config = Some(config.clone());
    }

    async fn find_zone_id(&self, zone_name: &str) -> Result<String, DnsError> {
        let url = format!("{}/zones", self.config()?.api_url);

        let body = self.call_dns_api(Method::GET, &url, None::<&()>).await?;
        let zones: Vec<Zone> = serde_json::from_str(&body)?;

        zones
            .into_iter()
            .find(|zone| zone.name == zone_name)
            .map(|zone| zone.id)
            .ok_or_else(|| DnsError::ZoneNotFound(zone_name.to_string()))
    }

    async fn find_record_id(
        &self,
        zone_id: &str,
        record_name: &str,
    ) -> Result<String, DnsError> {
        self.find_txt_records(zone_id, record_name)
            .await?
            .into_iter()
            .next()
            .map(|record| record.id)
            .ok_or_else(|| DnsError::RecordNotFound(record_name.to_string()))
    }

    async fn get_record_value(
        &self,
        zone_id: &str,
        record_name_or_id: &str,
    ) -> Result<String, DnsError> {
        if zone_id.is_empty() {
            return Err(DnsError::RecordNotFound(record_name_or_id.to_string()));
        }

        self.find_txt_records(zone_id, record_name_or_id)
            .await?
            .into_iter()
            .next()
            .map(|record| record.content)
            .ok_or_else(|| DnsError::RecordNotFound(record_name_or_id.to_string()))
    }

    async fn create_records(
        &mut self,
        zone_id: &str,
        records: &RecordCreateRequest,
    ) -> Result<(), DnsError> {
        let url = format!("{}/zones/{}/records", self.config()?.api_url, zone_id);

        debug!(
            "Creating {} record(s) in zone {}: {}",
            records.len(),
            zone_id,
            serde_json::to_string(records)?
        );

        self.call_dns_api(Method::POST, &url, Some(records)).await?;
        Ok(())
    }

    async fn delete_record(&mut self, zone_id: &str, record_id: &str) -> Result<(), DnsError> {
        let url = format!(
            "{}/zones/{}/records/{}",
            self.config()?.api_url,
            zone_id,
            record_id
        );

        self.call_dns_api(Method::DELETE, &url, None::<&()>).await?;
        Ok(())
    }
}
