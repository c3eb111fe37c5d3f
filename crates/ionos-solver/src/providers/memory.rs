//! In-memory DNS provider
//!
//! Deterministic stand-in for the live API. Zones are registered up front
//! and looked up by exact name. A record's id is its name joined to the zone
//! id (`recordName + "." + zoneId`), so creating the same name twice in a
//! zone replaces the earlier record. Record names are stored lowercased and
//! must lie inside their zone.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::traits::DnsProvider;
use super::types::{Record, RecordCreateRequest, Zone, TXT_RECORD_TYPE};
use crate::config::Config;
use crate::errors::DnsError;

/// Zone type reported for registered zones
const ZONE_TYPE: &str = "NATIVE";

#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    config: Option<Config>,
    zones: BTreeMap<String, Zone>,
    records: BTreeMap<String, Record>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone with a fixed id
    pub fn with_zone(mut self, name: &str, id: &str) -> Self {
        self.zones.insert(
            name.to_string(),
            Zone {
                id: id.to_string(),
                name: name.to_string(),
                zone_type: ZONE_TYPE.to_string(),
            },
        );
        self
    }

    /// Seed a TXT record in a registered zone.
    ///
    /// Records for unknown zones or outside their zone are skipped.
    pub fn with_record(mut self, zone_id: &str, name: &str, content: &str) -> Self {
        let Some(root_name) = self.zone_name(zone_id) else {
            warn!("Not seeding {}: zone {} is not registered", name, zone_id);
            return self;
        };
        if !Self::in_zone(name, &root_name) {
            warn!("Not seeding {}: outside zone {}", name, root_name);
            return self;
        }

        let record = Self::new_record(zone_id, &root_name, name, content, 0);
        self.records.insert(record.id.clone(), record);
        self
    }

    /// Id under which a record name is stored in a zone
    pub fn record_key(record_name: &str, zone_id: &str) -> String {
        format!("{}.{}", record_name.to_ascii_lowercase(), zone_id)
    }

    /// Whether `name` is the zone apex or a name below it
    fn in_zone(name: &str, zone_name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let zone_name = zone_name.to_ascii_lowercase();
        name == zone_name || name.ends_with(&format!(".{}", zone_name))
    }

    /// Snapshot of all stored records, keyed by id
    pub fn records(&self) -> &BTreeMap<String, Record> {
        &self.records
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    fn ensure_configured(&self) -> Result<(), DnsError> {
        if self.config.is_none() {
            return Err(DnsError::MissingConfig);
        }
        Ok(())
    }

    fn zone_name(&self, zone_id: &str) -> Option<String> {
        self.zones
            .values()
            .find(|zone| zone.id == zone_id)
            .map(|zone| zone.name.clone())
    }

    fn new_record(zone_id: &str, root_name: &str, name: &str, content: &str, ttl: u32) -> Record {
        Record {
            name: name.to_ascii_lowercase(),
            root_name: root_name.to_string(),
            record_type: TXT_RECORD_TYPE.to_string(),
            content: content.to_string(),
            change_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            ttl,
            disabled: false,
            id: Self::record_key(name, zone_id),
        }
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    fn configure(&mut self, config: &Config) {
        self.config = Some(config.clone());
    }

    async fn find_zone_id(&self, zone_name: &str) -> Result<String, DnsError> {
        self.ensure_configured()?;

        self.zones
            .get(zone_name)
            .map(|zone| zone.id.clone())
            .ok_or_else(|| DnsError::ZoneNotFound(zone_name.to_string()))
    }

    async fn find_record_id(
        &self,
        zone_id: &str,
        record_name: &str,
    ) -> Result<String, DnsError> {
        self.ensure_configured()?;

        let key = Self::record_key(record_name, zone_id);
        match self.records.get(&key) {
            Some(record) if record.record_type == TXT_RECORD_TYPE => Ok(key),
            _ => Err(DnsError::RecordNotFound(record_name.to_string())),
        }
    }

    async fn get_record_value(
        &self,
        zone_id: &str,
        record_name_or_id: &str,
    ) -> Result<String, DnsError> {
        self.ensure_configured()?;

        let found = if zone_id.is_empty() {
            self.records.get(record_name_or_id).or_else(|| {
                self.records
                    .values()
                    .find(|record| record.name.eq_ignore_ascii_case(record_name_or_id))
            })
        } else {
            self.records
                .get(record_name_or_id)
                .filter(|record| record.id.ends_with(&format!(".{}", zone_id)))
                .or_else(|| {
                    self.records
                        .get(&Self::record_key(record_name_or_id, zone_id))
                })
        };

        found
            .map(|record| record.content.clone())
            .ok_or_else(|| DnsError::RecordNotFound(record_name_or_id.to_string()))
    }

    async fn create_records(
        &mut self,
        zone_id: &str,
        records: &RecordCreateRequest,
    ) -> Result<(), DnsError> {
        self.ensure_configured()?;

        let root_name = self
            .zone_name(zone_id)
            .ok_or_else(|| DnsError::ZoneNotFound(zone_id.to_string()))?;

        // Reject the whole batch before writing any of it
        if let Some(outside) = records
            .records()
            .iter()
            .find(|entry| !Self::in_zone(&entry.name, &root_name))
        {
            return Err(DnsError::InvalidRecord {
                record: outside.name.clone(),
                zone: root_name,
            });
        }

        for entry in records.records() {
            let mut record =
                Self::new_record(zone_id, &root_name, &entry.name, &entry.content, entry.ttl);
            record.record_type = entry.record_type.clone();
            record.disabled = entry.disabled;

            debug!("Storing record {} in zone {}", record.id, zone_id);
            self.records.insert(record.id.clone(), record);
        }

        Ok(())
    }

    async fn delete_record(&mut self, zone_id: &str, record_id: &str) -> Result<(), DnsError> {
        self.ensure_configured()?;

        match self.records.remove(record_id) {
            Some(_) => {
                debug!("Removed record {} from zone {}", record_id, zone_id);
                Ok(())
            }
            None => Err(DnsError::RecordNotFound(record_id.to_string())),
        }
    }
}
