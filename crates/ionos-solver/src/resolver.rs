//! Zone resolution
//!
//! Finds the provider zone that should hold a challenge record when the
//! issuer does not name one. Zones can sit at any depth, so candidates are
//! probed from the most specific ancestor of the record name down to the
//! two-label name; the first zone the provider knows wins. The record's own
//! leaf label is never a candidate.

use tracing::{debug, info};

use crate::errors::DnsError;
use crate::providers::DnsProvider;

/// Candidate zone names for `fqdn`, most specific first.
///
/// The terminal empty label and the leaf label are skipped, and the last
/// candidate has two labels. Names with fewer than three labels yield none.
pub fn candidate_zones(fqdn: &str) -> Vec<String> {
    let mut labels: Vec<&str> = fqdn.split('.').collect();
    if labels.last() == Some(&"") {
        labels.pop();
    }

    if labels.len() < 3 {
        return Vec::new();
    }

    (1..=labels.len() - 2)
        .map(|start| labels[start..].join("."))
        .collect()
}

/// Name of the most specific provider zone enclosing `fqdn`.
///
/// Each probe is an independent lookup; a failed probe only moves on to the
/// next candidate.
pub async fn find_zone_name<P>(provider: &P, fqdn: &str) -> Result<String, DnsError>
where
    P: DnsProvider + ?Sized,
{
    for candidate in candidate_zones(fqdn) {
        match provider.find_zone_id(&candidate).await {
            Ok(zone_id) if !zone_id.is_empty() => {
                info!("Found zone {} (id {}) for {}", candidate, zone_id, fqdn);
                return Ok(candidate);
            }
            Ok(_) => debug!("Zone probe for {} returned an empty id", candidate),
            Err(e) => debug!("Zone probe for {} failed: {}", candidate, e),
        }
    }

    Err(DnsError::ZoneNotFound(fqdn.to_string()))
}
