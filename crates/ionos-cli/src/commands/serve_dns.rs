use anyhow::Context;
use clap::Args;
use ionos_solver::{
    shared, Config, DnsProvider, DnsResponder, MemoryProvider, ProviderConfig,
};
use std::net::{IpAddr, SocketAddr};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Args)]
pub struct ServeDnsCommand {
    /// Address to bind the responder to
    #[arg(long, default_value = "0.0.0.0")]
    pub address: IpAddr,

    /// UDP port to answer on
    #[arg(long, env = "IONOS_DNS_PORT", default_value_t = 59351)]
    pub port: u16,

    /// Zone to register, as name or name=id (id defaults to the name with a trailing dot)
    #[arg(long = "zone")]
    pub zones: Vec<String>,

    /// TXT record to seed, as name=value; stored in the longest matching zone
    #[arg(long = "record")]
    pub records: Vec<String>,
}

/// Parse `name[=id]`
fn parse_zone(raw: &str) -> anyhow::Result<(String, String)> {
    let (name, id) = match raw.split_once('=') {
        Some((name, id)) => (name.trim(), id.trim().to_string()),
        None => (raw.trim(), format!("{}.", raw.trim())),
    };
    let name = name.trim_end_matches('.');
    if name.is_empty() || id.is_empty() {
        anyhow::bail!("Invalid zone '{}', expected name or name=id", raw);
    }
    Ok((name.to_string(), id))
}

/// Parse `name=value`
fn parse_record(raw: &str) -> anyhow::Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("Invalid record '{}', expected name=value", raw))?;
    let name = name.trim().trim_end_matches('.');
    if name.is_empty() {
        anyhow::bail!("Invalid record '{}', name is empty", raw);
    }
    Ok((name.to_string(), value.to_string()))
}

/// Build the in-memory provider the responder answers from
fn seed_provider(zones: &[String], records: &[String]) -> anyhow::Result<MemoryProvider> {
    let zones = zones
        .iter()
        .map(|raw| parse_zone(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut provider = zones
        .iter()
        .fold(MemoryProvider::new(), |provider, (name, id)| {
            provider.with_zone(name, id)
        });

    for raw in records {
        let (name, value) = parse_record(raw)?;
        let (_, zone_id) = zones
            .iter()
            .filter(|(zone, _)| name == *zone || name.ends_with(&format!(".{}", zone)))
            .max_by_key(|(zone, _)| zone.len())
            .with_context(|| format!("No zone registered for record {}", name))?;
        provider = provider.with_record(zone_id, &name, &value);
    }

    provider.configure(&Config::new(&ProviderConfig::default(), "", ""));
    Ok(provider)
}

impl ServeDnsCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let provider = seed_provider(&self.zones, &self.records)?;
        info!(
            "Seeded {} zone(s) and {} record(s)",
            provider.zones().count(),
            provider.records().len()
        );

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async {
            let addr = SocketAddr::new(self.address, self.port);
            let socket = DnsResponder::<MemoryProvider>::bind(addr)
                .await
                .with_context(|| format!("Failed to bind DNS responder on {}", addr))?;

            let shutdown = CancellationToken::new();
            let on_signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, initiating graceful shutdown...");
                    on_signal.cancel();
                }
            });

            DnsResponder::new(shared(provider))
                .serve(socket, shutdown)
                .await
                .context("DNS responder failed")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zone() {
        assert_eq!(
            parse_zone("example.com=Z1").unwrap(),
            ("example.com".to_string(), "Z1".to_string())
        );
        assert_eq!(
            parse_zone("example.com").unwrap(),
            ("example.com".to_string(), "example.com.".to_string())
        );
        assert!(parse_zone("=Z1").is_err());
    }

    #[test]
    fn test_parse_record() {
        assert_eq!(
            parse_record("_acme-challenge.example.com.=abc=123").unwrap(),
            ("_acme-challenge.example.com".to_string(), "abc=123".to_string())
        );
        assert!(parse_record("no-value").is_err());
    }

    #[tokio::test]
    async fn test_seed_provider_uses_longest_zone() {
        let provider = seed_provider(
            &["example.com=Z1".to_string(), "b.example.com=Z2".to_string()],
            &["_acme-challenge.a.b.example.com=v".to_string()],
        )
        .unwrap();

        assert!(provider.is_configured());
        assert!(provider
            .records()
            .contains_key("_acme-challenge.a.b.example.com.Z2"));
        assert_eq!(
            provider
                .get_record_value("", "_acme-challenge.a.b.example.com")
                .await
                .unwrap(),
            "v"
        );
    }

    #[test]
    fn test_seed_provider_requires_zone() {
        let err = seed_provider(&[], &["a.example.com=v".to_string()]).unwrap_err();
        assert!(err.to_string().contains("No zone registered"));
    }
}
