//! Secret store access
//!
//! API key halves live in namespaced secrets. The store is an external
//! collaborator; this module defines the lookup contract and two backends:
//! an in-memory map and a directory of mounted secret volumes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::SecretKeySelector;
use crate::errors::DnsError;

/// Namespaced key lookup returning raw secret bytes
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(
        &self,
        namespace: &str,
        selector: &SecretKeySelector,
    ) -> Result<Vec<u8>, DnsError>;
}

/// Read a secret value as UTF-8, trimming the trailing newline editors leave behind.
pub async fn read_secret_string(
    store: &dyn SecretStore,
    namespace: &str,
    selector: &SecretKeySelector,
) -> Result<String, DnsError> {
    let data = store.get_secret(namespace, selector).await?;
    let value = String::from_utf8(data).map_err(|_| {
        DnsError::InvalidSecret(format!(
            "key \"{}\" in secret '{}/{}' is not valid UTF-8",
            selector.key, namespace, selector.name
        ))
    })?;
    Ok(value.trim_end_matches(['\r', '\n']).to_string())
}

/// In-memory secret store
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    secrets: HashMap<(String, String), HashMap<String, Vec<u8>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(
        mut self,
        namespace: &str,
        name: &str,
        key: &str,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        self.secrets
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret(
        &self,
        namespace: &str,
        selector: &SecretKeySelector,
    ) -> Result<Vec<u8>, DnsError> {
        let data = self
            .secrets
            .get(&(namespace.to_string(), selector.name.clone()))
            .ok_or_else(|| DnsError::SecretNotFound {
                namespace: namespace.to_string(),
                name: selector.name.clone(),
            })?;

        data.get(&selector.key)
            .cloned()
            .ok_or_else(|| DnsError::SecretKeyNotFound {
                namespace: namespace.to_string(),
                name: selector.name.clone(),
                key: selector.key.clone(),
            })
    }
}

/// Secrets mounted on disk as `<root>/<namespace>/<name>/<key>`
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    root: PathBuf,
}

impl FileSecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_safe_segment(segment: &str) -> bool {
        !segment.is_empty() && segment != "." && segment != ".." && !segment.contains('/')
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get_secret(
        &self,
        namespace: &str,
        selector: &SecretKeySelector,
    ) -> Result<Vec<u8>, DnsError> {
        let not_found = || DnsError::SecretNotFound {
            namespace: namespace.to_string(),
            name: selector.name.clone(),
        };

        if !Self::is_safe_segment(namespace) || !Self::is_safe_segment(&selector.name) {
            return Err(not_found());
        }

        let secret_dir = self.root.join(namespace).join(&selector.name);
        if !tokio::fs::metadata(&secret_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(not_found());
        }

        let key_not_found = || DnsError::SecretKeyNotFound {
            namespace: namespace.to_string(),
            name: selector.name.clone(),
            key: selector.key.clone(),
        };

        if !Self::is_safe_segment(&selector.key) {
            return Err(key_not_found());
        }

        let path = secret_dir.join(&selector.key);
        debug!("Reading secret key from {}", path.display());

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(key_not_found()),
            Err(e) => Err(DnsError::Io(e)),
        }
    }
}
