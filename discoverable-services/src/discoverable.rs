use std::path::{Path, PathBuf};
use std::time::Duration;
use shared::protocol::DEFAULT_FIND_TIMEOUT_MS;
use shared::types::{DiscoveryResult, PublishEntry, ServiceDefinition};
use crate::config::DEFAULT_REGISTRY_PATH;
use crate::error::{Error, Result};
use crate::mdns::advertise::{PublicationRecord, Publisher};
use crate::mdns::browser::Discovery;
use crate::mdns::engine::{EngineFactory, MdnsSdEngine};
use crate::net::{self, InterfaceProbe};
use crate::registry::RegistryCache;

/// Entry point for registry-backed discovery and publication.
///
/// Owns the registry cache and the publishing session; a process normally
/// holds one of these for its lifetime and calls `unpublish_services` before
/// exiting.
pub struct Discoverable {
    registry: RegistryCache,
    discovery: Discovery,
    publisher: Publisher,
}

impl Discoverable {
    /// Use the system mDNS daemon and network interfaces
    pub fn new(registry_path: impl Into<PathBuf>) -> Self {
        Self::with_engine(registry_path, MdnsSdEngine::factory(), net::system_interfaces())
    }

    pub fn with_engine(
        registry_path: impl Into<PathBuf>,
        engines: EngineFactory,
        interfaces: InterfaceProbe,
    ) -> Self {
        Self {
            registry: RegistryCache::new(registry_path),
            discovery: Discovery::new(engines.clone(), interfaces.clone()),
            publisher: Publisher::new(engines, interfaces),
        }
    }

    /// Point at a different registry. The next lookup rescans.
    pub fn set_registry_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidArgument(
                "path parameter must be a non-empty path".to_string(),
            ));
        }

        tracing::info!("Service registry path set to {}", path.display());
        self.registry.invalidate(Some(path));
        Ok(())
    }

    pub fn registry_path(&self) -> PathBuf {
        self.registry.root()
    }

    /// Every service definition in the registry, with its tags
    pub async fn enumerate_services(&self) -> Result<Vec<ServiceDefinition>> {
        let catalog = self.registry.get().await?;
        Ok(catalog.definitions().to_vec())
    }

    /// Browse for services by identifier or tag for `timeout` (2s by default).
    ///
    /// Identifiers missing from the registry are ignored.
    pub async fn find_services<S: AsRef<str>>(
        &self,
        identifiers: &[S],
        timeout: Option<Duration>,
    ) -> Result<Vec<DiscoveryResult>> {
        let timeout = timeout.unwrap_or(Duration::from_millis(DEFAULT_FIND_TIMEOUT_MS));
        self.discovery.discover(&self.registry, identifiers, timeout).await
    }

    /// Advertise services. Entries that do not resolve or lack a port are
    /// skipped; returns how many were advertised.
    pub async fn publish_services(&self, entries: &[PublishEntry]) -> Result<usize> {
        self.publisher.publish(&self.registry, entries).await
    }

    /// Retract everything published by this instance
    pub async fn unpublish_services(&self) {
        self.publisher.unpublish_all().await
    }

    pub async fn published(&self) -> Vec<PublicationRecord> {
        self.publisher.records().await
    }
}

impl Default for Discoverable {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_PATH)
    }
}
