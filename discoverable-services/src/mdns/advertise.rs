use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;
use mdns_sd::{ServiceInfo, UnregisterStatus};
use tokio::sync::Mutex;
use shared::protocol::MAX_SERVICE_NAME_LEN;
use shared::types::{PublishEntry, ServiceDescriptor};
use crate::error::{Error, Result};
use crate::mdns::engine::{EngineFactory, MdnsEngine};
use crate::net::InterfaceProbe;
use crate::registry::RegistryCache;
use crate::resolver;

/// How long teardown waits for the engine to confirm each goodbye
const UNREGISTER_WAIT: Duration = Duration::from_secs(1);

/// A service this process is currently advertising.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationRecord {
    pub identifier: String,
    pub advertised_name: String,
    pub host: Option<String>,
    pub port: u16,
    pub descriptor: ServiceDescriptor,
    /// Full DNS-SD instance name, used to retract the advertisement
    pub fullname: String,
}

struct Session {
    engine: Arc<dyn MdnsEngine>,
    records: Vec<PublicationRecord>,
}

impl Session {
    /// Send goodbyes for every record, then shut the engine down. Failures are
    /// logged; the engine is always shut down.
    async fn retract(self) {
        for record in &self.records {
            let status = match self.engine.unregister(&record.fullname) {
                Ok(status) => status,
                Err(e) => {
                    tracing::error!("Failed to unregister {}: {}", record.fullname, e);
                    continue;
                }
            };

            match tokio::time::timeout(UNREGISTER_WAIT, status.recv_async()).await {
                Ok(Ok(UnregisterStatus::OK)) => tracing::info!("Unregistered {}", record.fullname),
                Ok(Ok(_)) => {
                    tracing::warn!("{} was not registered with the mDNS engine", record.fullname)
                }
                Ok(Err(e)) => tracing::warn!("No unregister status for {}: {}", record.fullname, e),
                Err(_) => tracing::warn!("Timed out unregistering {}", record.fullname),
            }
        }

        if let Err(e) = self.engine.shutdown() {
            tracing::error!("Failed to shut down mDNS publishing engine: {}", e);
        }
    }
}

/// Owns the process's single mDNS publishing session.
pub struct Publisher {
    engines: EngineFactory,
    interfaces: InterfaceProbe,
    session: Mutex<Option<Session>>,
}

impl Publisher {
    pub fn new(engines: EngineFactory, interfaces: InterfaceProbe) -> Self {
        Self {
            engines,
            interfaces,
            session: Mutex::new(None),
        }
    }

    /// Advertise every entry that resolves against the registry and has a port.
    ///
    /// Other entries, and entries the engine refuses, are skipped. The publishing session is created with the
    /// first advertised entry and reused until `unpublish_all`. Returns the
    /// number of entries advertised by this call.
    pub async fn publish(&self, registry: &RegistryCache, entries: &[PublishEntry]) -> Result<usize> {
        validate_entries(entries)?;

        let addresses = (self.interfaces)();
        if addresses.is_empty() {
            return Err(Error::NoUsableInterface);
        }

        let catalog = registry.get().await?;
        // Resolved before any registration
        let local = if entries.iter().any(|entry| entry.host.is_none()) {
            Some(local_host()?)
        } else {
            None
        };
        let mut session = self.session.lock().await;
        let mut published = 0;

        for entry in entries {
            let descriptor = match resolver::resolve(&entry.identifier, &catalog)? {
                Some(descriptor) if descriptor.is_usable() => descriptor,
                _ => {
                    tracing::debug!("Not publishing {}: unknown service {}", entry.name, entry.identifier);
                    continue;
                }
            };
            if !descriptor.fits_name_limit() {
                tracing::warn!(
                    "Not publishing {}: service type {} is longer than {} bytes",
                    entry.name,
                    descriptor.service_type,
                    MAX_SERVICE_NAME_LEN
                );
                continue;
            }
            let Some(port) = entry.port else {
                tracing::debug!("Not publishing {}: no port given", entry.name);
                continue;
            };

            let host = match (&entry.host, &local) {
                (Some(host), _) => advertised_host(host),
                (None, Some(local)) => local.clone(),
                (None, None) => continue,
            };
            let info = match ServiceInfo::new(
                &descriptor.query_domain(),
                &entry.name,
                &host,
                &addresses[..],
                port,
                entry.txt.clone(),
            ) {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!("Not publishing {}: {}", entry.name, e);
                    continue;
                }
            };
            let fullname = info.get_fullname().to_string();

            if session.is_none() {
                tracing::info!("Starting mDNS publishing session");
                *session = Some(Session {
                    engine: (self.engines)()?,
                    records: Vec::new(),
                });
            }
            let Some(active) = session.as_mut() else {
                continue;
            };

            if let Err(e) = active.engine.register(info) {
                tracing::warn!("Failed to register {}: {}", fullname, e);
                continue;
            }
            tracing::info!(
                "Registered {} as {} on {} port {}",
                descriptor.query_domain(),
                entry.name,
                host,
                port
            );

            active.records.push(PublicationRecord {
                identifier: entry.identifier.clone(),
                advertised_name: entry.name.clone(),
                host: entry.host.clone(),
                port,
                descriptor,
                fullname,
            });
            published += 1;
        }

        Ok(published)
    }

    /// Retract everything published and close the session. A no-op when
    /// nothing is published.
    pub async fn unpublish_all(&self) {
        let Some(session) = self.session.lock().await.take() else {
            tracing::debug!("No published services to retract");
            return;
        };

        tracing::info!("Retracting {} published services", session.records.len());
        session.retract().await;
    }

    /// Snapshot of what is currently advertised
    pub async fn records(&self) -> Vec<PublicationRecord> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.records.clone())
            .unwrap_or_default()
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        let Some(session) = self.session.get_mut().take() else {
            return;
        };

        // No runtime to wait on here; send goodbyes without confirmation
        tracing::warn!(
            "Publisher dropped with {} services still published, retracting",
            session.records.len()
        );
        for record in &session.records {
            if let Err(e) = session.engine.unregister(&record.fullname) {
                tracing::error!("Failed to unregister {}: {}", record.fullname, e);
            }
        }
        if let Err(e) = session.engine.shutdown() {
            tracing::error!("Failed to shut down mDNS publishing engine: {}", e);
        }
    }
}

fn validate_entries(entries: &[PublishEntry]) -> Result<()> {
    for entry in entries {
        if entry.identifier.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "service entries must have a non-empty identifier".to_string(),
            ));
        }
        if entry.name.trim().is_empty() {
            return Err(Error::InvalidArgument(format!(
                "service entry for {} must have a non-empty name",
                entry.identifier
            )));
        }
        if entry.host.as_deref().is_some_and(|host| host.trim_end_matches('.').is_empty()) {
            return Err(Error::InvalidArgument(format!(
                "service entry {} has an empty host",
                entry.name
            )));
        }
    }
    Ok(())
}

/// mDNS host names live under "local.", e.g. "server1" -> "server1.local."
fn advertised_host(host: &str) -> String {
    let host = host.trim_end_matches('.');
    if host.ends_with(".local") {
        format!("{}.", host)
    } else {
        format!("{}.local.", host)
    }
}

fn local_host() -> Result<String> {
    advertised_local_host(hostname::get())
}

fn advertised_local_host(lookup: std::io::Result<OsString>) -> Result<String> {
    let hostname = lookup.map_err(Error::Hostname)?;
    Ok(advertised_host(&hostname.to_string_lossy()))
}
