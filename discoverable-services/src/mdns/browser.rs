use std::time::Duration;
use futures::future::join_all;
use mdns_sd::{ServiceEvent, ServiceInfo};
use shared::types::{DiscoveryResult, ServiceDescriptor};
use crate::error::{Error, Result};
use crate::mdns::engine::{EngineFactory, MdnsEngine};
use crate::net::InterfaceProbe;
use crate::registry::{Catalog, RegistryCache};
use crate::resolver;

/// One network browse and every caller identifier that resolved to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowsePlan {
    pub descriptor: ServiceDescriptor,
    pub identifiers: Vec<String>,
}

/// Resolve the requested identifiers into one browse per distinct descriptor.
///
/// Unknown identifiers and inert descriptors are dropped. Plans keep the order
/// in which their descriptor was first requested.
pub fn plan_browses<S: AsRef<str>>(identifiers: &[S], catalog: &Catalog) -> Result<Vec<BrowsePlan>> {
    let mut plans: Vec<BrowsePlan> = Vec::new();

    for identifier in identifiers {
        let identifier = identifier.as_ref();
        let descriptor = match resolver::resolve(identifier, catalog)? {
            Some(descriptor) if descriptor.is_usable() => descriptor,
            Some(_) => {
                tracing::debug!("Skipping {}: resolved without a type or protocol", identifier);
                continue;
            }
            None => {
                tracing::debug!("Skipping {}: not in the service registry", identifier);
                continue;
            }
        };

        match plans.iter_mut().find(|plan| plan.descriptor == descriptor) {
            Some(plan) => {
                if !plan.identifiers.iter().any(|existing| existing == identifier) {
                    plan.identifiers.push(identifier.to_string());
                }
            }
            None => plans.push(BrowsePlan {
                descriptor,
                identifiers: vec![identifier.to_string()],
            }),
        }
    }

    Ok(plans)
}

/// Runs bounded, concurrent browses for registry services.
pub struct Discovery {
    engines: EngineFactory,
    interfaces: InterfaceProbe,
}

impl Discovery {
    pub fn new(engines: EngineFactory, interfaces: InterfaceProbe) -> Self {
        Self { engines, interfaces }
    }

    /// Browse for every resolvable identifier and return what was found.
    ///
    /// Each browse runs for `timeout` measured from its own start. The engine
    /// created for this call is shut down before returning, on every path.
    pub async fn discover<S: AsRef<str>>(
        &self,
        registry: &RegistryCache,
        identifiers: &[S],
        timeout: Duration,
    ) -> Result<Vec<DiscoveryResult>> {
        if timeout.is_zero() {
            return Err(Error::InvalidArgument(
                "timeout must be a positive duration".to_string(),
            ));
        }

        if (self.interfaces)().is_empty() {
            return Err(Error::NoUsableInterface);
        }

        let catalog = registry.get().await?;
        let plans = plan_browses(identifiers, &catalog)?;
        if plans.is_empty() {
            tracing::debug!("Nothing to browse for");
            return Ok(Vec::new());
        }

        let engine = (self.engines)()?;
        let found = run_browses(engine.as_ref(), &plans, timeout).await;

        if let Err(e) = engine.shutdown() {
            tracing::warn!("Failed to shut down mDNS browse engine: {}", e);
        }

        tracing::info!("Found {} service instances across {} browses", found.len(), plans.len());
        Ok(found)
    }
}

async fn run_browses(engine: &dyn MdnsEngine, plans: &[BrowsePlan], timeout: Duration) -> Vec<DiscoveryResult> {
    let browses = plans.iter().map(|plan| browse(engine, plan, timeout));
    join_all(browses).await.into_iter().flatten().collect()
}

/// Collect resolved instances for one descriptor until `timeout` elapses.
///
/// A browse the engine refuses to start contributes nothing.
async fn browse(engine: &dyn MdnsEngine, plan: &BrowsePlan, timeout: Duration) -> Vec<DiscoveryResult> {
    let domain = plan.descriptor.query_domain();
    let receiver = match engine.browse(&domain) {
        Ok(receiver) => receiver,
        Err(e) => {
            tracing::warn!("Failed to browse {} for {:?}: {}", domain, plan.identifiers, e);
            return Vec::new();
        }
    };
    tracing::debug!("Browsing {} for {:?}", domain, plan.identifiers);

    let mut instances: Vec<ServiceInfo> = Vec::new();
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,

            event = receiver.recv_async() => {
                match event {
                    Ok(ServiceEvent::ServiceResolved(info)) => {
                        tracing::debug!("Resolved {} on {}", info.get_fullname(), info.get_hostname());
                        // Re-resolutions replace the earlier sighting in place
                        match instances.iter_mut().find(|i| i.get_fullname() == info.get_fullname()) {
                            Some(existing) => *existing = info,
                            None => instances.push(info),
                        }
                    }
                    Ok(ServiceEvent::ServiceRemoved(_ty, fullname)) => {
                        tracing::debug!("Service removed: {}", fullname);
                        instances.retain(|i| i.get_fullname() != fullname);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("Browse for {} ended early: {}", domain, e);
                        break;
                    }
                }
            }
        }
    }

    if let Err(e) = engine.stop_browse(&domain) {
        tracing::warn!("Failed to stop browsing {}: {}", domain, e);
    }

    plan.identifiers
        .iter()
        .flat_map(|identifier| {
            instances
                .iter()
                .map(move |info| convert_service_info(identifier, &plan.descriptor, info))
        })
        .collect()
}

/// Convert an mdns-sd ServiceInfo to a DiscoveryResult tagged with the caller's identifier
fn convert_service_info(identifier: &str, descriptor: &ServiceDescriptor, info: &ServiceInfo) -> DiscoveryResult {
    let fullname = info.get_fullname();
    let name = fullname
        .strip_suffix(info.get_type())
        .and_then(|name| name.strip_suffix('.'))
        .unwrap_or(fullname);

    let mut addresses: Vec<_> = info.get_addresses().iter().copied().collect();
    addresses.sort();

    let txt = info
        .get_properties()
        .iter()
        .map(|prop| (prop.key().to_string(), prop.val_str().to_string()))
        .collect();

    DiscoveryResult {
        service: identifier.to_string(),
        name: name.to_string(),
        fullname: fullname.to_string(),
        host: info.get_hostname().to_string(),
        port: info.get_port(),
        addresses,
        service_type: descriptor.service_type.clone(),
        protocol: descriptor.protocol.clone(),
        subtypes: descriptor.subtypes.clone(),
        txt,
    }
}
