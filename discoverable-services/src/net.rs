use std::net::IpAddr;
use std::sync::Arc;

/// Returns the host's non-loopback interface addresses. An empty result means
/// there is nothing for mDNS to bind to.
pub type InterfaceProbe = Arc<dyn Fn() -> Vec<IpAddr> + Send + Sync>;

pub fn system_interfaces() -> InterfaceProbe {
    Arc::new(non_loopback_addresses)
}

pub fn non_loopback_addresses() -> Vec<IpAddr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => {
            let mut addresses: Vec<IpAddr> = interfaces
                .into_iter()
                .filter(|iface| !iface.is_loopback())
                .map(|iface| iface.ip())
                .collect();
            addresses.sort();
            addresses.dedup();
            addresses
        }
        Err(e) => {
            tracing::warn!("Failed to enumerate network interfaces: {}", e);
            Vec::new()
        }
    }
}
