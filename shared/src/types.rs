use std::collections::HashMap;
use std::net::IpAddr;
use serde::{Serialize, Deserialize};
use crate::protocol::{MAX_SERVICE_NAME_LEN, MDNS_DOMAIN, SUBTYPE_LABEL};

/// Canonical DNS-SD form of a registry entry, e.g. type "ssh", protocol "tcp",
/// subtypes ["resin-device"] for "_resin-device._sub._ssh._tcp".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(rename = "type")]
    pub service_type: String,

    pub protocol: String,

    /// Outermost first
    #[serde(default)]
    pub subtypes: Vec<String>,
}

impl ServiceDescriptor {
    /// A descriptor without both a type and a protocol is never handed to the mDNS engine.
    pub fn is_usable(&self) -> bool {
        !self.service_type.is_empty() && !self.protocol.is_empty()
    }

    /// Whether the type label is short enough for the mDNS engine to advertise
    pub fn fits_name_limit(&self) -> bool {
        self.service_type.len() <= MAX_SERVICE_NAME_LEN as usize
    }

    /// Base service domain, e.g. "_ssh._tcp.local."
    pub fn service_domain(&self) -> String {
        format!("_{}._{}.{}", self.service_type, self.protocol, MDNS_DOMAIN)
    }

    /// Domain used for browsing and registration. Scoped to the outermost
    /// subtype when there is one, e.g. "_resin-device._sub._ssh._tcp.local."
    pub fn query_domain(&self) -> String {
        match self.subtypes.first() {
            Some(subtype) => format!("_{}.{}.{}", subtype, SUBTYPE_LABEL, self.service_domain()),
            None => self.service_domain(),
        }
    }
}

/// A registry entry: one leaf directory of the registry tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// e.g. "_resin-device._sub._ssh._tcp" or "_http._tcp"
    #[serde(rename = "service")]
    pub identifier: String,

    /// Aliases a caller may use in place of the identifier
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A service instance found on the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// The identifier or tag the caller asked for
    pub service: String,

    /// Advertised instance name, e.g. "dev1"
    pub name: String,

    /// Full DNS-SD instance name, e.g. "dev1._ssh._tcp.local."
    pub fullname: String,

    /// Hostname, e.g. "dev1.local."
    pub host: String,

    pub port: u16,

    pub addresses: Vec<IpAddr>,

    #[serde(rename = "type")]
    pub service_type: String,

    pub protocol: String,

    pub subtypes: Vec<String>,

    /// TXT record key-value pairs
    pub txt: HashMap<String, String>,
}

/// A request to advertise a local service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishEntry {
    /// Service identifier or one of its tags
    pub identifier: String,

    /// Instance name to advertise as
    pub name: String,

    /// Overrides the local hostname, useful when proxying for another host
    #[serde(default)]
    pub host: Option<String>,

    /// Entries without a port are skipped
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub txt: HashMap<String, String>,
}
