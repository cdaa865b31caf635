//! Registry-driven mDNS service discovery and publication.
//!
//! Services a process knows about are declared as a directory tree (see
//! [`registry::loader`]). Callers refer to them by DNS-SD identifier or by tag;
//! [`Discoverable`] resolves those against the registry before browsing for or
//! advertising them through `mdns-sd`.

pub mod config;
pub mod discoverable;
pub mod error;
pub mod mdns;
pub mod net;
pub mod registry;
pub mod resolver;

pub use discoverable::Discoverable;
pub use error::{Error, Result};
pub use shared::types::{DiscoveryResult, PublishEntry, ServiceDefinition, ServiceDescriptor};
