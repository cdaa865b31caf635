use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed caller input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The registry root, or a directory below it, could not be read
    #[error("Failed to read service registry at {}: {source}", .path.display())]
    RegistryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A leaf's tags file exists but is not a JSON array of strings
    #[error("tags.json for {service} service definition is incorrect: {reason}")]
    RegistryFormat { service: String, reason: String },

    #[error("At least one non-loopback interface must be present to bind to")]
    NoUsableInterface,

    /// A catalog entry that the resolver grammar rejects
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Failed to get system hostname: {0}")]
    Hostname(#[source] std::io::Error),

    /// The mDNS engine could not be started
    #[error("mDNS engine error: {0}")]
    Engine(#[from] mdns_sd::Error),
}
