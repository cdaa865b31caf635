/// mDNS domain appended to every browsed or published service type
pub const MDNS_DOMAIN: &str = "local.";

/// DNS-SD label separating a subtype from its parent service type
pub const SUBTYPE_LABEL: &str = "_sub";

/// Optional per-leaf registry file holding a JSON array of tag aliases
pub const TAGS_FILE: &str = "tags.json";

/// Browse window used when a caller does not supply one
pub const DEFAULT_FIND_TIMEOUT_MS: u64 = 2000;

/// Longest service type label the mDNS engine will advertise, leading
/// underscore excluded
pub const MAX_SERVICE_NAME_LEN: u8 = 30;
