use shared::protocol::SUBTYPE_LABEL;
use shared::types::{ServiceDefinition, ServiceDescriptor};
use crate::error::{Error, Result};
use crate::registry::Catalog;

/// Resolve a service identifier or tag against the catalog.
///
/// An exact identifier match wins over tags; among tags the first definition in
/// catalog order wins. Returns `Ok(None)` when nothing matches. A matching
/// definition whose identifier cannot be parsed is an `Error::Internal`.
pub fn resolve(identifier_or_tag: &str, catalog: &Catalog) -> Result<Option<ServiceDescriptor>> {
    match find_definition(identifier_or_tag, catalog) {
        Some(definition) => parse_identifier(&definition.identifier).map(Some),
        None => Ok(None),
    }
}

pub fn find_definition<'a>(identifier_or_tag: &str, catalog: &'a Catalog) -> Option<&'a ServiceDefinition> {
    let definitions = catalog.definitions();
    definitions
        .iter()
        .find(|d| d.identifier == identifier_or_tag)
        .or_else(|| {
            definitions
                .iter()
                .find(|d| d.tags.iter().any(|tag| tag == identifier_or_tag))
        })
}

/// Parse `("_" subtype "._sub.")? "_" type "._" protocol`.
///
/// Both the subtype and the type take as much as they can, so the last
/// `._sub.` and the last `._` are the separators. An empty type or protocol
/// still parses; the resulting descriptor is inert.
pub fn parse_identifier(identifier: &str) -> Result<ServiceDescriptor> {
    let invalid = || {
        Error::Internal(format!(
            "catalog identifier {:?} does not match the DNS-SD service grammar",
            identifier
        ))
    };

    let subtype_separator = format!(".{}.", SUBTYPE_LABEL);
    let (subtypes, rest) = match identifier.rsplit_once(subtype_separator.as_str()) {
        Some((subtype, rest)) => {
            let subtype = subtype.strip_prefix('_').filter(|s| !s.is_empty()).ok_or_else(invalid)?;
            (vec![subtype.to_string()], rest)
        }
        None => (Vec::new(), identifier),
    };

    let (service_type, protocol) = rest
        .strip_prefix('_')
        .and_then(|rest| rest.rsplit_once("._"))
        .ok_or_else(invalid)?;

    Ok(ServiceDescriptor {
        service_type: service_type.to_string(),
        protocol: protocol.to_string(),
        subtypes,
    })
}
