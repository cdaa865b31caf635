use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use shared::protocol::{SUBTYPE_LABEL, TAGS_FILE};
use shared::types::ServiceDefinition;
use crate::error::{Error, Result};

/// An immutable snapshot of the service registry, in scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    definitions: Vec<ServiceDefinition>,
}

impl Catalog {
    pub fn new(definitions: Vec<ServiceDefinition>) -> Self {
        Self { definitions }
    }

    pub fn definitions(&self) -> &[ServiceDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// A leaf directory: its path on disk and its segments relative to the root.
struct Leaf {
    path: PathBuf,
    components: Vec<String>,
}

/// Scan the registry tree rooted at `root`.
///
/// Leaf directories two levels deep describe `type/protocol`, three levels
/// deep `subtype/type/protocol`. Leaves at any other depth are ignored.
/// Siblings are visited in name order so the catalog is stable for a given
/// tree. This does blocking I/O; async callers go through the registry cache.
pub fn load(root: &Path) -> Result<Catalog> {
    let mut leaves = Vec::new();
    scan_directory(root, &mut Vec::new(), &mut leaves)?;

    let mut definitions = Vec::with_capacity(leaves.len());
    for leaf in leaves {
        let Some(identifier) = identifier_for(&leaf.components) else {
            tracing::debug!(
                "Ignoring registry leaf {} at depth {}",
                leaf.path.display(),
                leaf.components.len()
            );
            continue;
        };

        let tags = read_tags(&leaf.path.join(TAGS_FILE), &identifier)?;
        definitions.push(ServiceDefinition { identifier, tags });
    }

    tracing::debug!("Loaded {} service definitions from {}", definitions.len(), root.display());
    Ok(Catalog { definitions })
}

fn scan_directory(dir: &Path, components: &mut Vec<String>, leaves: &mut Vec<Leaf>) -> Result<()> {
    let io_error = |source| Error::RegistryIo {
        path: dir.to_path_buf(),
        source,
    };

    let mut subdirectories: Vec<OsString> = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let path = entry.path();

        // Follows symlinks, so a linked directory counts as a directory
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => subdirectories.push(entry.file_name()),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Skipping dangling registry entry {}", path.display());
            }
            Err(source) => return Err(Error::RegistryIo { path, source }),
        }
    }

    if subdirectories.is_empty() {
        leaves.push(Leaf {
            path: dir.to_path_buf(),
            components: components.clone(),
        });
        return Ok(());
    }

    subdirectories.sort();
    for name in subdirectories {
        components.push(name.to_string_lossy().into_owned());
        scan_directory(&dir.join(&name), components, leaves)?;
        components.pop();
    }

    Ok(())
}

/// DNS-SD identifier for a leaf, or None when its depth is outside [2, 3].
fn identifier_for(components: &[String]) -> Option<String> {
    match components {
        [service_type, protocol] => Some(format!("_{}._{}", service_type, protocol)),
        [subtype, service_type, protocol] => Some(format!(
            "_{}.{}._{}._{}",
            subtype, SUBTYPE_LABEL, service_type, protocol
        )),
        _ => None,
    }
}

fn read_tags(path: &Path, identifier: &str) -> Result<Vec<String>> {
    let format_error = |reason: String| Error::RegistryFormat {
        service: identifier.to_string(),
        reason,
    };

    match fs::read_to_string(path) {
        Ok(data) => serde_json::from_str::<Vec<String>>(&data)
            .map_err(|e| format_error(format!("expected a JSON array of strings: {}", e))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(format_error(e.to_string())),
    }
}
