use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use crate::error::{Error, Result};
use crate::registry::loader::{self, Catalog};

/// One registry root and the catalog loaded from it, if any yet.
struct Generation {
    root: PathBuf,
    catalog: Arc<OnceCell<Arc<Catalog>>>,
}

impl Generation {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            catalog: Arc::new(OnceCell::new()),
        }
    }
}

/// Memoized view of the service registry.
///
/// Concurrent cold `get` calls share a single scan. A failed scan leaves the
/// cache empty so the next call retries it. `invalidate` swaps in a fresh
/// generation; a scan still running against the old one cannot populate it.
pub struct RegistryCache {
    state: Mutex<Generation>,
}

impl RegistryCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(Generation::new(root.into())),
        }
    }

    /// Current registry root
    pub fn root(&self) -> PathBuf {
        self.lock().root.clone()
    }

    /// Get the catalog, scanning the registry on first use
    pub async fn get(&self) -> Result<Arc<Catalog>> {
        let (root, cell) = {
            let state = self.lock();
            (state.root.clone(), state.catalog.clone())
        };

        let catalog = cell
            .get_or_try_init(|| load_catalog(root))
            .await?;

        Ok(catalog.clone())
    }

    /// Drop the cached catalog, optionally switching to a new registry root
    pub fn invalidate(&self, new_root: Option<&Path>) {
        let mut state = self.lock();
        let root = match new_root {
            Some(root) => root.to_path_buf(),
            None => state.root.clone(),
        };
        tracing::debug!("Invalidating registry cache, next load from {}", root.display());
        *state = Generation::new(root);
    }

    fn lock(&self) -> MutexGuard<'_, Generation> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn load_catalog(root: PathBuf) -> Result<Arc<Catalog>> {
    tracing::info!("Loading service registry from {}", root.display());

    let catalog = tokio::task::spawn_blocking(move || loader::load(&root))
        .await
        .map_err(|e| Error::Internal(format!("Registry scan task failed: {}", e)))??;

    Ok(Arc::new(catalog))
}
