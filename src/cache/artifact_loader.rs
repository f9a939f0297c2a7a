//! Loading precompiled artifacts at most once per path.

use anyhow::{Result, anyhow};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::graph::GraphDependency;

/// Reads a precompiled artifact (framework, xcframework, bundle) from disk and
/// describes it as a graph node.
///
/// Implementations perform blocking I/O. They are always called from a blocking
/// thread pool.
pub trait ArtifactLoader: Send + Sync {
    /// Load the artifact at `path`.
    ///
    /// # Errors
    ///
    /// Fails when the artifact is missing or cannot be parsed.
    fn load(&self, path: &Path) -> Result<GraphDependency>;
}

/// Deduplicating front of an [`ArtifactLoader`].
///
/// Concurrent requests for the same path share a single load. Requests for
/// different paths run in parallel on tokio's blocking pool.
pub struct ArtifactStore {
    loader: Arc<dyn ArtifactLoader>,
    cells: DashMap<PathBuf, Arc<OnceCell<GraphDependency>>>,
}

impl ArtifactStore {
    /// Create an empty store over `loader`.
    #[must_use]
    pub fn new(loader: Arc<dyn ArtifactLoader>) -> Self {
        Self {
            loader,
            cells: DashMap::new(),
        }
    }

    /// The artifact at `path`, loading it on first request.
    ///
    /// # Errors
    ///
    /// Returns the loader's error unchanged. A failed load is not cached.
    pub async fn load(&self, path: &Path) -> Result<GraphDependency> {
        let cell = self.cells.entry(path.to_path_buf()).or_default().clone();

        let dependency = cell
            .get_or_try_init(|| async {
                debug!("Loading artifact {}", path.display());
                let loader = Arc::clone(&self.loader);
                let owned = path.to_path_buf();
                tokio::task::spawn_blocking(move || loader.load(&owned)).await.map_err(|e| {
                    anyhow!("Task join error while loading artifact {}: {}", path.display(), e)
                })?
            })
            .await?;

        Ok(dependency.clone())
    }

    /// Number of artifacts loaded so far.
    #[must_use]
    pub fn loaded(&self) -> usize {
        self.cells.iter().filter(|entry| entry.value().initialized()).count()
    }
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore").field("paths", &self.cells.len()).finish()
    }
}
