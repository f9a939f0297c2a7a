//! In-memory artifact loader for tests.

use anyhow::Result;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::fixtures::test_xcframework;
use crate::cache::ArtifactLoader;
use crate::core::GraphError;
use crate::graph::{BinaryLinking, GraphDependency};

/// Serves configured artifacts and counts how often each path is loaded.
///
/// Paths without a configured artifact load as dynamic xcframeworks.
#[derive(Debug, Default)]
pub struct MockArtifactLoader {
    artifacts: HashMap<PathBuf, GraphDependency>,
    failing: HashSet<PathBuf>,
    delay: Option<Duration>,
    loads: DashMap<PathBuf, usize>,
}

impl MockArtifactLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `artifact` for its own path.
    pub fn with_artifact(mut self, artifact: GraphDependency) -> Self {
        self.artifacts.insert(artifact.path().to_path_buf(), artifact);
        self
    }

    /// Fail loads of `path` with [`GraphError::ArtifactNotFound`].
    pub fn fail_on(mut self, path: impl AsRef<Path>) -> Self {
        self.failing.insert(path.as_ref().to_path_buf());
        self
    }

    /// Block every load for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of loads of `path`, including failed ones.
    pub fn load_count(&self, path: impl AsRef<Path>) -> usize {
        self.loads.get(path.as_ref()).map_or(0, |count| *count)
    }

    /// Number of loads across all paths.
    pub fn total_loads(&self) -> usize {
        self.loads.iter().map(|entry| *entry.value()).sum()
    }
}

impl ArtifactLoader for MockArtifactLoader {
    fn load(&self, path: &Path) -> Result<GraphDependency> {
        *self.loads.entry(path.to_path_buf()).or_insert(0) += 1;

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.failing.contains(path) {
            return Err(GraphError::ArtifactNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        Ok(self
            .artifacts
            .get(path)
            .cloned()
            .unwrap_or_else(|| test_xcframework(path, BinaryLinking::Dynamic)))
    }
}
