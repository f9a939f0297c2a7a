//! Common test utilities and fixtures for xcgraph integration tests
//!
//! Integration tests describe workspaces as [`ProjectDescriptor`]s and load them
//! through the public [`GraphLoader`]. Precompiled artifacts live in a temporary
//! directory read by [`DirectoryArtifactLoader`].

// Allow dead code because these utilities are used across different test files
// and not all utilities are used in every test file
#![allow(dead_code)]

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use xcgraph::cache::ArtifactLoader;
use xcgraph::core::GraphError;
use xcgraph::graph::{
    BinaryLinking, FrameworkInfo, Graph, GraphDependency, GraphLoader, LinkingStatus, Project,
    ProjectDescriptor, Target, TargetIdentifier, Workspace, XcFrameworkInfo,
};

/// Project descriptor at `path` named after its last component.
pub fn descriptor(path: &str, targets: Vec<Target>) -> ProjectDescriptor {
    let name = Path::new(path).file_name().map_or("Project".into(), |name| {
        name.to_string_lossy().into_owned()
    });
    ProjectDescriptor {
        project: Project::new(path, name),
        targets,
    }
}

/// Load a workspace listing the first descriptor's project.
pub fn load(descriptors: &[ProjectDescriptor]) -> Result<Graph> {
    let root = descriptors.first().context("at least one project is required")?;
    let workspace =
        Workspace::new("Workspace", root.project.path.clone(), [root.project.path.clone()]);
    GraphLoader::new(descriptors).load_workspace(&workspace)
}

/// Precompiled artifacts on disk.
///
/// `.xcframework` directories load as dynamic xcframeworks, `.framework`
/// directories as dynamic frameworks and `.bundle` directories as bundles. A
/// missing directory fails with [`GraphError::ArtifactNotFound`].
pub struct DirectoryArtifactLoader {
    loads: AtomicUsize,
}

impl DirectoryArtifactLoader {
    pub fn new() -> Self {
        Self {
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ArtifactLoader for DirectoryArtifactLoader {
    fn load(&self, path: &Path) -> Result<GraphDependency> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !path.is_dir() {
            return Err(GraphError::ArtifactNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let extension = path.extension().and_then(|extension| extension.to_str());
        match extension {
            Some("xcframework") => Ok(GraphDependency::XcFramework(XcFrameworkInfo {
                path: path.to_path_buf(),
                linking: BinaryLinking::Dynamic,
                status: LinkingStatus::Required,
                swift_modules: vec![],
                module_maps: vec![],
                mergeable: false,
            })),
            Some("framework") => {
                let stem = path.file_stem().context("framework without name")?;
                Ok(GraphDependency::Framework(FrameworkInfo {
                    path: path.to_path_buf(),
                    binary_path: path.join(stem),
                    dsym_path: None,
                    linking: BinaryLinking::Dynamic,
                    architectures: vec!["arm64".to_string()],
                    status: LinkingStatus::Required,
                }))
            }
            Some("bundle") => Ok(GraphDependency::bundle(path)),
            _ => Err(GraphError::UnsupportedDependency {
                description: format!("unknown artifact type at {}", path.display()),
            }
            .into()),
        }
    }
}

/// A temporary binary cache.
pub struct TestCache {
    temp_dir: TempDir,
    artifacts: BTreeMap<TargetIdentifier, PathBuf>,
}

impl TestCache {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new().context("Failed to create cache directory")?,
            artifacts: BTreeMap::new(),
        })
    }

    /// Store an xcframework for the target `name` of the project at `project`.
    pub fn store(&mut self, project: &str, name: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(format!("{name}.xcframework"));
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        self.artifacts.insert(TargetIdentifier::new(project, name), path.clone());
        Ok(path)
    }

    /// Map the target to an artifact that does not exist on disk.
    pub fn store_missing(&mut self, project: &str, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(format!("{name}-missing.xcframework"));
        self.artifacts.insert(TargetIdentifier::new(project, name), path.clone());
        path
    }

    pub fn artifacts(&self) -> &BTreeMap<TargetIdentifier, PathBuf> {
        &self.artifacts
    }

    /// The graph node the loader produces for the artifact stored for `name`.
    pub fn node(&self, name: &str) -> GraphDependency {
        let path = self.temp_dir.path().join(format!("{name}.xcframework"));
        GraphDependency::XcFramework(XcFrameworkInfo {
            path,
            linking: BinaryLinking::Dynamic,
            status: LinkingStatus::Required,
            swift_modules: vec![],
            module_maps: vec![],
            mergeable: false,
        })
    }
}
