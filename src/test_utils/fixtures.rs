//! Test fixtures for creating sample graph data
//!
//! Constructors for the node kinds and descriptors tests use most, and a
//! [`GraphFixture`] that assembles graphs with terse name-based edges.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::graph::{
    BinaryLinking, FrameworkInfo, Graph, GraphBuilder, GraphDependency, LibraryInfo,
    LinkingStatus, PackageProductKind, PlatformCondition, Product, Project, SdkSource, Target,
    Workspace, XcFrameworkInfo,
};

/// A target without dependencies.
pub fn test_target(name: &str, product: Product) -> Target {
    Target::new(name, product)
}

/// A local project named after the last component of `path`.
pub fn test_project(path: impl AsRef<Path>) -> Project {
    let path = path.as_ref();
    let name = path.file_name().map_or_else(
        || "Project".to_string(),
        |name| name.to_string_lossy().into_owned(),
    );
    Project::new(path, name)
}

/// A precompiled framework at `path`.
pub fn test_framework(path: impl Into<PathBuf>, linking: BinaryLinking) -> GraphDependency {
    let path = path.into();
    let binary = path.file_stem().map(|stem| path.join(stem)).unwrap_or_else(|| path.clone());
    GraphDependency::Framework(FrameworkInfo {
        binary_path: binary,
        path,
        dsym_path: None,
        linking,
        architectures: vec!["arm64".to_string()],
        status: LinkingStatus::Required,
    })
}

/// A precompiled xcframework at `path` without Swift modules.
pub fn test_xcframework(path: impl Into<PathBuf>, linking: BinaryLinking) -> GraphDependency {
    GraphDependency::XcFramework(XcFrameworkInfo {
        path: path.into(),
        linking,
        status: LinkingStatus::Required,
        swift_modules: vec![],
        module_maps: vec![],
        mergeable: false,
    })
}

/// A precompiled library at `path` with headers in a sibling `include` directory.
pub fn test_library(path: impl Into<PathBuf>, linking: BinaryLinking) -> GraphDependency {
    let path = path.into();
    let public_headers =
        path.parent().map_or_else(|| PathBuf::from("include"), |dir| dir.join("include"));
    GraphDependency::Library(LibraryInfo {
        path,
        public_headers,
        linking,
        architectures: vec!["arm64".to_string()],
        swift_module_map: None,
    })
}

/// A system SDK such as `UIKit.framework`. `XCTest.framework` comes from the
/// developer directory.
pub fn test_sdk(name: &str) -> GraphDependency {
    let source =
        if name == "XCTest.framework" { SdkSource::Developer } else { SdkSource::System };
    GraphDependency::sdk(name, format!("/System/Library/Frameworks/{name}"), source)
}

/// A precompiled bundle at `path`.
pub fn test_bundle(path: impl Into<PathBuf>) -> GraphDependency {
    GraphDependency::bundle(path)
}

/// A package product of the package at `path`.
pub fn test_package_product(
    path: impl Into<PathBuf>,
    product: &str,
    kind: PackageProductKind,
) -> GraphDependency {
    GraphDependency::PackageProduct {
        path: path.into(),
        product: product.to_string(),
        kind,
    }
}

/// Builds graphs whose targets mostly live in one project.
///
/// Targets are referred to by name within the fixture's project. Targets of other
/// projects are added with [`GraphFixture::target_in`] and referred to by node.
pub struct GraphFixture {
    path: PathBuf,
    builder: GraphBuilder,
}

impl GraphFixture {
    /// A fixture with one local project at `path` listed by the workspace.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut builder = GraphBuilder::new("Workspace", path.clone());
        builder
            .workspace(Workspace::new("Workspace", path.clone(), [path.clone()]))
            .project(test_project(&path));
        Self {
            path,
            builder,
        }
    }

    /// Path of the fixture's project.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Node of the target `name` of the fixture's project.
    pub fn node(&self, name: &str) -> GraphDependency {
        GraphDependency::target(name, self.path.clone())
    }

    /// Add a target to the fixture's project.
    pub fn target(&mut self, name: &str, product: Product) -> &mut Self {
        self.add_target(test_target(name, product))
    }

    /// Add a fully configured target to the fixture's project.
    pub fn add_target(&mut self, target: Target) -> &mut Self {
        self.builder.target(self.path.clone(), target);
        self
    }

    /// Register another project.
    pub fn project(&mut self, project: Project) -> &mut Self {
        self.builder.project(project);
        self
    }

    /// Add a target to another, already registered project.
    pub fn target_in(&mut self, path: impl Into<PathBuf>, target: Target) -> &mut Self {
        self.builder.target(path, target);
        self
    }

    /// Edge between two targets of the fixture's project.
    pub fn edge(&mut self, from: &str, to: &str) -> &mut Self {
        let (from, to) = (self.node(from), self.node(to));
        self.builder.dependency(from, to);
        self
    }

    /// Conditional edge between two targets of the fixture's project.
    pub fn conditional_edge(
        &mut self,
        from: &str,
        to: &str,
        condition: Option<PlatformCondition>,
    ) -> &mut Self {
        let (from, to) = (self.node(from), self.node(to));
        self.builder.conditional_dependency(from, to, condition);
        self
    }

    /// Edge from a target of the fixture's project to any node.
    pub fn edge_to(&mut self, from: &str, to: GraphDependency) -> &mut Self {
        let from = self.node(from);
        self.builder.dependency(from, to);
        self
    }

    /// Edge between arbitrary nodes.
    pub fn node_edge(&mut self, from: GraphDependency, to: GraphDependency) -> &mut Self {
        self.builder.dependency(from, to);
        self
    }

    /// Conditional edge between arbitrary nodes.
    pub fn conditional_node_edge(
        &mut self,
        from: GraphDependency,
        to: GraphDependency,
        condition: Option<PlatformCondition>,
    ) -> &mut Self {
        self.builder.conditional_dependency(from, to, condition);
        self
    }

    /// Validate and return the graph.
    pub fn build(self) -> Result<Graph> {
        self.builder.build()
    }
}
