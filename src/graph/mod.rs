//! Dependency graph model and construction.
//!
//! The graph's nodes are [`GraphDependency`] values: targets built from sources,
//! precompiled frameworks, libraries and xcframeworks, SDKs, bundles and package
//! products. Edges point from a node to what it depends on and may carry a
//! [`PlatformCondition`].
//!
//! # Modules
//!
//! - [`condition`] - Platform conditions and how they combine
//! - [`dependency`] - Node kinds and their identity
//! - [`model`] - Projects, targets and workspaces
//! - [`reference`] - Resolved references returned by traversal queries
//! - [`circular`] - Incremental cycle detection for target edges
//! - [`dependency_graph`] - The graph and its builder
//! - [`loader`] - Graph construction from project descriptors

pub mod circular;
pub mod condition;
pub mod dependency;
pub mod dependency_graph;
pub mod loader;
pub mod model;
pub mod reference;

pub use circular::CircularDependencyDetector;
pub use condition::{CombinationResult, Platform, PlatformCondition, PlatformFilter};
pub use dependency::{
    BinaryLinking, FrameworkInfo, GraphDependency, GraphEdge, LibraryInfo, LinkingStatus,
    PackageProductKind, SdkSource, XcFrameworkInfo,
};
pub use dependency_graph::{Adjacency, Graph, GraphBuilder, GraphSnapshot};
pub use loader::GraphLoader;
pub use model::{
    BINARY_SOURCES_TAG, GraphTarget, GraphTargetReference, Product, Project, ProjectDescriptor,
    ProjectKind, Scheme, Target, TargetDependency, TargetIdentifier, Workspace,
};
pub use reference::GraphDependencyReference;
