//! xcgraph - dependency graph engine for native project generation
//!
//! Models the targets of a workspace, the precompiled frameworks, libraries,
//! xcframeworks, SDKs, bundles and package products they depend on, and the
//! platform conditions on those dependencies. Project generators query it for
//! link flags, embed phases and resource copies, and build pipelines use it to
//! replace targets with cached binaries.
//!
//! # Architecture Overview
//!
//! Generation runs in three stages over immutable graphs:
//! - **Load**: [`graph::GraphLoader`] turns project descriptors into a validated
//!   [`graph::Graph`], detecting dependency cycles as edges are registered
//! - **Substitute** (optional): [`cache::CacheGraphMutator`] maps the graph to one
//!   in which targets with a precompiled artifact are replaced by the artifact
//! - **Query**: [`traverser::GraphTraverser`] answers what a target links, embeds
//!   and copies, with the platform conditions under which it does so
//!
//! # Core Modules
//!
//! - [`core`] - Error taxonomy and user-facing error formatting
//! - [`config`] - Settings file (`~/.xcgraph/config.toml`) and environment overrides
//! - [`graph`] - Value model, graph construction and cycle detection
//! - [`traverser`] - Read-only link, embed and resource queries
//! - [`cache`] - Binary cache substitution and artifact loading
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use xcgraph::graph::{
//!     GraphLoader, Product, Project, ProjectDescriptor, Target, TargetDependency, Workspace,
//! };
//! use xcgraph::traverser::GraphTraverser;
//!
//! # fn example() -> anyhow::Result<()> {
//! let project = ProjectDescriptor {
//!     project: Project::new("/Projects/App", "App"),
//!     targets: vec![
//!         Target::new("App", Product::App).with_dependency(TargetDependency::target("Core")),
//!         Target::new("Core", Product::Framework),
//!     ],
//! };
//! let descriptors = [project];
//! let graph = GraphLoader::new(&descriptors).load_project(Path::new("/Projects/App"))?;
//!
//! let traverser = GraphTraverser::new(&graph);
//! for reference in traverser.embeddable_frameworks(Path::new("/Projects/App"), "App") {
//!     println!("embed {reference:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod graph;
pub mod traverser;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
