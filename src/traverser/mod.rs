//! Read-only queries over a built [`Graph`].
//!
//! [`GraphTraverser`] answers the questions project generation asks about a
//! target: what it links, which frameworks it embeds, which resource bundles it
//! copies. Every transitive query is a specialization of
//! [`GraphTraverser::filter_dependencies`], a single reachability search that
//! collects nodes matching a `test` predicate and stops descending at nodes
//! matching a `skip` predicate.
//!
//! Queries against targets the graph does not contain return empty results.
//! Results are ordered sets, so generated output is reproducible.
//!
//! # Modules
//!
//! - [`condition_cache`] - Memoized platform-condition combinations
//! - `conditions` - Combined conditions and dependency references
//! - `linking` - Linkable dependencies and search paths
//! - `embedding` - Embeddable frameworks, resource bundles and copied products

pub mod condition_cache;
mod conditions;
mod embedding;
mod linking;


use anyhow::Result;
use petgraph::algo::toposort;
use petgraph::graph::NodeIndex;
use petgraph::visit::{VisitMap, Visitable};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::trace;

pub use condition_cache::ConditionCache;

use crate::core::GraphError;
use crate::graph::{
    BinaryLinking, Graph, GraphDependency, GraphTarget, GraphTargetReference, Product,
    ProjectKind, Scheme, Target, TargetIdentifier,
};

/// Query engine over an immutable [`Graph`].
///
/// A traverser is cheap to create and safe to share between threads. Condition
/// combinations are memoized in a [`ConditionCache`], which can be shared between
/// traversers of the same graph with [`GraphTraverser::with_condition_cache`].
#[derive(Debug)]
pub struct GraphTraverser<'g> {
    graph: &'g Graph,
    condition_cache: Arc<ConditionCache>,
    conditional_nodes: OnceLock<HashSet<NodeIndex>>,
}

impl<'g> GraphTraverser<'g> {
    /// Create a traverser with its own condition cache.
    #[must_use]
    pub fn new(graph: &'g Graph) -> Self {
        Self::with_condition_cache(graph, Arc::new(ConditionCache::new()))
    }

    /// Create a traverser using an existing condition cache.
    #[must_use]
    pub fn with_condition_cache(graph: &'g Graph, condition_cache: Arc<ConditionCache>) -> Self {
        Self {
            graph,
            condition_cache,
            conditional_nodes: OnceLock::new(),
        }
    }

    /// The traversed graph.
    #[must_use]
    pub const fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// The condition cache of this traverser.
    #[must_use]
    pub fn condition_cache(&self) -> &Arc<ConditionCache> {
        &self.condition_cache
    }

    /// Collect the nodes reachable from `roots` that satisfy `test`.
    ///
    /// Every reachable node is visited once. The search does not descend past a
    /// node for which `skip` holds. Roots are never part of the result and are
    /// never skipped. Roots missing from the graph are ignored.
    pub fn filter_dependencies<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a GraphDependency>,
        test: impl Fn(&GraphDependency) -> bool,
        skip: impl Fn(&GraphDependency) -> bool,
    ) -> BTreeSet<&'g GraphDependency> {
        let graph = self.graph.inner();
        let roots: HashSet<NodeIndex> =
            roots.into_iter().filter_map(|root| self.graph.index_of(root)).collect();

        let mut stack: Vec<NodeIndex> = roots.iter().copied().collect();
        let mut visited = graph.visit_map();
        let mut found = BTreeSet::new();

        while let Some(node) = stack.pop() {
            if !visited.visit(node) {
                continue;
            }

            let dependency = &graph[node];
            let is_root = roots.contains(&node);
            if !is_root && test(dependency) {
                found.insert(dependency);
            }
            if !is_root && skip(dependency) {
                continue;
            }
            stack.extend(graph.neighbors(node).filter(|child| !visited.is_visited(child)));
        }

        found
    }

    /// The stored node of the target `name` at `path`.
    fn target_node(&self, path: &Path, name: &str) -> Option<&'g GraphDependency> {
        self.graph.node(&GraphDependency::target(name, path))
    }

    /// Direct dependencies of a node as stored in the graph.
    fn children(&self, dependency: &GraphDependency) -> Vec<&'g GraphDependency> {
        let graph = self.graph;
        graph.direct_dependencies(dependency)
    }

    // Lookups

    /// The target `name` of the project at `path`.
    #[must_use]
    pub fn target(&self, path: &Path, name: &str) -> Option<GraphTarget<'g>> {
        let graph = self.graph;
        let project = graph.project(path)?;
        let target = graph.target(path, name)?;
        Some(GraphTarget {
            path: &project.path,
            target,
            project,
        })
    }

    /// The target behind a target node.
    #[must_use]
    pub fn target_from(&self, dependency: &GraphDependency) -> Option<GraphTarget<'g>> {
        let (name, path) = dependency.as_target()?;
        self.target(path, name)
    }

    /// All targets of the project at `path`.
    #[must_use]
    pub fn targets_at(&self, path: &Path) -> BTreeSet<GraphTarget<'g>> {
        let graph = self.graph;
        let (Some(project), Some(targets)) = (graph.project(path), graph.targets().get(path))
        else {
            return BTreeSet::new();
        };
        targets
            .values()
            .map(|target| GraphTarget {
                path: &project.path,
                target,
                project,
            })
            .collect()
    }

    /// Every target of the graph.
    #[must_use]
    pub fn all_targets(&self) -> BTreeSet<GraphTarget<'g>> {
        let graph = self.graph;
        graph.projects().keys().flat_map(|path| self.targets_at(path)).collect()
    }

    /// Targets of the projects the workspace lists.
    #[must_use]
    pub fn root_targets(&self) -> BTreeSet<GraphTarget<'g>> {
        let graph = self.graph;
        graph.workspace().projects.iter().flat_map(|path| self.targets_at(path)).collect()
    }

    /// Project schemes followed by workspace schemes.
    #[must_use]
    pub fn schemes(&self) -> Vec<&'g Scheme> {
        let graph = self.graph;
        graph
            .projects()
            .values()
            .flat_map(|project| project.schemes.iter())
            .chain(graph.workspace().schemes.iter())
            .collect()
    }

    /// Targets the target directly depends on, with the condition of each edge.
    #[must_use]
    pub fn direct_target_dependencies(
        &self,
        path: &Path,
        name: &str,
    ) -> BTreeSet<GraphTargetReference<'g>> {
        let Some(from) = self.target_node(path, name) else {
            return BTreeSet::new();
        };
        self.children(from)
            .into_iter()
            .filter_map(|child| {
                let target = self.target_from(child)?;
                Some(GraphTargetReference {
                    target,
                    condition: self.graph.condition(from, child).cloned(),
                })
            })
            .collect()
    }

    /// Direct target dependencies declared in the same project.
    #[must_use]
    pub fn direct_local_target_dependencies(
        &self,
        path: &Path,
        name: &str,
    ) -> BTreeSet<GraphTargetReference<'g>> {
        self.direct_target_dependencies(path, name)
            .into_iter()
            .filter(|reference| reference.target.path == path)
            .collect()
    }

    /// Every target reachable through target dependencies.
    #[must_use]
    pub fn all_target_dependencies(&self, path: &Path, name: &str) -> BTreeSet<GraphTarget<'g>> {
        let Some(from) = self.target_node(path, name) else {
            return BTreeSet::new();
        };
        self.filter_dependencies([from], GraphDependency::is_target, |dependency| {
            !dependency.is_target()
        })
        .into_iter()
        .filter_map(|dependency| self.target_from(dependency))
        .collect()
    }

    /// Every target, dependencies before their dependents.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CircularDependency`] if the graph contains a cycle.
    pub fn all_targets_topological_sorted(&self) -> Result<Vec<GraphTarget<'g>>> {
        let graph = self.graph.inner();
        let order = toposort(graph, None).map_err(|cycle| {
            let node = &graph[cycle.node_id()];
            let id = node
                .as_target()
                .map_or_else(
                    || TargetIdentifier::new(node.path(), node.to_string()),
                    |(name, path)| TargetIdentifier::new(path, name),
                );
            GraphError::CircularDependency {
                cycle: vec![id.clone(), id],
            }
        })?;

        Ok(order.into_iter().rev().filter_map(|index| self.target_from(&graph[index])).collect())
    }

    /// The target of the same project that depends on the given target, e.g. the
    /// app hosting an extension.
    #[must_use]
    pub fn host_target_for(&self, path: &Path, name: &str) -> Option<GraphTarget<'g>> {
        let dependency = self.target_node(path, name)?;
        self.targets_at(path).into_iter().find(|candidate| {
            self.target_node(path, &candidate.target.name)
                .is_some_and(|node| self.graph.has_edge(node, dependency))
        })
    }

    /// The app a unit test bundle is hosted by.
    #[must_use]
    pub fn unit_test_host(&self, path: &Path, name: &str) -> Option<GraphTarget<'g>> {
        self.direct_target_dependencies(path, name)
            .into_iter()
            .map(|reference| reference.target)
            .find(|target| target.target.product.can_host_tests())
    }

    /// Direct dependencies that are app extensions.
    #[must_use]
    pub fn app_extension_dependencies(
        &self,
        path: &Path,
        name: &str,
    ) -> BTreeSet<GraphTargetReference<'g>> {
        self.direct_target_dependencies(path, name)
            .into_iter()
            .filter(|reference| {
                matches!(
                    reference.target.target.product,
                    Product::AppExtension
                        | Product::StickerPackExtension
                        | Product::Watch2Extension
                        | Product::TvTopShelfExtension
                        | Product::MessagesExtension
                )
            })
            .collect()
    }

    /// The App Clip embedded by an app of the same project.
    #[must_use]
    pub fn app_clip_dependencies(
        &self,
        path: &Path,
        name: &str,
    ) -> Option<GraphTargetReference<'g>> {
        self.direct_local_target_dependencies(path, name)
            .into_iter()
            .find(|reference| reference.target.target.product == Product::AppClip)
    }

    /// Whether the target is a test bundle or links XCTest directly.
    #[must_use]
    pub fn depends_on_xctest(&self, path: &Path, name: &str) -> bool {
        let Some(target) = self.target(path, name) else {
            return false;
        };
        if target.target.product.tests_bundle() {
            return true;
        }
        self.target_node(path, name).is_some_and(|node| {
            self.children(node).into_iter().any(|child| {
                matches!(child, GraphDependency::Sdk { name, .. } if name == "XCTest.framework")
            })
        })
    }

    /// Precompiled nodes reachable from `dependency`.
    #[must_use]
    pub fn prebuilt_dependencies(
        &self,
        dependency: &GraphDependency,
    ) -> BTreeSet<&'g GraphDependency> {
        self.filter_dependencies([dependency], GraphDependency::is_precompiled, |_| false)
    }

    /// Paths of every precompiled framework in the graph.
    #[must_use]
    pub fn precompiled_frameworks_paths(&self) -> BTreeSet<PathBuf> {
        self.graph
            .nodes()
            .into_iter()
            .filter_map(|node| match node {
                GraphDependency::Framework(info) => Some(info.path.clone()),
                _ => None,
            })
            .collect()
    }

    // Predicates shared by the queries

    fn test_target(&self, dependency: &GraphDependency, test: impl FnOnce(&Target) -> bool) -> bool {
        self.target_from(dependency).is_some_and(|target| test(target.target))
    }

    fn is_dependency_static(&self, dependency: &GraphDependency) -> bool {
        match dependency {
            GraphDependency::Target {
                ..
            } => self.test_target(dependency, |target| target.product.is_static()),
            other => other.linking() == Some(BinaryLinking::Static),
        }
    }

    fn can_dependency_link_static_products(&self, dependency: &GraphDependency) -> bool {
        match dependency {
            GraphDependency::Target {
                ..
            } => self.test_target(dependency, Target::can_link_static_products),
            other => other.linking() == Some(BinaryLinking::Dynamic),
        }
    }

    fn is_dependency_external(&self, dependency: &GraphDependency) -> bool {
        dependency
            .as_target()
            .and_then(|(_, path)| self.graph.project(path))
            .is_some_and(|project| project.kind == ProjectKind::External)
    }

    fn is_embeddable_dependency_target(&self, dependency: &GraphDependency) -> bool {
        self.test_target(dependency, |target| {
            target.product.is_dynamic()
                || (target.product == Product::StaticFramework && target.contains_resources)
        })
    }

    fn can_dependency_embed_binaries(&self, dependency: &GraphDependency) -> bool {
        self.test_target(dependency, Target::can_embed_frameworks)
    }

    fn can_dependency_embed_bundles(&self, dependency: &GraphDependency) -> bool {
        self.test_target(dependency, Target::can_embed_bundles)
    }

    fn is_dependency_resource_bundle(&self, dependency: &GraphDependency) -> bool {
        match dependency {
            GraphDependency::Bundle {
                ..
            } => true,
            GraphDependency::Target {
                ..
            } => self.test_target(dependency, |target| target.product == Product::Bundle),
            _ => false,
        }
    }

    /// Static targets and binaries reachable without crossing a node that links
    /// static products itself.
    fn transitive_static_dependencies(
        &self,
        dependency: &GraphDependency,
    ) -> BTreeSet<&'g GraphDependency> {
        let found = self.filter_dependencies(
            [dependency],
            |node| self.is_dependency_static(node),
            |node| self.can_dependency_link_static_products(node),
        );
        trace!("{} static dependencies below {dependency}", found.len());
        found
    }
}
