//! The dependency graph and its builder.
//!
//! A [`Graph`] stores its nodes in a petgraph [`DiGraph`] and interns them through
//! a map from node to index, so every identifying key maps to exactly one node.
//! Edge weights hold the optional platform condition of the edge. Projects and
//! targets live in ordered registries next to the adjacency.
//!
//! Graphs are built once with a [`GraphBuilder`], validated by
//! [`GraphBuilder::build`] and immutable afterwards. Transforms produce new graphs.

use anyhow::{Context, Result};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::circular::CircularDependencyDetector;
use super::condition::PlatformCondition;
use super::dependency::{GraphDependency, GraphEdge};
use super::model::{Project, Target, TargetIdentifier, Workspace};
use crate::core::GraphError;

/// Outgoing edges of every node, with their conditions.
pub type Adjacency = BTreeMap<GraphDependency, BTreeMap<GraphDependency, Option<PlatformCondition>>>;

/// A validated, immutable dependency graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    name: String,
    path: PathBuf,
    workspace: Workspace,
    projects: BTreeMap<PathBuf, Project>,
    targets: BTreeMap<PathBuf, BTreeMap<String, Target>>,
    dependencies: DiGraph<GraphDependency, Option<PlatformCondition>>,
    node_map: HashMap<GraphDependency, NodeIndex>,
}

impl Graph {
    /// Name of the graph, usually the workspace name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root directory of the graph.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Workspace metadata.
    #[must_use]
    pub const fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Registered projects by path.
    #[must_use]
    pub const fn projects(&self) -> &BTreeMap<PathBuf, Project> {
        &self.projects
    }

    /// The project at `path`.
    #[must_use]
    pub fn project(&self, path: &Path) -> Option<&Project> {
        self.projects.get(path)
    }

    /// Registered targets by project path and name.
    #[must_use]
    pub const fn targets(&self) -> &BTreeMap<PathBuf, BTreeMap<String, Target>> {
        &self.targets
    }

    /// The target `name` of the project at `path`.
    #[must_use]
    pub fn target(&self, path: &Path, name: &str) -> Option<&Target> {
        self.targets.get(path)?.get(name)
    }

    /// Whether the node is part of the graph.
    #[must_use]
    pub fn contains(&self, dependency: &GraphDependency) -> bool {
        self.node_map.contains_key(dependency)
    }

    /// The stored node equal to `dependency`, with its full payload.
    #[must_use]
    pub fn node(&self, dependency: &GraphDependency) -> Option<&GraphDependency> {
        self.node_map.get(dependency).map(|&index| &self.dependencies[index])
    }

    /// Direct dependencies of a node, sorted. Unknown nodes have none.
    #[must_use]
    pub fn direct_dependencies(&self, dependency: &GraphDependency) -> Vec<&GraphDependency> {
        self.node_map
            .get(dependency)
            .map(|&index| self.children(index).map(|child| &self.dependencies[child]).collect())
            .unwrap_or_default()
    }

    /// Nodes depending directly on `dependency`, sorted.
    #[must_use]
    pub fn dependents(&self, dependency: &GraphDependency) -> Vec<&GraphDependency> {
        let Some(&index) = self.node_map.get(dependency) else {
            return Vec::new();
        };
        let mut dependents: Vec<_> = self
            .dependencies
            .neighbors_directed(index, Direction::Incoming)
            .map(|parent| &self.dependencies[parent])
            .collect();
        dependents.sort();
        dependents
    }

    /// Whether the edge `from → to` exists.
    #[must_use]
    pub fn has_edge(&self, from: &GraphDependency, to: &GraphDependency) -> bool {
        match (self.node_map.get(from), self.node_map.get(to)) {
            (Some(&from), Some(&to)) => self.dependencies.contains_edge(from, to),
            _ => false,
        }
    }

    /// The condition of the edge `from → to`, if the edge exists and is conditional.
    #[must_use]
    pub fn condition(
        &self,
        from: &GraphDependency,
        to: &GraphDependency,
    ) -> Option<&PlatformCondition> {
        let from = *self.node_map.get(from)?;
        let to = *self.node_map.get(to)?;
        let edge = self.dependencies.find_edge(from, to)?;
        self.dependencies[edge].as_ref()
    }

    /// Whether any edge carries a condition.
    #[must_use]
    pub fn has_conditions(&self) -> bool {
        self.dependencies.edge_weights().any(Option::is_some)
    }

    /// Every conditional edge with its condition.
    #[must_use]
    pub fn edge_conditions(&self) -> BTreeMap<GraphEdge, PlatformCondition> {
        self.dependencies
            .edge_references()
            .filter_map(|edge| {
                let condition = edge.weight().as_ref()?;
                Some((
                    GraphEdge::new(
                        self.dependencies[edge.source()].clone(),
                        self.dependencies[edge.target()].clone(),
                    ),
                    condition.clone(),
                ))
            })
            .collect()
    }

    /// All nodes, sorted.
    #[must_use]
    pub fn nodes(&self) -> BTreeSet<&GraphDependency> {
        self.dependencies.node_weights().collect()
    }

    /// Outgoing edges of every node, including nodes without edges.
    #[must_use]
    pub fn adjacency(&self) -> Adjacency {
        self.dependencies
            .node_indices()
            .map(|index| {
                let edges = self
                    .dependencies
                    .edges(index)
                    .map(|edge| (self.dependencies[edge.target()].clone(), edge.weight().clone()))
                    .collect();
                (self.dependencies[index].clone(), edges)
            })
            .collect()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.dependencies.node_count()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.dependencies.edge_count()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.node_count() == 0
    }

    /// Serializable view of the graph for diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            name: self.name.clone(),
            path: self.path.clone(),
            workspace: self.workspace.clone(),
            projects: self.projects.values().cloned().collect(),
            targets: self
                .targets
                .iter()
                .flat_map(|(path, targets)| {
                    targets.values().map(move |target| (path.clone(), target.clone()))
                })
                .map(|(path, target)| SnapshotTarget {
                    path,
                    target,
                })
                .collect(),
            dependencies: self
                .adjacency()
                .into_iter()
                .map(|(from, edges)| SnapshotNode {
                    node: from,
                    edges: edges
                        .into_iter()
                        .map(|(to, condition)| SnapshotEdge {
                            to,
                            condition,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Pretty-printed JSON of [`Graph::snapshot`].
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.snapshot()).context("Failed to serialize graph")
    }

    pub(crate) const fn inner(&self) -> &DiGraph<GraphDependency, Option<PlatformCondition>> {
        &self.dependencies
    }

    pub(crate) fn index_of(&self, dependency: &GraphDependency) -> Option<NodeIndex> {
        self.node_map.get(dependency).copied()
    }

    /// Children of a node in node order.
    pub(crate) fn children(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        let mut children: Vec<NodeIndex> = self.dependencies.neighbors(index).collect();
        children.sort_by(|a, b| self.dependencies[*a].cmp(&self.dependencies[*b]));
        children.into_iter()
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.workspace == other.workspace
            && self.projects == other.projects
            && self.targets == other.targets
            && self.adjacency() == other.adjacency()
    }
}

impl Eq for Graph {}

/// Serializable form of a [`Graph`].
#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot {
    /// Graph name
    pub name: String,
    /// Graph path
    pub path: PathBuf,
    /// Workspace metadata
    pub workspace: Workspace,
    /// Projects, sorted by path
    pub projects: Vec<Project>,
    /// Targets, sorted by project path and name
    pub targets: Vec<SnapshotTarget>,
    /// Nodes with their outgoing edges, sorted
    pub dependencies: Vec<SnapshotNode>,
}

/// A target in a [`GraphSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotTarget {
    /// Project path
    pub path: PathBuf,
    /// The target
    pub target: Target,
}

/// A node in a [`GraphSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotNode {
    /// The node
    pub node: GraphDependency,
    /// Its outgoing edges
    pub edges: Vec<SnapshotEdge>,
}

/// An edge in a [`GraphSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotEdge {
    /// Dependency
    pub to: GraphDependency,
    /// Edge condition
    pub condition: Option<PlatformCondition>,
}

/// Incrementally assembles a [`Graph`].
///
/// ```rust,no_run
/// use xcgraph::graph::{GraphBuilder, GraphDependency, Product, Project, Target};
///
/// # fn example() -> anyhow::Result<()> {
/// let mut builder = GraphBuilder::new("Workspace", "/Projects");
/// builder
///     .project(Project::new("/Projects/App", "App"))
///     .target("/Projects/App", Target::new("App", Product::App))
///     .target("/Projects/App", Target::new("Core", Product::Framework))
///     .dependency(
///         GraphDependency::target("App", "/Projects/App"),
///         GraphDependency::target("Core", "/Projects/App"),
///     );
/// let graph = builder.build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    /// Start a graph with the given name and root path.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            graph: Graph {
                name: name.into(),
                path: path.into(),
                ..Graph::default()
            },
        }
    }

    /// Set the workspace metadata.
    pub fn workspace(&mut self, workspace: Workspace) -> &mut Self {
        self.graph.workspace = workspace;
        self
    }

    /// Register a project.
    pub fn project(&mut self, project: Project) -> &mut Self {
        self.graph.targets.entry(project.path.clone()).or_default();
        self.graph.projects.insert(project.path.clone(), project);
        self
    }

    /// Register a target of the project at `path` and add its node.
    pub fn target(&mut self, path: impl Into<PathBuf>, target: Target) -> &mut Self {
        let path = path.into();
        self.ensure_node(GraphDependency::target(target.name.clone(), path.clone()));
        self.graph.targets.entry(path).or_default().insert(target.name.clone(), target);
        self
    }

    /// Whether the target is registered.
    #[must_use]
    pub fn has_target(&self, path: &Path, name: &str) -> bool {
        self.graph.target(path, name).is_some()
    }

    /// Add a node without edges.
    pub fn node(&mut self, dependency: GraphDependency) -> &mut Self {
        self.ensure_node(dependency);
        self
    }

    /// Add the unconditional edge `from → to`.
    pub fn dependency(&mut self, from: GraphDependency, to: GraphDependency) -> &mut Self {
        self.conditional_dependency(from, to, None)
    }

    /// Add the edge `from → to` restricted to `condition`.
    ///
    /// Adding an existing edge again merges the conditions: the edge stays
    /// unconditional if either side is unconditional, otherwise the filters are
    /// unioned.
    pub fn conditional_dependency(
        &mut self,
        from: GraphDependency,
        to: GraphDependency,
        condition: Option<PlatformCondition>,
    ) -> &mut Self {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);

        let graph = &mut self.graph.dependencies;
        if let Some(edge) = graph.find_edge(from_idx, to_idx) {
            let merged = match (&graph[edge], &condition) {
                (Some(existing), Some(new)) => PlatformCondition::when(
                    existing.platform_filters().union(new.platform_filters()).copied(),
                ),
                _ => None,
            };
            graph[edge] = merged;
        } else {
            graph.add_edge(from_idx, to_idx, condition);
        }
        self
    }

    fn ensure_node(&mut self, dependency: GraphDependency) -> NodeIndex {
        if let Some(&index) = self.graph.node_map.get(&dependency) {
            index
        } else {
            let index = self.graph.dependencies.add_node(dependency.clone());
            self.graph.node_map.insert(dependency, index);
            index
        }
    }

    /// Validate and return the graph.
    ///
    /// # Errors
    ///
    /// - [`GraphError::MissingProject`] if a target node's project is not registered
    /// - [`GraphError::MissingTarget`] if a target node has no registered target
    /// - [`GraphError::CircularDependency`] if target dependencies form a cycle
    pub fn build(self) -> Result<Graph> {
        let graph = self.graph;
        let mut detector = CircularDependencyDetector::new();

        for index in graph.dependencies.node_indices() {
            let Some((name, path)) = graph.dependencies[index].as_target() else {
                continue;
            };
            if !graph.projects.contains_key(path) {
                return Err(GraphError::MissingProject {
                    path: path.to_path_buf(),
                }
                .into());
            }
            if graph.target(path, name).is_none() {
                return Err(GraphError::MissingTarget {
                    name: name.to_string(),
                    path: path.to_path_buf(),
                }
                .into());
            }

            let from = TargetIdentifier::new(path, name);
            for child in graph.dependencies.neighbors(index) {
                if let Some((child_name, child_path)) = graph.dependencies[child].as_target() {
                    detector.start(from.clone(), TargetIdentifier::new(child_path, child_name));
                }
            }
        }
        detector.complete()?;

        debug!(
            "Built graph '{}' with {} nodes and {} edges",
            graph.name,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}
