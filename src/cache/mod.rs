//! Binary cache substitution
//!
//! [`CacheGraphMutator`] replaces targets that have a precompiled artifact with
//! the artifact itself, so the build only compiles what actually changed.
//!
//! # Phases
//!
//! 1. **Plan**: walk targets dependencies first. A target is replaceable when it
//!    has an artifact, is not named in `sources`, and every target it depends on
//!    directly is replaceable.
//! 2. **Load**: load every artifact still reachable from a target that stays, in
//!    parallel and at most once per path (see [`ArtifactStore`]). Any failure
//!    aborts the whole substitution.
//! 3. **Rewrite**: build a new graph. Edges into a replaced target point at its
//!    artifact with their conditions unchanged. An artifact depends on the
//!    artifacts of the replaced target's dependencies, and keeps its frameworks,
//!    xcframeworks, bundles and SDKs. Libraries and package products are linked
//!    into the artifact and disappear.
//!
//! Replaced targets are removed, or with `keep_source_targets` kept without
//! dependencies and tagged [`BINARY_SOURCES_TAG`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::{BTreeMap, BTreeSet};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use xcgraph::cache::{ArtifactLoader, CacheGraphMutator};
//! use xcgraph::graph::{Graph, TargetIdentifier};
//!
//! # async fn example(graph: Graph, loader: Arc<dyn ArtifactLoader>) -> anyhow::Result<()> {
//! let artifacts = BTreeMap::from([(
//!     TargetIdentifier::new("/Projects/App", "Core"),
//!     PathBuf::from("/Cache/Core.xcframework"),
//! )]);
//! let mutator = CacheGraphMutator::new(loader);
//! let cached = mutator.map(&graph, &artifacts, &BTreeSet::new(), false).await?;
//! # Ok(())
//! # }
//! ```

pub mod artifact_loader;

pub use artifact_loader::{ArtifactLoader, ArtifactStore};

use anyhow::Result;
use futures::{StreamExt, TryStreamExt, stream};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::CacheSettings;
use crate::core::GraphError;
use crate::graph::{
    BINARY_SOURCES_TAG, Graph, GraphBuilder, GraphDependency, GraphTarget, PlatformCondition,
    Product, TargetIdentifier,
};
use crate::traverser::GraphTraverser;

/// Replaces targets with their precompiled artifacts.
pub struct CacheGraphMutator {
    loader: Arc<dyn ArtifactLoader>,
    max_concurrent_loads: usize,
}

/// Targets to replace, and those of them that stay reachable.
#[derive(Debug, Default)]
struct SubstitutionPlan {
    replaceable: BTreeSet<TargetIdentifier>,
    reachable: BTreeSet<TargetIdentifier>,
}

impl CacheGraphMutator {
    /// Create a mutator loading artifacts through `loader`.
    #[must_use]
    pub fn new(loader: Arc<dyn ArtifactLoader>) -> Self {
        Self {
            loader,
            max_concurrent_loads: CacheSettings::default().max_concurrent_loads,
        }
    }

    /// Apply cache settings.
    #[must_use]
    pub fn with_settings(mut self, settings: &CacheSettings) -> Self {
        self.max_concurrent_loads = settings.max_concurrent_loads.max(1);
        self
    }

    /// Substitute precompiled artifacts for the targets of `graph`.
    ///
    /// `precompiled_artifacts` maps targets to artifact paths. Targets named in
    /// `sources` are never replaced. Identifiers of targets missing from the
    /// graph are ignored, which makes the substitution idempotent.
    ///
    /// # Errors
    ///
    /// - Any error of the artifact loader, unchanged
    /// - [`GraphError::UnsupportedDependency`] if an artifact loads as a target or
    ///   package product
    /// - [`GraphError::CircularDependency`] if `graph` is cyclic
    pub async fn map(
        &self,
        graph: &Graph,
        precompiled_artifacts: &BTreeMap<TargetIdentifier, PathBuf>,
        sources: &BTreeSet<String>,
        keep_source_targets: bool,
    ) -> Result<Graph> {
        let plan = plan(graph, precompiled_artifacts, sources)?;
        if plan.replaceable.is_empty() {
            debug!("No replaceable targets in graph '{}'", graph.name());
            return Ok(graph.clone());
        }
        info!(
            "Replacing {} targets with cached binaries ({} reachable)",
            plan.replaceable.len(),
            plan.reachable.len()
        );

        let paths: BTreeSet<PathBuf> = plan
            .reachable
            .iter()
            .filter_map(|id| precompiled_artifacts.get(id).cloned())
            .collect();
        let artifacts = self.load_artifacts(paths).await?;

        let mut rewriter = Rewriter {
            graph,
            plan: &plan,
            precompiled_artifacts,
            artifacts: &artifacts,
            builder: GraphBuilder::new(graph.name(), graph.path()),
            pending: Vec::new(),
            visited: HashSet::new(),
        };
        let mapped = rewriter.rewrite(keep_source_targets)?;

        let removed = graph.node_count().saturating_sub(mapped.node_count());
        info!(
            "Cache substitution of '{}' done: {} nodes, {} fewer than before",
            graph.name(),
            mapped.node_count(),
            removed
        );
        Ok(mapped)
    }

    async fn load_artifacts(
        &self,
        paths: BTreeSet<PathBuf>,
    ) -> Result<HashMap<PathBuf, GraphDependency>> {
        let store = ArtifactStore::new(Arc::clone(&self.loader));
        let store = &store;

        stream::iter(paths)
            .map(|path| async move {
                let artifact = store.load(&path).await?;
                let from_sources = matches!(
                    artifact,
                    GraphDependency::Target { .. } | GraphDependency::PackageProduct { .. }
                );
                if from_sources {
                    return Err(anyhow::Error::from(GraphError::UnsupportedDependency {
                        description: format!(
                            "artifact at {} loaded as a {}",
                            path.display(),
                            artifact.kind_name()
                        ),
                    }));
                }
                Ok((path, artifact))
            })
            .buffer_unordered(self.max_concurrent_loads)
            .try_collect()
            .await
    }
}

impl std::fmt::Debug for CacheGraphMutator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheGraphMutator")
            .field("max_concurrent_loads", &self.max_concurrent_loads)
            .finish_non_exhaustive()
    }
}

fn plan(
    graph: &Graph,
    precompiled_artifacts: &BTreeMap<TargetIdentifier, PathBuf>,
    sources: &BTreeSet<String>,
) -> Result<SubstitutionPlan> {
    let traverser = GraphTraverser::new(graph);
    let order = traverser.all_targets_topological_sorted()?;
    let mut plan = SubstitutionPlan::default();
    let mut pinned: BTreeSet<TargetIdentifier> = BTreeSet::new();

    // Pinning a bundle can turn its dependents into source targets, which may pin
    // further bundles.
    loop {
        plan.replaceable.clear();
        for target in &order {
            let id = target.identifier();
            if !precompiled_artifacts.contains_key(&id)
                || sources.contains(&target.target.name)
                || pinned.contains(&id)
            {
                continue;
            }
            let dependencies_replaceable = graph
                .direct_dependencies(&target.dependency())
                .into_iter()
                .filter_map(GraphDependency::as_target)
                .all(|(name, path)| plan.replaceable.contains(&TargetIdentifier::new(path, name)));
            if dependencies_replaceable {
                plan.replaceable.insert(id);
            }
        }

        let newly_pinned: Vec<TargetIdentifier> = order
            .iter()
            .filter(|target| target.target.product == Product::Bundle)
            .map(GraphTarget::identifier)
            .filter(|id| plan.replaceable.contains(id))
            .filter(|id| {
                graph.dependents(&id.to_dependency()).into_iter().any(|parent| {
                    parent.as_target().is_some_and(|(name, path)| {
                        !plan.replaceable.contains(&TargetIdentifier::new(path, name))
                    })
                })
            })
            .collect();
        if newly_pinned.is_empty() {
            break;
        }
        for id in newly_pinned {
            debug!("Keeping bundle {id} from sources next to its source dependents");
            pinned.insert(id);
        }
    }
    for id in &plan.replaceable {
        debug!("Target {id} is replaceable");
    }

    let mut visited: HashSet<&GraphDependency> = HashSet::new();
    let mut stack: Vec<&GraphDependency> = graph
        .targets()
        .iter()
        .flat_map(|(path, targets)| {
            targets.keys().map(move |name| TargetIdentifier::new(path, name.clone()))
        })
        .filter(|id| !plan.replaceable.contains(id))
        .filter_map(|id| graph.node(&id.to_dependency()))
        .collect();
    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        if let Some((name, path)) = node.as_target() {
            let id = TargetIdentifier::new(path, name);
            if plan.replaceable.contains(&id) {
                plan.reachable.insert(id);
            }
        }
        stack.extend(graph.direct_dependencies(node));
    }

    Ok(plan)
}

/// Precompiled nodes an artifact keeps depending on.
const fn is_carried_by_artifact(dependency: &GraphDependency) -> bool {
    matches!(
        dependency,
        GraphDependency::Framework(_)
            | GraphDependency::XcFramework(_)
            | GraphDependency::Bundle { .. }
            | GraphDependency::Sdk { .. }
    )
}

struct Rewriter<'a> {
    graph: &'a Graph,
    plan: &'a SubstitutionPlan,
    precompiled_artifacts: &'a BTreeMap<TargetIdentifier, PathBuf>,
    artifacts: &'a HashMap<PathBuf, GraphDependency>,
    builder: GraphBuilder,
    /// Non-target nodes whose edges still have to be copied
    pending: Vec<&'a GraphDependency>,
    visited: HashSet<&'a GraphDependency>,
}

impl<'a> Rewriter<'a> {
    fn rewrite(&mut self, keep_source_targets: bool) -> Result<Graph> {
        let graph = self.graph;
        self.builder.workspace(graph.workspace().clone());
        for project in graph.projects().values() {
            self.builder.project(project.clone());
        }

        for (path, targets) in graph.targets() {
            for target in targets.values() {
                let id = TargetIdentifier::new(path, target.name.clone());
                if self.plan.replaceable.contains(&id) {
                    if keep_source_targets {
                        debug!("Keeping {id} as binary-shadowed source target");
                        let mut shadowed = target.clone();
                        shadowed.tags.insert(BINARY_SOURCES_TAG.to_string());
                        self.builder.target(path.clone(), shadowed);
                    } else {
                        debug!("Pruning replaced target {id}");
                    }
                    continue;
                }

                self.builder.target(path.clone(), target.clone());
                let node = id.to_dependency();
                for child in graph.direct_dependencies(&node) {
                    let condition = graph.condition(&node, child).cloned();
                    let to = self.resolve(child)?;
                    self.builder.conditional_dependency(node.clone(), to, condition);
                }
            }
        }

        let plan = self.plan;
        for id in &plan.reachable {
            let artifact = self.artifact(id)?;
            let node = id.to_dependency();
            for child in graph.direct_dependencies(&node) {
                if !child.is_target() && !is_carried_by_artifact(child) {
                    continue;
                }
                let to = self.resolve(child)?;
                if is_carried_by_artifact(&to) {
                    let condition = graph.condition(&node, child).cloned();
                    self.add_edge(artifact.clone(), to, condition);
                }
            }
        }

        while let Some(node) = self.pending.pop() {
            for child in graph.direct_dependencies(node) {
                let condition = graph.condition(node, child).cloned();
                let to = self.resolve(child)?;
                self.add_edge(node.clone(), to, condition);
            }
        }

        std::mem::take(&mut self.builder).build()
    }

    /// The node an edge to `child` points at after substitution.
    fn resolve(&mut self, child: &'a GraphDependency) -> Result<GraphDependency> {
        match child.as_target() {
            Some((name, path)) => {
                let id = TargetIdentifier::new(path, name);
                if self.plan.replaceable.contains(&id) {
                    Ok(self.artifact(&id)?.clone())
                } else {
                    Ok(child.clone())
                }
            }
            None => {
                if self.visited.insert(child) {
                    self.pending.push(child);
                }
                Ok(child.clone())
            }
        }
    }

    fn artifact(&self, id: &TargetIdentifier) -> Result<&'a GraphDependency> {
        let path = self.precompiled_artifacts.get(id).ok_or_else(|| GraphError::MissingTarget {
            name: id.name.clone(),
            path: id.path.clone(),
        })?;
        Ok(self.artifacts.get(path).ok_or_else(|| GraphError::ArtifactNotFound {
            path: path.clone(),
        })?)
    }

    fn add_edge(
        &mut self,
        from: GraphDependency,
        to: GraphDependency,
        condition: Option<PlatformCondition>,
    ) {
        if from != to {
            self.builder.conditional_dependency(from, to, condition);
        }
    }
}
