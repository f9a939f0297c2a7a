//! Platform conditions along paths and emitter references.

use petgraph::graph::NodeIndex;
use std::collections::HashSet;

use super::GraphTraverser;
use crate::graph::{
    BinaryLinking, CombinationResult, GraphDependency, GraphDependencyReference, GraphEdge,
    PackageProductKind, Product,
};

impl<'g> GraphTraverser<'g> {
    /// The condition under which `from` depends on `to`, directly or transitively.
    ///
    /// Conditions intersect along a path and union across alternative paths:
    /// with `A -[ios]-> B -> C` and `A -[macos]-> D -> C`, `A` depends on `C` on
    /// iOS and macOS. When no path is satisfiable on any platform the result is
    /// [`CombinationResult::Incompatible`].
    #[must_use]
    pub fn combined_condition(
        &self,
        to: &GraphDependency,
        from: &GraphDependency,
    ) -> CombinationResult {
        let conditional = self.conditional_nodes();
        if conditional.is_empty() {
            return CombinationResult::Condition(None);
        }
        let to_index = self.graph.index_of(to);
        let from_index = self.graph.index_of(from);
        let touches_conditions = [to_index, from_index]
            .into_iter()
            .flatten()
            .any(|index| conditional.contains(&index));
        if !touches_conditions {
            return CombinationResult::Condition(None);
        }

        match (from_index, to_index) {
            (Some(from_index), Some(to_index)) => {
                self.combined_condition_between(from_index, to_index, conditional)
            }
            _ => CombinationResult::Incompatible,
        }
    }

    fn combined_condition_between(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        conditional: &HashSet<NodeIndex>,
    ) -> CombinationResult {
        if !conditional.contains(&from) && !conditional.contains(&to) {
            return CombinationResult::Condition(None);
        }

        let graph = self.graph.inner();
        let key = GraphEdge::new(graph[from].clone(), graph[to].clone());
        if let Some(cached) = self.condition_cache.get(&key) {
            return cached;
        }

        let result = if let Some(edge) = graph.find_edge(from, to) {
            CombinationResult::Condition(graph[edge].clone())
        } else {
            self.graph
                .children(from)
                .map(|child| {
                    let edge_condition =
                        graph.find_edge(from, child).and_then(|edge| graph[edge].as_ref());
                    match self.combined_condition_between(child, to, conditional) {
                        CombinationResult::Incompatible => CombinationResult::Incompatible,
                        CombinationResult::Condition(Some(condition)) => {
                            condition.intersection(edge_condition)
                        }
                        CombinationResult::Condition(None) => {
                            CombinationResult::Condition(edge_condition.cloned())
                        }
                    }
                })
                .fold(CombinationResult::Incompatible, CombinationResult::combine_with)
        };

        self.condition_cache.set(key, result.clone());
        result
    }

    /// Endpoints of conditional edges and everything reachable from them.
    fn conditional_nodes(&self) -> &HashSet<NodeIndex> {
        self.conditional_nodes.get_or_init(|| {
            let graph = self.graph.inner();
            let mut nodes = HashSet::new();
            let mut stack: Vec<NodeIndex> = graph
                .edge_indices()
                .filter(|&edge| graph[edge].is_some())
                .filter_map(|edge| graph.edge_endpoints(edge))
                .flat_map(|(from, to)| [from, to])
                .collect();
            while let Some(node) = stack.pop() {
                if nodes.insert(node) {
                    stack.extend(graph.neighbors(node));
                }
            }
            nodes
        })
    }

    /// The reference an emitter uses for `to` when generating `from`.
    ///
    /// Returns `None` when `to` is unreachable from `from` on every platform, for
    /// package products that are not embedded, and for unknown targets.
    #[must_use]
    pub fn dependency_reference(
        &self,
        to: &GraphDependency,
        from: &GraphDependency,
    ) -> Option<GraphDependencyReference> {
        let CombinationResult::Condition(condition) = self.combined_condition(to, from) else {
            return None;
        };

        let reference = match to {
            GraphDependency::Framework(info) => GraphDependencyReference::Framework {
                path: info.path.clone(),
                binary_path: info.binary_path.clone(),
                dsym_path: info.dsym_path.clone(),
                linking: info.linking,
                architectures: info.architectures.clone(),
                product: match info.linking {
                    BinaryLinking::Static => Product::StaticFramework,
                    BinaryLinking::Dynamic => Product::Framework,
                },
                status: info.status,
                condition,
            },
            GraphDependency::Library(info) => GraphDependencyReference::Library {
                path: info.path.clone(),
                linking: info.linking,
                architectures: info.architectures.clone(),
                product: match info.linking {
                    BinaryLinking::Static => Product::StaticLibrary,
                    BinaryLinking::Dynamic => Product::DynamicLibrary,
                },
                condition,
            },
            GraphDependency::XcFramework(info) => GraphDependencyReference::XcFramework {
                path: info.path.clone(),
                linking: info.linking,
                status: info.status,
                condition,
            },
            GraphDependency::Bundle {
                path,
            } => GraphDependencyReference::Bundle {
                path: path.clone(),
                condition,
            },
            GraphDependency::PackageProduct {
                product,
                kind: PackageProductKind::RuntimeEmbedded,
                ..
            } => GraphDependencyReference::PackageProduct {
                product: product.clone(),
                condition,
            },
            GraphDependency::PackageProduct {
                ..
            } => return None,
            GraphDependency::Sdk {
                path,
                status,
                source,
                ..
            } => GraphDependencyReference::Sdk {
                path: path.clone(),
                status: *status,
                source: *source,
                condition,
            },
            GraphDependency::Target {
                status,
                ..
            } => {
                let target = self.target_from(to)?;
                GraphDependencyReference::Product {
                    target: target.target.name.clone(),
                    product_name: target.target.product_name_with_extension(),
                    status: *status,
                    condition,
                }
            }
        };
        Some(reference)
    }

    /// References for a set of nodes, dropping the unreachable ones.
    pub(super) fn references<'a>(
        &self,
        dependencies: impl IntoIterator<Item = &'a GraphDependency>,
        from: &GraphDependency,
    ) -> Vec<GraphDependencyReference> {
        dependencies
            .into_iter()
            .filter_map(|dependency| self.dependency_reference(dependency, from))
            .collect()
    }
}
