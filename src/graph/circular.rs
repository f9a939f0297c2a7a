//! Incremental cycle detection for target dependencies.
//!
//! Graph construction registers target-to-target edges one at a time with
//! [`CircularDependencyDetector::start`] and periodically validates them with
//! [`CircularDependencyDetector::complete`]. Projects may be loaded in any order
//! and partially, so nodes are created lazily by `start`.
//!
//! Validation is a depth-first search over an explicit stack. Nodes whose whole
//! subtree was already proven acyclic are remembered as *inspected* and never
//! explored again, so repeated `complete` calls stay cheap. Registering an edge
//! from an inspected node invalidates that node and every inspected node that
//! reaches it.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use super::model::TargetIdentifier;
use crate::core::GraphError;

/// Validates that registered target dependencies are acyclic.
#[derive(Debug, Default)]
pub struct CircularDependencyDetector {
    graph: DiGraph<TargetIdentifier, ()>,
    node_map: HashMap<TargetIdentifier, NodeIndex>,
    inspected: HashSet<NodeIndex>,
}

struct Frame {
    node: NodeIndex,
    children: Vec<NodeIndex>,
    next: usize,
}

impl CircularDependencyDetector {
    /// Create an empty detector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_node(&mut self, id: TargetIdentifier) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&id) {
            index
        } else {
            let index = self.graph.add_node(id.clone());
            self.node_map.insert(id, index);
            index
        }
    }

    /// Register the edge `from → to`. No validation happens here.
    pub fn start(&mut self, from: TargetIdentifier, to: TargetIdentifier) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);

        if self.graph.contains_edge(from_idx, to_idx) {
            return;
        }
        self.graph.add_edge(from_idx, to_idx, ());
        self.invalidate(from_idx);
    }

    /// Drop the inspected mark of `node` and of every inspected node reaching it.
    ///
    /// Inspected nodes only have inspected descendants, so the walk can stop at
    /// the first node that is not inspected.
    fn invalidate(&mut self, node: NodeIndex) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if !self.inspected.remove(&current) {
                continue;
            }
            stack.extend(self.graph.neighbors_directed(current, Direction::Incoming));
        }
    }

    /// Validate every registered node not yet proven cycle-free.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CircularDependency`] with the cycle in traversal order.
    /// The first and last element of the reported cycle are the same target.
    pub fn complete(&mut self) -> Result<(), GraphError> {
        let roots: Vec<NodeIndex> = self.graph.node_indices().collect();
        for root in roots {
            if self.inspected.contains(&root) {
                continue;
            }
            self.visit(root)?;
        }
        debug!("Validated {} targets, no circular dependency", self.inspected.len());
        Ok(())
    }

    fn children(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        // registration order
        children.sort_unstable();
        children
    }

    fn visit(&mut self, root: NodeIndex) -> Result<(), GraphError> {
        let mut path = vec![root];
        let mut on_path = HashSet::from([root]);
        let mut stack = vec![Frame {
            node: root,
            children: self.children(root),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.next == frame.children.len() {
                let node = frame.node;
                stack.pop();
                path.pop();
                on_path.remove(&node);
                self.inspected.insert(node);
                continue;
            }

            let child = frame.children[frame.next];
            frame.next += 1;

            if on_path.contains(&child) {
                let start = path.iter().position(|&n| n == child).unwrap_or(0);
                let mut cycle: Vec<TargetIdentifier> =
                    path[start..].iter().map(|&n| self.graph[n].clone()).collect();
                cycle.push(self.graph[child].clone());
                debug!("Circular dependency found through {} targets", cycle.len() - 1);
                return Err(GraphError::CircularDependency {
                    cycle,
                });
            }
            if self.inspected.contains(&child) {
                trace!("Skipping inspected target {}", self.graph[child]);
                continue;
            }

            path.push(child);
            on_path.insert(child);
            let children = self.children(child);
            stack.push(Frame {
                node: child,
                children,
                next: 0,
            });
        }

        Ok(())
    }

    /// Number of registered targets.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> TargetIdentifier {
        TargetIdentifier::new("/project", name)
    }

    fn cycle_names(error: GraphError) -> Vec<String> {
        match error {
            GraphError::CircularDependency {
                cycle,
            } => cycle.into_iter().map(|id| id.name).collect(),
            other => panic!("expected a circular dependency, got {other:?}"),
        }
    }

    #[test]
    fn test_acyclic_chain() {
        let mut detector = CircularDependencyDetector::new();
        detector.start(id("A"), id("B"));
        detector.start(id("B"), id("C"));
        assert!(detector.complete().is_ok());
        assert_eq!(detector.node_count(), 3);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut detector = CircularDependencyDetector::new();
        detector.start(id("A"), id("B"));
        detector.start(id("A"), id("C"));
        detector.start(id("B"), id("D"));
        detector.start(id("C"), id("D"));
        assert!(detector.complete().is_ok());
    }

    #[test]
    fn test_three_node_cycle() {
        let mut detector = CircularDependencyDetector::new();
        detector.start(id("A"), id("B"));
        detector.start(id("B"), id("C"));
        detector.start(id("C"), id("A"));

        let cycle = cycle_names(detector.complete().unwrap_err());
        assert_eq!(cycle, vec!["A", "B", "C", "A"]);
    }

    #[test]
    fn test_self_loop() {
        let mut detector = CircularDependencyDetector::new();
        detector.start(id("A"), id("A"));

        let cycle = cycle_names(detector.complete().unwrap_err());
        assert_eq!(cycle, vec!["A", "A"]);
    }

    #[test]
    fn test_cycle_not_reachable_from_first_root_is_trimmed() {
        let mut detector = CircularDependencyDetector::new();
        detector.start(id("Root"), id("B"));
        detector.start(id("B"), id("C"));
        detector.start(id("C"), id("B"));

        let cycle = cycle_names(detector.complete().unwrap_err());
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle, vec!["B", "C", "B"]);
    }

    #[test]
    fn test_edge_added_after_complete_invalidates_inspected_nodes() {
        let mut detector = CircularDependencyDetector::new();
        detector.start(id("A"), id("B"));
        detector.start(id("B"), id("C"));
        assert!(detector.complete().is_ok());

        // C was proven cycle-free, closing the loop must still be detected
        detector.start(id("C"), id("A"));
        let cycle = cycle_names(detector.complete().unwrap_err());
        assert_eq!(cycle.len(), 4);
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn test_same_names_in_different_projects_are_distinct() {
        let mut detector = CircularDependencyDetector::new();
        detector.start(TargetIdentifier::new("/a", "Core"), TargetIdentifier::new("/b", "Core"));
        assert!(detector.complete().is_ok());
    }

    #[test]
    fn test_complete_on_empty_detector() {
        let mut detector = CircularDependencyDetector::new();
        assert!(detector.complete().is_ok());
    }
}
