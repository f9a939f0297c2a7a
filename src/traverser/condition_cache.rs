//! Memoized platform-condition combinations.

use dashmap::DashMap;

use crate::graph::{CombinationResult, GraphEdge};

/// Concurrent cache of combined conditions keyed by `(from, to)`.
///
/// Entries are only an optimization: a missing entry is recomputed, so the cache
/// can be cleared at any time. A cache must only be shared between traversers of
/// the same graph.
#[derive(Debug, Default)]
pub struct ConditionCache {
    entries: DashMap<GraphEdge, CombinationResult>,
}

impl ConditionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached result for an edge.
    #[must_use]
    pub fn get(&self, edge: &GraphEdge) -> Option<CombinationResult> {
        self.entries.get(edge).map(|entry| entry.value().clone())
    }

    /// Store the result for an edge.
    pub fn set(&self, edge: GraphEdge, result: CombinationResult) {
        self.entries.insert(edge, result);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
