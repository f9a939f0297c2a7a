//! Binary cache substitution with artifacts stored on disk

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use xcgraph::cache::CacheGraphMutator;
use xcgraph::core::GraphError;
use xcgraph::graph::{
    Graph, GraphDependency, PlatformCondition, PlatformFilter, Product, Target,
    TargetDependency,
};
use xcgraph::test_utils::{init_test_logging, test_sdk};
use xcgraph::traverser::GraphTraverser;

use crate::common::{DirectoryArtifactLoader, TestCache, descriptor, load};

const APP: &str = "/Workspace/App";

fn ios() -> Option<PlatformCondition> {
    PlatformCondition::when([PlatformFilter::Ios])
}

fn target(name: &str) -> GraphDependency {
    GraphDependency::target(name, APP)
}

fn no_sources() -> BTreeSet<String> {
    BTreeSet::new()
}

/// App depends on B and C, which both depend on D.
fn diamond() -> Graph {
    let descriptors = [descriptor(
        APP,
        vec![
            Target::new("App", Product::App)
                .with_dependency(TargetDependency::target("B"))
                .with_dependency(TargetDependency::target("C")),
            Target::new("B", Product::Framework).with_dependency(TargetDependency::target("D")),
            Target::new("C", Product::Framework).with_dependency(TargetDependency::target("D")),
            Target::new("D", Product::Framework),
        ],
    )];
    load(&descriptors).unwrap()
}

/// App -> A -> B -> C
fn chain() -> Graph {
    let descriptors = [descriptor(
        APP,
        vec![
            Target::new("App", Product::App).with_dependency(TargetDependency::target("A")),
            Target::new("A", Product::Framework).with_dependency(TargetDependency::target("B")),
            Target::new("B", Product::Framework).with_dependency(TargetDependency::target("C")),
            Target::new("C", Product::Framework),
        ],
    )];
    load(&descriptors).unwrap()
}

fn cache_with(names: &[&str]) -> TestCache {
    let mut cache = TestCache::new().unwrap();
    for name in names {
        cache.store(APP, name).unwrap();
    }
    cache
}

#[tokio::test]
async fn test_diamond_is_replaced_by_artifacts() {
    init_test_logging(None);
    let graph = diamond();
    let cache = cache_with(&["B", "C", "D"]);
    let loader = Arc::new(DirectoryArtifactLoader::new());
    let mutator = CacheGraphMutator::new(loader.clone());

    let mapped = mutator.map(&graph, cache.artifacts(), &no_sources(), false).await.unwrap();

    let app_children: BTreeSet<_> =
        mapped.direct_dependencies(&target("App")).into_iter().collect();
    assert_eq!(app_children, BTreeSet::from([&cache.node("B"), &cache.node("C")]));
    assert!(mapped.has_edge(&cache.node("B"), &cache.node("D")));
    assert!(mapped.has_edge(&cache.node("C"), &cache.node("D")));
    for name in ["B", "C", "D"] {
        assert!(!mapped.contains(&target(name)));
        assert!(mapped.target(Path::new(APP), name).is_none());
    }
    assert_eq!(mapped.node_count(), 4);
    assert_eq!(mapped.edge_count(), 4);

    // every artifact path is read exactly once
    assert_eq!(loader.loads(), 3);
}

#[tokio::test]
async fn test_replaced_graph_embeds_artifacts() {
    let graph = diamond();
    let cache = cache_with(&["B", "C", "D"]);
    let mutator = CacheGraphMutator::new(Arc::new(DirectoryArtifactLoader::new()));

    let mapped = mutator.map(&graph, cache.artifacts(), &no_sources(), false).await.unwrap();
    let traverser = GraphTraverser::new(&mapped);

    let embedded: BTreeSet<_> = traverser
        .embeddable_frameworks(Path::new(APP), "App")
        .iter()
        .filter_map(|reference| reference.path().map(Path::to_path_buf))
        .collect();
    let expected: BTreeSet<_> =
        ["B", "C", "D"].iter().map(|name| cache.node(name).path().to_path_buf()).collect();
    assert_eq!(embedded, expected);
}

#[tokio::test]
async fn test_conditions_survive_substitution() {
    let descriptors = [descriptor(
        APP,
        vec![
            Target::new("App", Product::App).with_dependency(TargetDependency::target("B")),
            Target::new("B", Product::Framework)
                .with_dependency(TargetDependency::target("C").when(ios())),
            Target::new("C", Product::Framework),
        ],
    )];
    let graph = load(&descriptors).unwrap();
    let cache = cache_with(&["B", "C"]);
    let mutator = CacheGraphMutator::new(Arc::new(DirectoryArtifactLoader::new()));

    let mapped = mutator.map(&graph, cache.artifacts(), &no_sources(), false).await.unwrap();

    assert!(mapped.has_edge(&target("App"), &cache.node("B")));
    assert_eq!(mapped.condition(&target("App"), &cache.node("B")), None);
    assert_eq!(mapped.condition(&cache.node("B"), &cache.node("C")), ios().as_ref());
}

#[tokio::test]
async fn test_sources_stop_replacement_of_dependents() {
    let graph = chain();
    let cache = cache_with(&["A", "B", "C"]);
    let loader = Arc::new(DirectoryArtifactLoader::new());
    let mutator = CacheGraphMutator::new(loader.clone());
    let sources = BTreeSet::from(["B".to_string()]);

    let mapped = mutator.map(&graph, cache.artifacts(), &sources, false).await.unwrap();

    assert!(mapped.has_edge(&target("App"), &target("A")));
    assert!(mapped.has_edge(&target("A"), &target("B")));
    assert!(mapped.has_edge(&target("B"), &cache.node("C")));
    assert!(!mapped.contains(&target("C")));
    assert_eq!(loader.loads(), 1);
}

#[tokio::test]
async fn test_keep_source_targets_tags_replaced_targets() {
    let graph = chain();
    let cache = cache_with(&["A", "B", "C"]);
    let mutator = CacheGraphMutator::new(Arc::new(DirectoryArtifactLoader::new()));
    let sources = BTreeSet::from(["B".to_string()]);

    let mapped = mutator.map(&graph, cache.artifacts(), &sources, true).await.unwrap();

    let shadowed = mapped.target(Path::new(APP), "C").unwrap();
    assert!(shadowed.is_binary_shadowed());
    assert!(mapped.direct_dependencies(&target("C")).is_empty());
    assert!(mapped.has_edge(&target("B"), &cache.node("C")));
    assert!(!mapped.target(Path::new(APP), "B").unwrap().is_binary_shadowed());
}

#[tokio::test]
async fn test_substitution_is_idempotent() {
    let graph = diamond();
    let cache = cache_with(&["B", "C", "D"]);
    let mutator = CacheGraphMutator::new(Arc::new(DirectoryArtifactLoader::new()));

    for keep_source_targets in [false, true] {
        let once = mutator
            .map(&graph, cache.artifacts(), &no_sources(), keep_source_targets)
            .await
            .unwrap();
        let twice = mutator
            .map(&once, cache.artifacts(), &no_sources(), keep_source_targets)
            .await
            .unwrap();
        assert_eq!(once, twice);
    }
}

#[tokio::test]
async fn test_sdks_pass_through_artifacts() {
    let descriptors = [descriptor(
        APP,
        vec![
            Target::new("App", Product::App).with_dependency(TargetDependency::target("Testing")),
            Target::new("Testing", Product::Framework)
                .with_dependency(TargetDependency::resolved(test_sdk("XCTest.framework"))),
        ],
    )];
    let graph = load(&descriptors).unwrap();
    let cache = cache_with(&["Testing"]);
    let mutator = CacheGraphMutator::new(Arc::new(DirectoryArtifactLoader::new()));

    let mapped = mutator.map(&graph, cache.artifacts(), &no_sources(), false).await.unwrap();

    let xctest = test_sdk("XCTest.framework");
    assert_eq!(mapped.direct_dependencies(&cache.node("Testing")), vec![&xctest]);
    assert!(mapped.has_edge(&target("App"), &cache.node("Testing")));
}

#[tokio::test]
async fn test_missing_artifact_aborts_substitution() {
    let graph = diamond();
    let mut cache = cache_with(&["C", "D"]);
    let missing = cache.store_missing(APP, "B");
    let mutator = CacheGraphMutator::new(Arc::new(DirectoryArtifactLoader::new()));

    let error = mutator.map(&graph, cache.artifacts(), &no_sources(), false).await.unwrap_err();

    assert!(matches!(
        error.downcast_ref::<GraphError>(),
        Some(GraphError::ArtifactNotFound { path }) if *path == missing
    ));
}
