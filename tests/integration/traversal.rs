//! Link, embed and resource queries on loaded workspaces

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use xcgraph::graph::{
    GraphDependencyReference, PlatformCondition, PlatformFilter, Product, Target,
    TargetDependency,
};
use xcgraph::test_utils::test_sdk;
use xcgraph::traverser::{ConditionCache, GraphTraverser};

use crate::common::{descriptor, load};

const APP: &str = "/Workspace/App";

fn ios() -> Option<PlatformCondition> {
    PlatformCondition::when([PlatformFilter::Ios])
}

fn products(references: &BTreeSet<GraphDependencyReference>) -> BTreeSet<String> {
    references
        .iter()
        .filter_map(|reference| match reference {
            GraphDependencyReference::Product {
                product_name,
                ..
            } => Some(product_name.clone()),
            _ => None,
        })
        .collect()
}

fn names<const N: usize>(names: [&str; N]) -> BTreeSet<String> {
    names.into_iter().map(str::to_string).collect()
}

/// App links a conditional dynamic framework and a chain of static libraries, and
/// both the app and the framework ship a resource bundle.
fn workspace() -> xcgraph::graph::Graph {
    let descriptors = [descriptor(
        APP,
        vec![
            Target::new("App", Product::App)
                .with_dependency(TargetDependency::target("Feature").when(ios()))
                .with_dependency(TargetDependency::target("Storage"))
                .with_dependency(TargetDependency::target("AppResources")),
            Target::new("Feature", Product::Framework)
                .with_dependency(TargetDependency::target("FeatureResources")),
            Target::new("FeatureResources", Product::Bundle),
            Target::new("AppResources", Product::Bundle),
            Target::new("Storage", Product::StaticLibrary)
                .with_dependency(TargetDependency::target("Models")),
            Target::new("Models", Product::StaticLibrary)
                .with_dependency(TargetDependency::resolved(test_sdk("CoreData.framework"))),
        ],
    )];
    load(&descriptors).unwrap()
}

#[test]
fn test_app_link_phase() {
    let graph = workspace();
    let traverser = GraphTraverser::new(&graph);
    let app = Path::new(APP);

    let linked = traverser.linkable_dependencies(app, "App");

    assert_eq!(products(&linked), names(["Feature.framework", "libModels.a", "libStorage.a"]));
    let sdks: Vec<_> = linked.iter().filter_map(GraphDependencyReference::path).collect();
    assert_eq!(sdks, vec![Path::new("/System/Library/Frameworks/CoreData.framework")]);

    let feature = linked.iter().find(|reference| {
        matches!(reference, GraphDependencyReference::Product { target, .. } if target == "Feature")
    });
    assert_eq!(feature.and_then(GraphDependencyReference::condition), ios().as_ref());
}

#[test]
fn test_app_embed_and_resource_phases() {
    let graph = workspace();
    let traverser = GraphTraverser::new(&graph);
    let app = Path::new(APP);

    let embedded = traverser.embeddable_frameworks(app, "App");
    assert_eq!(products(&embedded), names(["Feature.framework"]));
    assert_eq!(
        products(&traverser.resource_bundle_dependencies(app, "App")),
        names(["AppResources.bundle"])
    );
    assert_eq!(
        products(&traverser.resource_bundle_dependencies(app, "Feature")),
        names(["FeatureResources.bundle"])
    );
    assert!(traverser.embeddable_frameworks(app, "Storage").is_empty());
}

#[test]
fn test_topological_order_of_loaded_workspace() {
    let graph = workspace();
    let traverser = GraphTraverser::new(&graph);

    let order: Vec<String> = traverser
        .all_targets_topological_sorted()
        .unwrap()
        .into_iter()
        .map(|target| target.target.name.clone())
        .collect();
    let position = |name: &str| order.iter().position(|candidate| candidate == name).unwrap();

    assert_eq!(order.len(), 6);
    assert!(position("Models") < position("Storage"));
    assert!(position("Storage") < position("App"));
    assert!(position("FeatureResources") < position("Feature"));
    assert!(position("Feature") < position("App"));
}

#[test]
fn test_concurrent_queries_share_one_traverser() {
    let graph = workspace();
    let cache = Arc::new(ConditionCache::new());
    let traverser = GraphTraverser::with_condition_cache(&graph, Arc::clone(&cache));
    let app = Path::new(APP);

    let expected = GraphTraverser::new(&graph).linkable_dependencies(app, "App");

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| traverser.linkable_dependencies(app, "App")))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });

    assert!(!cache.is_empty());
}
