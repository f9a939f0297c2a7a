//! Settings files driving the cache mutator

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use xcgraph::cache::CacheGraphMutator;
use xcgraph::config::{CacheSettings, GraphConfig};
use xcgraph::core::GraphError;
use xcgraph::graph::{GraphDependency, Product, Target, TargetDependency};

use crate::common::{DirectoryArtifactLoader, TestCache, descriptor, load};

const APP: &str = "/Workspace/App";

#[tokio::test]
async fn test_saved_settings_drive_substitution() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("xcgraph").join("config.toml");
    let config = GraphConfig {
        cache: CacheSettings {
            keep_source_targets: true,
            max_concurrent_loads: 1,
        },
    };
    config.save_to(&path).await.unwrap();

    let loaded = GraphConfig::load_from(&path).await.unwrap();
    assert_eq!(loaded, config);

    let graph = load(&[descriptor(
        APP,
        vec![
            Target::new("App", Product::App).with_dependency(TargetDependency::target("Core")),
            Target::new("Core", Product::Framework),
        ],
    )])
    .unwrap();
    let mut cache = TestCache::new().unwrap();
    cache.store(APP, "Core").unwrap();
    let mutator = CacheGraphMutator::new(Arc::new(DirectoryArtifactLoader::new()))
        .with_settings(&loaded.cache);

    let mapped = mutator
        .map(&graph, cache.artifacts(), &BTreeSet::new(), loaded.cache.keep_source_targets)
        .await
        .unwrap();

    assert!(mapped.target(Path::new(APP), "Core").unwrap().is_binary_shadowed());
    assert!(mapped.has_edge(&GraphDependency::target("App", APP), &cache.node("Core")));
}

#[tokio::test]
async fn test_partial_settings_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    tokio::fs::write(&path, "[cache]\nkeep_source_targets = true\n").await.unwrap();

    let config = GraphConfig::load_from(&path).await.unwrap();

    assert!(config.cache.keep_source_targets);
    assert_eq!(config.cache.max_concurrent_loads, CacheSettings::default().max_concurrent_loads);
}

#[tokio::test]
async fn test_invalid_settings_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    tokio::fs::write(&path, "[cache]\nmax_concurrent_loads = 0\n").await.unwrap();

    let error = GraphConfig::load_from(&path).await.unwrap_err();

    assert!(matches!(error.downcast_ref::<GraphError>(), Some(GraphError::ConfigError { .. })));
}
