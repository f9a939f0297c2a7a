//! Graph construction from project descriptors

use std::path::Path;

use xcgraph::core::{GraphError, user_friendly_error};
use xcgraph::graph::{
    BinaryLinking, FrameworkInfo, GraphDependency, LinkingStatus, PlatformCondition,
    PlatformFilter, Product, Target, TargetDependency,
};
use xcgraph::test_utils::init_test_logging;
use xcgraph::traverser::GraphTraverser;

use crate::common::{descriptor, load};

const APP: &str = "/Workspace/App";
const DEPENDENCIES: &str = "/Workspace/Dependencies";

fn ios() -> Option<PlatformCondition> {
    PlatformCondition::when([PlatformFilter::Ios])
}

fn cycle_of(error: &anyhow::Error) -> Vec<String> {
    match error.downcast_ref::<GraphError>() {
        Some(GraphError::CircularDependency {
            cycle,
        }) => cycle.iter().map(|id| id.name.clone()).collect(),
        other => panic!("expected a circular dependency, got {other:?}"),
    }
}

#[test]
fn test_workspace_with_external_project() {
    init_test_logging(None);
    let charts = GraphDependency::Framework(FrameworkInfo {
        path: "/Vendor/Charts.framework".into(),
        binary_path: "/Vendor/Charts.framework/Charts".into(),
        dsym_path: None,
        linking: BinaryLinking::Dynamic,
        architectures: vec!["arm64".to_string()],
        status: LinkingStatus::Required,
    });
    let networking = TargetDependency::project("Networking", DEPENDENCIES).when(ios());
    let descriptors = [
        descriptor(
            APP,
            vec![
                Target::new("App", Product::App)
                    .with_dependency(TargetDependency::target("Core"))
                    .with_dependency(networking),
                Target::new("Core", Product::Framework)
                    .with_dependency(TargetDependency::resolved(charts.clone())),
            ],
        ),
        descriptor(DEPENDENCIES, vec![Target::new("Networking", Product::StaticFramework)]),
    ];

    let graph = load(&descriptors).unwrap();

    assert_eq!(graph.projects().len(), 2);
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 3);
    let app = GraphDependency::target("App", APP);
    let networking = GraphDependency::target("Networking", DEPENDENCIES);
    assert_eq!(graph.condition(&app, &networking), ios().as_ref());
    assert!(graph.has_edge(&GraphDependency::target("Core", APP), &charts));

    let traverser = GraphTraverser::new(&graph);
    let roots: Vec<_> =
        traverser.root_targets().into_iter().map(|target| target.target.name.clone()).collect();
    assert_eq!(roots, vec!["App".to_string(), "Core".to_string()]);

    let json = graph.to_json().unwrap();
    assert!(json.contains("Networking"));
    assert!(json.contains("Charts.framework"));
}

#[test]
fn test_loading_is_deterministic() {
    let descriptors = [descriptor(
        APP,
        vec![
            Target::new("App", Product::App)
                .with_dependency(TargetDependency::target("Feature"))
                .with_dependency(TargetDependency::target("Core")),
            Target::new("Feature", Product::Framework)
                .with_dependency(TargetDependency::target("Core")),
            Target::new("Core", Product::Framework),
        ],
    )];

    assert_eq!(load(&descriptors).unwrap(), load(&descriptors).unwrap());
}

#[test]
fn test_cycle_across_projects_is_reported_in_order() {
    let descriptors = [
        descriptor(
            APP,
            vec![
                Target::new("App", Product::App)
                    .with_dependency(TargetDependency::project("Networking", DEPENDENCIES)),
            ],
        ),
        descriptor(
            DEPENDENCIES,
            vec![
                Target::new("Networking", Product::Framework)
                    .with_dependency(TargetDependency::target("Logging")),
                Target::new("Logging", Product::Framework)
                    .with_dependency(TargetDependency::project("App", APP)),
            ],
        ),
    ];

    let error = load(&descriptors).unwrap_err();
    let cycle = cycle_of(&error);

    assert_eq!(cycle.len(), 4);
    assert_eq!(cycle.first(), cycle.last());
    for name in ["App", "Networking", "Logging"] {
        assert!(cycle.contains(&name.to_string()));
    }
    assert!(error.to_string().contains(" → "));
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let descriptors = [descriptor(
        APP,
        vec![Target::new("App", Product::App).with_dependency(TargetDependency::target("App"))],
    )];

    let error = load(&descriptors).unwrap_err();
    assert_eq!(cycle_of(&error), vec!["App".to_string(), "App".to_string()]);

    let context = user_friendly_error(error);
    assert!(context.suggestion.is_some());
}

#[test]
fn test_missing_target_is_reported_with_suggestion() {
    let descriptors = [descriptor(
        APP,
        vec![Target::new("App", Product::App).with_dependency(TargetDependency::target("Kore"))],
    )];

    let error = load(&descriptors).unwrap_err();
    match error.downcast_ref::<GraphError>() {
        Some(GraphError::MissingTarget {
            name,
            path,
        }) => {
            assert_eq!(name, "Kore");
            assert_eq!(path, Path::new(APP));
        }
        other => panic!("expected a missing target, got {other:?}"),
    }

    let context = user_friendly_error(error);
    assert!(context.suggestion.unwrap().contains(APP));
}

#[test]
fn test_missing_project_is_reported() {
    let descriptors = [descriptor(
        APP,
        vec![
            Target::new("App", Product::App)
                .with_dependency(TargetDependency::project("Networking", DEPENDENCIES)),
        ],
    )];

    let error = load(&descriptors).unwrap_err();
    assert!(matches!(
        error.downcast_ref::<GraphError>(),
        Some(GraphError::MissingProject { path }) if path == Path::new(DEPENDENCIES)
    ));
}
