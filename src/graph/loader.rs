//! Builds a [`Graph`] from project descriptors.
//!
//! Loading starts from the projects a workspace lists and follows cross-project
//! target dependencies to the projects they name, so projects outside the
//! workspace list are pulled in on demand. Target edges are registered with a
//! [`CircularDependencyDetector`] as they are discovered and validated after every
//! project, which reports a cycle as soon as the project closing it is loaded.

use anyhow::Result;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::circular::CircularDependencyDetector;
use super::dependency::GraphDependency;
use super::dependency_graph::{Graph, GraphBuilder};
use super::model::{ProjectDescriptor, TargetDependency, TargetIdentifier, Workspace};
use crate::core::GraphError;

/// Loads graphs from already parsed project descriptors.
pub struct GraphLoader<'a> {
    descriptors: HashMap<&'a Path, &'a ProjectDescriptor>,
}

impl<'a> GraphLoader<'a> {
    /// Create a loader over the given descriptors.
    #[must_use]
    pub fn new(descriptors: &'a [ProjectDescriptor]) -> Self {
        Self {
            descriptors: descriptors
                .iter()
                .map(|descriptor| (descriptor.project.path.as_path(), descriptor))
                .collect(),
        }
    }

    /// Load the graph of a single project.
    ///
    /// The graph is named after the project and its workspace lists only that
    /// project.
    ///
    /// # Errors
    ///
    /// See [`GraphLoader::load_workspace`].
    pub fn load_project(&self, path: &Path) -> Result<Graph> {
        let descriptor = self.descriptor(path)?;
        let workspace =
            Workspace::new(descriptor.project.name.clone(), path, [path.to_path_buf()]);
        self.load_workspace(&workspace)
    }

    /// Load the graph of a workspace.
    ///
    /// # Errors
    ///
    /// - [`GraphError::MissingProject`] if a referenced project has no descriptor
    /// - [`GraphError::MissingTarget`] if a referenced target is not declared
    /// - [`GraphError::UnsupportedDependency`] if a resolved dependency is a target node
    /// - [`GraphError::CircularDependency`] if target dependencies form a cycle
    pub fn load_workspace(&self, workspace: &Workspace) -> Result<Graph> {
        info!(
            "Loading workspace '{}' with {} projects",
            workspace.name,
            workspace.projects.len()
        );

        let mut builder = GraphBuilder::new(workspace.name.clone(), workspace.path.clone());
        builder.workspace(workspace.clone());

        let mut detector = CircularDependencyDetector::new();
        let mut queue: VecDeque<PathBuf> = workspace.projects.iter().cloned().collect();
        let mut seen: HashSet<PathBuf> = queue.iter().cloned().collect();

        while let Some(path) = queue.pop_front() {
            let descriptor = self.descriptor(&path)?;
            debug!(
                "Loading project '{}' ({} targets)",
                descriptor.project.name,
                descriptor.targets.len()
            );
            builder.project(descriptor.project.clone());

            for target in &descriptor.targets {
                builder.target(&path, target.clone());
                let from = GraphDependency::target(target.name.clone(), &path);
                let from_id = TargetIdentifier::new(&path, target.name.clone());

                for dependency in &target.dependencies {
                    match dependency {
                        TargetDependency::Target {
                            name,
                            condition,
                        } => {
                            if descriptor.target(name).is_none() {
                                return Err(GraphError::MissingTarget {
                                    name: name.clone(),
                                    path: path.clone(),
                                }
                                .into());
                            }
                            detector.start(from_id.clone(), TargetIdentifier::new(&path, name));
                            builder.conditional_dependency(
                                from.clone(),
                                GraphDependency::target(name.clone(), &path),
                                condition.clone(),
                            );
                        }
                        TargetDependency::Project {
                            target: name,
                            path: other,
                            condition,
                        } => {
                            if seen.insert(other.clone()) {
                                queue.push_back(other.clone());
                            }
                            detector.start(from_id.clone(), TargetIdentifier::new(other, name));
                            builder.conditional_dependency(
                                from.clone(),
                                GraphDependency::target(name.clone(), other),
                                condition.clone(),
                            );
                        }
                        TargetDependency::Resolved {
                            dependency,
                            condition,
                        } => {
                            if dependency.is_target() {
                                return Err(GraphError::UnsupportedDependency {
                                    description: format!(
                                        "{dependency} declared by '{}' must be declared as a target or project dependency",
                                        target.name
                                    ),
                                }
                                .into());
                            }
                            builder.conditional_dependency(
                                from.clone(),
                                dependency.clone(),
                                condition.clone(),
                            );
                        }
                    }
                }
                detector.complete()?;
            }
        }

        let graph = builder.build()?;
        info!(
            "Loaded graph '{}': {} projects, {} nodes",
            graph.name(),
            graph.projects().len(),
            graph.node_count()
        );
        Ok(graph)
    }

    fn descriptor(&self, path: &Path) -> Result<&'a ProjectDescriptor, GraphError> {
        self.descriptors.get(path).copied().ok_or_else(|| GraphError::MissingProject {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Platform, PlatformCondition, PlatformFilter, Product, Project, Target};

    fn descriptor(path: &str, targets: Vec<Target>) -> ProjectDescriptor {
        ProjectDescriptor {
            project: Project::new(path, path.trim_start_matches('/')),
            targets,
        }
    }

    #[test]
    fn test_follows_cross_project_dependencies() {
        let descriptors = vec![
            descriptor(
                "/App",
                vec![
                    Target::new("App", Product::App)
                        .with_dependency(TargetDependency::project("Core", "/Core")),
                ],
            ),
            descriptor("/Core", vec![Target::new("Core", Product::Framework)]),
        ];
        let loader = GraphLoader::new(&descriptors);
        let graph = loader.load_project(Path::new("/App")).unwrap();

        assert_eq!(graph.projects().len(), 2);
        assert_eq!(graph.workspace().projects, vec![PathBuf::from("/App")]);
        assert_eq!(
            graph.direct_dependencies(&GraphDependency::target("App", "/App")),
            vec![&GraphDependency::target("Core", "/Core")]
        );
    }

    #[test]
    fn test_edge_conditions_are_kept() {
        let ios = PlatformCondition::when([PlatformFilter::Ios]);
        let descriptors = vec![descriptor(
            "/App",
            vec![
                Target::new("App", Product::App)
                    .with_platforms([Platform::Ios, Platform::Macos])
                    .with_dependency(TargetDependency::target("Core").when(ios.clone())),
                Target::new("Core", Product::Framework),
            ],
        )];
        let graph = GraphLoader::new(&descriptors).load_project(Path::new("/App")).unwrap();

        assert_eq!(
            graph.condition(
                &GraphDependency::target("App", "/App"),
                &GraphDependency::target("Core", "/App")
            ),
            ios.as_ref()
        );
    }

    #[test]
    fn test_missing_project_is_reported() {
        let descriptors = vec![descriptor(
            "/App",
            vec![
                Target::new("App", Product::App)
                    .with_dependency(TargetDependency::project("Core", "/Missing")),
            ],
        )];
        let error = GraphLoader::new(&descriptors).load_project(Path::new("/App")).unwrap_err();

        match error.downcast_ref::<GraphError>() {
            Some(GraphError::MissingProject {
                path,
            }) => assert_eq!(path, Path::new("/Missing")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_target_is_reported() {
        let descriptors = vec![descriptor(
            "/App",
            vec![
                Target::new("App", Product::App)
                    .with_dependency(TargetDependency::target("Ghost")),
            ],
        )];
        let error = GraphLoader::new(&descriptors).load_project(Path::new("/App")).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<GraphError>(),
            Some(GraphError::MissingTarget { name, .. }) if name == "Ghost"
        ));
    }

    #[test]
    fn test_missing_cross_project_target_is_reported() {
        let descriptors = vec![
            descriptor(
                "/App",
                vec![
                    Target::new("App", Product::App)
                        .with_dependency(TargetDependency::project("Ghost", "/Core")),
                ],
            ),
            descriptor("/Core", vec![Target::new("Core", Product::Framework)]),
        ];
        let error = GraphLoader::new(&descriptors).load_project(Path::new("/App")).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<GraphError>(),
            Some(GraphError::MissingTarget { name, .. }) if name == "Ghost"
        ));
    }

    #[test]
    fn test_cross_project_cycle_is_reported() {
        let descriptors = vec![
            descriptor(
                "/A",
                vec![
                    Target::new("A", Product::Framework)
                        .with_dependency(TargetDependency::project("B", "/B")),
                ],
            ),
            descriptor(
                "/B",
                vec![
                    Target::new("B", Product::Framework)
                        .with_dependency(TargetDependency::project("A", "/A")),
                ],
            ),
        ];
        let error = GraphLoader::new(&descriptors).load_project(Path::new("/A")).unwrap_err();

        match error.downcast_ref::<GraphError>() {
            Some(GraphError::CircularDependency {
                cycle,
            }) => {
                assert_eq!(cycle.len(), 3);
                assert_eq!(cycle.first(), cycle.last());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolved_target_node_is_unsupported() {
        let descriptors = vec![descriptor(
            "/App",
            vec![
                Target::new("App", Product::App).with_dependency(TargetDependency::resolved(
                    GraphDependency::target("Core", "/App"),
                )),
                Target::new("Core", Product::Framework),
            ],
        )];
        let error = GraphLoader::new(&descriptors).load_project(Path::new("/App")).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<GraphError>(),
            Some(GraphError::UnsupportedDependency { .. })
        ));
    }
}
