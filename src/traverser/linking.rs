//! What a target passes to the linker, and where the linker looks.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::GraphTraverser;
use crate::graph::{BinaryLinking, GraphDependency, GraphDependencyReference, Product};

impl<'g> GraphTraverser<'g> {
    /// Everything the target's binary links against, excluding static products
    /// its unit test host already links.
    #[must_use]
    pub fn linkable_dependencies(
        &self,
        path: &Path,
        name: &str,
    ) -> BTreeSet<GraphDependencyReference> {
        self.linkable_dependencies_with(path, name, true)
    }

    /// Everything the target's binary links against.
    ///
    /// The result is the union of:
    ///
    /// - SDKs required by the target's static closure
    /// - SDKs the target declares directly
    /// - Precompiled dynamic binaries reachable from its direct precompiled dependencies
    /// - Static xcframeworks with Swift modules linked by those dynamic xcframeworks
    /// - The static closure itself, with the dynamic targets and precompiled binaries
    ///   it depends on
    /// - Dynamic libraries and frameworks built by direct target dependencies
    ///
    /// For a unit test bundle with a host app and `exclude_host_app_dependencies`
    /// set, products of the host's static closure are removed, since the host
    /// already links them.
    #[must_use]
    pub fn linkable_dependencies_with(
        &self,
        path: &Path,
        name: &str,
        exclude_host_app_dependencies: bool,
    ) -> BTreeSet<GraphDependencyReference> {
        let (Some(target), Some(from)) = (self.target(path, name), self.target_node(path, name))
        else {
            return BTreeSet::new();
        };
        let links_static = target.target.can_link_static_products();
        let mut references = BTreeSet::new();

        if links_static {
            let sdks: Vec<_> = self
                .transitive_static_dependencies(from)
                .into_iter()
                .flat_map(|dependency| self.children(dependency))
                .filter(|dependency| dependency.is_sdk())
                .collect();
            references.extend(self.references(sdks, from));
        }

        let direct = self.children(from);
        references.extend(self.references(direct.iter().copied().filter(|d| d.is_sdk()), from));

        let precompiled_dynamic = self.precompiled_dynamic_libraries_and_frameworks(from);
        let static_xcframeworks = self.filter_dependencies(
            precompiled_dynamic.iter().copied().filter(|d| d.as_xcframework().is_some()),
            |dependency| {
                dependency.as_xcframework().is_some_and(|info| {
                    info.linking == BinaryLinking::Static && !info.swift_modules.is_empty()
                })
            },
            |dependency| dependency.as_xcframework().is_none(),
        );
        let static_xcframework_sdks: Vec<_> = static_xcframeworks
            .iter()
            .flat_map(|dependency| self.children(dependency))
            .filter(|dependency| dependency.is_sdk())
            .collect();
        references.extend(self.references(
            precompiled_dynamic
                .iter()
                .chain(static_xcframeworks.iter())
                .chain(static_xcframework_sdks.iter())
                .copied(),
            from,
        ));

        if links_static {
            let static_closure = self.transitive_static_dependencies(from);
            let host_static = match self.unit_test_host(path, name) {
                Some(host)
                    if exclude_host_app_dependencies
                        && target.target.product == Product::UnitTests =>
                {
                    self.transitive_static_dependencies(&host.dependency())
                }
                _ => BTreeSet::new(),
            };

            let dynamic_of_static = static_closure.iter().flat_map(|dependency| {
                self.children(dependency).into_iter().filter(move |child| {
                    child.is_target() && self.is_embeddable_dependency_target(child)
                })
            });
            let precompiled_of_static = static_closure.iter().flat_map(|dependency| {
                self.children(dependency)
                    .into_iter()
                    .filter(|child| child.is_precompiled() && child.is_linkable())
            });
            let closure: BTreeSet<&GraphDependency> = static_closure
                .iter()
                .copied()
                .chain(dynamic_of_static)
                .chain(precompiled_of_static)
                .collect();

            references.extend(self.references(closure, from));
            for reference in self.references(host_static, from) {
                references.remove(&reference);
            }
        }

        let dynamic_targets = direct.iter().copied().filter(|dependency| {
            self.test_target(dependency, |target| {
                matches!(target.product, Product::DynamicLibrary | Product::Framework)
            })
        });
        references.extend(self.references(dynamic_targets, from));

        references
    }

    /// Direct precompiled dependencies and everything reachable from them, limited
    /// to dynamically linked binaries.
    fn precompiled_dynamic_libraries_and_frameworks(
        &self,
        from: &GraphDependency,
    ) -> BTreeSet<&'g GraphDependency> {
        let precompiled: Vec<&'g GraphDependency> =
            self.children(from).into_iter().filter(|d| d.is_precompiled()).collect();
        let reachable = self.filter_dependencies(
            precompiled.iter().copied(),
            |_| true,
            |dependency| {
                dependency.is_target() && self.can_dependency_link_static_products(dependency)
            },
        );

        precompiled
            .into_iter()
            .chain(reachable)
            .filter(|dependency| dependency.is_precompiled_dynamic_and_linkable())
            .collect()
    }

    /// Static xcframeworks without Swift modules that vend module maps, linked by
    /// the target's dynamic xcframeworks.
    #[must_use]
    pub fn static_objc_xcframeworks_linked_by_dynamic_xcframework_dependencies(
        &self,
        path: &Path,
        name: &str,
    ) -> BTreeSet<&'g GraphDependency> {
        let Some(from) = self.target_node(path, name) else {
            return BTreeSet::new();
        };
        let precompiled_dynamic = self.precompiled_dynamic_libraries_and_frameworks(from);
        self.filter_dependencies(
            precompiled_dynamic.into_iter().filter(|d| d.as_xcframework().is_some()),
            |dependency| {
                dependency.as_xcframework().is_some_and(|info| {
                    info.linking == BinaryLinking::Static
                        && info.swift_modules.is_empty()
                        && !info.module_maps.is_empty()
                })
            },
            |dependency| dependency.as_xcframework().is_none(),
        )
    }

    /// Linkable dependencies including the host's, plus static precompiled
    /// frameworks and their dependencies. Used to compute framework search paths.
    #[must_use]
    pub fn searchable_path_dependencies(
        &self,
        path: &Path,
        name: &str,
    ) -> BTreeSet<GraphDependencyReference> {
        let mut references = self.linkable_dependencies_with(path, name, false);
        references.extend(self.static_precompiled_frameworks_dependencies(path, name));
        references
    }

    fn static_precompiled_frameworks_dependencies(
        &self,
        path: &Path,
        name: &str,
    ) -> Vec<GraphDependencyReference> {
        let Some(from) = self.target_node(path, name) else {
            return Vec::new();
        };
        let static_frameworks: Vec<&'g GraphDependency> = self
            .children(from)
            .into_iter()
            .filter(|dependency| dependency.linking() == Some(BinaryLinking::Static))
            .filter(|dependency| matches!(dependency, GraphDependency::Framework(_)))
            .collect();
        let reachable =
            self.filter_dependencies(static_frameworks.iter().copied(), |_| true, |_| false);

        let all: BTreeSet<&GraphDependency> =
            static_frameworks.into_iter().chain(reachable).collect();
        self.references(all, from)
    }

    /// Run path search paths of a unit test bundle without host app: the parent
    /// directories of the precompiled dynamic frameworks it embeds.
    #[must_use]
    pub fn run_path_search_paths(&self, path: &Path, name: &str) -> BTreeSet<PathBuf> {
        let Some(target) = self.target(path, name) else {
            return BTreeSet::new();
        };
        if !target.target.can_embed_frameworks()
            || target.target.product != Product::UnitTests
            || self.unit_test_host(path, name).is_some()
        {
            return BTreeSet::new();
        }
        let Some(from) = self.target_node(path, name) else {
            return BTreeSet::new();
        };

        self.filter_dependencies(
            [from],
            GraphDependency::is_precompiled_dynamic_and_linkable,
            |dependency| self.can_dependency_embed_binaries(dependency),
        )
        .into_iter()
        .filter_map(|dependency| match dependency {
            GraphDependency::Framework(info) => info.path.parent().map(Path::to_path_buf),
            GraphDependency::XcFramework(info) => info.path.parent().map(Path::to_path_buf),
            _ => None,
        })
        .collect()
    }

    /// Direct dependencies on static targets.
    #[must_use]
    pub fn direct_static_dependencies(
        &self,
        path: &Path,
        name: &str,
    ) -> BTreeSet<GraphDependencyReference> {
        let Some(from) = self.target_node(path, name) else {
            return BTreeSet::new();
        };
        let static_targets = self.children(from).into_iter().filter(|dependency| {
            self.test_target(dependency, |target| target.product.is_static())
        });
        self.references(static_targets, from).into_iter().collect()
    }

    /// Static xcframeworks reachable through precompiled static binaries only.
    pub(super) fn static_precompiled_xcframeworks_dependencies(
        &self,
        path: &Path,
        name: &str,
    ) -> Vec<GraphDependencyReference> {
        let Some(from) = self.target_node(path, name) else {
            return Vec::new();
        };
        let xcframeworks = self.filter_dependencies(
            [from],
            |dependency| {
                dependency.as_xcframework().is_some_and(|info| info.linking == BinaryLinking::Static)
            },
            |dependency| {
                !dependency.is_precompiled()
                    || dependency.linking() == Some(BinaryLinking::Dynamic)
            },
        );
        self.references(xcframeworks, from)
    }

    /// Directories holding the libraries the target links.
    #[must_use]
    pub fn libraries_search_paths(&self, path: &Path, name: &str) -> BTreeSet<PathBuf> {
        let Some(from) = self.target_node(path, name) else {
            return BTreeSet::new();
        };
        let direct = self.children(from).into_iter().filter_map(|dependency| match dependency {
            GraphDependency::Library(info) => Some(info.path.clone()),
            _ => None,
        });
        let linked = self.linkable_dependencies_with(path, name, false).into_iter().filter_map(
            |reference| match reference {
                GraphDependencyReference::Library {
                    path,
                    ..
                } => Some(path),
                _ => None,
            },
        );

        direct
            .chain(linked)
            .filter_map(|library| library.parent().map(Path::to_path_buf))
            .collect()
    }

    /// Public header directories of directly linked libraries.
    #[must_use]
    pub fn libraries_public_headers_folders(&self, path: &Path, name: &str) -> BTreeSet<PathBuf> {
        let Some(from) = self.target_node(path, name) else {
            return BTreeSet::new();
        };
        self.children(from)
            .into_iter()
            .filter_map(|dependency| match dependency {
                GraphDependency::Library(info) => Some(info.public_headers.clone()),
                _ => None,
            })
            .collect()
    }

    /// Directories of the Swift module maps of directly linked libraries.
    #[must_use]
    pub fn libraries_swift_include_paths(&self, path: &Path, name: &str) -> BTreeSet<PathBuf> {
        let Some(from) = self.target_node(path, name) else {
            return BTreeSet::new();
        };
        self.children(from)
            .into_iter()
            .filter_map(|dependency| match dependency {
                GraphDependency::Library(info) => info.swift_module_map.as_deref(),
                _ => None,
            })
            .filter_map(|map| map.parent().map(Path::to_path_buf))
            .collect()
    }

    /// Linked, embedded and copied dependencies of every target of a project.
    #[must_use]
    pub fn all_project_dependencies(&self, path: &Path) -> BTreeSet<GraphDependencyReference> {
        let mut references = BTreeSet::new();
        for target in self.targets_at(path) {
            let name = target.target.name.as_str();
            references.extend(self.linkable_dependencies(path, name));
            references.extend(self.embeddable_frameworks(path, name));
            references.extend(self.copy_product_dependencies(path, name));
        }
        references
    }
}
