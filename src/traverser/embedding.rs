//! Frameworks copied into a product bundle, and resources copied next to them.

use std::collections::BTreeSet;
use std::path::Path;

use super::GraphTraverser;
use crate::graph::{GraphDependencyReference, LinkingStatus, Product};

impl GraphTraverser<'_> {
    /// Dynamic frameworks the target embeds into its bundle.
    ///
    /// Collection stops at products that embed their own frameworks (apps, test
    /// bundles, watch extensions). A unit test bundle embeds only what its host
    /// app does not, and nothing when it has no host.
    #[must_use]
    pub fn embeddable_frameworks(
        &self,
        path: &Path,
        name: &str,
    ) -> BTreeSet<GraphDependencyReference> {
        let (Some(target), Some(from)) = (self.target(path, name), self.target_node(path, name))
        else {
            return BTreeSet::new();
        };
        if !target.target.can_embed_frameworks() {
            return BTreeSet::new();
        }

        let mut references = BTreeSet::new();

        let precompiled = self.filter_dependencies(
            [from],
            |dependency| dependency.is_precompiled_dynamic_and_linkable(),
            |dependency| self.can_dependency_embed_binaries(dependency),
        );
        form_union_preferring_required(&mut references, self.references(precompiled, from));

        let targets = self.filter_dependencies(
            [from],
            |dependency| self.is_embeddable_dependency_target(dependency),
            |dependency| self.can_dependency_embed_binaries(dependency),
        );
        form_union_preferring_required(&mut references, self.references(targets, from));

        if target.target.product == Product::UnitTests {
            match self.unit_test_host(path, name) {
                Some(host) => {
                    let hosted = self.embeddable_frameworks(host.path, &host.target.name);
                    references.retain(|reference| !hosted.contains(reference));
                }
                None => references.clear(),
            }
        }

        references
    }

    /// Resource bundles the target copies into its product.
    ///
    /// Local bundle targets stop at the first target that hosts resources itself.
    /// Precompiled bundles, and bundles of external projects when the target
    /// embeds bundles, stop at the first target that embeds bundles.
    #[must_use]
    pub fn resource_bundle_dependencies(
        &self,
        path: &Path,
        name: &str,
    ) -> BTreeSet<GraphDependencyReference> {
        let (Some(target), Some(from)) = (self.target(path, name), self.target_node(path, name))
        else {
            return BTreeSet::new();
        };
        if !target.target.can_host_resources() {
            return BTreeSet::new();
        }

        let local = self.filter_dependencies(
            [from],
            |dependency| {
                self.is_dependency_resource_bundle(dependency)
                    && !(self.is_dependency_external(dependency) || dependency.is_precompiled())
            },
            |dependency| self.test_target(dependency, |target| target.can_host_resources()),
        );
        let external = self.filter_dependencies(
            [from],
            |dependency| {
                self.is_dependency_resource_bundle(dependency)
                    && (dependency.is_precompiled()
                        || (self.is_dependency_external(dependency)
                            && target.target.can_embed_bundles()))
            },
            |dependency| self.can_dependency_embed_bundles(dependency),
        );

        self.references(local.union(&external).copied(), from).into_iter().collect()
    }

    /// Products copied into the target's product directory: static dependencies of
    /// static targets, apps and app extensions of other projects, and resource
    /// bundles.
    #[must_use]
    pub fn copy_product_dependencies(
        &self,
        path: &Path,
        name: &str,
    ) -> BTreeSet<GraphDependencyReference> {
        let Some(target) = self.target(path, name) else {
            return BTreeSet::new();
        };
        let mut references = BTreeSet::new();

        if target.target.product.is_static() {
            references.extend(self.direct_static_dependencies(path, name));
            references.extend(self.static_precompiled_xcframeworks_dependencies(path, name));
        }

        references.extend(
            self.direct_target_dependencies(path, name)
                .into_iter()
                .filter(|reference| reference.target.path != path)
                .filter(|reference| {
                    matches!(reference.target.target.product, Product::App | Product::AppExtension)
                })
                .map(|reference| GraphDependencyReference::Product {
                    target: reference.target.target.name.clone(),
                    product_name: reference.target.target.product_name_with_extension(),
                    status: LinkingStatus::Required,
                    condition: None,
                }),
        );
        references.extend(self.resource_bundle_dependencies(path, name));

        references
    }
}

/// Merge `other` into `references`. A framework or xcframework already present
/// with the same path is replaced only when the new reference is required and
/// the existing one optional.
fn form_union_preferring_required(
    references: &mut BTreeSet<GraphDependencyReference>,
    other: impl IntoIterator<Item = GraphDependencyReference>,
) {
    for reference in other {
        let existing =
            references.iter().find(|existing| existing.has_same_path(&reference)).cloned();
        match existing {
            Some(existing) => {
                if reference.linking_status() == Some(LinkingStatus::Required)
                    && existing.linking_status() == Some(LinkingStatus::Optional)
                {
                    references.remove(&existing);
                    references.insert(reference);
                }
            }
            None => {
                references.insert(reference);
            }
        }
    }
}
