//! Project, target and workspace descriptors.
//!
//! These values are supplied by the manifest loading stage and are read-only for
//! the graph engine. The only change the engine ever makes is tagging targets that
//! were replaced by a cached binary but kept for reference.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use super::condition::{Platform, PlatformCondition};
use super::dependency::GraphDependency;

/// Tag added to targets whose product is provided by a cached binary while their
/// sources stay in the graph.
pub const BINARY_SOURCES_TAG: &str = "binary-sources";

/// The product a target builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Product {
    /// Application
    App,
    /// App Clip
    AppClip,
    /// Static library
    StaticLibrary,
    /// Dynamic library
    DynamicLibrary,
    /// Dynamic framework
    Framework,
    /// Static framework
    StaticFramework,
    /// Unit test bundle
    UnitTests,
    /// UI test bundle
    UiTests,
    /// Resource or loadable bundle
    Bundle,
    /// Command line tool
    CommandLineTool,
    /// App extension
    AppExtension,
    /// ExtensionKit extension
    ExtensionKitExtension,
    /// watchOS application
    Watch2App,
    /// watchOS extension
    Watch2Extension,
    /// tvOS top shelf extension
    TvTopShelfExtension,
    /// iMessage extension
    MessagesExtension,
    /// Sticker pack extension
    StickerPackExtension,
    /// macOS system extension
    SystemExtension,
    /// XPC service
    Xpc,
}

impl Product {
    /// Static libraries and static frameworks.
    #[must_use]
    pub const fn is_static(self) -> bool {
        matches!(self, Self::StaticLibrary | Self::StaticFramework)
    }

    /// Dynamic libraries and dynamic frameworks.
    #[must_use]
    pub const fn is_dynamic(self) -> bool {
        matches!(self, Self::DynamicLibrary | Self::Framework)
    }

    /// Unit and UI test bundles.
    #[must_use]
    pub const fn tests_bundle(self) -> bool {
        matches!(self, Self::UnitTests | Self::UiTests)
    }

    /// Products that can be launched.
    #[must_use]
    pub const fn runnable(self) -> bool {
        matches!(self, Self::App | Self::AppClip | Self::CommandLineTool | Self::Watch2App)
    }

    /// Products that can act as a unit test host.
    #[must_use]
    pub const fn can_host_tests(self) -> bool {
        matches!(self, Self::App | Self::AppClip)
    }

    /// File name of the built product for the given product name.
    #[must_use]
    pub fn file_name(self, product_name: &str) -> String {
        match self {
            Self::App | Self::AppClip | Self::Watch2App => format!("{product_name}.app"),
            Self::StaticLibrary => format!("lib{product_name}.a"),
            Self::DynamicLibrary => format!("lib{product_name}.dylib"),
            Self::Framework | Self::StaticFramework => format!("{product_name}.framework"),
            Self::UnitTests | Self::UiTests => format!("{product_name}.xctest"),
            Self::Bundle => format!("{product_name}.bundle"),
            Self::CommandLineTool => product_name.to_string(),
            Self::AppExtension
            | Self::ExtensionKitExtension
            | Self::Watch2Extension
            | Self::TvTopShelfExtension
            | Self::MessagesExtension
            | Self::StickerPackExtension => format!("{product_name}.appex"),
            Self::SystemExtension => format!("{product_name}.systemextension"),
            Self::Xpc => format!("{product_name}.xpc"),
        }
    }
}

/// Identifies a target by the path of its project and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetIdentifier {
    /// Path of the project declaring the target
    pub path: PathBuf,
    /// Target name
    pub name: String,
}

impl TargetIdentifier {
    /// Create a new identifier.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// The graph node of this target.
    #[must_use]
    pub fn to_dependency(&self) -> GraphDependency {
        GraphDependency::target(self.name.clone(), self.path.clone())
    }
}

impl fmt::Display for TargetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.name)
    }
}

/// A dependency as declared by a target, before graph construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TargetDependency {
    /// A target of the same project
    Target {
        /// Target name
        name: String,
        /// Platform restriction of the edge
        #[serde(default)]
        condition: Option<PlatformCondition>,
    },
    /// A target of another project
    Project {
        /// Target name
        target: String,
        /// Path of the other project
        path: PathBuf,
        /// Platform restriction of the edge
        #[serde(default)]
        condition: Option<PlatformCondition>,
    },
    /// A dependency already resolved to a graph node: SDK, precompiled binary,
    /// bundle or package product.
    Resolved {
        /// The resolved node
        dependency: GraphDependency,
        /// Platform restriction of the edge
        #[serde(default)]
        condition: Option<PlatformCondition>,
    },
}

impl TargetDependency {
    /// A same-project target dependency without condition.
    pub fn target(name: impl Into<String>) -> Self {
        Self::Target {
            name: name.into(),
            condition: None,
        }
    }

    /// A cross-project target dependency without condition.
    pub fn project(target: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Project {
            target: target.into(),
            path: path.into(),
            condition: None,
        }
    }

    /// A resolved node dependency without condition.
    #[must_use]
    pub const fn resolved(dependency: GraphDependency) -> Self {
        Self::Resolved {
            dependency,
            condition: None,
        }
    }

    /// Restrict the dependency to a platform condition.
    #[must_use]
    pub fn when(mut self, new_condition: Option<PlatformCondition>) -> Self {
        match &mut self {
            Self::Target {
                condition,
                ..
            }
            | Self::Project {
                condition,
                ..
            }
            | Self::Resolved {
                condition,
                ..
            } => *condition = new_condition,
        }
        self
    }
}

/// A buildable unit declared by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Target name, unique within its project
    pub name: String,
    /// Built product
    pub product: Product,
    /// Product name, defaults to the target name
    pub product_name: String,
    /// Platforms the target supports
    #[serde(default)]
    pub platforms: BTreeSet<Platform>,
    /// Whether the target ships resources
    #[serde(default)]
    pub contains_resources: bool,
    /// Whether the product is built mergeable
    #[serde(default)]
    pub mergeable: bool,
    /// Free-form metadata tags
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Declared dependencies
    #[serde(default)]
    pub dependencies: Vec<TargetDependency>,
}

impl Target {
    /// Create a target whose product name equals its name.
    pub fn new(name: impl Into<String>, product: Product) -> Self {
        let name = name.into();
        Self {
            product_name: name.clone(),
            name,
            product,
            platforms: BTreeSet::new(),
            contains_resources: false,
            mergeable: false,
            tags: BTreeSet::new(),
            dependencies: Vec::new(),
        }
    }

    /// Set the supported platforms.
    #[must_use]
    pub fn with_platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> Self {
        self.platforms = platforms.into_iter().collect();
        self
    }

    /// Add a declared dependency.
    #[must_use]
    pub fn with_dependency(mut self, dependency: TargetDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Mark the target as shipping resources.
    #[must_use]
    pub const fn with_resources(mut self) -> Self {
        self.contains_resources = true;
        self
    }

    /// File name of the built product.
    #[must_use]
    pub fn product_name_with_extension(&self) -> String {
        self.product.file_name(&self.product_name)
    }

    /// Whether static products are linked into this target's binary rather than
    /// passed on to its dependents.
    #[must_use]
    pub const fn can_link_static_products(&self) -> bool {
        matches!(
            self.product,
            Product::Framework
                | Product::App
                | Product::CommandLineTool
                | Product::Xpc
                | Product::UnitTests
                | Product::UiTests
                | Product::AppExtension
                | Product::Watch2Extension
                | Product::MessagesExtension
                | Product::AppClip
                | Product::TvTopShelfExtension
                | Product::SystemExtension
                | Product::ExtensionKitExtension
        )
    }

    /// Whether dynamic frameworks are embedded into this target's bundle.
    ///
    /// Bundles only embed frameworks when they target macOS exclusively.
    #[must_use]
    pub fn can_embed_frameworks(&self) -> bool {
        match self.product {
            Product::App
            | Product::Watch2App
            | Product::AppClip
            | Product::UnitTests
            | Product::UiTests
            | Product::Watch2Extension
            | Product::SystemExtension
            | Product::Xpc => true,
            Product::Bundle => {
                self.platforms.len() == 1 && self.platforms.contains(&Platform::Macos)
            }
            _ => false,
        }
    }

    /// Whether resource bundles are copied into this target's product.
    #[must_use]
    pub const fn can_embed_bundles(&self) -> bool {
        matches!(
            self.product,
            Product::App
                | Product::AppExtension
                | Product::ExtensionKitExtension
                | Product::Watch2App
                | Product::AppClip
                | Product::UnitTests
                | Product::UiTests
                | Product::Watch2Extension
                | Product::SystemExtension
                | Product::Xpc
        )
    }

    /// Whether the product can carry resources at all.
    #[must_use]
    pub const fn supports_resources(&self) -> bool {
        !matches!(
            self.product,
            Product::CommandLineTool
                | Product::DynamicLibrary
                | Product::StaticLibrary
                | Product::SystemExtension
                | Product::Xpc
        )
    }

    /// Whether resource bundles reaching this target stop here. Static frameworks
    /// only host resources they ship themselves.
    #[must_use]
    pub fn can_host_resources(&self) -> bool {
        self.supports_resources()
            && (self.product != Product::StaticFramework || self.contains_resources)
    }

    /// Whether the target carries the binary-sources tag.
    #[must_use]
    pub fn is_binary_shadowed(&self) -> bool {
        self.tags.contains(BINARY_SOURCES_TAG)
    }
}

/// Whether a project belongs to the user or was imported from a dependency manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    /// A project of the workspace
    #[default]
    Local,
    /// A project generated for an external dependency
    External,
}

/// A scheme of a project or workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheme {
    /// Scheme name
    pub name: String,
    /// Targets built by the scheme
    #[serde(default)]
    pub build_targets: Vec<TargetIdentifier>,
    /// Targets tested by the scheme
    #[serde(default)]
    pub test_targets: Vec<TargetIdentifier>,
    /// Executable launched by the run action
    #[serde(default)]
    pub run_executable: Option<TargetIdentifier>,
}

/// A project registered in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Directory of the project
    pub path: PathBuf,
    /// Project name
    pub name: String,
    /// Local or external
    #[serde(default)]
    pub kind: ProjectKind,
    /// Project schemes
    #[serde(default)]
    pub schemes: Vec<Scheme>,
}

impl Project {
    /// Create a local project without schemes.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            kind: ProjectKind::Local,
            schemes: Vec::new(),
        }
    }

    /// Whether the project was imported from a dependency manager.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.kind == ProjectKind::External
    }
}

/// A project together with the targets it declares, as produced by manifest loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    /// The project
    pub project: Project,
    /// Declared targets, in declaration order
    #[serde(default)]
    pub targets: Vec<Target>,
}

impl ProjectDescriptor {
    /// The declared target with the given name.
    #[must_use]
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|target| target.name == name)
    }
}

/// Workspace metadata of a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Workspace name
    pub name: String,
    /// Workspace directory
    pub path: PathBuf,
    /// Projects of the workspace, in declaration order
    #[serde(default)]
    pub projects: Vec<PathBuf>,
    /// Workspace schemes
    #[serde(default)]
    pub schemes: Vec<Scheme>,
}

impl Workspace {
    /// Create a workspace listing the given projects.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        projects: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            projects: projects.into_iter().collect(),
            schemes: Vec::new(),
        }
    }
}

/// A target borrowed from a graph together with its project.
#[derive(Debug, Clone, Copy)]
pub struct GraphTarget<'g> {
    /// Path of the project
    pub path: &'g Path,
    /// The target
    pub target: &'g Target,
    /// The project declaring the target
    pub project: &'g Project,
}

impl GraphTarget<'_> {
    /// The graph node of this target.
    #[must_use]
    pub fn dependency(&self) -> GraphDependency {
        GraphDependency::target(self.target.name.clone(), self.path)
    }

    /// The identifier of this target.
    #[must_use]
    pub fn identifier(&self) -> TargetIdentifier {
        TargetIdentifier::new(self.path, self.target.name.clone())
    }
}

impl PartialEq for GraphTarget<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.target.name == other.target.name
    }
}

impl Eq for GraphTarget<'_> {}

impl PartialOrd for GraphTarget<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GraphTarget<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.path, &self.target.name).cmp(&(other.path, &other.target.name))
    }
}

/// A target reached through an edge, with the edge's condition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GraphTargetReference<'g> {
    /// The dependency target
    pub target: GraphTarget<'g>,
    /// Condition of the edge leading to it
    pub condition: Option<PlatformCondition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_file_names() {
        assert_eq!(Product::App.file_name("App"), "App.app");
        assert_eq!(Product::StaticLibrary.file_name("Core"), "libCore.a");
        assert_eq!(Product::Framework.file_name("Core"), "Core.framework");
        assert_eq!(Product::UnitTests.file_name("AppTests"), "AppTests.xctest");
        assert_eq!(Product::CommandLineTool.file_name("tool"), "tool");
    }

    #[test]
    fn test_bundle_embeds_frameworks_only_on_macos() {
        let mac = Target::new("Plugin", Product::Bundle).with_platforms([Platform::Macos]);
        let multi = Target::new("Plugin", Product::Bundle)
            .with_platforms([Platform::Macos, Platform::Ios]);
        assert!(mac.can_embed_frameworks());
        assert!(!multi.can_embed_frameworks());
    }

    #[test]
    fn test_static_framework_hosts_resources_only_when_it_has_some() {
        let plain = Target::new("Core", Product::StaticFramework);
        let with_resources = Target::new("Core", Product::StaticFramework).with_resources();
        assert!(!plain.can_host_resources());
        assert!(with_resources.can_host_resources());
        assert!(!Target::new("Lib", Product::StaticLibrary).can_host_resources());
    }

    #[test]
    fn test_static_linking_boundaries() {
        assert!(Target::new("App", Product::App).can_link_static_products());
        assert!(Target::new("Core", Product::Framework).can_link_static_products());
        assert!(!Target::new("Lib", Product::StaticLibrary).can_link_static_products());
        assert!(!Target::new("Core", Product::StaticFramework).can_link_static_products());
    }

    #[test]
    fn test_target_dependency_when() {
        let condition =
            PlatformCondition::when([crate::graph::PlatformFilter::Ios]).unwrap();
        let dependency = TargetDependency::target("Core").when(Some(condition.clone()));
        assert_eq!(
            dependency,
            TargetDependency::Target {
                name: "Core".to_string(),
                condition: Some(condition)
            }
        );
    }
}
