//! Graph nodes.
//!
//! A [`GraphDependency`] is a closed set of node kinds. Equality, hashing and
//! ordering only look at the identifying fields of a node (its kind, path and,
//! where relevant, name), never at the descriptive payload. Two edges pointing
//! at "the same" framework therefore always resolve to one node in the graph.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// How a binary is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryLinking {
    /// Linked into the consumer's binary
    Static,
    /// Loaded at runtime
    Dynamic,
}

/// Whether a dependency must be present at runtime.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LinkingStatus {
    /// Always linked
    #[default]
    Required,
    /// Weakly linked
    Optional,
}

/// Where an SDK comes from.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SdkSource {
    /// Shipped with the platform SDK
    #[default]
    System,
    /// Shipped with the developer tools (e.g. XCTest)
    Developer,
}

/// The kind of a Swift package product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PackageProductKind {
    /// Linked library product
    Runtime,
    /// Library product that must also be embedded
    RuntimeEmbedded,
    /// Build tool plugin
    Plugin,
    /// Swift macro
    Macro,
}

/// A precompiled `.framework`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    /// Path to the `.framework` directory
    pub path: PathBuf,
    /// Path to the binary inside the framework
    pub binary_path: PathBuf,
    /// Path to the debug symbols, if any
    #[serde(default)]
    pub dsym_path: Option<PathBuf>,
    /// Linking of the binary
    pub linking: BinaryLinking,
    /// Architectures the binary contains
    #[serde(default)]
    pub architectures: Vec<String>,
    /// Linking status
    #[serde(default)]
    pub status: LinkingStatus,
}

/// A precompiled library (`.a` or `.dylib`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryInfo {
    /// Path to the library file
    pub path: PathBuf,
    /// Directory holding the public headers
    pub public_headers: PathBuf,
    /// Linking of the library
    pub linking: BinaryLinking,
    /// Architectures the library contains
    #[serde(default)]
    pub architectures: Vec<String>,
    /// Path to the Swift module map, if any
    #[serde(default)]
    pub swift_module_map: Option<PathBuf>,
}

/// A precompiled `.xcframework`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcFrameworkInfo {
    /// Path to the `.xcframework` directory
    pub path: PathBuf,
    /// Linking of the contained binaries
    pub linking: BinaryLinking,
    /// Linking status
    #[serde(default)]
    pub status: LinkingStatus,
    /// Swift modules vended by the xcframework
    #[serde(default)]
    pub swift_modules: Vec<PathBuf>,
    /// Clang module maps vended by the xcframework
    #[serde(default)]
    pub module_maps: Vec<PathBuf>,
    /// Whether the binaries were built mergeable
    #[serde(default)]
    pub mergeable: bool,
}

/// A node of the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphDependency {
    /// A target built from sources, identified by project path and name
    Target {
        /// Target name
        name: String,
        /// Path of the project declaring the target
        path: PathBuf,
        /// Linking status of the product
        #[serde(default)]
        status: LinkingStatus,
    },
    /// A precompiled framework
    Framework(FrameworkInfo),
    /// A precompiled library
    Library(LibraryInfo),
    /// A precompiled xcframework
    #[serde(rename = "xcframework")]
    XcFramework(XcFrameworkInfo),
    /// A system SDK (framework or library)
    Sdk {
        /// SDK name, e.g. `XCTest.framework` or `libc++.tbd`
        name: String,
        /// Path of the SDK
        path: PathBuf,
        /// Linking status
        #[serde(default)]
        status: LinkingStatus,
        /// Where the SDK comes from
        #[serde(default)]
        source: SdkSource,
    },
    /// A precompiled resource bundle
    Bundle {
        /// Path to the `.bundle` directory
        path: PathBuf,
    },
    /// A Swift package product
    PackageProduct {
        /// Path of the package
        path: PathBuf,
        /// Product name
        product: String,
        /// Kind of product
        kind: PackageProductKind,
    },
}

impl GraphDependency {
    /// A required target node.
    pub fn target(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Target {
            name: name.into(),
            path: path.into(),
            status: LinkingStatus::Required,
        }
    }

    /// A required system SDK node.
    pub fn sdk(name: impl Into<String>, path: impl Into<PathBuf>, source: SdkSource) -> Self {
        Self::Sdk {
            name: name.into(),
            path: path.into(),
            status: LinkingStatus::Required,
            source,
        }
    }

    /// A precompiled bundle node.
    pub fn bundle(path: impl Into<PathBuf>) -> Self {
        Self::Bundle {
            path: path.into(),
        }
    }

    /// The path identifying this node.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Target {
                path,
                ..
            }
            | Self::Sdk {
                path,
                ..
            }
            | Self::Bundle {
                path,
            }
            | Self::PackageProduct {
                path,
                ..
            } => path,
            Self::Framework(info) => &info.path,
            Self::Library(info) => &info.path,
            Self::XcFramework(info) => &info.path,
        }
    }

    /// Short name of the node kind, used in logs and diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Target {
                ..
            } => "target",
            Self::Framework(_) => "framework",
            Self::Library(_) => "library",
            Self::XcFramework(_) => "xcframework",
            Self::Sdk {
                ..
            } => "sdk",
            Self::Bundle {
                ..
            } => "bundle",
            Self::PackageProduct {
                ..
            } => "package product",
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Target {
                ..
            } => 0,
            Self::Framework(_) => 1,
            Self::Library(_) => 2,
            Self::XcFramework(_) => 3,
            Self::Sdk {
                ..
            } => 4,
            Self::Bundle {
                ..
            } => 5,
            Self::PackageProduct {
                ..
            } => 6,
        }
    }

    fn identity(&self) -> (&Path, u8, &str) {
        let name = match self {
            Self::Target {
                name,
                ..
            }
            | Self::Sdk {
                name,
                ..
            }
            | Self::PackageProduct {
                product: name,
                ..
            } => name.as_str(),
            _ => "",
        };
        (self.path(), self.rank(), name)
    }

    /// Name and project path when this is a target node.
    #[must_use]
    pub fn as_target(&self) -> Option<(&str, &Path)> {
        match self {
            Self::Target {
                name,
                path,
                ..
            } => Some((name, path)),
            _ => None,
        }
    }

    /// Whether this is a target node.
    #[must_use]
    pub const fn is_target(&self) -> bool {
        matches!(self, Self::Target { .. })
    }

    /// Whether this is an SDK node.
    #[must_use]
    pub const fn is_sdk(&self) -> bool {
        matches!(self, Self::Sdk { .. })
    }

    /// The xcframework payload, if any.
    #[must_use]
    pub const fn as_xcframework(&self) -> Option<&XcFrameworkInfo> {
        match self {
            Self::XcFramework(info) => Some(info),
            _ => None,
        }
    }

    /// Binary linking of precompiled nodes.
    #[must_use]
    pub const fn linking(&self) -> Option<BinaryLinking> {
        match self {
            Self::Framework(info) => Some(info.linking),
            Self::Library(info) => Some(info.linking),
            Self::XcFramework(info) => Some(info.linking),
            _ => None,
        }
    }

    /// Frameworks, libraries, xcframeworks and bundles are precompiled.
    #[must_use]
    pub const fn is_precompiled(&self) -> bool {
        matches!(
            self,
            Self::Framework(_) | Self::Library(_) | Self::XcFramework(_) | Self::Bundle { .. }
        )
    }

    /// Whether the node is something a linker consumes.
    #[must_use]
    pub const fn is_linkable(&self) -> bool {
        matches!(
            self,
            Self::Framework(_)
                | Self::Library(_)
                | Self::XcFramework(_)
                | Self::Target { .. }
                | Self::Sdk { .. }
        )
    }

    /// A dynamically linked precompiled framework, library or xcframework.
    #[must_use]
    pub fn is_precompiled_dynamic_and_linkable(&self) -> bool {
        self.linking() == Some(BinaryLinking::Dynamic)
    }
}

impl PartialEq for GraphDependency {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for GraphDependency {}

impl Hash for GraphDependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for GraphDependency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GraphDependency {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl fmt::Display for GraphDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target {
                name,
                path,
                ..
            } => write!(f, "target '{name}' ({})", path.display()),
            Self::Sdk {
                name,
                ..
            } => write!(f, "sdk '{name}'"),
            Self::PackageProduct {
                product,
                path,
                ..
            } => write!(f, "package product '{product}' ({})", path.display()),
            other => write!(f, "{} {}", other.kind_name(), other.path().display()),
        }
    }
}

/// A directed edge, the key of per-edge condition lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphEdge {
    /// Depending node
    pub from: GraphDependency,
    /// Dependency
    pub to: GraphDependency,
}

impl GraphEdge {
    /// Create an edge `from → to`.
    #[must_use]
    pub const fn new(from: GraphDependency, to: GraphDependency) -> Self {
        Self {
            from,
            to,
        }
    }
}
