//! References handed to project emitters.
//!
//! A [`GraphDependencyReference`] is what a traversal query returns: the data an
//! emitter needs to write a link, embed or copy phase entry, together with the
//! platform condition that applies to it from the queried target.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::condition::PlatformCondition;
use super::dependency::{BinaryLinking, LinkingStatus, SdkSource};
use super::model::Product;

/// A resolved dependency of a target.
///
/// Ordering is derived, so sets of references iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GraphDependencyReference {
    /// A precompiled framework
    Framework {
        /// Path to the `.framework`
        path: PathBuf,
        /// Path to its binary
        binary_path: PathBuf,
        /// Path to its debug symbols
        dsym_path: Option<PathBuf>,
        /// Linking of the binary
        linking: BinaryLinking,
        /// Architectures of the binary
        architectures: Vec<String>,
        /// Equivalent product type
        product: Product,
        /// Linking status
        status: LinkingStatus,
        /// Resolved condition
        condition: Option<PlatformCondition>,
    },
    /// A precompiled library
    Library {
        /// Path to the library
        path: PathBuf,
        /// Linking of the library
        linking: BinaryLinking,
        /// Architectures of the library
        architectures: Vec<String>,
        /// Equivalent product type
        product: Product,
        /// Resolved condition
        condition: Option<PlatformCondition>,
    },
    /// A precompiled xcframework
    #[serde(rename = "xcframework")]
    XcFramework {
        /// Path to the `.xcframework`
        path: PathBuf,
        /// Linking of the contained binaries
        linking: BinaryLinking,
        /// Linking status
        status: LinkingStatus,
        /// Resolved condition
        condition: Option<PlatformCondition>,
    },
    /// A precompiled bundle
    Bundle {
        /// Path to the `.bundle`
        path: PathBuf,
        /// Resolved condition
        condition: Option<PlatformCondition>,
    },
    /// The product of a target built from sources
    Product {
        /// Target name
        target: String,
        /// Product file name, e.g. `Core.framework`
        product_name: String,
        /// Linking status
        status: LinkingStatus,
        /// Resolved condition
        condition: Option<PlatformCondition>,
    },
    /// A system SDK
    Sdk {
        /// Path of the SDK
        path: PathBuf,
        /// Linking status
        status: LinkingStatus,
        /// Where the SDK comes from
        source: SdkSource,
        /// Resolved condition
        condition: Option<PlatformCondition>,
    },
    /// An embedded package product
    PackageProduct {
        /// Product name
        product: String,
        /// Resolved condition
        condition: Option<PlatformCondition>,
    },
}

impl GraphDependencyReference {
    /// The resolved condition of the reference.
    #[must_use]
    pub const fn condition(&self) -> Option<&PlatformCondition> {
        match self {
            Self::Framework {
                condition,
                ..
            }
            | Self::Library {
                condition,
                ..
            }
            | Self::XcFramework {
                condition,
                ..
            }
            | Self::Bundle {
                condition,
                ..
            }
            | Self::Product {
                condition,
                ..
            }
            | Self::Sdk {
                condition,
                ..
            }
            | Self::PackageProduct {
                condition,
                ..
            } => condition.as_ref(),
        }
    }

    /// Path of path-based references.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Framework {
                path,
                ..
            }
            | Self::Library {
                path,
                ..
            }
            | Self::XcFramework {
                path,
                ..
            }
            | Self::Bundle {
                path,
                ..
            }
            | Self::Sdk {
                path,
                ..
            } => Some(path),
            Self::Product {
                ..
            }
            | Self::PackageProduct {
                ..
            } => None,
        }
    }

    /// Linking status, for the kinds that have one.
    #[must_use]
    pub const fn linking_status(&self) -> Option<LinkingStatus> {
        match self {
            Self::Framework {
                status,
                ..
            }
            | Self::XcFramework {
                status,
                ..
            }
            | Self::Product {
                status,
                ..
            }
            | Self::Sdk {
                status,
                ..
            } => Some(*status),
            _ => None,
        }
    }

    /// Whether both references point at the same framework or xcframework.
    #[must_use]
    pub fn has_same_path(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Framework {
                    path: lhs,
                    ..
                },
                Self::Framework {
                    path: rhs,
                    ..
                },
            )
            | (
                Self::XcFramework {
                    path: lhs,
                    ..
                },
                Self::XcFramework {
                    path: rhs,
                    ..
                },
            ) => lhs == rhs,
            _ => false,
        }
    }
}
