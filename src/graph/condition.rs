//! Platform conditions attached to graph edges.
//!
//! An edge may be restricted to a subset of platforms, e.g. a framework linked only
//! on iOS. Conditions combine along paths (intersection) and across alternative
//! paths (union). A missing condition means "all platforms".

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A platform a target can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// iOS
    Ios,
    /// macOS
    Macos,
    /// tvOS
    Tvos,
    /// watchOS
    Watchos,
    /// visionOS
    Visionos,
}

impl Platform {
    /// The filter that selects this platform.
    #[must_use]
    pub const fn filter(self) -> PlatformFilter {
        match self {
            Self::Ios => PlatformFilter::Ios,
            Self::Macos => PlatformFilter::Macos,
            Self::Tvos => PlatformFilter::Tvos,
            Self::Watchos => PlatformFilter::Watchos,
            Self::Visionos => PlatformFilter::Visionos,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ios => "iOS",
            Self::Macos => "macOS",
            Self::Tvos => "tvOS",
            Self::Watchos => "watchOS",
            Self::Visionos => "visionOS",
        };
        f.write_str(name)
    }
}

/// A single platform filter an edge condition is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFilter {
    /// iOS devices and simulators
    Ios,
    /// macOS
    Macos,
    /// tvOS
    Tvos,
    /// watchOS
    Watchos,
    /// visionOS
    Visionos,
    /// Mac Catalyst
    Catalyst,
    /// DriverKit
    Driverkit,
}

/// A non-empty set of platform filters restricting an edge.
///
/// Construct it through [`PlatformCondition::when`], which returns `None` for an
/// empty filter set. An empty condition would make the edge unusable everywhere,
/// which is expressed instead as [`CombinationResult::Incompatible`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformCondition(BTreeSet<PlatformFilter>);

impl PlatformCondition {
    /// Create a condition from a set of filters, `None` when the set is empty.
    pub fn when(filters: impl IntoIterator<Item = PlatformFilter>) -> Option<Self> {
        let filters: BTreeSet<_> = filters.into_iter().collect();
        if filters.is_empty() {
            None
        } else {
            Some(Self(filters))
        }
    }

    /// The filters of this condition.
    #[must_use]
    pub const fn platform_filters(&self) -> &BTreeSet<PlatformFilter> {
        &self.0
    }

    /// Whether the condition lets `filter` through.
    #[must_use]
    pub fn contains(&self, filter: PlatformFilter) -> bool {
        self.0.contains(&filter)
    }

    /// Restrict this condition by another one.
    ///
    /// An absent `other` applies everywhere, so the result is this condition. Two
    /// disjoint conditions are [`CombinationResult::Incompatible`].
    #[must_use]
    pub fn intersection(&self, other: Option<&Self>) -> CombinationResult {
        let Some(other) = other else {
            return CombinationResult::Condition(Some(self.clone()));
        };
        match Self::when(self.0.intersection(&other.0).copied()) {
            Some(condition) => CombinationResult::Condition(Some(condition)),
            None => CombinationResult::Incompatible,
        }
    }

    /// Widen this condition by another one. An absent `other` applies everywhere.
    #[must_use]
    pub fn union(&self, other: Option<&Self>) -> CombinationResult {
        let Some(other) = other else {
            return CombinationResult::Condition(None);
        };
        CombinationResult::Condition(Self::when(self.0.union(&other.0).copied()))
    }
}

impl fmt::Display for PlatformCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self
            .0
            .iter()
            .map(|filter| match filter {
                PlatformFilter::Ios => "ios",
                PlatformFilter::Macos => "macos",
                PlatformFilter::Tvos => "tvos",
                PlatformFilter::Watchos => "watchos",
                PlatformFilter::Visionos => "visionos",
                PlatformFilter::Catalyst => "catalyst",
                PlatformFilter::Driverkit => "driverkit",
            })
            .collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Outcome of combining edge conditions along one or more paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombinationResult {
    /// No platform satisfies every condition on the path.
    Incompatible,
    /// The resolved condition, `None` meaning unconditional.
    Condition(Option<PlatformCondition>),
}

impl CombinationResult {
    /// Merge the results of two alternative paths.
    ///
    /// `Incompatible` is the identity, an unconditional path absorbs everything and
    /// two conditions are unioned.
    #[must_use]
    pub fn combine_with(self, other: Self) -> Self {
        match (self, other) {
            (Self::Incompatible, Self::Incompatible) => Self::Incompatible,
            (Self::Incompatible, Self::Condition(condition))
            | (Self::Condition(condition), Self::Incompatible) => Self::Condition(condition),
            (Self::Condition(Some(lhs)), Self::Condition(Some(rhs))) => lhs.union(Some(&rhs)),
            (Self::Condition(_), Self::Condition(_)) => Self::Condition(None),
        }
    }
}
