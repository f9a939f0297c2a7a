//! Error handling for xcgraph
//!
//! This module provides the error taxonomy of the dependency graph engine and the
//! user-facing reporting layer built on top of it. The design mirrors how the graph
//! is used in a generation pipeline:
//! 1. **Strongly-typed errors** ([`GraphError`]) so callers can match on the failure
//!    and decide, for example, to fall back to a full source build
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions for
//!    terminal output
//!
//! # Error Categories
//!
//! - **Structural**: [`GraphError::MissingProject`], [`GraphError::MissingTarget`],
//!   [`GraphError::MissingFile`]. Fatal and reported immediately.
//! - **Cycle**: [`GraphError::CircularDependency`] carries the full ordered cycle.
//! - **Shape**: [`GraphError::UnsupportedDependency`] for dependency references the
//!   graph cannot represent in a given position.
//! - **Artifacts**: [`GraphError::ArtifactNotFound`] is what artifact loaders raise when
//!   a cached binary is missing or unreadable. The cache mutator propagates loader errors
//!   untouched.
//! - **Configuration**: [`GraphError::ConfigError`], [`GraphError::TomlError`].
//!
//! Traversal queries never fail on unknown targets: a query against a target that is
//! not part of the graph yields an empty result.
//!
//! # Examples
//!
//! ```rust,no_run
//! use xcgraph::core::{GraphError, user_friendly_error};
//! use xcgraph::graph::TargetIdentifier;
//!
//! let error = GraphError::CircularDependency {
//!     cycle: vec![
//!         TargetIdentifier::new("/project", "App"),
//!         TargetIdentifier::new("/project", "Core"),
//!         TargetIdentifier::new("/project", "App"),
//!     ],
//! };
//!
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::graph::TargetIdentifier;

/// The main error type for graph construction, traversal and cache substitution.
///
/// Each variant carries enough structured context (paths, names, the ordered cycle)
/// for actionable diagnostics. Variants are designed to be matched on after
/// `anyhow::Error::downcast_ref::<GraphError>()`.
#[derive(Error, Debug)]
pub enum GraphError {
    /// A project path is referenced but no project is registered at that path.
    #[error("Project not found at {path}")]
    MissingProject {
        /// Path of the missing project
        path: PathBuf,
    },

    /// A target is referenced but the project at `path` does not declare it.
    #[error("Target '{name}' not found in project at {path}")]
    MissingTarget {
        /// Name of the missing target
        name: String,
        /// Path of the project that was expected to declare it
        path: PathBuf,
    },

    /// A file that was explicitly requested, such as a configuration file passed
    /// to [`crate::config::GraphConfig::load_from`], does not exist.
    #[error("File not found: {path}")]
    MissingFile {
        /// Path of the missing file
        path: PathBuf,
    },

    /// The target dependency graph contains a cycle.
    ///
    /// The cycle is reported in traversal order and ends with its first node,
    /// e.g. `App → Core → App`.
    #[error("Circular dependency detected: {}", format_cycle(.cycle))]
    CircularDependency {
        /// The ordered cycle, first and last element are the same target
        cycle: Vec<TargetIdentifier>,
    },

    /// A dependency reference has a shape the graph cannot represent here.
    #[error("Unsupported dependency: {description}")]
    UnsupportedDependency {
        /// Human readable description of the offending dependency
        description: String,
    },

    /// A precompiled artifact is missing or cannot be parsed.
    #[error("Precompiled artifact not found or unreadable: {path}")]
    ArtifactNotFound {
        /// Path of the artifact
        path: PathBuf,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

fn format_cycle(cycle: &[TargetIdentifier]) -> String {
    cycle.iter().map(ToString::to_string).collect::<Vec<_>>().join(" → ")
}

impl Clone for GraphError {
    fn clone(&self) -> Self {
        match self {
            Self::MissingProject {
                path,
            } => Self::MissingProject {
                path: path.clone(),
            },
            Self::MissingTarget {
                name,
                path,
            } => Self::MissingTarget {
                name: name.clone(),
                path: path.clone(),
            },
            Self::MissingFile {
                path,
            } => Self::MissingFile {
                path: path.clone(),
            },
            Self::CircularDependency {
                cycle,
            } => Self::CircularDependency {
                cycle: cycle.clone(),
            },
            Self::UnsupportedDependency {
                description,
            } => Self::UnsupportedDependency {
                description: description.clone(),
            },
            Self::ArtifactNotFound {
                path,
            } => Self::ArtifactNotFound {
                path: path.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // io::Error and toml errors are not Clone, keep kind and message
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
            Self::TomlError(e) => Self::ConfigError {
                message: e.to_string(),
            },
        }
    }
}

/// Error wrapper that adds a suggestion and details for terminal output.
///
/// The suggestion is an actionable next step, the details explain why the error
/// happened. Both are optional.
///
/// ```rust,no_run
/// use xcgraph::core::{ErrorContext, GraphError};
///
/// let context = ErrorContext::new(GraphError::MissingProject { path: "/Projects/App".into() })
///     .with_suggestion("Make sure the project is part of the workspace")
///     .with_details("Every target dependency must resolve to a loaded project");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying graph error
    pub error: GraphError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: GraphError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error. Rendered in green.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error. Rendered in yellow.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with an actionable suggestion.
///
/// Recognizes [`GraphError`] (including one wrapped in an existing [`ErrorContext`]),
/// [`std::io::Error`] and [`toml::de::Error`]. Anything else is reported with its
/// full context chain as details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(graph_error) = error.downcast_ref::<GraphError>() {
        return create_error_context(graph_error.clone());
    }

    if let Some(context) = error.downcast_ref::<ErrorContext>() {
        return ErrorContext {
            error: context.error.clone(),
            suggestion: context.suggestion.clone(),
            details: context.details.clone(),
        };
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        let context = ErrorContext::new(GraphError::IoError(std::io::Error::new(
            io_error.kind(),
            io_error.to_string(),
        )));
        return match io_error.kind() {
            std::io::ErrorKind::NotFound => context
                .with_suggestion("Check that the file or directory exists and the path is correct"),
            std::io::ErrorKind::PermissionDenied => {
                context.with_suggestion("Check the file permissions and ownership")
            }
            _ => context,
        };
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(GraphError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the configuration file")
        .with_details("Configuration is read from ~/.xcgraph/config.toml or $XCGRAPH_CONFIG");
    }

    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    let context = ErrorContext::new(GraphError::ConfigError {
        message: error.to_string(),
    });
    if chain.is_empty() {
        context
    } else {
        context.with_details(chain.join("\n  caused by: "))
    }
}

fn create_error_context(error: GraphError) -> ErrorContext {
    match &error {
        GraphError::MissingProject {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Add the project to the workspace or fix the dependency's project path")
            .with_details("Every project referenced by a target dependency must be loaded"),
        GraphError::MissingTarget {
            path,
            ..
        } => {
            let path = path.display().to_string();
            ErrorContext::new(error)
                .with_suggestion(format!("Check the target names declared by the project at {path}"))
                .with_details("Target dependencies are matched by exact, case-sensitive name")
        }
        GraphError::MissingFile {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check that the file exists and the path is correct"),
        GraphError::CircularDependency {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Remove one of the dependencies in the cycle. Extracting shared code into a separate target usually breaks it")
            .with_details("Targets cannot depend on each other directly or transitively"),
        GraphError::UnsupportedDependency {
            ..
        } => ErrorContext::new(error)
            .with_details("Only target, framework, library, xcframework, SDK, bundle and package product dependencies are supported"),
        GraphError::ArtifactNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Clear the binary cache and build from sources to regenerate the artifact")
            .with_details("The cached binary was scheduled for substitution but could not be loaded"),
        GraphError::ConfigError {
            ..
        }
        | GraphError::TomlError(_) => ErrorContext::new(error)
            .with_suggestion("Check ~/.xcgraph/config.toml or the file pointed to by XCGRAPH_CONFIG"),
        GraphError::IoError(_) => ErrorContext::new(error),
    }
}
