//! Core types for xcgraph
//!
//! This module holds the pieces every other module relies on:
//! - [`GraphError`] - enumerated failures of graph construction, traversal and caching
//! - [`ErrorContext`] - user-facing wrapper with suggestions and details
//! - [`user_friendly_error`] - convert any `anyhow::Error` into an [`ErrorContext`]
//!
//! Public fallible operations return [`anyhow::Result`] and carry a [`GraphError`]
//! inside, so callers can recover the structured error:
//!
//! ```rust,no_run
//! use xcgraph::core::GraphError;
//!
//! fn report(result: anyhow::Result<()>) {
//!     if let Err(error) = result {
//!         match error.downcast_ref::<GraphError>() {
//!             Some(GraphError::CircularDependency { cycle }) => {
//!                 eprintln!("cycle of {} targets", cycle.len() - 1);
//!             }
//!             _ => eprintln!("{error:#}"),
//!         }
//!     }
//! }
//! ```

pub mod error;

pub use error::{ErrorContext, GraphError, user_friendly_error};
