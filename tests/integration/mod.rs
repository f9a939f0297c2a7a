//! Integration test suite for xcgraph
//!
//! End-to-end tests that load workspaces from project descriptors, query them,
//! and substitute cached binaries read from a temporary directory.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **loading**: Graph construction, validation errors and cycle reports
//! - **traversal**: Link, embed and resource queries on loaded workspaces
//! - **cache_substitution**: Binary cache substitution with on-disk artifacts
//! - **configuration**: Settings files driving the cache mutator

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cache_substitution;
mod configuration;
mod loading;
mod traversal;
