//! Test utilities for xcgraph
//!
//! This module provides helpers shared by unit and integration tests: logging
//! initialization, fixture constructors for targets, projects and precompiled
//! nodes, a [`GraphFixture`] builder for single-project graphs, and a
//! [`MockArtifactLoader`] that records how often each artifact was loaded.
//!
//! # Example
//!
//! ```rust,no_run
//! use xcgraph::graph::Product;
//! use xcgraph::test_utils::GraphFixture;
//!
//! let mut fixture = GraphFixture::new("/Projects/App");
//! fixture.target("App", Product::App).target("Core", Product::Framework).edge("App", "Core");
//! let graph = fixture.build().unwrap();
//! ```

pub mod fixtures;
pub mod mock_loader;

pub use fixtures::{
    GraphFixture, test_bundle, test_framework, test_library, test_package_product, test_project,
    test_sdk, test_target, test_xcframework,
};
pub use mock_loader::MockArtifactLoader;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise the
/// `RUST_LOG` environment variable. Without either, logging stays disabled.
///
/// ```bash
/// RUST_LOG=xcgraph=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
