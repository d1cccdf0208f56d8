// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQLHub - Driver Layer
//!
//! This crate provides the backend abstraction for the SQLHub language server.
//! It defines the [`ConnectionDriver`] trait and the machinery every backend
//! shares:
//!
//! - **Result normalization**: unique column names, row mapping and
//!   per-statement envelopes with success or error messages
//! - **Paginated execution**: bounded submit/poll/fetch loops for
//!   statement APIs that return results in pages
//! - **Explorer tree**: kind-driven resolution of a node's children
//! - **Registry**: alias-keyed driver constructors installed by plugins
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sqlhub_driver::{ConnectionConfig, DriverRegistry, QueryOptions};
//!
//! async fn run(registry: &DriverRegistry) -> sqlhub_driver::DriverResult<()> {
//!     let config = ConnectionConfig::new("warehouse", "RedshiftData")
//!         .with_setting("clusterIdentifier", "analytics")
//!         .with_setting("database", "dev");
//!     let mut driver = registry.create(&config)?;
//!     driver.open().await?;
//!     for envelope in driver.query("SELECT 1", QueryOptions::new("req-1")).await {
//!         println!("{:?}", envelope.results);
//!     }
//!     driver.close().await
//! }
//! ```

pub mod completions;
pub mod driver;
pub mod error;
pub mod explorer;
pub mod model;
pub mod normalize;
pub mod pagination;
pub mod queries;
pub mod registry;
pub mod statement;

// Re-exports
pub use completions::{CompletionCache, completion_entry, load_static_completions};
pub use driver::{ConnectionDriver, HandleSlot, QueryOptions};
pub use error::{DriverError, DriverResult};
pub use explorer::{MetadataSource, children_for_item, schema_groups, search_items};
pub use model::{
    CompletionEntry, CompletionMap, ConnectionConfig, ContextValue, ResultEnvelope, ResultMessage,
    Row, SearchableItem, TreeNode,
};
pub use normalize::{EnvelopeContext, StatementOutput, normalize_batch};
pub use pagination::{
    PagedResult, PaginatedExecutor, PaginationLimits, ResultPage, StatementStatus, Submission,
    SubmitPollBackend,
};
pub use queries::{DEFAULT_SEARCH_LIMIT, QueryTemplates};
pub use registry::{
    DriverConstructor, DriverPlugin, DriverRegistry, PluginContext, RESOURCE_KINDS, ResourceMap,
    install_plugin,
};
pub use statement::{split_statements, statement_command};
