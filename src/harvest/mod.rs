//! Harvest module - incremental post and profile export.
//!
//! This module provides the core pieces of the harvester:
//! - **Query**: search expression construction via [`SearchCriteria`]
//! - **Rows**: flat CSV records via [`PostRow`] and [`UserRow`]
//! - **Sink**: truncate-then-append CSV output via [`CsvSink`]
//! - **Pipeline**: async harvest loops via [`pipeline::HarvestPipeline`]
//! - **Sources**: concrete [`PostSource`](crate::traits::PostSource) backends

pub mod pipeline;
pub mod query;
pub mod sink;
pub mod sources;
pub mod traits;

// Re-export commonly used types
pub use traits::{
    ConfigurationError, CsvRecord, HarvestError, PersistenceError, PostRow, UserRow,
};

pub use pipeline::{HarvestPipeline, HarvestResult, HarvestStats};
pub use query::{build_expression, build_expression_on, DateBound, SearchCriteria};
pub use sink::{posts_file_name, users_file_name, CsvSink};
pub use sources::HttpPostSource;
