//! Landex ETL Library
//!
//! Sequential batch loader that extracts data from remote sources and
//! lands it in a relational `landing` schema.
//!
//! # Pipeline
//!
//! - **Sources**: publicly readable S3 objects (CSV and JSON files) and
//!   JSON-returning HTTP API endpoints.
//! - **Tabular path**: source column names are normalized to snake_case,
//!   reconciled against the live destination schema, enriched with
//!   `loaded_at`/`source_file` metadata where the table has those
//!   columns, and the recognized subset is appended. Unknown columns
//!   are logged and dropped, never fatal.
//! - **Raw path**: JSON documents land one row per document (or array
//!   element) in a single `raw_data` column, transactionally per call.
//!
//! Runs are full-refresh: every targeted table is truncated before its
//! pass. There is no retry layer; the first unhandled error aborts the
//! run.
//!
//! # Example
//!
//! ```no_run
//! use landex_etl::orchestrator::Orchestrator;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = Orchestrator::from_config_file("config.yaml")?;
//!     orchestrator.extract_all().await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod raw;
pub mod s3;
pub mod schema;
pub mod tabular;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use error::{ExtractError, Result};

/// Destination namespace for ingested data
pub const LANDING_SCHEMA: &str = "landing";

/// Bounded timeout applied to every remote fetch; requests are not
/// retried on timeout or transient failure.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
