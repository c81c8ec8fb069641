//! Raw JSON document loading
//!
//! Semi-structured sources land as-is: every document (or every element
//! of an array document) becomes one row in a single `raw_data` JSON
//! column. All rows for one call are written inside a single
//! transaction, so a failure mid-document leaves nothing behind.

use crate::db::Db;
use crate::error::{ExtractError, Result};
use crate::LANDING_SCHEMA;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{error, info};

/// A parsed JSON payload destined for single-column storage
///
/// The parsing step decides once whether the payload is a single object
/// or a sequence; the loader consumes both variants uniformly.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDocument {
    /// One document, one row
    Single(Value),
    /// One row per element
    Many(Vec<Value>),
}

impl RawDocument {
    /// Classify a parsed JSON value
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => RawDocument::Many(items),
            other => RawDocument::Single(other),
        }
    }

    /// Number of rows this document produces
    pub fn row_count(&self) -> u64 {
        match self {
            RawDocument::Single(_) => 1,
            RawDocument::Many(items) => items.len() as u64,
        }
    }
}

/// Capability interface for raw-document destinations
#[async_trait]
pub trait RawDocumentSink: Send + Sync {
    /// Insert the document into `landing.table_name`, returning the
    /// number of rows written.
    async fn load(&self, table_name: &str, document: &RawDocument) -> Result<u64>;
}

/// Postgres-backed raw-document loader
pub struct RawDocumentLoader {
    db: Db,
}

impl RawDocumentLoader {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    async fn connect_and_insert(&self, table_name: &str, document: &RawDocument) -> Result<u64> {
        let pool = self.db.connect().await?;
        Self::insert_all(&pool, table_name, document).await
    }

    /// Write every row of `document` into `landing.table_name`.
    pub async fn insert_all(
        pool: &PgPool,
        table_name: &str,
        document: &RawDocument,
    ) -> Result<u64> {
        let statement = format!(
            "INSERT INTO {}.{} (raw_data) VALUES ($1)",
            LANDING_SCHEMA, table_name
        );

        // One transaction per call: commit after the last row, roll back
        // (by dropping the transaction) if any insert fails.
        let mut tx = pool.begin().await?;
        match document {
            RawDocument::Many(items) => {
                for item in items {
                    sqlx::query(&statement)
                        .bind(Json(item))
                        .execute(&mut *tx)
                        .await?;
                }
            },
            RawDocument::Single(value) => {
                sqlx::query(&statement)
                    .bind(Json(value))
                    .execute(&mut *tx)
                    .await?;
            },
        }
        tx.commit().await?;

        Ok(document.row_count())
    }
}

#[async_trait]
impl RawDocumentSink for RawDocumentLoader {
    async fn load(&self, table_name: &str, document: &RawDocument) -> Result<u64> {
        let table_name = table_name.to_lowercase();

        match self.connect_and_insert(&table_name, document).await {
            Ok(rows) => {
                info!(table = %table_name, rows = rows, "Loaded JSON data");
                Ok(rows)
            },
            Err(e) => {
                error!(table = %table_name, error = %e, "Error loading JSON data");
                Err(ExtractError::load(table_name, e))
            },
        }
    }
}
