//! Destination schema inspection
//!
//! The tabular loader reconciles incoming columns against whatever the
//! destination table looks like right now, so the column list is read
//! fresh from the metadata catalog on every load call and never cached.

use crate::db::Db;
use crate::error::{ExtractError, Result};
use async_trait::async_trait;
use tracing::info;

/// Capability interface for destination column lookups
///
/// Injected into the tabular loader so reconciliation can be exercised
/// without a live database.
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    /// Current column names of `schema.table_name`, in physical order.
    ///
    /// Returns an empty list (not an error) when the table has no
    /// columns or does not exist; callers treat empty as "nothing
    /// matches". Fails with [`ExtractError::SchemaLookup`] only when the
    /// catalog query itself cannot execute.
    async fn columns_of(&self, schema: &str, table_name: &str) -> Result<Vec<String>>;
}

/// Postgres-backed inspector querying `information_schema.columns`
pub struct PgSchemaInspector {
    db: Db,
}

impl PgSchemaInspector {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SchemaInspector for PgSchemaInspector {
    async fn columns_of(&self, schema: &str, table_name: &str) -> Result<Vec<String>> {
        let table_name = table_name.to_lowercase();

        let lookup_error = |source: sqlx::Error| ExtractError::SchemaLookup {
            schema: schema.to_string(),
            table: table_name.clone(),
            source,
        };

        let pool = self.db.connect().await.map_err(|e| match e {
            ExtractError::Database(source) => lookup_error(source),
            other => other,
        })?;

        let columns: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT column_name::text
            FROM information_schema.columns
            WHERE table_schema = $1
              AND table_name = $2
            ORDER BY ordinal_position
            "#,
        )
        .bind(schema)
        .bind(&table_name)
        .fetch_all(&pool)
        .await
        .map_err(lookup_error)?;

        info!(
            schema = %schema,
            table = %table_name,
            columns = ?columns,
            "Fetched table columns"
        );
        Ok(columns)
    }
}
