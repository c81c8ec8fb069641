//! Tabular loading into the landing schema
//!
//! This is the core of the extractor: a CSV batch arrives with arbitrary
//! source column names, the names are normalized, reconciled against the
//! live destination schema, metadata columns are injected where the
//! table has them, and only the recognized column subset is appended.
//! Unknown columns never fail a load; they are logged and dropped.

use crate::db::Db;
use crate::error::{ExtractError, Result};
use crate::normalize::normalize_column;
use crate::schema::SchemaInspector;
use crate::LANDING_SCHEMA;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Metadata column holding the load timestamp
pub const LOADED_AT_COLUMN: &str = "loaded_at";
/// Metadata column holding the source descriptor
pub const SOURCE_FILE_COLUMN: &str = "source_file";

/// Capability interface for the current time
///
/// The loader stamps `loaded_at` from an injected clock so tests can pin
/// the load instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A scalar cell value, leniently inferred from source text
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    /// Infer a scalar from a raw CSV cell.
    ///
    /// Empty cells are NULL; unambiguous booleans, integers and floats
    /// get their natural type; everything else stays text.
    pub fn infer(raw: &str) -> Self {
        if raw.is_empty() {
            return Scalar::Null;
        }
        match raw.to_ascii_lowercase().as_str() {
            "true" => return Scalar::Bool(true),
            "false" => return Scalar::Bool(false),
            _ => {},
        }
        if let Ok(n) = raw.parse::<i64>() {
            return Scalar::Int(n);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Scalar::Float(f);
        }
        Scalar::Text(raw.to_string())
    }
}

/// An ordered tabular batch: header columns plus rows of scalars
///
/// Every row has exactly as many values as there are columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl RecordBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    /// Parse CSV text into a batch, inferring scalar types per cell
    pub fn from_csv(content: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| ExtractError::Parse(format!("invalid CSV header: {}", e)))?
            .iter()
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| ExtractError::Parse(format!("invalid CSV record: {}", e)))?;
            rows.push(record.iter().map(Scalar::infer).collect());
        }

        Ok(Self::new(columns, rows))
    }

    pub fn row_count(&self) -> u64 {
        self.rows.len() as u64
    }
}

/// A batch reconciled against a destination schema
///
/// `columns`/`rows` hold only the recognized projection; `skipped` lists
/// the normalized source columns the destination does not have
/// (diagnostic only, never persisted).
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
    pub skipped: Vec<String>,
}

/// Normalize, inject metadata, and filter a batch against the
/// destination column set. Pure: all I/O stays in the caller.
pub fn prepare_batch(
    batch: RecordBatch,
    table_columns: &[String],
    source_descriptor: &str,
    loaded_at: DateTime<Utc>,
) -> PreparedBatch {
    let mut columns: Vec<String> = batch.columns.iter().map(|c| normalize_column(c)).collect();
    let mut rows = batch.rows;

    // Metadata columns are injected only when the destination has them;
    // all rows of one call share one load instant.
    if table_columns.iter().any(|c| c == LOADED_AT_COLUMN) {
        set_column(
            &mut columns,
            &mut rows,
            LOADED_AT_COLUMN,
            Scalar::Timestamp(loaded_at),
        );
    }
    if table_columns.iter().any(|c| c == SOURCE_FILE_COLUMN) {
        set_column(
            &mut columns,
            &mut rows,
            SOURCE_FILE_COLUMN,
            Scalar::Text(source_descriptor.to_string()),
        );
    }

    let (existing, missing): (Vec<usize>, Vec<usize>) = (0..columns.len())
        .partition(|&i| table_columns.iter().any(|c| *c == columns[i]));

    let skipped: Vec<String> = missing.iter().map(|&i| columns[i].clone()).collect();
    let kept: Vec<String> = existing.iter().map(|&i| columns[i].clone()).collect();
    let projected: Vec<Vec<Scalar>> = rows
        .into_iter()
        .map(|row| existing.iter().map(|&i| row[i].clone()).collect())
        .collect();

    PreparedBatch {
        columns: kept,
        rows: projected,
        skipped,
    }
}

/// Overwrite a column's values if present, otherwise append it
fn set_column(columns: &mut Vec<String>, rows: &mut [Vec<Scalar>], name: &str, value: Scalar) {
    if let Some(idx) = columns.iter().position(|c| c == name) {
        for row in rows.iter_mut() {
            row[idx] = value.clone();
        }
    } else {
        columns.push(name.to_string());
        for row in rows.iter_mut() {
            row.push(value.clone());
        }
    }
}

/// Build the single multi-row INSERT statement for a prepared batch.
///
/// NULL cells are written as the SQL keyword rather than bound: a bound
/// null parameter carries a declared text type, which the server
/// rejects at prepare time when the destination column is numeric or
/// timestamp. The keyword stays untyped and lands in any column.
fn build_insert(table_name: &str, prepared: &PreparedBatch) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("INSERT INTO {}.{} (", LANDING_SCHEMA, table_name));
    {
        let mut columns = builder.separated(", ");
        for column in &prepared.columns {
            columns.push(column.clone());
        }
    }
    builder.push(") ");
    builder.push_values(prepared.rows.iter(), |mut values, row| {
        for value in row {
            match value {
                Scalar::Null => values.push("NULL"),
                Scalar::Bool(v) => values.push_bind(*v),
                Scalar::Int(v) => values.push_bind(*v),
                Scalar::Float(v) => values.push_bind(*v),
                Scalar::Text(v) => values.push_bind(v.clone()),
                Scalar::Timestamp(v) => values.push_bind(*v),
            };
        }
    });
    builder
}

/// Capability interface for tabular destinations
#[async_trait]
pub trait TabularSink: Send + Sync {
    /// Append the recognized projection of `batch` to
    /// `landing.table_name`, returning the number of rows appended.
    async fn load(&self, table_name: &str, batch: RecordBatch, source_descriptor: &str)
        -> Result<u64>;
}

/// Postgres-backed tabular loader
pub struct TabularLoader {
    db: Db,
    inspector: Arc<dyn SchemaInspector>,
    clock: Arc<dyn Clock>,
}

impl TabularLoader {
    pub fn new(db: Db, inspector: Arc<dyn SchemaInspector>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            inspector,
            clock,
        }
    }

    async fn load_inner(
        &self,
        table_name: &str,
        batch: RecordBatch,
        source_descriptor: &str,
    ) -> Result<u64> {
        let table_columns = self.inspector.columns_of(LANDING_SCHEMA, table_name).await?;

        let prepared = prepare_batch(batch, &table_columns, source_descriptor, self.clock.now());

        if !prepared.skipped.is_empty() {
            warn!(
                table = %table_name,
                skipped = ?prepared.skipped,
                "Skipping columns not present in destination table"
            );
        }

        let rows = prepared.rows.len() as u64;
        if rows == 0 || prepared.columns.is_empty() {
            info!(table = %table_name, "Nothing to append");
            return Ok(0);
        }

        // Single multi-row INSERT: the append is one atomic statement.
        let mut builder = build_insert(table_name, &prepared);

        let pool = self.db.connect().await?;
        builder.build().execute(&pool).await?;

        Ok(rows)
    }
}

#[async_trait]
impl TabularSink for TabularLoader {
    async fn load(
        &self,
        table_name: &str,
        batch: RecordBatch,
        source_descriptor: &str,
    ) -> Result<u64> {
        let table_name = table_name.to_lowercase();

        match self.load_inner(&table_name, batch, source_descriptor).await {
            Ok(rows) => {
                info!(table = %table_name, rows = rows, "Successfully loaded rows");
                Ok(rows)
            },
            Err(e) => {
                error!(table = %table_name, error = %e, "Error loading data");
                Err(ExtractError::load(table_name, e))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schema(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn load_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_infer_scalars() {
        assert_eq!(Scalar::infer(""), Scalar::Null);
        assert_eq!(Scalar::infer("true"), Scalar::Bool(true));
        assert_eq!(Scalar::infer("False"), Scalar::Bool(false));
        assert_eq!(Scalar::infer("42"), Scalar::Int(42));
        assert_eq!(Scalar::infer("-3.5"), Scalar::Float(-3.5));
        assert_eq!(Scalar::infer("hello"), Scalar::Text("hello".to_string()));
    }

    #[test]
    fn test_from_csv() {
        let batch = RecordBatch::from_csv("id,Store Name\n1,Alpha\n2,\n").unwrap();
        assert_eq!(batch.columns, vec!["id", "Store Name"]);
        assert_eq!(batch.row_count(), 2);
        assert_eq!(batch.rows[0], vec![Scalar::Int(1), Scalar::Text("Alpha".to_string())]);
        assert_eq!(batch.rows[1], vec![Scalar::Int(2), Scalar::Null]);
    }

    #[test]
    fn test_unknown_columns_dropped_not_fatal() {
        let batch = RecordBatch::new(
            vec!["id".into(), "name".into(), "extra".into()],
            vec![
                vec![Scalar::Int(1), Scalar::Text("a".into()), Scalar::Text("x".into())],
                vec![Scalar::Int(2), Scalar::Text("b".into()), Scalar::Text("y".into())],
            ],
        );
        let prepared = prepare_batch(
            batch,
            &schema(&["id", "name", "loaded_at"]),
            "orders.csv",
            load_instant(),
        );

        assert_eq!(prepared.columns, vec!["id", "name", "loaded_at"]);
        assert_eq!(prepared.skipped, vec!["extra"]);
        // Row count is preserved no matter how many columns were dropped
        assert_eq!(prepared.rows.len(), 2);
        assert_eq!(prepared.rows[0][2], Scalar::Timestamp(load_instant()));
        assert_eq!(prepared.rows[1][2], Scalar::Timestamp(load_instant()));
    }

    #[test]
    fn test_source_file_only_when_schema_has_it() {
        let batch = RecordBatch::new(vec!["id".into()], vec![vec![Scalar::Int(1)]]);

        let without = prepare_batch(batch.clone(), &schema(&["id"]), "orders.csv", load_instant());
        assert_eq!(without.columns, vec!["id"]);
        assert!(without
            .rows
            .iter()
            .flatten()
            .all(|v| *v != Scalar::Text("orders.csv".to_string())));

        let with = prepare_batch(
            batch,
            &schema(&["id", "source_file"]),
            "orders.csv",
            load_instant(),
        );
        assert_eq!(with.columns, vec!["id", "source_file"]);
        assert_eq!(with.rows[0][1], Scalar::Text("orders.csv".to_string()));
    }

    #[test]
    fn test_source_columns_are_normalized() {
        let batch = RecordBatch::new(
            vec!["customerKey".into(), "Store-ID ".into()],
            vec![vec![Scalar::Int(7), Scalar::Int(3)]],
        );
        let prepared = prepare_batch(
            batch,
            &schema(&["customer_key", "store_id"]),
            "stores.csv",
            load_instant(),
        );
        assert_eq!(prepared.columns, vec!["customer_key", "store_id"]);
        assert!(prepared.skipped.is_empty());
    }

    #[test]
    fn test_empty_schema_matches_nothing() {
        let batch = RecordBatch::new(vec!["id".into()], vec![vec![Scalar::Int(1)]]);
        let prepared = prepare_batch(batch, &[], "orders.csv", load_instant());
        assert!(prepared.columns.is_empty());
        assert_eq!(prepared.skipped, vec!["id"]);
    }

    #[test]
    fn test_null_cells_render_as_sql_null_not_typed_binds() {
        // An empty cell must land in columns of any type, so it cannot
        // be bound as a typed parameter.
        let prepared = PreparedBatch {
            columns: vec!["id".into(), "amount".into()],
            rows: vec![
                vec![Scalar::Int(1), Scalar::Null],
                vec![Scalar::Null, Scalar::Float(2.5)],
            ],
            skipped: vec![],
        };
        let mut builder = build_insert("orders", &prepared);
        assert_eq!(
            builder.sql(),
            "INSERT INTO landing.orders (id, amount) VALUES ($1, NULL), (NULL, $2)"
        );
    }

    #[test]
    fn test_existing_metadata_column_overwritten_not_duplicated() {
        let batch = RecordBatch::new(
            vec!["id".into(), "loaded_at".into()],
            vec![vec![Scalar::Int(1), Scalar::Text("stale".into())]],
        );
        let prepared = prepare_batch(
            batch,
            &schema(&["id", "loaded_at"]),
            "orders.csv",
            load_instant(),
        );
        assert_eq!(prepared.columns, vec!["id", "loaded_at"]);
        assert_eq!(prepared.rows[0][1], Scalar::Timestamp(load_instant()));
    }
}
