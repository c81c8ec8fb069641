//! Error types for the Landex extractor
//!
//! Every component logs its failure with context (source identifier,
//! table name) and then re-raises the error unchanged; there is no retry
//! layer and no partial-success bookkeeping anywhere in the pipeline.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for extractor operations
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Error type covering the whole extraction pipeline
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Configuration file is missing, malformed, or fails to deserialize
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote endpoint could not be reached (DNS, connect, timeout)
    #[error("Could not reach {endpoint}: {source}")]
    Connectivity {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Remote endpoint answered with a non-success status code
    #[error("Request to {url} returned status {status}")]
    HttpStatus { url: String, status: StatusCode },

    /// Destination metadata catalog query failed
    #[error("Schema lookup failed for {schema}.{table}: {source}")]
    SchemaLookup {
        schema: String,
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// Insert/append into a landing table failed; wraps the underlying cause
    #[error("Failed to load data into table '{table}': {source}")]
    Load {
        table: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Database operation outside the load path failed (connect, truncate)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Response body could not be parsed (CSV or JSON)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ExtractError {
    /// Wrap an underlying failure as a load error for the given table
    pub fn load(
        table: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Load {
            table: table.into(),
            source: source.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_carries_table_name() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = ExtractError::load("customers", inner);
        let msg = err.to_string();
        assert!(msg.contains("customers"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_http_status_display() {
        let err = ExtractError::HttpStatus {
            url: "https://api.example.com/orders".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("https://api.example.com/orders"));
    }
}
