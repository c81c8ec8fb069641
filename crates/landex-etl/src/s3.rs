//! Public S3 object-storage extraction
//!
//! Files live in a publicly readable bucket and are fetched over plain
//! HTTPS; no AWS credentials are involved. Each configured storage key
//! is dispatched by extension: `.json` goes to the raw-document loader,
//! `.csv` to the tabular loader (with the key as source descriptor),
//! anything else is skipped. The skip is current behavior inherited
//! from the source mapping, not necessarily intended.

use crate::config::S3Config;
use crate::error::{ExtractError, Result};
use crate::raw::{RawDocument, RawDocumentSink};
use crate::tabular::{RecordBatch, TabularSink};
use crate::REQUEST_TIMEOUT;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Extractor for a publicly readable S3 bucket
pub struct PublicS3Extractor {
    config: S3Config,
    raw: Arc<dyn RawDocumentSink>,
    tabular: Arc<dyn TabularSink>,
    client: reqwest::Client,
}

impl PublicS3Extractor {
    pub fn new(
        config: S3Config,
        raw: Arc<dyn RawDocumentSink>,
        tabular: Arc<dyn TabularSink>,
    ) -> Self {
        Self {
            config,
            raw,
            tabular,
            client: reqwest::Client::new(),
        }
    }

    /// Public retrieval URL for a storage key
    ///
    /// Virtual-hosted style against AWS, or path style when a custom
    /// endpoint (minio and friends) is configured.
    pub fn public_url(&self, s3_key: &str) -> String {
        match &self.config.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.config.bucket_name,
                s3_key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.config.bucket_name, self.config.region, s3_key
            ),
        }
    }

    /// Fetch one storage key and dispatch it to the matching loader.
    ///
    /// Returns the number of rows loaded (zero for skipped extensions).
    pub async fn extract_file(&self, s3_key: &str, table_name: &str) -> Result<u64> {
        let url = self.public_url(s3_key);
        info!(url = %url, "Fetching from URL");

        let result = self.fetch_and_dispatch(&url, s3_key, table_name).await;
        match result {
            Ok(rows) => {
                info!(key = %s3_key, rows = rows, "Successfully processed");
                Ok(rows)
            },
            Err(e) => {
                error!(key = %s3_key, error = %e, "Error processing S3 file");
                Err(e)
            },
        }
    }

    async fn fetch_and_dispatch(
        &self,
        url: &str,
        s3_key: &str,
        table_name: &str,
    ) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ExtractError::Connectivity {
                endpoint: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let content = response.text().await.map_err(|e| ExtractError::Connectivity {
            endpoint: url.to_string(),
            source: e,
        })?;

        if s3_key.ends_with(".json") {
            let value: serde_json::Value = serde_json::from_str(&content)
                .map_err(|e| ExtractError::Parse(format!("invalid JSON in {}: {}", s3_key, e)))?;
            self.raw
                .load(table_name, &RawDocument::from_value(value))
                .await
        } else if s3_key.ends_with(".csv") {
            let batch = RecordBatch::from_csv(&content)?;
            self.tabular.load(table_name, batch, s3_key).await
        } else {
            debug!(key = %s3_key, "Skipping file with unsupported extension");
            Ok(0)
        }
    }

    /// Process every configured storage key, in configured order.
    ///
    /// A single failing file aborts the remaining files and propagates.
    pub async fn extract_all(&self) -> Result<()> {
        for (s3_key, table_name) in self.config.files.iter() {
            info!(key = %s3_key, "Processing");
            self.extract_file(s3_key, table_name).await?;
        }
        Ok(())
    }
}
