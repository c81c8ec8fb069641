//! Extraction orchestration
//!
//! Wires the whole pipeline together: builds the database handle, the
//! schema inspector and clock capabilities, both loaders and both
//! fetchers from one configuration, then drives full-refresh runs.
//! Every destination table the current mapping targets is truncated
//! before its pass; any failure propagates upward with no retry.

use crate::api::ApiExtractor;
use crate::config::ExtractorConfig;
use crate::db::Db;
use crate::error::Result;
use crate::raw::{RawDocumentLoader, RawDocumentSink};
use crate::s3::PublicS3Extractor;
use crate::schema::PgSchemaInspector;
use crate::tabular::{SystemClock, TabularLoader, TabularSink};
use crate::LANDING_SCHEMA;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Top-level driver for full extraction runs
pub struct Orchestrator {
    config: ExtractorConfig,
    db: Db,
    s3: PublicS3Extractor,
    api: ApiExtractor,
}

impl Orchestrator {
    /// Build the component graph from configuration
    pub fn new(config: ExtractorConfig) -> Self {
        let db = Db::new(config.database.clone());
        let inspector = Arc::new(PgSchemaInspector::new(db.clone()));
        let clock = Arc::new(SystemClock);

        let raw: Arc<dyn RawDocumentSink> = Arc::new(RawDocumentLoader::new(db.clone()));
        let tabular: Arc<dyn TabularSink> =
            Arc::new(TabularLoader::new(db.clone(), inspector, clock));

        let s3 = PublicS3Extractor::new(config.s3.clone(), raw.clone(), tabular);
        let api = ApiExtractor::new(config.api.endpoints.clone(), raw);

        Self {
            config,
            db,
            s3,
            api,
        }
    }

    /// Load configuration from a YAML file and build the orchestrator
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(ExtractorConfig::load(path)?))
    }

    /// Truncate all S3-mapped tables, then run the S3 pass
    pub async fn extract_s3_data(&self) -> Result<()> {
        info!("Starting S3 data extraction");

        let result = async {
            for table_name in self.config.s3.files.tables() {
                self.db.truncate_table(LANDING_SCHEMA, table_name).await?;
            }
            self.s3.extract_all().await
        }
        .await;

        match result {
            Ok(()) => {
                info!("S3 data extraction completed successfully");
                Ok(())
            },
            Err(e) => {
                error!(error = %e, "S3 data extraction failed");
                Err(e)
            },
        }
    }

    /// Truncate all API-mapped tables, then run the API pass
    pub async fn extract_api_data(&self) -> Result<()> {
        info!("Starting API data extraction");

        let result = async {
            for table_name in self.config.api.endpoints.tables() {
                self.db.truncate_table(LANDING_SCHEMA, table_name).await?;
            }
            self.api.extract_all().await
        }
        .await;

        match result {
            Ok(()) => {
                info!("API data extraction completed successfully");
                Ok(())
            },
            Err(e) => {
                error!(error = %e, "API data extraction failed");
                Err(e)
            },
        }
    }

    /// Run the full extraction: S3 pass, then API pass
    pub async fn extract_all(&self) -> Result<()> {
        info!("Starting full data extraction");

        let result = async {
            self.extract_s3_data().await?;
            self.extract_api_data().await
        }
        .await;

        match result {
            Ok(()) => {
                info!("Data extraction completed successfully");
                Ok(())
            },
            Err(e) => {
                error!(error = %e, "Data extraction failed");
                Err(e)
            },
        }
    }
}
