//! HTTP API extraction
//!
//! Each configured endpoint is fetched with a bounded timeout, required
//! to answer with a success status, parsed as JSON and handed to the
//! raw-document loader. Endpoints are processed strictly in configured
//! order; a failing endpoint aborts the remainder of the pass while
//! rows already committed for earlier endpoints stay in place.

use crate::config::TableMapping;
use crate::error::{ExtractError, Result};
use crate::raw::{RawDocument, RawDocumentSink};
use crate::REQUEST_TIMEOUT;
use std::sync::Arc;
use tracing::{error, info};

/// Extractor for JSON-returning HTTP GET endpoints
pub struct ApiExtractor {
    endpoints: TableMapping,
    raw: Arc<dyn RawDocumentSink>,
    client: reqwest::Client,
}

impl ApiExtractor {
    pub fn new(endpoints: TableMapping, raw: Arc<dyn RawDocumentSink>) -> Self {
        Self {
            endpoints,
            raw,
            client: reqwest::Client::new(),
        }
    }

    /// Fetch one endpoint and load its JSON body.
    ///
    /// Returns the number of rows loaded.
    pub async fn extract_endpoint(&self, url: &str, table_name: &str) -> Result<u64> {
        let table_name = table_name.to_lowercase();

        match self.fetch_and_load(url, &table_name).await {
            Ok(rows) => {
                info!(url = %url, table = %table_name, rows = rows, "Loaded API data");
                Ok(rows)
            },
            Err(e) => {
                error!(url = %url, table = %table_name, error = %e, "Error processing endpoint");
                Err(e)
            },
        }
    }

    async fn fetch_and_load(&self, url: &str, table_name: &str) -> Result<u64> {
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

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExtractError::Parse(format!("invalid JSON from {}: {}", url, e)))?;

        self.raw
            .load(table_name, &RawDocument::from_value(json))
            .await
    }

    /// Process every configured endpoint, in configured order.
    ///
    /// A single failing endpoint aborts the remaining endpoints and
    /// propagates; there is no partial-success reporting.
    pub async fn extract_all(&self) -> Result<()> {
        for (url, table_name) in self.endpoints.iter() {
            info!(url = %url, "Processing");
            self.extract_endpoint(url, table_name).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingRawSink;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor_for(
        endpoints: Vec<(String, String)>,
    ) -> (ApiExtractor, Arc<RecordingRawSink>) {
        let raw = Arc::new(RecordingRawSink::default());
        (ApiExtractor::new(endpoints.into(), raw.clone()), raw)
    }

    #[tokio::test]
    async fn test_endpoint_routes_json_to_raw_loader() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customers"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])),
            )
            .mount(&server)
            .await;

        let (extractor, raw) = extractor_for(vec![]);
        let url = format!("{}/customers", server.uri());
        let rows = extractor.extract_endpoint(&url, "Customers_Raw").await.unwrap();

        assert_eq!(rows, 2);
        let calls = raw.calls();
        assert_eq!(calls.len(), 1);
        // Table name is lowercased before loading
        assert_eq!(calls[0].0, "customers_raw");
        assert_eq!(calls[0].1, RawDocument::Many(vec![json!({"id": 1}), json!({"id": 2})]));
    }

    #[tokio::test]
    async fn test_non_success_status_propagates_without_loading() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (extractor, raw) = extractor_for(vec![]);
        let url = format!("{}/down", server.uri());
        let err = extractor.extract_endpoint(&url, "t").await.unwrap_err();

        assert!(matches!(
            err,
            ExtractError::HttpStatus { status, .. } if status.as_u16() == 503
        ));
        assert!(raw.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let (extractor, _) = extractor_for(vec![]);
        let url = format!("{}/garbled", server.uri());
        let err = extractor.extract_endpoint(&url, "t").await.unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[tokio::test]
    async fn test_extract_all_aborts_after_failed_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/one"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"n": 1})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/two"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/three"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"n": 3})))
            .mount(&server)
            .await;

        let endpoints = vec![
            (format!("{}/one", server.uri()), "t_one".to_string()),
            (format!("{}/two", server.uri()), "t_two".to_string()),
            (format!("{}/three", server.uri()), "t_three".to_string()),
        ];
        let (extractor, raw) = extractor_for(endpoints);

        let err = extractor.extract_all().await.unwrap_err();
        assert!(matches!(err, ExtractError::HttpStatus { .. }));

        // Endpoint one loaded; endpoint three was never attempted
        let calls = raw.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "t_one");
        let requests = server.received_requests().await.unwrap();
        assert!(!requests.iter().any(|r| r.url.path() == "/three"));
    }
}
