//! Recording fakes for the loader seams, shared by fetcher tests

use crate::error::Result;
use crate::raw::{RawDocument, RawDocumentSink};
use crate::tabular::{RecordBatch, TabularSink};
use async_trait::async_trait;
use std::sync::Mutex;

/// Raw-document sink that records every call instead of touching a database
#[derive(Default)]
pub struct RecordingRawSink {
    calls: Mutex<Vec<(String, RawDocument)>>,
}

impl RecordingRawSink {
    pub fn calls(&self) -> Vec<(String, RawDocument)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RawDocumentSink for RecordingRawSink {
    async fn load(&self, table_name: &str, document: &RawDocument) -> Result<u64> {
        self.calls
            .lock()
            .unwrap()
            .push((table_name.to_string(), document.clone()));
        Ok(document.row_count())
    }
}

/// Tabular sink that records every call instead of touching a database
#[derive(Default)]
pub struct RecordingTabularSink {
    calls: Mutex<Vec<(String, RecordBatch, String)>>,
}

impl RecordingTabularSink {
    pub fn calls(&self) -> Vec<(String, RecordBatch, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TabularSink for RecordingTabularSink {
    async fn load(
        &self,
        table_name: &str,
        batch: RecordBatch,
        source_descriptor: &str,
    ) -> Result<u64> {
        let rows = batch.row_count();
        self.calls.lock().unwrap().push((
            table_name.to_string(),
            batch,
            source_descriptor.to_string(),
        ));
        Ok(rows)
    }
}
