use fnlog_core::config::DEFAULT_MAX_REQUEST_BYTES;
use fnlog_core::error::Result;
use fnlog_core::model::log::RawLogRecord;
use fnlog_core::query::IngestResponse;
use fnlog_store::Store;
use tracing::debug;

use crate::normalize::normalize_batch;
use crate::otlp::envelope::decode_logs_request;

/// Decode, normalize, store. Shared by the HTTP and gRPC ingest surfaces.
#[derive(Clone)]
pub struct Pipeline {
    store: Store,
    max_request_bytes: usize,
}

impl Pipeline {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }

    /// Caps both the transport body and the body after decompression.
    pub fn with_max_request_bytes(mut self, max_request_bytes: usize) -> Self {
        self.max_request_bytes = max_request_bytes;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    /// Handles one export body. A decode failure stores nothing; per-record
    /// problems only affect the record they occur in.
    pub fn ingest(
        &self,
        body: &[u8],
        content_type: Option<&str>,
        content_encoding: Option<&str>,
    ) -> Result<IngestResponse> {
        let records = decode_logs_request(
            body,
            content_type,
            content_encoding,
            self.max_request_bytes,
        )?;
        Ok(self.ingest_records(records))
    }

    pub fn ingest_records(&self, records: Vec<RawLogRecord>) -> IngestResponse {
        let entries = normalize_batch(records);
        let inserted = self.store.add_batch(entries);
        let added = inserted.ids.len();
        debug!(added, total = inserted.total, "log batch stored");
        IngestResponse::success(added, inserted.total)
    }
}
