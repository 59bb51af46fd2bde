//! Chunk, embed and upsert one merged record.

use crate::error::{IndexError, VectorStoreError};
use crate::models::{ChunkMetadata, MergedRecord, UploadBatch, VectorItem};
use crate::services::batch::BatchAccumulator;
use crate::services::chunker::TextSplitter;
use crate::services::embedding::Embedder;
use crate::services::vector_store::VectorStore;
use crate::utils::retry::{RetryConfig, with_retry};

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Content was empty; nothing was embedded.
    Skipped,
    Indexed { chunks: usize, batches: usize },
}

/// Drives a record through chunking, embedding and batched upserts.
pub struct RecordIndexer<'a> {
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
    splitter: TextSplitter,
    batch_size: usize,
    metadata_text_chars: usize,
    namespace: Option<String>,
    retry: RetryConfig,
}

impl<'a> RecordIndexer<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        store: &'a dyn VectorStore,
        splitter: TextSplitter,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            splitter,
            batch_size,
            metadata_text_chars: 1000,
            namespace: None,
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    #[must_use]
    pub fn with_metadata_text_chars(mut self, chars: usize) -> Self {
        self.metadata_text_chars = chars;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Index every chunk of `record`, in order.
    ///
    /// Batches go out as soon as they fill. A failure after retries stops the
    /// record; batches already sent stay in the store and are overwritten on
    /// the next run since vector ids are deterministic.
    pub async fn index_record(&self, record: &MergedRecord) -> Result<IndexOutcome, IndexError> {
        if record.content.trim().is_empty() {
            tracing::warn!(lesson_id = %record.lesson_id, "skipping record with empty content");
            return Ok(IndexOutcome::Skipped);
        }

        let mut accumulator = BatchAccumulator::new(self.batch_size);
        let mut chunks = 0;
        let mut batches = 0;

        for chunk in self.splitter.split(&record.content) {
            let values = with_retry(&self.retry, || self.embedder.embed(chunk.text))
                .await
                .into_result()?;

            let metadata = ChunkMetadata::for_chunk(record, &chunk, self.metadata_text_chars);
            chunks += 1;

            if let Some(batch) = accumulator.accumulate(VectorItem::new(values, metadata)) {
                self.upload(&batch).await?;
                batches += 1;
            }
        }

        if let Some(batch) = accumulator.flush() {
            self.upload(&batch).await?;
            batches += 1;
        }

        tracing::info!(
            lesson_id = %record.lesson_id,
            chunks,
            batches,
            "indexed record"
        );
        Ok(IndexOutcome::Indexed { chunks, batches })
    }

    async fn upload(&self, batch: &UploadBatch) -> Result<(), VectorStoreError> {
        let namespace = self.namespace.as_deref();
        with_retry(&self.retry, || self.store.upsert(batch, namespace))
            .await
            .into_result()?;
        tracing::debug!(items = batch.len(), "upserted batch");
        Ok(())
    }
}
