mod chunk;
mod config;
mod page;
mod record;
mod search;

pub use chunk::{Chunk, ChunkMetadata, UploadBatch, VectorItem};
pub use config::{
    Config, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_EMBEDDING_URL, DEFAULT_MIN_PAGE_CONFIDENCE, DEFAULT_OCR_LANGUAGE, DEFAULT_QDRANT_URL,
    DefaultsConfig, EmbeddingConfig, EmbeddingProvider, ExtractionConfig, IndexingConfig,
    OcrConfig, RetrySettings, SearchConfig, VectorDriver, VectorStoreConfig,
};
pub use page::{BoundingBox, PageUnit, RawPage, TextFragment, TextSource};
pub use record::{Classification, DocumentExtraction, MergedRecord};
pub use search::{OutputFormat, QueryMatch, QueryResults};
