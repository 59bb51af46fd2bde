mod batch;
mod chunker;
mod confidence;
mod embedding;
mod extractor;
mod fallback;
mod indexer;
mod ocr;
mod pipeline;
pub mod vector_store;
mod worker;

pub use batch::BatchAccumulator;
pub use chunker::{Chunks, TextSplitter};
pub use confidence::ConfidenceGate;
pub use embedding::{Embedder, EmbeddingClient, HealthResponse};
pub use extractor::{LopdfExtractor, PageExtractor};
pub use fallback::apply_fallback;
pub use indexer::{IndexOutcome, RecordIndexer};
pub use ocr::{OcrEngine, TesseractOcr};
pub use pipeline::{ConvertedRecord, Converter, load_records, parse_chapter_metadata, save_record};
pub use vector_store::{PineconeBackend, QdrantBackend, VectorStore, create_backend};
pub use worker::{BatchReport, TaskOutcome, run_batch};
