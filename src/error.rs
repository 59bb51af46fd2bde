//! Error types for the chapter indexing pipeline.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors raised while reading pages out of a PDF.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to open PDF {path}: {message}")]
    OpenError { path: String, message: String },

    #[error("failed to read page {page}: {message}")]
    PageError { page: u32, message: String },

    #[error("invalid page sequence: {0}")]
    PageSequence(String),
}

/// Errors raised by the OCR fallback engine.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR tool not available: {0}")]
    ToolMissing(String),

    #[error("failed to render page {page}: {message}")]
    RenderError { page: u32, message: String },

    #[error("OCR failed on page {page}: {message}")]
    RecognitionError { page: u32, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            // 5xx gateways and rate limits clear up on their own
            EmbeddingError::ServerError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("loading")
            }
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("vector store client error: {0}")]
    ClientError(String),
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::ConnectionError(_) => true,
            VectorStoreError::CollectionError(msg)
            | VectorStoreError::UpsertError(msg)
            | VectorStoreError::QueryError(msg)
            | VectorStoreError::ClientError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
                    || msg_lower.contains("429")
            }
        }
    }
}

/// Errors related to chunking and upserting a record.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("chunking error: {0}")]
    ChunkError(String),

    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),
}

/// Errors raised while converting one PDF into a record.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("conversion panicked: {0}")]
    Panicked(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("missing required setting: {0}")]
    MissingCredential(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Bad command-line input, reported before any work starts.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("input error: {0}")]
    Input(String),
}
