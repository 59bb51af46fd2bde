//! Vector store abstraction layer.
//!
//! Backends (Qdrant, Pinecone) sit behind one trait and are picked from
//! configuration. Only the backends know the wire shape of a vector's
//! metadata; everything above them deals in
//! [`ChunkMetadata`](crate::models::ChunkMetadata).

mod pinecone;
mod qdrant;

pub use pinecone::PineconeBackend;
pub use qdrant::QdrantBackend;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{QueryMatch, UploadBatch, VectorDriver, VectorStoreConfig};

/// Abstract trait for vector store operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the vector store is healthy and accessible.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Create the collection if the backend needs one and it is missing.
    async fn ensure_collection(&self) -> Result<(), VectorStoreError>;

    /// Insert or replace every vector in `batch` in one call.
    async fn upsert(
        &self,
        batch: &UploadBatch,
        namespace: Option<&str>,
    ) -> Result<(), VectorStoreError>;

    /// Nearest neighbours of `vector`, best first.
    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        namespace: Option<&str>,
    ) -> Result<Vec<QueryMatch>, VectorStoreError>;

    /// Get the collection or index name.
    fn collection(&self) -> &str;
}

/// Create a vector store backend for the configured driver.
pub fn create_backend(
    config: &VectorStoreConfig,
    embedding_dim: u64,
) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Qdrant => Ok(Box::new(QdrantBackend::new(config, embedding_dim)?)),
        VectorDriver::Pinecone => Ok(Box::new(PineconeBackend::new(config)?)),
    }
}
