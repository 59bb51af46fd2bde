//! Qdrant vector store backend implementation.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use std::collections::HashMap;
use std::time::Duration;

use super::VectorStore;
use crate::error::VectorStoreError;
use crate::models::{ChunkMetadata, QueryMatch, UploadBatch, VectorItem, VectorStoreConfig};

/// Payload key carrying the original `{lesson_id}_{chunk_id}` id.
const VECTOR_ID_KEY: &str = "vector_id";
const NAMESPACE_KEY: &str = "namespace";

/// Qdrant vector store backend.
///
/// Qdrant only accepts integer or UUID point ids, so each vector id is
/// mapped to a name-based UUID and kept in the payload as well. Namespaces
/// are a payload field used as a filter and are part of the point id.
pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    embedding_dim: u64,
}

impl QdrantBackend {
    pub fn new(config: &VectorStoreConfig, embedding_dim: u64) -> Result<Self, VectorStoreError> {
        let mut builder =
            Qdrant::from_url(&config.url).timeout(Duration::from_secs(config.timeout_secs));

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            embedding_dim,
        })
    }

    /// Stable point id for a vector id within a namespace. The same vector id
    /// in two namespaces gives two points; re-upserting overwrites in place.
    pub fn point_id(namespace: Option<&str>, vector_id: &str) -> String {
        let name = match namespace {
            Some(ns) => format!("{ns}\u{0}{vector_id}"),
            None => vector_id.to_string(),
        };
        uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    /// Restrict a search to one namespace. Without one, only points stored
    /// without a namespace match.
    fn namespace_filter(namespace: Option<&str>) -> Filter {
        match namespace {
            Some(ns) => Filter::must([Condition::matches(NAMESPACE_KEY, ns.to_string())]),
            None => Filter::must([Condition::is_empty(NAMESPACE_KEY)]),
        }
    }

    fn to_payload(item: &VectorItem, namespace: Option<&str>) -> HashMap<String, Value> {
        let meta = &item.metadata;
        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert(VECTOR_ID_KEY.to_string(), item.id.clone().into());
        payload.insert("lesson_id".to_string(), meta.lesson_id.clone().into());
        payload.insert("board".to_string(), meta.board.clone().into());
        payload.insert("subject".to_string(), meta.subject.clone().into());
        payload.insert("grade".to_string(), i64::from(meta.grade).into());
        payload.insert("book".to_string(), meta.book.clone().into());
        payload.insert("chapter_no".to_string(), meta.chapter_no.clone().into());
        payload.insert("title".to_string(), meta.title.clone().into());
        payload.insert("language".to_string(), meta.language.clone().into());
        payload.insert("chunk_id".to_string(), i64::from(meta.chunk_id).into());
        payload.insert("chunk_text".to_string(), meta.chunk_text.clone().into());
        if let Some(ns) = namespace {
            payload.insert(NAMESPACE_KEY.to_string(), ns.to_string().into());
        }
        payload
    }

    fn from_payload(payload: &HashMap<String, Value>) -> Option<ChunkMetadata> {
        let text = |key: &str| match payload.get(key).and_then(|v| v.kind.as_ref()) {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        };
        let int = |key: &str| match payload.get(key).and_then(|v| v.kind.as_ref()) {
            Some(Kind::IntegerValue(n)) => u32::try_from(*n).ok(),
            Some(Kind::DoubleValue(n)) => Some(*n as u32),
            _ => None,
        };

        Some(ChunkMetadata {
            lesson_id: text("lesson_id")?,
            board: text("board").unwrap_or_default(),
            subject: text("subject").unwrap_or_default(),
            grade: int("grade").unwrap_or_default(),
            book: text("book").unwrap_or_default(),
            chapter_no: text("chapter_no").unwrap_or_default(),
            title: text("title").unwrap_or_default(),
            language: text("language").unwrap_or_default(),
            chunk_id: int("chunk_id")?,
            chunk_text: text("chunk_text").unwrap_or_default(),
        })
    }

    async fn collection_exists(&self) -> Result<bool, VectorStoreError> {
        self.client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))
    }
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        if self.collection_exists().await? {
            return Ok(());
        }

        tracing::info!(
            collection = %self.collection,
            dimension = self.embedding_dim,
            "creating collection"
        );
        let create_collection = CreateCollectionBuilder::new(&self.collection).vectors_config(
            VectorParamsBuilder::new(self.embedding_dim, Distance::Cosine),
        );

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(())
    }

    async fn upsert(
        &self,
        batch: &UploadBatch,
        namespace: Option<&str>,
    ) -> Result<(), VectorStoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = batch
            .items
            .iter()
            .map(|item| {
                PointStruct::new(
                    Self::point_id(namespace, &item.id),
                    item.values.clone(),
                    Self::to_payload(item, namespace),
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        namespace: Option<&str>,
    ) -> Result<Vec<QueryMatch>, VectorStoreError> {
        let search = SearchPointsBuilder::new(&self.collection, vector, top_k)
            .with_payload(true)
            .filter(Self::namespace_filter(namespace));

        let response = self
            .client
            .search_points(search)
            .await
            .map_err(|e| VectorStoreError::QueryError(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| {
                let id = match point.payload.get(VECTOR_ID_KEY).and_then(|v| v.kind.as_ref()) {
                    Some(Kind::StringValue(s)) => s.clone(),
                    _ => String::new(),
                };
                QueryMatch {
                    id,
                    score: point.score,
                    metadata: Self::from_payload(&point.payload),
                }
            })
            .collect())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> VectorItem {
        VectorItem::new(
            vec![0.5; 4],
            ChunkMetadata {
                lesson_id: "abc".to_string(),
                board: "CBSE".to_string(),
                subject: "Science".to_string(),
                grade: 4,
                book: "Play, Do, Learn".to_string(),
                chapter_no: "02".to_string(),
                title: "Plants".to_string(),
                language: "en".to_string(),
                chunk_id: 9,
                chunk_text: "Leaves are green.".to_string(),
            },
        )
    }

    #[test]
    fn test_point_id_is_stable_uuid() {
        let a = QdrantBackend::point_id(None, "abc_9");
        assert_eq!(a, QdrantBackend::point_id(None, "abc_9"));
        assert_ne!(a, QdrantBackend::point_id(None, "abc_10"));
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_point_id_differs_per_namespace() {
        let plain = QdrantBackend::point_id(None, "L1_0");
        let in_a = QdrantBackend::point_id(Some("a"), "L1_0");
        let in_b = QdrantBackend::point_id(Some("b"), "L1_0");
        assert_ne!(in_a, in_b);
        assert_ne!(plain, in_a);
        assert_eq!(in_a, QdrantBackend::point_id(Some("a"), "L1_0"));
    }

    #[test]
    fn test_namespace_filter() {
        use qdrant_client::qdrant::condition::ConditionOneOf;

        let scoped = QdrantBackend::namespace_filter(Some("grade4"));
        assert_eq!(scoped.must.len(), 1);
        match &scoped.must[0].condition_one_of {
            Some(ConditionOneOf::Field(field)) => assert_eq!(field.key, NAMESPACE_KEY),
            other => panic!("expected field match, got {other:?}"),
        }

        let default = QdrantBackend::namespace_filter(None);
        match &default.must[0].condition_one_of {
            Some(ConditionOneOf::IsEmpty(cond)) => assert_eq!(cond.key, NAMESPACE_KEY),
            other => panic!("expected is_empty, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_round_trip() {
        let item = item();
        let payload = QdrantBackend::to_payload(&item, Some("grade4"));
        assert!(payload.contains_key(NAMESPACE_KEY));
        assert!(payload.contains_key(VECTOR_ID_KEY));

        let meta = QdrantBackend::from_payload(&payload).unwrap();
        assert_eq!(meta, item.metadata);
    }

    #[test]
    fn test_payload_without_namespace() {
        let payload = QdrantBackend::to_payload(&item(), None);
        assert!(!payload.contains_key(NAMESPACE_KEY));
        assert!(QdrantBackend::from_payload(&HashMap::new()).is_none());
    }
}
