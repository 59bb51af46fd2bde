//! Pinecone vector store backend over the data-plane REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::VectorStore;
use crate::error::VectorStoreError;
use crate::models::{ChunkMetadata, QueryMatch, UploadBatch, VectorStoreConfig};

const API_VERSION: &str = "2024-07";

#[derive(Debug, Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a ChunkMetadata,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: Vec<f32>,
    top_k: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Debug, Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

/// Pinecone backend. `index_host` is the data-plane host, `collection` the index name.
pub struct PineconeBackend {
    client: Client,
    host: String,
    index: String,
    api_key: String,
}

impl PineconeBackend {
    pub fn new(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            VectorStoreError::ConnectionError("Pinecone API key is not set".to_string())
        })?;

        let host = config
            .index_host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                VectorStoreError::ConnectionError("Pinecone index host is not set".to_string())
            })?
            .trim_end_matches('/');
        let host = if host.starts_with("http") {
            host.to_string()
        } else {
            format!("https://{host}")
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            host,
            index: config.collection.clone(),
            api_key,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(format!("{}{path}", self.host))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
    }

    fn transport_error(e: reqwest::Error) -> VectorStoreError {
        if e.is_timeout() {
            VectorStoreError::ConnectionError(format!("timeout: {e}"))
        } else if e.is_connect() {
            VectorStoreError::ConnectionError(e.to_string())
        } else {
            VectorStoreError::ClientError(e.to_string())
        }
    }

    async fn status_error(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        format!("status {status}: {body}")
    }
}

#[async_trait]
impl VectorStore for PineconeBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        let response = self
            .post("/describe_index_stats", &serde_json::json!({}))
            .await
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VectorStoreError::ConnectionError(
                Self::status_error(response).await,
            ));
        }
        Ok(true)
    }

    /// Pinecone indexes are provisioned outside this tool.
    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
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

        let request = UpsertRequest {
            vectors: batch
                .items
                .iter()
                .map(|item| WireVector {
                    id: &item.id,
                    values: &item.values,
                    metadata: &item.metadata,
                })
                .collect(),
            namespace,
        };

        let response = self
            .post("/vectors/upsert", &request)
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(VectorStoreError::UpsertError(
                Self::status_error(response).await,
            ));
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        namespace: Option<&str>,
    ) -> Result<Vec<QueryMatch>, VectorStoreError> {
        let request = QueryRequest {
            vector,
            top_k,
            namespace,
            include_metadata: true,
        };

        let response = self
            .post("/query", &request)
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(VectorStoreError::QueryError(
                Self::status_error(response).await,
            ));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::QueryError(e.to_string()))?;

        Ok(body
            .matches
            .into_iter()
            .map(|m| QueryMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata.and_then(|v| serde_json::from_value(v).ok()),
            })
            .collect())
    }

    fn collection(&self) -> &str {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{VectorDriver, VectorItem};

    fn config(host: &str) -> VectorStoreConfig {
        VectorStoreConfig {
            driver: VectorDriver::Pinecone,
            index_host: Some(host.to_string()),
            api_key: Some("pk-test".to_string()),
            collection: "textbooks-prod".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_host_normalization() {
        let backend = PineconeBackend::new(&config("textbooks-abc.svc.pinecone.io/")).unwrap();
        assert_eq!(backend.host(), "https://textbooks-abc.svc.pinecone.io");
    }

    #[test]
    fn test_missing_api_key() {
        let mut cfg = config("https://x.pinecone.io");
        cfg.api_key = None;
        assert!(PineconeBackend::new(&cfg).is_err());
    }

    #[test]
    fn test_missing_index_host_ignores_qdrant_url() {
        let cfg = VectorStoreConfig {
            index_host: None,
            ..config("unused")
        };
        assert_eq!(cfg.url, crate::models::DEFAULT_QDRANT_URL);
        assert!(PineconeBackend::new(&cfg).is_err());
    }

    #[test]
    fn test_upsert_body_shape() {
        let item = VectorItem::new(
            vec![0.25, 0.5],
            ChunkMetadata {
                lesson_id: "abc".to_string(),
                board: "CBSE".to_string(),
                subject: "Science".to_string(),
                grade: 4,
                book: "Book".to_string(),
                chapter_no: "1.0".to_string(),
                title: "Water".to_string(),
                language: "en".to_string(),
                chunk_id: 0,
                chunk_text: "Water is life.".to_string(),
            },
        );
        let request = UpsertRequest {
            vectors: vec![WireVector {
                id: &item.id,
                values: &item.values,
                metadata: &item.metadata,
            }],
            namespace: Some("grade4"),
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["namespace"], "grade4");
        assert_eq!(body["vectors"][0]["id"], "abc_0");
        assert_eq!(body["vectors"][0]["metadata"]["grade"], 4);
        assert_eq!(body["vectors"][0]["metadata"]["chunk_text"], "Water is life.");
    }

    #[test]
    fn test_query_request_and_response() {
        let body = serde_json::to_value(QueryRequest {
            vector: vec![0.1],
            top_k: 5,
            namespace: None,
            include_metadata: true,
        })
        .unwrap();
        assert_eq!(body["topK"], 5);
        assert_eq!(body["includeMetadata"], true);
        assert!(body.get("namespace").is_none());

        let response: QueryResponse = serde_json::from_str(
            r#"{"matches":[{"id":"abc_0","score":0.91,"metadata":{"lesson_id":"abc"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.matches.len(), 1);
        assert_eq!(response.matches[0].id, "abc_0");
    }
}
