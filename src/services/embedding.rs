//! Embedding client for generating text embeddings.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EmbeddingError;
use crate::models::{EmbeddingConfig, EmbeddingProvider};

const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co/pipeline/feature-extraction";

/// Turns text into dense vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed several texts. Output order matches input order.
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed one text as a batch of one.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }

    /// Check that the embedding service is reachable.
    async fn health_check(&self) -> Result<HealthResponse, EmbeddingError>;
}

/// Request body for the TEI /embed endpoint.
#[derive(Debug, Serialize)]
struct TeiRequest<'a> {
    inputs: &'a [String],
    truncate: bool,
}

/// Request body for the Hugging Face feature-extraction pipeline.
#[derive(Debug, Serialize)]
struct HfRequest<'a> {
    inputs: &'a [String],
    options: HfOptions,
}

#[derive(Debug, Serialize)]
struct HfOptions {
    wait_for_model: bool,
}

/// Hugging Face answers with a flat vector for a single input on some models.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfResponse {
    Nested(Vec<Vec<f32>>),
    Flat(Vec<f32>),
}

impl HfResponse {
    fn into_vectors(self) -> Vec<Vec<f32>> {
        match self {
            HfResponse::Nested(vectors) => vectors,
            HfResponse::Flat(vector) => vec![vector],
        }
    }
}

/// Health response from the /health endpoint.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
}

impl HealthResponse {
    fn healthy(model_id: Option<String>) -> Self {
        Self {
            status: Some("healthy".to_string()),
            model_id,
        }
    }
}

/// HTTP client for a TEI server or the Hugging Face inference API.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    provider: EmbeddingProvider,
    endpoint: String,
    model: String,
    api_token: Option<String>,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        let endpoint = match config.provider {
            EmbeddingProvider::Tei => format!("{}/embed", config.url.trim_end_matches('/')),
            EmbeddingProvider::HuggingFace => {
                if config.url.contains("huggingface") {
                    config.url.trim_end_matches('/').to_string()
                } else {
                    format!("{HF_INFERENCE_URL}/{}", config.model)
                }
            }
        };

        Ok(Self {
            client,
            provider: config.provider,
            endpoint,
            model: config.model.clone(),
            api_token: config.api_token.clone(),
        })
    }

    /// The URL texts are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn provider(&self) -> EmbeddingProvider {
        self.provider
    }

    async fn post(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = match self.provider {
            EmbeddingProvider::Tei => self.client.post(&self.endpoint).json(&TeiRequest {
                inputs: texts,
                truncate: true,
            }),
            EmbeddingProvider::HuggingFace => {
                let token = self.api_token.as_deref().unwrap_or_default();
                self.client
                    .post(&self.endpoint)
                    .bearer_auth(token)
                    .json(&HfRequest {
                        inputs: texts,
                        options: HfOptions {
                            wait_for_model: true,
                        },
                    })
            }
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout
            } else if e.is_connect() {
                EmbeddingError::ConnectionError(e.to_string())
            } else {
                EmbeddingError::RequestError(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServerError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let vectors = match self.provider {
            EmbeddingProvider::Tei => response
                .json::<Vec<Vec<f32>>>()
                .await
                .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?,
            EmbeddingProvider::HuggingFace => response
                .json::<HfResponse>()
                .await
                .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?
                .into_vectors(),
        };

        if vectors.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.post(&texts).await
    }

    async fn health_check(&self) -> Result<HealthResponse, EmbeddingError> {
        match self.provider {
            EmbeddingProvider::Tei => {
                let url = self.endpoint.trim_end_matches("/embed");
                let response = self
                    .client
                    .get(format!("{url}/health"))
                    .send()
                    .await
                    .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

                if !response.status().is_success() {
                    return Err(EmbeddingError::ServerError(format!(
                        "health check failed with status: {}",
                        response.status()
                    )));
                }

                // TEI answers with an empty body
                let text = response.text().await.unwrap_or_default();
                Ok(serde_json::from_str(&text).unwrap_or_else(|_| HealthResponse::healthy(None)))
            }
            EmbeddingProvider::HuggingFace => {
                self.embed("health").await?;
                Ok(HealthResponse::healthy(Some(self.model.clone())))
            }
        }
    }
}
