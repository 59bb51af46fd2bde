use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::search::OutputFormat;
use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:8080";
pub const DEFAULT_EMBEDDING_MODEL: &str = "intfloat/multilingual-e5-large";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1024;
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "textbooks-prod";
pub const DEFAULT_MIN_PAGE_CONFIDENCE: f32 = 0.85;
pub const DEFAULT_OCR_LANGUAGE: &str = "mar+hin+eng";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("chapterdex").join("config.toml"))
    }

    /// Like [`Config::config_path`], but an error when no config directory exists.
    pub fn require_config_path() -> Result<PathBuf, ConfigError> {
        Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })
    }

    /// Load the TOML file (explicit path, else the user config path) and
    /// overlay process environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay environment settings using the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = get("EMBEDDING_PROVIDER").and_then(|v| v.parse().ok()) {
            self.embedding.provider = provider;
        }
        if let Some(url) = get("EMBEDDING_URL") {
            self.embedding.url = url;
        }
        if let Some(token) = get("HF_API_TOKEN") {
            self.embedding.api_token = Some(token);
        }

        if let Some(driver) = get("VECTOR_DRIVER").and_then(|v| v.parse().ok()) {
            self.vector_store.driver = driver;
        }
        match self.vector_store.driver {
            VectorDriver::Pinecone => {
                if let Some(key) = get("PINECONE_API_KEY") {
                    self.vector_store.api_key = Some(key);
                }
                if let Some(index) = get("PINECONE_INDEX_NAME") {
                    self.vector_store.collection = index;
                }
                if let Some(host) = get("PINECONE_INDEX_HOST") {
                    self.vector_store.index_host = Some(host);
                }
            }
            VectorDriver::Qdrant => {
                if let Some(key) = get("QDRANT_API_KEY") {
                    self.vector_store.api_key = Some(key);
                }
                if let Some(url) = get("QDRANT_URL") {
                    self.vector_store.url = url;
                }
            }
        }

        if let Some(flag) = get("ENABLE_OCR_FALLBACK") {
            self.extraction.ocr.enabled = flag.eq_ignore_ascii_case("true");
        }

        if let Some(board) = get("DEFAULT_BOARD") {
            self.defaults.board = board;
        }
        if let Some(subject) = get("DEFAULT_SUBJECT") {
            self.defaults.subject = subject;
        }
        if let Some(grade) = get("DEFAULT_GRADE").and_then(|v| v.trim().parse().ok()) {
            self.defaults.grade = grade;
        }
        if let Some(book) = get("DEFAULT_BOOK") {
            self.defaults.book = book;
        }
        if let Some(language) = get("DEFAULT_LANGUAGE") {
            self.defaults.language = language;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.extraction.min_page_confidence;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ValidationError(format!(
                "min_page_confidence must be between 0.0 and 1.0, got {threshold}"
            )));
        }
        if self.indexing.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.indexing.chunk_overlap, self.indexing.chunk_size
            )));
        }
        Ok(())
    }

    /// Credentials needed before any embedding or vector store call.
    pub fn validate_for_indexing(&self) -> Result<(), ConfigError> {
        if self.embedding.provider == EmbeddingProvider::HuggingFace
            && self.embedding.api_token.is_none()
        {
            return Err(ConfigError::MissingCredential(
                "HF_API_TOKEN is required for the huggingface embedding provider".to_string(),
            ));
        }

        if self.vector_store.driver == VectorDriver::Pinecone {
            if self.vector_store.api_key.is_none() {
                return Err(ConfigError::MissingCredential(
                    "PINECONE_API_KEY is not set".to_string(),
                ));
            }
            let has_host = self
                .vector_store
                .index_host
                .as_deref()
                .is_some_and(|h| !h.trim().is_empty());
            if !has_host {
                return Err(ConfigError::MissingCredential(
                    "PINECONE_INDEX_HOST is not set".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Text Embeddings Inference style `/embed` server
    #[default]
    Tei,
    /// Hugging Face Inference API feature-extraction pipeline
    HuggingFace,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tei" => Ok(EmbeddingProvider::Tei),
            "huggingface" | "hf" => Ok(EmbeddingProvider::HuggingFace),
            _ => Err(format!("unknown embedding provider: {s}")),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::Tei => write!(f, "tei"),
            EmbeddingProvider::HuggingFace => write!(f, "huggingface"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    #[serde(default = "default_embedding_dimension")]
    pub dimension: u32,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_embedding_timeout() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            url: default_embedding_url(),
            model: default_embedding_model(),
            api_token: None,
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    #[default]
    Qdrant,
    Pinecone,
}

impl std::str::FromStr for VectorDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qdrant" => Ok(VectorDriver::Qdrant),
            "pinecone" => Ok(VectorDriver::Pinecone),
            _ => Err(format!("unknown vector driver: {s}")),
        }
    }
}

impl std::fmt::Display for VectorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorDriver::Qdrant => write!(f, "qdrant"),
            VectorDriver::Pinecone => write!(f, "pinecone"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    /// Qdrant URL.
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// Pinecone index host. Never derived from `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_host: Option<String>,

    /// Qdrant collection, or the Pinecone index name.
    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_store_timeout() -> u64 {
    30
}

impl VectorStoreConfig {
    /// Address the configured driver talks to.
    pub fn endpoint(&self) -> &str {
        match self.driver {
            VectorDriver::Qdrant => &self.url,
            VectorDriver::Pinecone => self.index_host.as_deref().unwrap_or(""),
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::default(),
            url: default_qdrant_url(),
            index_host: None,
            collection: default_collection(),
            api_key: None,
            timeout_secs: default_store_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_min_page_confidence")]
    pub min_page_confidence: f32,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub ocr: OcrConfig,
}

fn default_min_page_confidence() -> f32 {
    DEFAULT_MIN_PAGE_CONFIDENCE
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_page_confidence: default_min_page_confidence(),
            output_dir: default_output_dir(),
            ocr: OcrConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ocr_language")]
    pub language: String,

    #[serde(default = "default_ocr_dpi")]
    pub dpi: u32,

    #[serde(default = "default_pdftoppm")]
    pub pdftoppm_path: String,

    #[serde(default = "default_tesseract")]
    pub tesseract_path: String,
}

fn default_true() -> bool {
    true
}

fn default_ocr_language() -> String {
    DEFAULT_OCR_LANGUAGE.to_string()
}

fn default_ocr_dpi() -> u32 {
    300
}

fn default_pdftoppm() -> String {
    "pdftoppm".to_string()
}

fn default_tesseract() -> String {
    "tesseract".to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            language: default_ocr_language(),
            dpi: default_ocr_dpi(),
            pdftoppm_path: default_pdftoppm(),
            tesseract_path: default_tesseract(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Maximum chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Characters shared between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    /// Vectors per upsert call.
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: u32,

    /// Characters of chunk text stored in vector metadata.
    #[serde(default = "default_preview_chars")]
    pub metadata_text_chars: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

fn default_chunk_size() -> u32 {
    512
}

fn default_chunk_overlap() -> u32 {
    50
}

fn default_upsert_batch_size() -> u32 {
    100
}

fn default_preview_chars() -> u32 {
    1000
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            upsert_batch_size: default_upsert_batch_size(),
            metadata_text_chars: default_preview_chars(),
            namespace: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

/// Classification values used when the command line leaves them out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_board")]
    pub board: String,

    #[serde(default = "default_subject")]
    pub subject: String,

    #[serde(default = "default_grade")]
    pub grade: u32,

    #[serde(default = "default_book")]
    pub book: String,

    #[serde(default = "default_language")]
    pub language: String,
}

fn default_board() -> String {
    "State Board Maharashtra".to_string()
}

fn default_subject() -> String {
    "Science".to_string()
}

fn default_grade() -> u32 {
    4
}

fn default_book() -> String {
    "Play, Do, Learn".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            board: default_board(),
            subject: default_subject(),
            grade: default_grade(),
            book: default_book(),
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default)]
    pub default_format: OutputFormat,

    #[serde(default = "default_preview_len")]
    pub preview_chars: usize,
}

fn default_limit() -> u32 {
    5
}

fn default_preview_len() -> usize {
    400
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_format: OutputFormat::Text,
            preview_chars: default_preview_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.url, DEFAULT_EMBEDDING_URL);
        assert_eq!(config.vector_store.url, DEFAULT_QDRANT_URL);
        assert_eq!(config.vector_store.collection, DEFAULT_COLLECTION);
        assert_eq!(config.extraction.min_page_confidence, 0.85);
        assert_eq!(config.indexing.chunk_size, 512);
        assert_eq!(config.indexing.chunk_overlap, 50);
        assert_eq!(config.indexing.upsert_batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [vector_store]
            driver = "pinecone"
            collection = "chapters"

            [indexing]
            chunk_size = 256
            "#,
        )
        .unwrap();

        assert_eq!(config.vector_store.driver, VectorDriver::Pinecone);
        assert_eq!(config.vector_store.collection, "chapters");
        assert_eq!(config.indexing.chunk_size, 256);
        assert_eq!(config.indexing.chunk_overlap, 50);
        assert!(config.extraction.ocr.enabled);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(lookup(&[
            ("VECTOR_DRIVER", "pinecone"),
            ("PINECONE_API_KEY", "pc-key"),
            ("PINECONE_INDEX_NAME", "chapters"),
            ("PINECONE_INDEX_HOST", "https://chapters-abc.svc.pinecone.io"),
            ("ENABLE_OCR_FALLBACK", "false"),
            ("DEFAULT_GRADE", "10"),
            ("DEFAULT_SUBJECT", "English"),
        ]));

        assert_eq!(config.vector_store.driver, VectorDriver::Pinecone);
        assert_eq!(config.vector_store.api_key.as_deref(), Some("pc-key"));
        assert_eq!(config.vector_store.collection, "chapters");
        assert_eq!(
            config.vector_store.endpoint(),
            "https://chapters-abc.svc.pinecone.io"
        );
        assert_eq!(config.vector_store.url, DEFAULT_QDRANT_URL);
        assert!(!config.extraction.ocr.enabled);
        assert_eq!(config.defaults.grade, 10);
        assert_eq!(config.defaults.subject, "English");
        assert!(config.validate_for_indexing().is_ok());
    }

    #[test]
    fn test_missing_pinecone_key_is_config_error() {
        let mut config = Config::default();
        config.vector_store.driver = VectorDriver::Pinecone;
        config.vector_store.index_host = Some("https://index.svc.pinecone.io".to_string());

        assert!(matches!(
            config.validate_for_indexing(),
            Err(ConfigError::MissingCredential(_))
        ));
    }

    #[test]
    fn test_pinecone_without_index_host_is_config_error() {
        let mut config = Config::default();
        config.apply_env(lookup(&[
            ("VECTOR_DRIVER", "pinecone"),
            ("PINECONE_API_KEY", "pc-key"),
            ("PINECONE_INDEX_NAME", "chapters"),
        ]));

        assert_eq!(config.vector_store.index_host, None);
        assert!(matches!(
            config.validate_for_indexing(),
            Err(ConfigError::MissingCredential(msg)) if msg.contains("PINECONE_INDEX_HOST")
        ));
    }

    #[test]
    fn test_require_config_path() {
        if let Some(expected) = Config::config_path() {
            assert_eq!(Config::require_config_path().unwrap(), expected);
            assert!(expected.ends_with("chapterdex/config.toml"));
        } else {
            assert!(matches!(
                Config::require_config_path(),
                Err(ConfigError::PathError(_))
            ));
        }
    }

    #[test]
    fn test_missing_hf_token_is_config_error() {
        let mut config = Config::default();
        config.embedding.provider = EmbeddingProvider::HuggingFace;
        assert!(matches!(
            config.validate_for_indexing(),
            Err(ConfigError::MissingCredential(_))
        ));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = Config::default();
        config.indexing.chunk_overlap = 512;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.defaults.book = "English Balbharti".to_string();
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.defaults.book, "English Balbharti");
    }
}
