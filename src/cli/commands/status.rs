use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat, VectorDriver};
use crate::services::{Embedder, EmbeddingClient, TesseractOcr, create_backend};

pub async fn handle_status(config: &Config, format: OutputFormat, verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);

    let embedding_healthy = match EmbeddingClient::new(&config.embedding) {
        Ok(client) => match client.health_check().await {
            Ok(_) => true,
            Err(e) => {
                if verbose {
                    eprintln!("Embedding check failed: {e}");
                }
                false
            }
        },
        Err(_) => false,
    };

    let vector_store_connected =
        match create_backend(&config.vector_store, u64::from(config.embedding.dimension)) {
            Ok(store) => store.health_check().await.unwrap_or(false),
            Err(e) => {
                if verbose {
                    eprintln!("Vector store setup failed: {e}");
                }
                false
            }
        };

    let ocr_enabled = config.extraction.ocr.enabled;
    let ocr_available = TesseractOcr::new(&config.extraction.ocr)
        .check_tools()
        .is_ok();

    let status = StatusInfo {
        embedding_provider: config.embedding.provider.to_string(),
        embedding_url: config.embedding.url.clone(),
        embedding_model: config.embedding.model.clone(),
        embedding_healthy,
        vector_store_driver: config.vector_store.driver.to_string(),
        vector_store_url: config.vector_store.endpoint().to_string(),
        vector_store_connected,
        collection: config.vector_store.collection.clone(),
        ocr_enabled,
        ocr_available,
    };

    print!("{}", formatter.format_status(&status));

    if !embedding_healthy || !vector_store_connected || (ocr_enabled && !ocr_available) {
        eprintln!();
        if !embedding_healthy {
            eprintln!(
                "Warning: embedding server not reachable at {}",
                config.embedding.url
            );
        }
        if !vector_store_connected {
            match config.vector_store.driver {
                VectorDriver::Qdrant => {
                    eprintln!("Warning: Qdrant not running. Start with: docker run -p 6334:6334 qdrant/qdrant");
                }
                VectorDriver::Pinecone => {
                    eprintln!("Warning: Pinecone index not reachable. Check PINECONE_API_KEY and PINECONE_INDEX_HOST.");
                }
            }
        }
        if ocr_enabled && !ocr_available {
            eprintln!("Hint: install poppler-utils and tesseract-ocr for OCR fallback.");
        }
    }

    Ok(())
}
