//! PDF to record conversion: extract, gate, recover, merge, persist.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::models::{Classification, DocumentExtraction, MergedRecord, PageUnit};
use crate::services::confidence::ConfidenceGate;
use crate::services::extractor::PageExtractor;
use crate::services::fallback::apply_fallback;
use crate::services::ocr::OcrEngine;

/// Marker in saved record file names; [`load_records`] matches on it.
const RECORD_MARKER: &str = "_validated_";

/// Chapter number and title from a file stem.
///
/// `Chapter_01_Where_the_mind` gives `("01", "Where the mind")`. Anything
/// else is chapter `1.0` with the whole stem as its title.
pub fn parse_chapter_metadata(stem: &str) -> (String, String) {
    let parts: Vec<&str> = stem.splitn(3, '_').collect();
    if parts.len() == 3 && parts[0].eq_ignore_ascii_case("chapter") {
        return (parts[1].to_string(), parts[2].replace('_', " ").trim().to_string());
    }
    ("1.0".to_string(), stem.replace('_', " ").trim().to_string())
}

/// Write `record` as pretty JSON under `dir` and return the file path.
pub fn save_record(record: &MergedRecord, dir: &Path) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(dir)?;
    let file_name = format!(
        "{}{RECORD_MARKER}{}.json",
        record.lesson_id,
        Utc::now().format("%Y%m%dT%H%M%S")
    );
    let path = dir.join(file_name);
    fs::write(&path, serde_json::to_string_pretty(record)?)?;
    Ok(path)
}

/// Every saved record in `dir`, ordered by path.
pub fn load_records(dir: &Path) -> Result<Vec<(PathBuf, MergedRecord)>, PipelineError> {
    let pattern = dir.join(format!("*{RECORD_MARKER}*.json"));
    let pattern = pattern.to_string_lossy();

    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?
        .filter_map(Result::ok)
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| -> Result<(PathBuf, MergedRecord), PipelineError> {
            let content = fs::read_to_string(&path)?;
            let record = serde_json::from_str(&content)?;
            Ok((path, record))
        })
        .collect()
}

/// Result of converting one PDF.
#[derive(Debug, Clone)]
pub struct ConvertedRecord {
    pub record: MergedRecord,
    pub path: PathBuf,
    pub pages: usize,
    pub recovered_pages: usize,
}

/// Converts chapter PDFs into saved records.
pub struct Converter {
    extractor: Box<dyn PageExtractor>,
    ocr: Option<Box<dyn OcrEngine>>,
    gate: ConfidenceGate,
    output_dir: PathBuf,
}

impl Converter {
    pub fn new(extractor: Box<dyn PageExtractor>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            ocr: None,
            gate: ConfidenceGate::default(),
            output_dir: output_dir.into(),
        }
    }

    /// Without an engine, flagged pages keep their direct text.
    #[must_use]
    pub fn with_ocr(mut self, ocr: Option<Box<dyn OcrEngine>>) -> Self {
        self.ocr = ocr;
        self
    }

    #[must_use]
    pub fn with_min_page_confidence(mut self, threshold: f32) -> Self {
        self.gate = ConfidenceGate::new(threshold);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Pages scored and flagged, before any recovery.
    pub fn extract(
        &self,
        pdf_path: &Path,
        classification: Classification,
    ) -> Result<DocumentExtraction, PipelineError> {
        let pages = self
            .extractor
            .extract_pages(pdf_path)?
            .into_iter()
            .map(|raw| {
                let confidence = ConfidenceGate::score(&raw.text);
                PageUnit::extracted(raw, confidence, self.gate.threshold())
            })
            .collect();

        Ok(DocumentExtraction::new(
            pdf_path.display().to_string(),
            pages,
            classification,
        )?)
    }

    pub fn convert(
        &self,
        pdf_path: &Path,
        classification: Classification,
    ) -> Result<ConvertedRecord, PipelineError> {
        let extraction = self.extract(pdf_path, classification)?;
        let flagged = extraction
            .pages()
            .iter()
            .filter(|p| p.needs_fallback)
            .count();

        let (extraction, recovered_pages) = match &self.ocr {
            Some(ocr) => (apply_fallback(extraction, ocr.as_ref(), pdf_path)?, flagged),
            None => {
                if flagged > 0 {
                    tracing::warn!(
                        pages = flagged,
                        path = %pdf_path.display(),
                        "low-confidence pages kept without OCR"
                    );
                }
                (extraction, 0)
            }
        };

        let stem = pdf_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (chapter_no, title) = parse_chapter_metadata(&stem);

        let pages = extraction.pages().len();
        let record = extraction.merge(chapter_no, title);
        let path = save_record(&record, &self.output_dir)?;

        tracing::info!(
            lesson_id = %record.lesson_id,
            pages,
            recovered_pages,
            confidence = record.confidence,
            images = record.image_count,
            path = %path.display(),
            "converted chapter"
        );

        Ok(ConvertedRecord {
            record,
            path,
            pages,
            recovered_pages,
        })
    }
}
