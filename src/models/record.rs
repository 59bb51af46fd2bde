use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::page::PageUnit;
use crate::error::ExtractionError;

/// Caller-supplied classification passed through to every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub board: String,
    pub subject: String,
    pub grade: u32,
    pub book: String,
    pub language: String,
}

/// All pages of one source PDF plus its classification.
#[derive(Debug, Clone)]
pub struct DocumentExtraction {
    pub pdf_path: String,
    pub lesson_id: String,
    pages: Vec<PageUnit>,
    pub classification: Classification,
}

impl DocumentExtraction {
    /// Pages must be numbered 1..=n in order.
    pub fn new(
        pdf_path: impl Into<String>,
        pages: Vec<PageUnit>,
        classification: Classification,
    ) -> Result<Self, ExtractionError> {
        for (idx, page) in pages.iter().enumerate() {
            let expected = idx as u32 + 1;
            if page.page_number != expected {
                return Err(ExtractionError::PageSequence(format!(
                    "expected page {expected}, found page {}",
                    page.page_number
                )));
            }
        }

        Ok(Self {
            pdf_path: pdf_path.into(),
            lesson_id: uuid::Uuid::new_v4().to_string(),
            pages,
            classification,
        })
    }

    pub fn pages(&self) -> &[PageUnit] {
        &self.pages
    }

    /// Swap pages through `f`, one replacement per page. Numbering is kept.
    pub fn replace_pages<F, E>(self, mut f: F) -> Result<Self, E>
    where
        F: FnMut(PageUnit) -> Result<PageUnit, E>,
    {
        let mut pages = Vec::with_capacity(self.pages.len());
        for page in self.pages {
            let number = page.page_number;
            let mut replaced = f(page)?;
            replaced.page_number = number;
            pages.push(replaced);
        }
        Ok(Self { pages, ..self })
    }

    /// The weakest page decides. Zero pages give 0.0.
    pub fn aggregate_confidence(&self) -> f32 {
        self.pages
            .iter()
            .map(|p| p.confidence)
            .reduce(f32::min)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0)
    }

    pub fn merged_content(&self) -> String {
        self.pages
            .iter()
            .map(|page| {
                format!(
                    "\n\n=== Page {} ===\n\n{}",
                    page.page_number,
                    page.raw_text.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    pub fn merge(self, chapter_no: String, title: String) -> MergedRecord {
        let content = self.merged_content();
        let confidence = self.aggregate_confidence();
        let image_count = self.pages.iter().map(|p| p.image_count).sum();
        let table_count = self.pages.iter().map(|p| p.table_count).sum();
        let Classification {
            board,
            subject,
            grade,
            book,
            language,
        } = self.classification;

        MergedRecord {
            lesson_id: self.lesson_id,
            board,
            subject,
            grade,
            book,
            chapter_no,
            title,
            content,
            language,
            page_number: None,
            confidence,
            image_count,
            table_count,
            created_at: Utc::now(),
        }
    }
}

/// The flattened per-chapter output, persisted as JSON and later indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub lesson_id: String,
    pub board: String,
    pub subject: String,
    pub grade: u32,
    pub book: String,
    pub chapter_no: String,
    pub title: String,
    pub content: String,
    pub language: String,
    #[serde(default)]
    pub page_number: Option<u32>,
    pub confidence: f32,
    #[serde(default)]
    pub image_count: u32,
    #[serde(default)]
    pub table_count: u32,
    pub created_at: DateTime<Utc>,
}
