//! Per-page extraction models.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in page coordinates, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// A positioned piece of text on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub bbox: BoundingBox,
}

/// What a PDF extractor returns for one page, before scoring.
#[derive(Debug, Clone, Default)]
pub struct RawPage {
    pub page_number: u32,
    pub text: String,
    pub fragments: Vec<TextFragment>,
    pub image_count: u32,
}

/// Where a page's text came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    #[default]
    TextLayer,
    Ocr,
}

/// One page's extracted content and its confidence verdict.
///
/// Pages are never edited in place. A fallback pass produces a new page
/// through [`PageUnit::recovered`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageUnit {
    pub page_number: u32,
    pub raw_text: String,
    pub fragments: Vec<TextFragment>,
    pub image_count: u32,
    pub table_count: u32,
    pub confidence: f32,
    pub needs_fallback: bool,
    pub source: TextSource,
}

impl PageUnit {
    /// Build a page from direct extraction output. The fallback flag is set
    /// when `confidence` is below `threshold`.
    pub fn extracted(raw: RawPage, confidence: f32, threshold: f32) -> Self {
        Self {
            page_number: raw.page_number,
            raw_text: raw.text,
            fragments: raw.fragments,
            image_count: raw.image_count,
            table_count: 0,
            confidence,
            needs_fallback: confidence < threshold,
            source: TextSource::TextLayer,
        }
    }

    /// Replacement page after OCR recovery. Never flagged again.
    #[must_use]
    pub fn recovered(self, text: String, confidence: f32) -> Self {
        Self {
            raw_text: text,
            confidence,
            needs_fallback: false,
            source: TextSource::Ocr,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str) -> RawPage {
        RawPage {
            page_number: 3,
            text: text.to_string(),
            fragments: vec![TextFragment {
                text: text.to_string(),
                bbox: BoundingBox {
                    x0: 10.0,
                    y0: 20.0,
                    x1: 110.0,
                    y1: 32.0,
                },
            }],
            image_count: 2,
        }
    }

    #[test]
    fn test_flag_follows_threshold() {
        assert!(PageUnit::extracted(raw("x"), 0.7, 0.85).needs_fallback);
        assert!(!PageUnit::extracted(raw("x"), 0.9, 0.85).needs_fallback);
        // equal to the threshold is not below it
        assert!(!PageUnit::extracted(raw("x"), 0.85, 0.85).needs_fallback);
    }

    #[test]
    fn test_recovered_clears_flag_and_keeps_layout() {
        let page = PageUnit::extracted(raw("#@!"), 0.4, 0.85);
        assert!(page.needs_fallback);

        let recovered = page.recovered("short".to_string(), 0.4);
        assert!(!recovered.needs_fallback);
        assert_eq!(recovered.source, TextSource::Ocr);
        assert_eq!(recovered.raw_text, "short");
        assert_eq!(recovered.page_number, 3);
        assert_eq!(recovered.image_count, 2);
        assert_eq!(recovered.fragments.len(), 1);
    }
}
