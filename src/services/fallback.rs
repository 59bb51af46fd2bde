//! One-shot OCR recovery of low-confidence pages.

use std::path::Path;

use crate::error::OcrError;
use crate::models::DocumentExtraction;
use crate::services::confidence::ConfidenceGate;
use crate::services::ocr::OcrEngine;

/// Replace every flagged page with its OCR text.
///
/// Recovered pages are scored by [`ConfidenceGate::score_recovered_text`] and
/// never flagged again, whatever that score is. Unflagged pages pass through
/// untouched. The first OCR error aborts the document.
pub fn apply_fallback(
    extraction: DocumentExtraction,
    ocr: &dyn OcrEngine,
    pdf_path: &Path,
) -> Result<DocumentExtraction, OcrError> {
    let flagged = extraction
        .pages()
        .iter()
        .filter(|p| p.needs_fallback)
        .count();
    if flagged == 0 {
        return Ok(extraction);
    }

    tracing::info!(pages = flagged, path = %pdf_path.display(), "running OCR fallback");
    extraction.replace_pages(|page| {
        if !page.needs_fallback {
            return Ok(page);
        }
        let text = ocr.recognize_page(pdf_path, page.page_number)?;
        let confidence = ConfidenceGate::score_recovered_text(&text);
        tracing::debug!(page = page.page_number, confidence, "page recovered");
        Ok(page.recovered(text, confidence))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, PageUnit, RawPage, TextSource};
    use std::sync::Mutex;

    struct MockOcr {
        text: String,
        calls: Mutex<Vec<u32>>,
        fail: bool,
    }

    impl MockOcr {
        fn returning(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: Mutex::new(Vec::new()),
                fail: false,
            }
        }
    }

    impl OcrEngine for MockOcr {
        fn recognize_page(&self, _pdf_path: &Path, page_number: u32) -> Result<String, OcrError> {
            self.calls.lock().unwrap().push(page_number);
            if self.fail {
                return Err(OcrError::RecognitionError {
                    page: page_number,
                    message: "unreadable".to_string(),
                });
            }
            Ok(self.text.clone())
        }
    }

    fn extraction(texts: &[&str]) -> DocumentExtraction {
        let pages = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                PageUnit::extracted(
                    RawPage {
                        page_number: i as u32 + 1,
                        text: text.to_string(),
                        ..Default::default()
                    },
                    ConfidenceGate::score(text),
                    0.85,
                )
            })
            .collect();
        DocumentExtraction::new(
            "chapter.pdf",
            pages,
            Classification {
                board: "CBSE".to_string(),
                subject: "Science".to_string(),
                grade: 4,
                book: "Book".to_string(),
                language: "en".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_only_flagged_pages_are_recovered() {
        let ocr = MockOcr::returning("Recovered text from the scanned page image.");
        let doc = extraction(&["Clean text layer.", "", "@@##$$%%^^&&"]);

        let doc = apply_fallback(doc, &ocr, Path::new("chapter.pdf")).unwrap();

        assert_eq!(*ocr.calls.lock().unwrap(), vec![2, 3]);
        let pages = doc.pages();
        assert_eq!(pages[0].source, TextSource::TextLayer);
        assert_eq!(pages[0].confidence, 1.0);
        for page in &pages[1..] {
            assert_eq!(page.source, TextSource::Ocr);
            assert_eq!(page.confidence, 0.7);
            assert!(!page.needs_fallback);
        }
    }

    #[test]
    fn test_low_recovered_score_is_not_reflagged() {
        let ocr = MockOcr::returning("");
        let doc = extraction(&[""]);

        let doc = apply_fallback(doc, &ocr, Path::new("chapter.pdf")).unwrap();
        assert_eq!(doc.pages()[0].confidence, 0.0);
        assert!(!doc.pages()[0].needs_fallback);

        // a second pass has nothing left to do
        let doc = apply_fallback(doc, &ocr, Path::new("chapter.pdf")).unwrap();
        assert_eq!(ocr.calls.lock().unwrap().len(), 1);
        assert_eq!(doc.aggregate_confidence(), 0.0);
    }

    #[test]
    fn test_ocr_error_propagates() {
        let ocr = MockOcr {
            fail: true,
            ..MockOcr::returning("")
        };
        let result = apply_fallback(extraction(&["ok text", ""]), &ocr, Path::new("chapter.pdf"));
        assert!(matches!(
            result,
            Err(OcrError::RecognitionError { page: 2, .. })
        ));
    }

    #[test]
    fn test_clean_document_skips_ocr() {
        let ocr = MockOcr::returning("unused");
        let doc = apply_fallback(
            extraction(&["First page.", "Second page."]),
            &ocr,
            Path::new("chapter.pdf"),
        )
        .unwrap();
        assert!(ocr.calls.lock().unwrap().is_empty());
        assert_eq!(doc.pages().len(), 2);
    }
}
