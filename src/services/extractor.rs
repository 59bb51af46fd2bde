//! Direct text extraction from PDF pages.

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;

use crate::error::ExtractionError;
use crate::models::{BoundingBox, RawPage, TextFragment};

/// US Letter height, used when a page carries no MediaBox.
const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// Average glyph width as a fraction of the font size.
const GLYPH_WIDTH_RATIO: f32 = 0.5;

/// Reads pages out of a PDF.
pub trait PageExtractor: Send + Sync {
    /// All pages in order, numbered from 1.
    fn extract_pages(&self, path: &Path) -> Result<Vec<RawPage>, ExtractionError>;
}

/// Pure-Rust extractor built on `lopdf`.
///
/// Page text comes from lopdf's own text extraction. Fragment boxes are
/// estimated from the text state (origin and font size) and are good enough
/// for ordering and rough layout, not for exact glyph geometry.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PageExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<RawPage>, ExtractionError> {
        let doc = Document::load(path).map_err(|e| ExtractionError::OpenError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut pages = Vec::new();
        for (page_number, page_id) in doc.get_pages() {
            let text = match doc.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(page = page_number, error = %e, "no text layer on page");
                    String::new()
                }
            };

            let page_dict = doc
                .get_dictionary(page_id)
                .map_err(|e| ExtractionError::PageError {
                    page: page_number,
                    message: e.to_string(),
                })?;

            let fragments = match doc.get_page_content(page_id).and_then(|c| Content::decode(&c)) {
                Ok(content) => text_fragments(&content, page_height(&doc, page_dict)),
                Err(e) => {
                    tracing::debug!(page = page_number, error = %e, "could not decode content stream");
                    Vec::new()
                }
            };

            pages.push(RawPage {
                page_number,
                text,
                fragments,
                image_count: count_images(&doc, page_dict),
            });
        }

        tracing::debug!(path = %path.display(), pages = pages.len(), "extracted pages");
        Ok(pages)
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Look up a page attribute, following `/Parent` for inherited entries.
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = page;
    // page trees are shallow; the bound guards against reference cycles
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return resolve(doc, value);
        }
        let parent: ObjectId = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(n) => Some(*n as f32),
        Object::Real(n) => Some(*n as f32),
        _ => None,
    }
}

fn page_height(doc: &Document, page: &Dictionary) -> f32 {
    match inherited(doc, page, b"MediaBox") {
        Some(Object::Array(bounds)) if bounds.len() == 4 => {
            match (number(&bounds[1]), number(&bounds[3])) {
                (Some(y0), Some(y1)) => (y1 - y0).abs(),
                _ => DEFAULT_PAGE_HEIGHT,
            }
        }
        _ => DEFAULT_PAGE_HEIGHT,
    }
}

fn count_images(doc: &Document, page: &Dictionary) -> u32 {
    let Some(resources) = inherited(doc, page, b"Resources").and_then(|r| resolve_dict(doc, r))
    else {
        return 0;
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve_dict(doc, x))
    else {
        return 0;
    };

    xobjects
        .iter()
        .filter_map(|(_, object)| resolve_dict(doc, object))
        .filter(|dict| {
            dict.get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|name| name == b"Image")
        })
        .count() as u32
}

/// Best-effort decoding of a PDF string operand.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes
        .iter()
        .map(|&b| b as char)
        .filter(|c| !c.is_control() || *c == ' ')
        .collect()
}

fn shown_text(operands: &[Object]) -> String {
    let mut text = String::new();
    for operand in operands {
        match operand {
            Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
            Object::Array(items) => {
                for item in items {
                    match item {
                        Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
                        // large negative kerning reads as a word gap
                        other => {
                            if number(other).is_some_and(|k| k < -200.0) {
                                text.push(' ');
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    text
}

/// Minimal text-state tracker for one content stream.
#[derive(Debug, Clone, Copy)]
struct TextState {
    line_x: f32,
    line_y: f32,
    x: f32,
    y: f32,
    scale: f32,
    font_size: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            line_x: 0.0,
            line_y: 0.0,
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            font_size: 12.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_x += tx * self.scale;
        self.line_y += ty * self.scale;
        self.x = self.line_x;
        self.y = self.line_y;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn size(&self) -> f32 {
        self.font_size * self.scale
    }
}

fn text_fragments(content: &Content, page_height: f32) -> Vec<TextFragment> {
    let mut fragments = Vec::new();
    let mut state = TextState::default();

    for op in &content.operations {
        let nums: Vec<f32> = op.operands.iter().filter_map(number).collect();
        match op.operator.as_str() {
            "BT" => {
                let (font_size, leading) = (state.font_size, state.leading);
                state = TextState {
                    font_size,
                    leading,
                    ..TextState::default()
                };
            }
            "Tf" => {
                if let Some(size) = nums.last() {
                    state.font_size = size.abs();
                }
            }
            "TL" => {
                if let Some(leading) = nums.first() {
                    state.leading = *leading;
                }
            }
            "Tm" if nums.len() == 6 => {
                state.scale = if nums[3] != 0.0 { nums[3].abs() } else { 1.0 };
                state.line_x = nums[4];
                state.line_y = nums[5];
                state.x = nums[4];
                state.y = nums[5];
            }
            "Td" if nums.len() == 2 => state.move_line(nums[0], nums[1]),
            "TD" if nums.len() == 2 => {
                state.leading = -nums[1];
                state.move_line(nums[0], nums[1]);
            }
            "T*" => state.next_line(),
            "Tj" | "TJ" | "'" | "\"" => {
                if matches!(op.operator.as_str(), "'" | "\"") {
                    state.next_line();
                }
                let text = shown_text(&op.operands);
                if text.trim().is_empty() {
                    continue;
                }
                let size = state.size();
                let width = text.chars().count() as f32 * size * GLYPH_WIDTH_RATIO;
                fragments.push(TextFragment {
                    bbox: BoundingBox {
                        x0: state.x,
                        y0: page_height - state.y - size,
                        x1: state.x + width,
                        y1: page_height - state.y,
                    },
                    text,
                });
                state.x += width;
            }
            _ => {}
        }
    }

    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{Stream, StringFormat, dictionary};

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    #[test]
    fn test_decode_pdf_string() {
        assert_eq!(decode_pdf_string(b"Hello"), "Hello");
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x09, 0x28]), "\u{0928}");
        assert_eq!(decode_pdf_string(b"a\x01b"), "ab");
    }

    #[test]
    fn test_fragments_follow_text_state() {
        let content = Content {
            operations: vec![
                op("BT", vec![]),
                op("Tf", vec![Object::Name(b"F1".to_vec()), 10.into()]),
                op("Td", vec![72.into(), 700.into()]),
                op(
                    "Tj",
                    vec![Object::String(b"Water".to_vec(), StringFormat::Literal)],
                ),
                op("TL", vec![14.into()]),
                op(
                    "'",
                    vec![Object::String(b"cycle".to_vec(), StringFormat::Literal)],
                ),
                op("ET", vec![]),
            ],
        };

        let fragments = text_fragments(&content, 792.0);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "Water");
        assert_eq!(fragments[0].bbox.x0, 72.0);
        assert_eq!(fragments[0].bbox.y1, 92.0);
        assert_eq!(fragments[0].bbox.y0, 82.0);
        assert_eq!(fragments[0].bbox.x1, 72.0 + 25.0);
        // next line starts back at the line origin, 14pt lower
        assert_eq!(fragments[1].bbox.x0, 72.0);
        assert_eq!(fragments[1].bbox.y1, 106.0);
    }

    #[test]
    fn test_tj_array_kerning_gap() {
        let operands = vec![Object::Array(vec![
            Object::String(b"Hello".to_vec(), StringFormat::Literal),
            Object::Integer(-250),
            Object::String(b"world".to_vec(), StringFormat::Literal),
            Object::Integer(-20),
            Object::String(b"!".to_vec(), StringFormat::Literal),
        ])];
        assert_eq!(shown_text(&operands), "Hello world!");
    }

    #[test]
    fn test_count_images_and_height() {
        let mut doc = Document::with_version("1.5");
        let image = doc.add_object(Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Image" },
            vec![],
        ));
        let form = doc.add_object(Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Form" },
            vec![],
        ));
        let resources = doc.add_object(dictionary! {
            "XObject" => dictionary! { "Im0" => image, "Fm0" => form },
        });
        let pages = doc.add_object(dictionary! {
            "Type" => "Pages",
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Resources" => resources,
        });
        let page = dictionary! { "Type" => "Page", "Parent" => pages };

        assert_eq!(count_images(&doc, &page), 1);
        assert_eq!(page_height(&doc, &page), 842.0);
        assert_eq!(page_height(&doc, &Dictionary::new()), DEFAULT_PAGE_HEIGHT);
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let result = LopdfExtractor.extract_pages(Path::new("/nonexistent/chapter.pdf"));
        assert!(matches!(result, Err(ExtractionError::OpenError { .. })));
    }
}
