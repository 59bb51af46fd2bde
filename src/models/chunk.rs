use serde::{Deserialize, Serialize};

use super::record::MergedRecord;

/// A window over a record's content. Offsets count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub index: usize,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl Chunk<'_> {
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Fixed-shape metadata stored with every vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub lesson_id: String,
    pub board: String,
    pub subject: String,
    pub grade: u32,
    pub book: String,
    pub chapter_no: String,
    pub title: String,
    pub language: String,
    pub chunk_id: u32,
    pub chunk_text: String,
}

impl ChunkMetadata {
    pub fn for_chunk(record: &MergedRecord, chunk: &Chunk<'_>, text_chars: usize) -> Self {
        Self {
            lesson_id: record.lesson_id.clone(),
            board: record.board.clone(),
            subject: record.subject.clone(),
            grade: record.grade,
            book: record.book.clone(),
            chapter_no: record.chapter_no.clone(),
            title: record.title.clone(),
            language: record.language.clone(),
            chunk_id: chunk.index as u32,
            chunk_text: chunk.text.chars().take(text_chars).collect(),
        }
    }
}

/// One embedded chunk awaiting upload.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorItem {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

impl VectorItem {
    /// Ids are unique per record and chunk position.
    pub fn generate_id(lesson_id: &str, chunk_id: u32) -> String {
        format!("{lesson_id}_{chunk_id}")
    }

    pub fn new(values: Vec<f32>, metadata: ChunkMetadata) -> Self {
        Self {
            id: Self::generate_id(&metadata.lesson_id, metadata.chunk_id),
            values,
            metadata,
        }
    }
}

/// Ordered group of vectors sent in one upsert call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadBatch {
    pub items: Vec<VectorItem>,
}

impl UploadBatch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record() -> MergedRecord {
        MergedRecord {
            lesson_id: "lesson-1".to_string(),
            board: "CBSE".to_string(),
            subject: "Science".to_string(),
            grade: 4,
            book: "Play, Do, Learn".to_string(),
            chapter_no: "02".to_string(),
            title: "Plants".to_string(),
            content: String::new(),
            language: "en".to_string(),
            page_number: None,
            confidence: 1.0,
            image_count: 0,
            table_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_metadata_truncates_chunk_text() {
        let text = "ab".repeat(10);
        let chunk = Chunk {
            index: 7,
            text: &text,
            start: 0,
            end: 20,
        };
        let meta = ChunkMetadata::for_chunk(&record(), &chunk, 5);
        assert_eq!(meta.chunk_text, "ababa");
        assert_eq!(meta.chunk_id, 7);
        assert_eq!(meta.chapter_no, "02");
    }

    #[test]
    fn test_vector_id_format() {
        let chunk = Chunk {
            index: 3,
            text: "x",
            start: 0,
            end: 1,
        };
        let item = VectorItem::new(vec![0.1], ChunkMetadata::for_chunk(&record(), &chunk, 10));
        assert_eq!(item.id, "lesson-1_3");
    }
}
