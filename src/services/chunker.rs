//! Overlapping text splitting for embedding.
//!
//! Windows are measured in characters. Each window after the first starts
//! `overlap` characters before the previous one ended, so dropping the first
//! `overlap` characters of every later chunk and concatenating restores the
//! input exactly.

use crate::error::IndexError;
use crate::models::{Chunk, IndexingConfig};

/// Break separators in priority order. A class wins as soon as it offers any
/// usable break inside the window.
const SEPARATOR_CLASSES: [&[&str]; 4] = [&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

/// Splits text into bounded, overlapping windows.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    max_size: usize,
    overlap: usize,
}

impl TextSplitter {
    pub fn new(max_size: usize, overlap: usize) -> Result<Self, IndexError> {
        if max_size == 0 {
            return Err(IndexError::ChunkError(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap >= max_size {
            return Err(IndexError::ChunkError(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({max_size})"
            )));
        }
        Ok(Self { max_size, overlap })
    }

    pub fn from_config(config: &IndexingConfig) -> Result<Self, IndexError> {
        Self::new(config.chunk_size as usize, config.chunk_overlap as usize)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Lazily split `content`. Call again to start over.
    pub fn split<'a>(&self, content: &'a str) -> Chunks<'a> {
        let mut offsets: Vec<usize> = content.char_indices().map(|(i, _)| i).collect();
        offsets.push(content.len());

        Chunks {
            content,
            offsets,
            max_size: self.max_size,
            overlap: self.overlap,
            start: 0,
            index: 0,
            done: content.is_empty(),
        }
    }
}

/// Iterator over the chunks of one piece of content.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    content: &'a str,
    /// Byte offset of every char, plus the content length.
    offsets: Vec<usize>,
    max_size: usize,
    overlap: usize,
    start: usize,
    index: usize,
    done: bool,
}

impl<'a> Chunks<'a> {
    fn total_chars(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Best end for a window starting at `start` when the rest of the
    /// content does not fit. Breaks at or before `start + overlap` are not
    /// usable because the next window would not advance.
    fn find_break(&self, start: usize) -> usize {
        let hard_end = start + self.max_size;
        let lower = start + self.overlap;
        let window_start = self.offsets[start];
        let window = &self.content[window_start..self.offsets[hard_end]];

        for class in SEPARATOR_CLASSES {
            let best = class
                .iter()
                .filter_map(|sep| window.rfind(sep).map(|pos| window_start + pos + sep.len()))
                .filter_map(|byte| self.offsets.binary_search(&byte).ok())
                .filter(|&pos| pos > lower)
                .max();
            if let Some(pos) = best {
                return pos;
            }
        }

        hard_end
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let total = self.total_chars();
        let start = self.start;
        let end = if total - start <= self.max_size {
            self.done = true;
            total
        } else {
            self.find_break(start)
        };

        let chunk = Chunk {
            index: self.index,
            text: &self.content[self.offsets[start]..self.offsets[end]],
            start,
            end,
        };

        self.index += 1;
        self.start = end - self.overlap;
        Some(chunk)
    }
}
