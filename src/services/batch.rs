use crate::models::{UploadBatch, VectorItem};

/// Groups embedded chunks into bounded upload batches, preserving order.
#[derive(Debug)]
pub struct BatchAccumulator {
    bound: usize,
    pending: Vec<VectorItem>,
}

impl BatchAccumulator {
    /// A bound of zero is treated as one.
    pub fn new(bound: usize) -> Self {
        let bound = bound.max(1);
        Self {
            bound,
            pending: Vec::with_capacity(bound),
        }
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Add one item. Returns the full batch exactly when the bound is reached.
    pub fn accumulate(&mut self, item: VectorItem) -> Option<UploadBatch> {
        self.pending.push(item);
        if self.pending.len() >= self.bound {
            Some(self.take())
        } else {
            None
        }
    }

    /// Emit whatever is left. Never returns an empty batch.
    pub fn flush(&mut self) -> Option<UploadBatch> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn take(&mut self) -> UploadBatch {
        UploadBatch {
            items: std::mem::replace(&mut self.pending, Vec::with_capacity(self.bound)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn item(n: u32) -> VectorItem {
        VectorItem::new(
            vec![n as f32],
            ChunkMetadata {
                lesson_id: "lesson".to_string(),
                board: "CBSE".to_string(),
                subject: "Science".to_string(),
                grade: 4,
                book: "Book".to_string(),
                chapter_no: "1.0".to_string(),
                title: "Title".to_string(),
                language: "en".to_string(),
                chunk_id: n,
                chunk_text: format!("chunk {n}"),
            },
        )
    }

    fn run(count: u32, bound: usize) -> Vec<UploadBatch> {
        let mut acc = BatchAccumulator::new(bound);
        let mut batches: Vec<UploadBatch> = (0..count).filter_map(|n| acc.accumulate(item(n))).collect();
        batches.extend(acc.flush());
        batches
    }

    #[test]
    fn test_101_items_at_bound_100() {
        let batches = run(101, 100);
        let sizes: Vec<usize> = batches.iter().map(UploadBatch::len).collect();
        assert_eq!(sizes, vec![100, 1]);
        assert_eq!(batches[1].items[0].id, "lesson_100");
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_batch() {
        let sizes: Vec<usize> = run(200, 100).iter().map(UploadBatch::len).collect();
        assert_eq!(sizes, vec![100, 100]);
    }

    #[test]
    fn test_flush_on_empty_is_none() {
        let mut acc = BatchAccumulator::new(10);
        assert!(acc.flush().is_none());
        assert!(acc.accumulate(item(0)).is_none());
        assert_eq!(acc.flush().map(|b| b.len()), Some(1));
        assert!(acc.flush().is_none());
    }

    #[test]
    fn test_zero_bound_clamped() {
        let mut acc = BatchAccumulator::new(0);
        assert_eq!(acc.bound(), 1);
        assert_eq!(acc.accumulate(item(0)).map(|b| b.len()), Some(1));
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn test_batches_bounded_and_ordered() {
        for (count, bound) in [(0, 3), (1, 1), (7, 3), (10, 4), (33, 32), (5, 100)] {
            let batches = run(count, bound);
            assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= bound));

            let ids: Vec<u32> = batches
                .iter()
                .flat_map(|b| b.items.iter().map(|i| i.metadata.chunk_id))
                .collect();
            assert_eq!(ids, (0..count).collect::<Vec<_>>());
        }
    }
}
