//! Page confidence scoring and the fallback decision.
//!
//! Two heuristics live here. [`ConfidenceGate::score`] judges direct
//! extraction output by character composition. [`ConfidenceGate::score_recovered_text`]
//! judges OCR output by length alone. Both return one of a few fixed steps.

use crate::models::DEFAULT_MIN_PAGE_CONFIDENCE;

/// Punctuation counted as ordinary text when scoring composition.
const ORDINARY_PUNCTUATION: &str = ".,;:-_()[]{}!?\"'";

/// Stepwise confidence scoring with a configurable fallback threshold.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PAGE_CONFIDENCE)
    }
}

impl ConfidenceGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Score directly extracted text: 0.0, 0.4, 0.7, 0.9 or 1.0.
    pub fn score(text: &str) -> f32 {
        if text.trim().is_empty() {
            return 0.0;
        }

        let mut total = 0usize;
        let mut good = 0usize;
        for ch in text.chars() {
            total += 1;
            if ch.is_alphanumeric() || ch.is_whitespace() || ORDINARY_PUNCTUATION.contains(ch) {
                good += 1;
            }
        }
        let ratio = good as f64 / total as f64;

        if ratio > 0.9 {
            1.0
        } else if ratio > 0.7 {
            0.9
        } else if ratio > 0.5 {
            0.7
        } else {
            0.4
        }
    }

    /// Score OCR output by how much text came back: 0.0, 0.4, 0.7 or 0.9.
    pub fn score_recovered_text(text: &str) -> f32 {
        let length = text.trim().chars().count();
        if length == 0 {
            0.0
        } else if length < 20 {
            0.4
        } else if length < 100 {
            0.7
        } else {
            0.9
        }
    }

    /// True iff `score` is strictly below `threshold`.
    pub fn needs_fallback(score: f32, threshold: f32) -> bool {
        score < threshold
    }

    /// [`Self::needs_fallback`] against this gate's threshold.
    pub fn should_fallback(&self, score: f32) -> bool {
        Self::needs_fallback(score, self.threshold)
    }
}
