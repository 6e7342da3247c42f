//! Keyword score normalization.
//!
//! Tantivy BM25 scores are unbounded while semantic scores are cosine similarities in
//! `0.0..=1.0`. Before the two are merged or compared, every keyword score is divided by a fixed
//! divisor and capped at 1.0:
//!
//! ```text
//! raw=3.6   divisor=10  ->  0.36
//! raw=14.2  divisor=10  ->  1.00
//! ```
//!
//! A fixed divisor keeps a score stable across queries, unlike top-score normalization, which
//! would always give the best hit 1.0 however weak it is.

use kb_config::SearchSettings;

/// Default keyword score divisor.
pub const DEFAULT_DIVISOR: f32 = 10.0;

/// Maps raw keyword scores into `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreNormalizer {
    /// Raw score that maps to 1.0.
    divisor: f32,
}

impl ScoreNormalizer {
    /// Creates a normalizer. Non-positive or non-finite divisors fall back to the default.
    pub fn new(divisor: f32) -> Self {
        let divisor = if divisor.is_finite() && divisor > 0.0 {
            divisor
        } else {
            DEFAULT_DIVISOR
        };
        Self { divisor }
    }

    /// Creates a normalizer from the search settings.
    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self::new(settings.keyword_score_divisor)
    }

    /// Returns the divisor in use.
    pub fn divisor(&self) -> f32 {
        self.divisor
    }

    /// Normalizes one raw score.
    pub fn normalize(&self, raw: f32) -> f32 {
        if raw.is_nan() {
            return 0.0;
        }
        (raw / self.divisor).clamp(0.0, 1.0)
    }
}

impl Default for ScoreNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_DIVISOR)
    }
}
