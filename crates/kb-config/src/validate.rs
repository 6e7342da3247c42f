//! Configuration validation.
//!
//! Validates a loaded configuration and reports warnings for potential issues.

use std::fmt;

use crate::Config;

/// Tolerance used when checking that fusion weights sum to one.
const WEIGHT_TOLERANCE: f32 = 1e-3;

/// A non-fatal warning about the configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// Keyword and semantic weights do not sum to 1.0.
    WeightsDoNotSumToOne {
        /// Configured keyword weight.
        keyword: f32,
        /// Configured semantic weight.
        semantic: f32,
    },
    /// Overlap ratio is outside `[0, 1)` and will be clamped.
    OverlapOutOfRange(f32),
    /// Minimum chunk size is not below the maximum chunk size.
    ChunkSizesInverted {
        /// Configured minimum.
        min: usize,
        /// Configured maximum.
        max: usize,
    },
    /// The keyword score divisor is not positive.
    NonPositiveDivisor(f32),
    /// A smaller budget exceeds the budget that contains it.
    BudgetExceedsParent {
        /// Name of the inner budget.
        budget: &'static str,
        /// Name of the enclosing budget.
        parent: &'static str,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WeightsDoNotSumToOne { keyword, semantic } => write!(
                f,
                "search weights sum to {} (keyword {keyword} + semantic {semantic}), expected 1.0",
                keyword + semantic
            ),
            Self::OverlapOutOfRange(ratio) => {
                write!(f, "chunking overlap_ratio {ratio} is outside [0, 1)")
            }
            Self::ChunkSizesInverted { min, max } => write!(
                f,
                "chunking min_chunk_size {min} is not smaller than max_chunk_size {max}"
            ),
            Self::NonPositiveDivisor(divisor) => {
                write!(f, "search keyword_score_divisor {divisor} must be positive")
            }
            Self::BudgetExceedsParent { budget, parent } => {
                write!(f, "budget {budget} exceeds {parent}")
            }
        }
    }
}

/// Validates the configuration and returns any warnings.
pub fn validate_config(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    let search = &config.search;
    if (search.keyword_weight + search.semantic_weight - 1.0).abs() > WEIGHT_TOLERANCE {
        warnings.push(ConfigWarning::WeightsDoNotSumToOne {
            keyword: search.keyword_weight,
            semantic: search.semantic_weight,
        });
    }
    if search.keyword_score_divisor <= 0.0 {
        warnings.push(ConfigWarning::NonPositiveDivisor(search.keyword_score_divisor));
    }

    let chunking = &config.chunking;
    if !(0.0..1.0).contains(&chunking.overlap_ratio) {
        warnings.push(ConfigWarning::OverlapOutOfRange(chunking.overlap_ratio));
    }
    if chunking.min_chunk_size >= chunking.max_chunk_size {
        warnings.push(ConfigWarning::ChunkSizesInverted {
            min: chunking.min_chunk_size,
            max: chunking.max_chunk_size,
        });
    }

    let budget = &config.budget;
    if budget.max_chunk_content_size > budget.max_result_content_size {
        warnings.push(ConfigWarning::BudgetExceedsParent {
            budget: "max_chunk_content_size",
            parent: "max_result_content_size",
        });
    }
    if budget.max_result_content_size > budget.max_total_content_size {
        warnings.push(ConfigWarning::BudgetExceedsParent {
            budget: "max_result_content_size",
            parent: "max_total_content_size",
        });
    }
    if budget.safe_content_threshold > budget.max_result_content_size {
        warnings.push(ConfigWarning::BudgetExceedsParent {
            budget: "safe_content_threshold",
            parent: "max_result_content_size",
        });
    }

    warnings
}
