// src/matching/policy.rs
// Score -> confidence label, and the per-category acceptance bar.

use serde::{Deserialize, Serialize};

use crate::models::ConfidenceLevel;
use crate::utils::config::{CategoryPolicy, MatchingConfig};

fn default_high() -> f64 {
    0.9
}

fn default_medium() -> f64 {
    0.7
}

/// Lower bounds of the high and medium bands. Anything below `medium` is low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBands {
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_medium")]
    pub medium: f64,
}

impl Default for ConfidenceBands {
    fn default() -> Self {
        Self {
            high: default_high(),
            medium: default_medium(),
        }
    }
}

impl ConfidenceBands {
    pub fn classify(&self, score: f64) -> ConfidenceLevel {
        if score >= self.high {
            ConfidenceLevel::High
        } else if score >= self.medium {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl CategoryPolicy {
    pub fn classify(&self, score: f64) -> ConfidenceLevel {
        self.confidence.classify(score)
    }

    /// A candidate that matched nothing is never accepted, whatever the threshold.
    pub fn accepts(&self, score: f64, matched_field_count: usize) -> bool {
        matched_field_count > 0 && score.is_finite() && score >= self.threshold
    }
}

/// Category-aware acceptance; unknown categories use the default category's bar.
pub fn accept(
    config: &MatchingConfig,
    category: Option<&str>,
    score: f64,
    matched_field_count: usize,
) -> bool {
    config.category(category).accepts(score, matched_field_count)
}

pub fn classify(config: &MatchingConfig, category: Option<&str>, score: f64) -> ConfidenceLevel {
    config.category(category).classify(score)
}
