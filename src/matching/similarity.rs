// src/matching/similarity.rs
// Raw string similarity in [0, 1]. Inputs are expected to be normalized already.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use strsim::normalized_levenshtein;

pub type SimilarityFn = fn(&str, &str) -> f64;

/// The closed set of comparison algorithms a category can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Whole-string edit distance.
    Ratio,
    /// Best alignment of the shorter string against any same-length window
    /// of the longer one.
    PartialRatio,
    /// Edit distance after sorting whitespace tokens.
    TokenSortRatio,
    /// Comparison of the shared token set against each side's leftovers.
    TokenSetRatio,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Ratio,
        Algorithm::PartialRatio,
        Algorithm::TokenSortRatio,
        Algorithm::TokenSetRatio,
    ];

    pub fn resolve(self) -> SimilarityFn {
        match self {
            Algorithm::Ratio => ratio,
            Algorithm::PartialRatio => partial_ratio,
            Algorithm::TokenSortRatio => token_sort_ratio,
            Algorithm::TokenSetRatio => token_set_ratio,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Ratio => "ratio",
            Algorithm::PartialRatio => "partial_ratio",
            Algorithm::TokenSortRatio => "token_sort_ratio",
            Algorithm::TokenSetRatio => "token_set_ratio",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown similarity algorithm '{}'", s))
    }
}

pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    normalized_levenshtein(a, b).clamp(0.0, 1.0)
}

pub fn partial_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == b_len {
        return ratio(a, b);
    }
    let (shorter, longer, window) = if a_len < b_len {
        (a, b, a_len)
    } else {
        (b, a, b_len)
    };

    let longer_chars: Vec<char> = longer.chars().collect();
    let mut best = 0.0_f64;
    for start in 0..=(longer_chars.len() - window) {
        let candidate: String = longer_chars[start..start + window].iter().collect();
        let score = ratio(shorter, &candidate);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}

pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let shared = join(tokens_a.intersection(&tokens_b).copied());
    let only_a = join(tokens_a.difference(&tokens_b).copied());
    let only_b = join(tokens_b.difference(&tokens_a).copied());

    let combined_a = join([shared.as_str(), only_a.as_str()].into_iter().filter(|s| !s.is_empty()));
    let combined_b = join([shared.as_str(), only_b.as_str()].into_iter().filter(|s| !s.is_empty()));

    ratio(&shared, &combined_a)
        .max(ratio(&shared, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn join<'a>(tokens: impl Iterator<Item = &'a str>) -> String {
    tokens.collect::<Vec<_>>().join(" ")
}
