// src/matching/ranker.rs
use crate::models::MatchResult;

pub const DEFAULT_LIMIT: usize = 5;

/// Highest score first, at most `limit` entries. Equal scores keep their input order.
pub fn rank(accepted: &[MatchResult], limit: usize) -> Vec<MatchResult> {
    rank_by(accepted, limit, |m| m.score)
}

pub fn rank_by<T, F>(items: &[T], limit: usize, score: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> f64,
{
    if limit == 0 || items.is_empty() {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..items.len()).collect();
    // sort_by is stable, so ties stay in candidate order.
    order.sort_by(|&a, &b| score(&items[b]).total_cmp(&score(&items[a])));
    order
        .into_iter()
        .take(limit)
        .map(|i| items[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceLevel, ScoreBreakdown};

    fn result(id: &str, score: f64) -> MatchResult {
        MatchResult {
            candidate_id: id.to_string(),
            score,
            confidence: ConfidenceLevel::Low,
            matched_fields: vec!["name".to_string()],
            breakdown: ScoreBreakdown::new(),
        }
    }

    fn ids(results: &[MatchResult]) -> Vec<&str> {
        results.iter().map(|r| r.candidate_id.as_str()).collect()
    }

    #[test]
    fn test_sorted_and_truncated() {
        let input = vec![result("a", 0.7), result("b", 0.95), result("c", 0.8)];
        let ranked = rank(&input, 2);
        assert_eq!(ids(&ranked), vec!["b", "c"]);
        // Input untouched.
        assert_eq!(ids(&input), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let input = vec![
            result("first", 0.8),
            result("top", 0.9),
            result("second", 0.8),
            result("third", 0.8),
        ];
        assert_eq!(ids(&rank(&input, 10)), vec!["top", "first", "second", "third"]);
    }

    #[test]
    fn test_empty_and_zero_limit() {
        assert!(rank(&[], DEFAULT_LIMIT).is_empty());
        assert!(rank(&[result("a", 1.0)], 0).is_empty());
    }
}
