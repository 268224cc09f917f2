// src/matching/scorer.rs
// Per-field fuzzy scoring and aggregation of field scores into one candidate score.

use serde::{Deserialize, Serialize};

use crate::matching::fields::{field_kind, resolve_values};
use crate::models::{CandidateAttributes, ScoreBreakdown, SearchCriteria};
use crate::utils::config::CategoryPolicy;

pub const DISPLAY_NAME_FIELD: &str = "display_name";

/// How field contributions are combined into a candidate total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Sum of weighted field scores. Not bounded by 1 when weights exceed 1.
    #[default]
    Additive,
    /// Sum of weighted scores divided by the weight of the fields actually compared.
    WeightedAverage,
}

#[derive(Clone, Copy)]
pub struct FieldScorer<'p> {
    policy: &'p CategoryPolicy,
}

impl<'p> FieldScorer<'p> {
    pub fn new(policy: &'p CategoryPolicy) -> Self {
        Self { policy }
    }

    pub fn canonicalize(&self, field: &str, value: &str) -> String {
        field_kind(field).canonicalize(value, &self.policy.normalizer)
    }

    /// Raw similarity of two values for `field`, or `None` when either side is
    /// empty after normalization.
    pub fn similarity(&self, field: &str, search_value: &str, target_value: &str) -> Option<f64> {
        let search = self.canonicalize(field, search_value);
        self.similarity_canonical(field, &search, target_value)
    }

    fn similarity_canonical(&self, field: &str, search: &str, target_value: &str) -> Option<f64> {
        if search.is_empty() {
            return None;
        }
        let target = self.canonicalize(field, target_value);
        if target.is_empty() {
            return None;
        }
        let raw = (self.policy.similarity)(search, &target);
        Some(raw.clamp(0.0, 1.0))
    }

    /// Best raw similarity over every target value. A single matching entry is enough.
    pub fn best_similarity(
        &self,
        field: &str,
        search_value: &str,
        targets: &[&str],
    ) -> Option<f64> {
        let search = self.canonicalize(field, search_value);
        self.best_similarity_canonical(field, &search, targets)
    }

    fn best_similarity_canonical(
        &self,
        field: &str,
        search: &str,
        targets: &[&str],
    ) -> Option<f64> {
        targets
            .iter()
            .filter_map(|target| self.similarity_canonical(field, search, target))
            .reduce(f64::max)
    }

    /// Weighted contribution of one target value. Zero when not comparable.
    pub fn score_field(&self, field: &str, search_value: &str, target_value: &str) -> f64 {
        self.score_field_multi(field, search_value, &[target_value])
    }

    pub fn score_field_multi(&self, field: &str, search_value: &str, targets: &[&str]) -> f64 {
        self.best_similarity(field, search_value, targets)
            .map_or(0.0, |raw| raw * self.policy.weight(field))
    }
}

#[derive(Debug, Clone)]
struct PreparedField {
    name: String,
    canonical: String,
    weight: f64,
}

/// Search criteria canonicalized once per call and reused for every candidate.
#[derive(Debug, Clone)]
pub struct PreparedCriteria {
    fields: Vec<PreparedField>,
}

impl PreparedCriteria {
    /// Number of fields that survived normalization.
    pub fn usable_fields(&self) -> usize {
        self.fields.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate_id: String,
    pub total: f64,
    pub breakdown: ScoreBreakdown,
    pub matched_fields: Vec<String>,
}

pub struct CandidateScorer<'p> {
    policy: &'p CategoryPolicy,
    fields: FieldScorer<'p>,
}

impl<'p> CandidateScorer<'p> {
    pub fn new(policy: &'p CategoryPolicy) -> Self {
        Self {
            policy,
            fields: FieldScorer::new(policy),
        }
    }

    pub fn prepare(&self, criteria: &SearchCriteria) -> PreparedCriteria {
        let fields = criteria
            .iter()
            .filter_map(|(name, value)| {
                let canonical = self.fields.canonicalize(name, value);
                (!canonical.is_empty()).then(|| PreparedField {
                    name: name.to_string(),
                    canonical,
                    weight: self.policy.weight(name),
                })
            })
            .collect();
        PreparedCriteria { fields }
    }

    pub fn score_candidate(
        &self,
        criteria: &SearchCriteria,
        candidate: &CandidateAttributes,
    ) -> ScoredCandidate {
        self.score_prepared(&self.prepare(criteria), candidate)
    }

    pub fn score_prepared(
        &self,
        prepared: &PreparedCriteria,
        candidate: &CandidateAttributes,
    ) -> ScoredCandidate {
        let mut breakdown = ScoreBreakdown::new();
        let mut matched_fields = Vec::new();
        let mut weighted_sum = 0.0;
        let mut compared_weight = 0.0;

        for field in &prepared.fields {
            let targets = resolve_values(&field.name, candidate);
            let Some(raw) = self
                .fields
                .best_similarity_canonical(&field.name, &field.canonical, &targets)
            else {
                continue;
            };

            let contribution = raw * field.weight;
            weighted_sum += contribution;
            compared_weight += field.weight;
            breakdown.insert(field.name.clone(), contribution);
            if contribution > 0.0 {
                matched_fields.push(field.name.clone());
            }
        }

        let total = match self.policy.aggregation {
            AggregationMode::Additive => weighted_sum,
            AggregationMode::WeightedAverage if compared_weight > 0.0 => {
                (weighted_sum / compared_weight).clamp(0.0, 1.0)
            }
            AggregationMode::WeightedAverage => 0.0,
        };

        ScoredCandidate {
            candidate_id: candidate.id.clone(),
            total,
            breakdown,
            matched_fields,
        }
    }

    /// Whole-string comparison of a free-text query against the candidate's
    /// synthesized display name.
    pub fn score_display_name(
        &self,
        normalized_query: &str,
        candidate: &CandidateAttributes,
    ) -> ScoredCandidate {
        let display_name = self.display_name(candidate);
        let normalized_name = self.policy.normalizer.normalize(&display_name);

        let mut breakdown = ScoreBreakdown::new();
        let mut matched_fields = Vec::new();
        let mut total = 0.0;
        if !normalized_query.is_empty() && !normalized_name.is_empty() {
            total = (self.policy.text_similarity)(normalized_query, &normalized_name)
                .clamp(0.0, 1.0);
            breakdown.insert(DISPLAY_NAME_FIELD.to_string(), total);
            if total > 0.0 {
                matched_fields.push(DISPLAY_NAME_FIELD.to_string());
            }
        }

        ScoredCandidate {
            candidate_id: candidate.id.clone(),
            total,
            breakdown,
            matched_fields,
        }
    }

    pub fn display_name(&self, candidate: &CandidateAttributes) -> String {
        self.policy
            .display_fields
            .iter()
            .filter_map(|field| resolve_values(field, candidate).first().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::similarity::Algorithm;
    use crate::utils::config::MatchingConfig;

    fn company_policy() -> CategoryPolicy {
        MatchingConfig::default().category(Some("company")).clone()
    }

    #[test]
    fn test_score_field_identical_is_weight() {
        let mut policy = company_policy();
        policy.field_weights.insert("name".into(), 2.0);
        let scorer = FieldScorer::new(&policy);

        assert_eq!(scorer.score_field("name", "Acme Films", "ACME films!"), 2.0);
        assert_eq!(scorer.score_field("name", "", "Acme"), 0.0);
        assert_eq!(scorer.score_field("name", "Acme", "  ...  "), 0.0);
    }

    #[test]
    fn test_multi_value_takes_maximum() {
        let policy = company_policy();
        let scorer = FieldScorer::new(&policy);

        let targets = ["x-ray pictures", "hollywood studio"];
        let multi = scorer.score_field_multi("name", "hollywood studio", &targets);
        assert_eq!(multi, scorer.score_field("name", "hollywood studio", "hollywood studio"));
        assert_eq!(multi, 1.0);
    }

    #[test]
    fn test_phone_kind_compares_digits() {
        let policy = company_policy();
        let scorer = FieldScorer::new(&policy);
        assert_eq!(scorer.similarity("phone", "555 12 34", "(555) 1234"), Some(1.0));
    }

    #[test]
    fn test_absent_fields_are_neutral() {
        let policy = company_policy();
        let scorer = CandidateScorer::new(&policy);
        let criteria = SearchCriteria::new().with("name", "Acme").with("inn", "7701");
        let candidate = CandidateAttributes::new("c1").with("name", "Acme");

        let scored = scorer.score_candidate(&criteria, &candidate);
        assert_eq!(scored.matched_fields, vec!["name".to_string()]);
        assert_eq!(scored.breakdown.len(), 1);
        assert_eq!(scored.total, policy.weight("name"));
    }

    #[test]
    fn test_no_overlap_scores_zero() {
        let policy = company_policy();
        let scorer = CandidateScorer::new(&policy);
        let criteria = SearchCriteria::new().with("inn", "7701");
        let candidate = CandidateAttributes::new("c1").with("name", "Acme");

        let scored = scorer.score_candidate(&criteria, &candidate);
        assert_eq!(scored.total, 0.0);
        assert!(scored.matched_fields.is_empty());
        assert!(scored.breakdown.is_empty());
    }

    #[test]
    fn test_additive_vs_weighted_average() {
        let mut policy = company_policy();
        policy.field_weights.insert("name".into(), 1.0);
        policy.field_weights.insert("city".into(), 3.0);
        let criteria = SearchCriteria::new()
            .with("name", "acme")
            .with("city", "moscow")
            .with("inn", "7701");
        let candidate = CandidateAttributes::new("c1")
            .with("name", "acme")
            .with("city", "zzzzzz");

        policy.aggregation = AggregationMode::Additive;
        let additive = CandidateScorer::new(&policy).score_candidate(&criteria, &candidate);
        let city = additive.breakdown["city"];
        assert!((additive.total - (1.0 + city)).abs() < 1e-9);

        policy.aggregation = AggregationMode::WeightedAverage;
        let averaged = CandidateScorer::new(&policy).score_candidate(&criteria, &candidate);
        assert!((averaged.total - (1.0 + city) / 4.0).abs() < 1e-9);
        assert!(averaged.total <= 1.0);
    }

    #[test]
    fn test_display_name_scoring() {
        let mut policy = MatchingConfig::default().category(Some("person")).clone();
        policy.text_algorithm = Algorithm::TokenSortRatio;
        policy.text_similarity = Algorithm::TokenSortRatio.resolve();
        let scorer = CandidateScorer::new(&policy);
        let candidate = CandidateAttributes::new("p1")
            .with("first_name", "Ivan")
            .with("last_name", "Petrov");

        assert_eq!(scorer.display_name(&candidate), "Ivan Petrov");
        let scored = scorer.score_display_name("petrov ivan", &candidate);
        assert_eq!(scored.total, 1.0);
        assert_eq!(scored.matched_fields, vec![DISPLAY_NAME_FIELD.to_string()]);
    }
}
