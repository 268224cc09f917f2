// src/matching/manager.rs
// Caller-facing entry points: fetch candidates, score, accept, rank.

use log::debug;
use std::sync::Arc;

use crate::error::{EngineResult, MatchError};
use crate::matching::ranker::rank;
use crate::matching::scorer::{CandidateScorer, ScoredCandidate};
use crate::models::{CandidateAttributes, MatchResult, SearchCriteria};
use crate::store::RecordStore;
use crate::utils::config::{CategoryPolicy, MatchingConfig};
use crate::utils::logging::{MatchingLogger, OperationType};

/// Stateless matching service. Holds only the read-only config and a handle to
/// the record store, so clones can be moved freely across tasks.
pub struct MatchingEngine<S> {
    config: Arc<MatchingConfig>,
    store: Arc<S>,
}

impl<S> Clone for MatchingEngine<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RecordStore> MatchingEngine<S> {
    pub fn new(config: Arc<MatchingConfig>, store: Arc<S>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Field-by-field search. `limit` defaults to the configured default and is
    /// clamped to `max_limit`.
    pub async fn search_matches(
        &self,
        criteria: &SearchCriteria,
        category: Option<&str>,
        limit: Option<usize>,
    ) -> EngineResult<Vec<MatchResult>> {
        let logger = MatchingLogger::new(OperationType::FieldSearch);
        let policy = self.config.category(category);
        let scorer = CandidateScorer::new(policy);

        let prepared = scorer.prepare(criteria);
        if prepared.usable_fields() == 0 {
            return Err(MatchError::InvalidCriteria(
                "no search field has a usable value".to_string(),
            ));
        }
        logger.log_start(
            &policy.name,
            &format!("with {} usable field(s)", prepared.usable_fields()),
        );

        let limit = self.config.effective_limit(limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.fetch(category, policy, &logger).await?;

        logger.log_phase("scoring", None);
        let scored = candidates
            .iter()
            .map(|candidate| scorer.score_prepared(&prepared, candidate));
        Ok(self.accept_and_rank(policy, scored, candidates.len(), limit, &logger))
    }

    /// Free-text search: the whole query against each candidate's synthesized
    /// display name, using the category's text algorithm.
    pub async fn search_by_text(
        &self,
        query: &str,
        category: Option<&str>,
        limit: Option<usize>,
    ) -> EngineResult<Vec<MatchResult>> {
        let logger = MatchingLogger::new(OperationType::TextSearch);
        let policy = self.config.category(category);
        let scorer = CandidateScorer::new(policy);

        let normalized_query = policy.normalizer.normalize(query);
        if normalized_query.is_empty() {
            return Err(MatchError::InvalidCriteria(
                "search query is empty after normalization".to_string(),
            ));
        }
        logger.log_start(&policy.name, &format!("for query '{}'", normalized_query));

        let limit = self.config.effective_limit(limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.fetch(category, policy, &logger).await?;

        logger.log_phase("scoring", Some(policy.text_algorithm.as_str()));
        let scored = candidates
            .iter()
            .map(|candidate| scorer.score_display_name(&normalized_query, candidate));
        Ok(self.accept_and_rank(policy, scored, candidates.len(), limit, &logger))
    }

    async fn fetch(
        &self,
        category: Option<&str>,
        policy: &CategoryPolicy,
        logger: &MatchingLogger,
    ) -> EngineResult<Vec<CandidateAttributes>> {
        // Records are looked up under the requested name even when scoring
        // falls back to the default category's settings.
        let record_category = category.unwrap_or(&policy.name);
        logger.log_phase("fetching candidates", Some(record_category));
        let candidates = self
            .store
            .fetch_candidates(record_category, policy.max_candidates)
            .await
            .map_err(MatchError::Store)?;
        logger.log_data_loaded(candidates.len(), "candidates");
        if candidates.len() >= policy.max_candidates {
            logger.log_warning(&format!(
                "candidate cap of {} reached, results cover a sample of '{}'",
                policy.max_candidates, record_category
            ));
        }
        Ok(candidates)
    }

    fn accept_and_rank(
        &self,
        policy: &CategoryPolicy,
        scored: impl Iterator<Item = ScoredCandidate>,
        evaluated: usize,
        limit: usize,
        logger: &MatchingLogger,
    ) -> Vec<MatchResult> {
        let accepted: Vec<MatchResult> = scored
            .filter(|s| policy.accepts(s.total, s.matched_fields.len()))
            .map(|s| MatchResult {
                candidate_id: s.candidate_id,
                score: s.total,
                confidence: policy.classify(s.total),
                matched_fields: s.matched_fields,
                breakdown: s.breakdown,
            })
            .collect();
        logger.log_filtered("below threshold", evaluated - accepted.len());

        let ranked = rank(&accepted, limit);
        if let Some(best) = ranked.first() {
            debug!(
                "Best candidate {} scored {:.3} ({})",
                best.candidate_id, best.score, best.confidence
            );
        }
        logger.log_completion(evaluated, accepted.len(), ranked.len());
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateAttributes, ConfidenceLevel};
    use crate::store::InMemoryStore;
    use anyhow::anyhow;
    use std::future::Future;

    fn engine(store: InMemoryStore) -> MatchingEngine<InMemoryStore> {
        MatchingEngine::new(Arc::new(MatchingConfig::default()), Arc::new(store))
    }

    struct FailingStore;

    impl RecordStore for FailingStore {
        fn fetch_candidates(
            &self,
            _category: &str,
            _max_count: usize,
        ) -> impl Future<Output = anyhow::Result<Vec<CandidateAttributes>>> + Send {
            async { Err(anyhow!("connection refused")) }
        }
    }

    #[tokio::test]
    async fn test_phone_search_limit_one_returns_best() {
        let store = InMemoryStore::new().with_candidates(
            "company",
            vec![
                CandidateAttributes::new("close").with("phone", "555-1235"),
                CandidateAttributes::new("exact").with_values("phones", ["555-1234", "555-0000"]),
            ],
        );
        let engine = engine(store);
        let criteria = SearchCriteria::new().with("phone", "5551234");

        let all = engine
            .search_matches(&criteria, Some("company"), Some(5))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].score > all[1].score);

        let top = engine
            .search_matches(&criteria, Some("company"), Some(1))
            .await
            .unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].candidate_id, "exact");
        assert_eq!(top[0].matched_fields, vec!["phone".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_criteria_rejected() {
        let engine = engine(InMemoryStore::new());
        let criteria: SearchCriteria = vec![("name", Some("  ")), ("phone", None)]
            .into_iter()
            .collect();
        let err = engine.search_matches(&criteria, None, None).await.unwrap_err();
        assert!(matches!(err, MatchError::InvalidCriteria(_)));

        // Punctuation-only values normalize to nothing.
        let criteria = SearchCriteria::new().with("name", "!!!");
        let err = engine.search_matches(&criteria, None, None).await.unwrap_err();
        assert!(matches!(err, MatchError::InvalidCriteria(_)));

        let err = engine.search_by_text("...", None, None).await.unwrap_err();
        assert!(matches!(err, MatchError::InvalidCriteria(_)));
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let store = InMemoryStore::new().with_candidates(
            "company",
            vec![CandidateAttributes::new("c1").with("name", "Zebra Logistics")],
        );
        let engine = engine(store);
        let criteria = SearchCriteria::new().with("inn", "7701234567");
        let results = engine
            .search_matches(&criteria, Some("company"), None)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_limit_zero_and_clamp() {
        let candidates =
            (0..30).map(|i| CandidateAttributes::new(format!("c{}", i)).with("name", "Acme"));
        let engine = engine(InMemoryStore::new().with_candidates("company", candidates));
        let criteria = SearchCriteria::new().with("name", "Acme");

        let none = engine.search_matches(&criteria, Some("company"), Some(0)).await.unwrap();
        assert!(none.is_empty());

        let clamped = engine.search_matches(&criteria, Some("company"), Some(100)).await.unwrap();
        assert_eq!(clamped.len(), engine.config().max_limit);
        // Equal scores keep store order.
        assert_eq!(clamped[0].candidate_id, "c0");
        assert_eq!(clamped[1].candidate_id, "c1");
    }

    #[tokio::test]
    async fn test_search_by_text_person_display_name() {
        let store = InMemoryStore::new().with_candidates(
            "person",
            vec![
                CandidateAttributes::new("p1")
                    .with("first_name", "Ivan")
                    .with("last_name", "Petrov"),
                CandidateAttributes::new("p2")
                    .with("first_name", "Maria")
                    .with("last_name", "Sidorova"),
            ],
        );
        let engine = engine(store);

        let results = engine
            .search_by_text("Petrov, Ivan", Some("person"), None)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].candidate_id, "p1");
        assert_eq!(results[0].confidence, ConfidenceLevel::High);
    }

    #[tokio::test]
    async fn test_unknown_category_uses_default_settings() {
        let store = InMemoryStore::new().with_candidates(
            "vendor",
            vec![CandidateAttributes::new("v1").with("name", "Acme Supplies")],
        );
        let engine = engine(store);
        let criteria = SearchCriteria::new().with("name", "acme supplies");
        let results = engine.search_matches(&criteria, Some("vendor"), None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let engine = MatchingEngine::new(
            Arc::new(MatchingConfig::default()),
            Arc::new(FailingStore),
        );
        let criteria = SearchCriteria::new().with("name", "Acme");
        let err = engine.search_matches(&criteria, None, None).await.unwrap_err();
        match err {
            MatchError::Store(e) => assert_eq!(e.to_string(), "connection refused"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
