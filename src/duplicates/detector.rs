// src/duplicates/detector.rs
// Whole-message near-duplicate detection over a trailing time window.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{EngineResult, MatchError};
use crate::models::{DuplicateCandidate, StoredMessage};
use crate::store::MessageStore;
use crate::utils::config::{DuplicatePolicy, MatchingConfig};
use crate::utils::logging::{MatchingLogger, OperationType};

const ELLIPSIS: &str = "...";

/// Why a text was kept out of comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    TooShort,
    Excluded,
    Blank,
}

/// Checks a raw text against the eligibility rules and returns its normalized
/// form when it may take part in comparison.
pub fn eligible_text(policy: &DuplicatePolicy, text: &str) -> Result<String, Ineligible> {
    if text.trim().chars().count() < policy.min_text_length {
        return Err(Ineligible::TooShort);
    }
    if policy
        .exclude_patterns
        .iter()
        .any(|pattern| text.contains(pattern.as_str()))
    {
        return Err(Ineligible::Excluded);
    }
    let normalized = policy.normalizer.normalize(text);
    if normalized.is_empty() {
        return Err(Ineligible::Blank);
    }
    Ok(normalized)
}

pub fn is_eligible(policy: &DuplicatePolicy, text: &str) -> bool {
    eligible_text(policy, text).is_ok()
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", text[..cut].trim_end(), ELLIPSIS),
        None => text.to_string(),
    }
}

pub struct DuplicateDetector<M> {
    config: Arc<MatchingConfig>,
    store: Arc<M>,
}

impl<M> Clone for DuplicateDetector<M> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
        }
    }
}

impl<M: MessageStore> DuplicateDetector<M> {
    pub fn new(config: Arc<MatchingConfig>, store: Arc<M>) -> Self {
        Self { config, store }
    }

    pub fn policy(&self) -> &DuplicatePolicy {
        &self.config.duplicates
    }

    pub async fn find_duplicates(
        &self,
        text: &str,
        exclude_id: Option<&str>,
    ) -> EngineResult<Vec<DuplicateCandidate>> {
        self.find_duplicates_at(text, exclude_id, Utc::now()).await
    }

    /// Every stored message inside the window whose similarity clears the
    /// threshold, best first. Equal similarities put the most recent first.
    pub async fn find_duplicates_at(
        &self,
        text: &str,
        exclude_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<DuplicateCandidate>> {
        let logger = MatchingLogger::new(OperationType::Duplicates);
        let policy = self.policy();

        let incoming = match eligible_text(policy, text) {
            Ok(normalized) => normalized,
            Err(reason) => {
                logger.log_debug(&format!("incoming text not eligible: {:?}", reason));
                return Ok(Vec::new());
            }
        };
        logger.log_start("messages", &format!("window {} days", policy.time_window.num_days()));

        let since = now
            .checked_sub_signed(policy.time_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        logger.log_phase("fetching messages", None);
        let messages = self
            .store
            .fetch_messages(since, policy.max_candidates)
            .await
            .map_err(MatchError::Store)?;
        logger.log_data_loaded(messages.len(), "messages");

        logger.log_phase("comparing", Some(policy.algorithm.as_str()));
        let mut skipped = 0usize;
        let mut evaluated = 0usize;
        let mut duplicates: Vec<DuplicateCandidate> = Vec::new();
        for message in &messages {
            if exclude_id == Some(message.id.as_str()) || message.created_at < since {
                skipped += 1;
                continue;
            }
            let Ok(stored) = eligible_text(policy, &message.text) else {
                skipped += 1;
                continue;
            };
            evaluated += 1;

            let similarity = (policy.similarity)(&incoming, &stored).clamp(0.0, 1.0);
            if similarity >= policy.threshold {
                duplicates.push(self.candidate(message, similarity, now));
            }
        }
        logger.log_filtered("excluded, out of window or ineligible", skipped);

        duplicates.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        logger.log_completion(evaluated, duplicates.len(), duplicates.len());
        Ok(duplicates)
    }

    pub async fn is_duplicate(&self, text: &str, exclude_id: Option<&str>) -> EngineResult<bool> {
        self.is_duplicate_at(text, exclude_id, Utc::now()).await
    }

    pub async fn is_duplicate_at(
        &self,
        text: &str,
        exclude_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        Ok(!self.find_duplicates_at(text, exclude_id, now).await?.is_empty())
    }

    /// Details of the single best duplicate, if any.
    pub async fn get_duplicate_info(
        &self,
        text: &str,
        exclude_id: Option<&str>,
    ) -> EngineResult<Option<DuplicateCandidate>> {
        self.get_duplicate_info_at(text, exclude_id, Utc::now()).await
    }

    pub async fn get_duplicate_info_at(
        &self,
        text: &str,
        exclude_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<Option<DuplicateCandidate>> {
        Ok(self
            .find_duplicates_at(text, exclude_id, now)
            .await?
            .into_iter()
            .next())
    }

    fn candidate(
        &self,
        message: &StoredMessage,
        similarity: f64,
        now: DateTime<Utc>,
    ) -> DuplicateCandidate {
        let age_seconds = match message.created_at.cmp(&now) {
            Ordering::Greater => 0,
            _ => (now - message.created_at).num_seconds(),
        };
        DuplicateCandidate {
            record_id: message.id.clone(),
            similarity,
            created_at: message.created_at,
            age_seconds,
            preview: preview(&message.text, self.policy().preview_length),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn detector(messages: Vec<StoredMessage>) -> DuplicateDetector<InMemoryStore> {
        DuplicateDetector::new(
            Arc::new(MatchingConfig::default()),
            Arc::new(InMemoryStore::new().with_messages(messages)),
        )
    }

    #[test]
    fn test_eligibility_rules() {
        let config = MatchingConfig::default();
        let policy = &config.duplicates;
        assert_eq!(eligible_text(policy, "too short"), Err(Ineligible::TooShort));
        assert_eq!(eligible_text(policy, "   padded   "), Err(Ineligible::TooShort));
        assert_eq!(
            eligible_text(policy, "Photo: [Media message] from the set"),
            Err(Ineligible::Excluded)
        );
        assert_eq!(eligible_text(policy, "!!!!!!!!!!!!!!"), Err(Ineligible::Blank));
        assert!(!is_eligible(policy, "[No text attached]"));
        assert!(is_eligible(policy, "Looking for a lead actor, drama, Moscow"));
        assert_eq!(
            eligible_text(policy, "Casting call, Moscow").as_deref(),
            Ok("casting call moscow")
        );
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("short", 100), "short");
        assert_eq!(preview("привет мир как дела", 6), "привет...");
        assert_eq!(preview("abc", 3), "abc");
    }

    #[tokio::test]
    async fn test_reordered_text_is_duplicate() {
        let detector = detector(vec![StoredMessage::new(
            "m1",
            "Looking for a lead actor, drama, Moscow",
            now() - Duration::days(1),
        )]);

        let info = detector
            .get_duplicate_info_at("drama Moscow looking for lead actor", None, now())
            .await
            .unwrap()
            .expect("reordered text should be a duplicate");
        assert_eq!(info.record_id, "m1");
        assert!(info.similarity >= 0.9);
        assert_eq!(info.age(), Duration::days(1));
        assert!(detector
            .is_duplicate_at("drama Moscow looking for lead actor", None, now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_old_records_ignored() {
        let text = "Looking for a lead actor, drama, Moscow";
        let detector = detector(vec![StoredMessage::new("old", text, now() - Duration::days(8))]);
        assert!(detector.find_duplicates_at(text, None, now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_excluded_and_short_texts_never_match() {
        let detector = detector(vec![
            StoredMessage::new("p1", "[No text attached]", now() - Duration::hours(1)),
            StoredMessage::new("p2", "[No text attached] ", now() - Duration::hours(2)),
            StoredMessage::new("s1", "hi", now() - Duration::hours(1)),
        ]);
        assert!(detector
            .find_duplicates_at("[No text attached]", None, now())
            .await
            .unwrap()
            .is_empty());
        assert!(detector.find_duplicates_at("hi", None, now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exclude_id_and_ordering() {
        let text = "Need two extras for a commercial shoot tomorrow";
        let detector = detector(vec![
            StoredMessage::new("self", text, now() - Duration::minutes(1)),
            StoredMessage::new("older", text, now() - Duration::days(3)),
            StoredMessage::new("newer", text, now() - Duration::days(1)),
            StoredMessage::new("unrelated", "Selling a used camera lens, good condition", now()),
        ]);

        let found = detector
            .find_duplicates_at(text, Some("self"), now())
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|d| d.record_id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "older"]);
        assert!(found.iter().all(|d| d.similarity == 1.0));
    }

    #[tokio::test]
    async fn test_ineligible_stored_texts_are_skipped() {
        let text = "Looking for a lead actor, drama, Moscow";
        let detector = detector(vec![
            StoredMessage::new(
                "media",
                "[Media message] Looking for a lead actor, drama, Moscow",
                now() - Duration::hours(1),
            ),
            StoredMessage::new("short", "Moscow", now() - Duration::hours(1)),
            StoredMessage::new("clean", text, now() - Duration::hours(2)),
        ]);

        let found = detector.find_duplicates_at(text, None, now()).await.unwrap();
        let ids: Vec<_> = found.iter().map(|d| d.record_id.as_str()).collect();
        assert_eq!(ids, vec!["clean"]);
    }

    #[tokio::test]
    async fn test_huge_window_does_not_overflow() {
        let mut config = MatchingConfig::default();
        config.duplicates.time_window = Duration::days(200_000_000);
        let text = "Looking for a lead actor, drama, Moscow";
        let store = InMemoryStore::new().with_messages(vec![StoredMessage::new(
            "ancient",
            text,
            now() - Duration::days(3650),
        )]);
        let detector = DuplicateDetector::new(Arc::new(config), Arc::new(store));

        let found = detector.find_duplicates_at(text, None, now()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].record_id, "ancient");
    }
}
