// src/store/memory.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{MessageStore, RecordStore};
use crate::models::{CandidateAttributes, StoredMessage};

/// Records document read by the CLI:
/// `{"records": {"<category>": [candidate, ...]}, "messages": [message, ...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordsDocument {
    #[serde(default)]
    pub records: HashMap<String, Vec<CandidateAttributes>>,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

/// Snapshot store backed by plain vectors. Cheap to clone into tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: HashMap<String, Vec<CandidateAttributes>>,
    messages: Vec<StoredMessage>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(document: RecordsDocument) -> Self {
        Self {
            records: document.records,
            messages: document.messages,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: RecordsDocument =
            serde_json::from_str(json).context("Failed to parse records document")?;
        Ok(Self::from_document(document))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read records file {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("Invalid records file {}", path.display()))
    }

    pub fn with_candidates(
        mut self,
        category: impl Into<String>,
        candidates: impl IntoIterator<Item = CandidateAttributes>,
    ) -> Self {
        self.records
            .entry(category.into())
            .or_default()
            .extend(candidates);
        self
    }

    pub fn with_messages(mut self, messages: impl IntoIterator<Item = StoredMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn candidate_count(&self, category: &str) -> usize {
        self.records.get(category).map_or(0, Vec::len)
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

impl RecordStore for InMemoryStore {
    async fn fetch_candidates(
        &self,
        category: &str,
        max_count: usize,
    ) -> Result<Vec<CandidateAttributes>> {
        let Some(candidates) = self.records.get(category) else {
            debug!("No records stored for category '{}'", category);
            return Ok(Vec::new());
        };
        Ok(candidates
            .iter()
            .filter(|c| c.active)
            .take(max_count)
            .cloned()
            .collect())
    }
}

impl MessageStore for InMemoryStore {
    async fn fetch_messages(
        &self,
        since: DateTime<Utc>,
        max_count: usize,
    ) -> Result<Vec<StoredMessage>> {
        let mut recent: Vec<StoredMessage> = self
            .messages
            .iter()
            .filter(|m| m.created_at >= since)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(max_count);
        Ok(recent)
    }
}
