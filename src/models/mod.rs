// src/models/mod.rs
pub mod core;
pub mod matching;

pub use self::core::{AttributeValue, CandidateAttributes, SearchCriteria, StoredMessage};
pub use self::matching::{ConfidenceLevel, DuplicateCandidate, MatchResult, ScoreBreakdown};
