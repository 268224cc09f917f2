// src/lib.rs
pub mod duplicates;
pub mod error;
pub mod matching;
pub mod models;
pub mod store;
pub mod utils;

pub use duplicates::DuplicateDetector;
pub use error::{ConfigError, EngineResult, MatchError};
pub use matching::MatchingEngine;
pub use utils::config::MatchingConfig;
