// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Problems with the configuration document. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid matching config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The caller supplied nothing usable to search with.
    #[error("invalid search criteria: {0}")]
    InvalidCriteria(String),
    /// Record store failures are passed through untouched.
    #[error(transparent)]
    Store(anyhow::Error),
}

pub type EngineResult<T> = std::result::Result<T, MatchError>;
