// src/utils/env.rs
use log::{debug, info};
use std::path::Path;

/// Loads a `.env` file from the working directory if there is one.
/// Variables already present in the environment are left alone.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    }
}

/// Loads an explicit env file. Missing files are only logged.
pub fn load_env_from(path: &Path) {
    match dotenv::from_path(path) {
        Ok(()) => info!("Loaded environment from {}", path.display()),
        Err(e) => debug!("Could not load env file {}: {}", path.display(), e),
    }
}
