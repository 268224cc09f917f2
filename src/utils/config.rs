// src/utils/config.rs
// Matching configuration: the JSON document, its validation, and the resolved
// per-category policies the engine reads at scoring time.

use chrono::Duration;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::matching::normalize::{NormalizationOptions, TextNormalizer};
use crate::matching::policy::ConfidenceBands;
use crate::matching::ranker::DEFAULT_LIMIT;
use crate::matching::scorer::AggregationMode;
use crate::matching::similarity::{Algorithm, SimilarityFn};

pub const CONFIG_PATH_ENV: &str = "MATCHING_CONFIG_PATH";
pub const MAX_CANDIDATES_ENV: &str = "MATCHING_MAX_CANDIDATES";
pub const TIME_WINDOW_DAYS_ENV: &str = "DUPLICATE_TIME_WINDOW_DAYS";
pub const DUPLICATE_THRESHOLD_ENV: &str = "DUPLICATE_THRESHOLD";

pub const DEFAULT_CATEGORY: &str = "default";

/// Upper bound for the duplicate window, roughly a century.
pub const MAX_TIME_WINDOW_DAYS: i64 = 36_500;

fn default_max_candidates() -> usize {
    1000
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_max_limit() -> usize {
    20
}

fn default_category_name() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_algorithm() -> Algorithm {
    Algorithm::TokenSetRatio
}

fn default_display_fields() -> Vec<String> {
    vec!["name".to_string()]
}

fn default_duplicate_threshold() -> f64 {
    0.9
}

fn default_duplicate_algorithm() -> Algorithm {
    Algorithm::TokenSortRatio
}

fn default_time_window_days() -> i64 {
    7
}

fn default_min_text_length() -> usize {
    10
}

fn default_exclude_patterns() -> Vec<String> {
    vec!["[No text attached]".to_string(), "[Media message]".to_string()]
}

fn default_preview_length() -> usize {
    100
}

/// Settings for one entity category, as written in the config document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySettings {
    pub threshold: f64,
    #[serde(default)]
    pub field_weights: BTreeMap<String, f64>,
    #[serde(default = "default_algorithm")]
    pub algorithm: Algorithm,
    /// Algorithm for free-text search against the display name. Falls back to `algorithm`.
    #[serde(default)]
    pub text_algorithm: Option<Algorithm>,
    #[serde(default)]
    pub aggregation: AggregationMode,
    #[serde(default)]
    pub normalization: NormalizationOptions,
    #[serde(default)]
    pub confidence: ConfidenceBands,
    #[serde(default = "default_display_fields")]
    pub display_fields: Vec<String>,
    #[serde(default)]
    pub max_candidates: Option<usize>,
}

impl CategorySettings {
    fn additive(threshold: f64, weights: &[(&str, f64)], display_fields: &[&str]) -> Self {
        Self {
            threshold,
            field_weights: weights.iter().map(|(f, w)| (f.to_string(), *w)).collect(),
            algorithm: default_algorithm(),
            text_algorithm: None,
            aggregation: AggregationMode::Additive,
            normalization: NormalizationOptions::default(),
            confidence: ConfidenceBands::default(),
            display_fields: display_fields.iter().map(|f| f.to_string()).collect(),
            max_candidates: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateSettings {
    #[serde(default = "default_duplicate_threshold")]
    pub threshold: f64,
    #[serde(default = "default_duplicate_algorithm")]
    pub algorithm: Algorithm,
    #[serde(default = "default_time_window_days")]
    pub time_window_days: i64,
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub normalization: NormalizationOptions,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,
}

impl Default for DuplicateSettings {
    fn default() -> Self {
        Self {
            threshold: default_duplicate_threshold(),
            algorithm: default_duplicate_algorithm(),
            time_window_days: default_time_window_days(),
            min_text_length: default_min_text_length(),
            exclude_patterns: default_exclude_patterns(),
            normalization: NormalizationOptions::default(),
            max_candidates: default_max_candidates(),
            preview_length: default_preview_length(),
        }
    }
}

fn default_categories() -> BTreeMap<String, CategorySettings> {
    let mut categories = BTreeMap::new();
    categories.insert(
        "company".to_string(),
        CategorySettings::additive(
            0.6,
            &[("name", 1.0), ("inn", 1.0), ("phone", 0.9), ("email", 0.9), ("website", 0.7)],
            &["name"],
        ),
    );
    categories.insert(
        "project".to_string(),
        CategorySettings::additive(
            0.6,
            &[("title", 1.0), ("name", 1.0), ("company", 0.5), ("description", 0.3)],
            &["title"],
        ),
    );
    let mut person = CategorySettings::additive(
        0.7,
        &[
            ("full_name", 1.0),
            ("first_name", 0.6),
            ("last_name", 0.8),
            ("phone", 1.0),
            ("email", 1.0),
        ],
        &["first_name", "last_name"],
    );
    person.algorithm = Algorithm::TokenSortRatio;
    person.aggregation = AggregationMode::WeightedAverage;
    person.confidence = ConfidenceBands { high: 0.9, medium: 0.6 };
    categories.insert("person".to_string(), person);
    categories.insert(
        DEFAULT_CATEGORY.to_string(),
        CategorySettings::additive(0.6, &[], &["name"]),
    );
    categories
}

/// The configuration document exactly as the configuration source supplies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default = "default_category_name")]
    pub default_category: String,
    #[serde(default = "default_categories")]
    pub categories: BTreeMap<String, CategorySettings>,
    #[serde(default)]
    pub duplicates: DuplicateSettings,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            max_candidates: default_max_candidates(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            default_category: default_category_name(),
            categories: default_categories(),
            duplicates: DuplicateSettings::default(),
        }
    }
}

impl ConfigDocument {
    /// Environment values win over the document when set and parseable.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Same as `apply_env_overrides`, reading values through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(max) = parse_override::<usize, _>(&lookup, MAX_CANDIDATES_ENV) {
            debug!("Overriding max_candidates from env: {}", max);
            self.max_candidates = max;
        }
        if let Some(days) = parse_override::<i64, _>(&lookup, TIME_WINDOW_DAYS_ENV) {
            debug!("Overriding duplicate time window from env: {} days", days);
            self.duplicates.time_window_days = days;
        }
        if let Some(threshold) = parse_override::<f64, _>(&lookup, DUPLICATE_THRESHOLD_ENV) {
            debug!("Overriding duplicate threshold from env: {}", threshold);
            self.duplicates.threshold = threshold;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.max_candidates == 0 {
            return invalid("max_candidates must be greater than 0".into());
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return invalid(format!(
                "default_limit must be within 1..={} (got {})",
                self.max_limit, self.default_limit
            ));
        }
        if !self.categories.contains_key(&self.default_category) {
            return invalid(format!(
                "default category '{}' is not defined",
                self.default_category
            ));
        }

        for (name, settings) in &self.categories {
            if !is_non_negative(settings.threshold) {
                return invalid(format!(
                    "category '{}': threshold must be a finite value >= 0",
                    name
                ));
            }
            let bands = settings.confidence;
            if !is_non_negative(bands.high)
                || !is_non_negative(bands.medium)
                || bands.medium > bands.high
            {
                return invalid(format!(
                    "category '{}': confidence bands need 0 <= medium <= high \
                     (got medium={}, high={})",
                    name, bands.medium, bands.high
                ));
            }
            if let Some((field, weight)) = settings
                .field_weights
                .iter()
                .find(|(_, w)| !(w.is_finite() && **w > 0.0))
            {
                return invalid(format!(
                    "category '{}': weight for field '{}' must be positive (got {})",
                    name, field, weight
                ));
            }
            if settings.max_candidates == Some(0) {
                return invalid(format!(
                    "category '{}': max_candidates must be greater than 0",
                    name
                ));
            }
        }

        let dup = &self.duplicates;
        if !(dup.threshold.is_finite() && (0.0..=1.0).contains(&dup.threshold)) {
            return invalid(format!(
                "duplicates: threshold must be within [0, 1] (got {})",
                dup.threshold
            ));
        }
        if !(1..=MAX_TIME_WINDOW_DAYS).contains(&dup.time_window_days) {
            return invalid(format!(
                "duplicates: time_window_days must be within 1..={} (got {})",
                MAX_TIME_WINDOW_DAYS, dup.time_window_days
            ));
        }
        if dup.max_candidates == 0 {
            return invalid("duplicates: max_candidates must be greater than 0".into());
        }
        if dup.exclude_patterns.iter().any(|p| p.is_empty()) {
            return invalid("duplicates: exclude_patterns must not contain empty strings".into());
        }
        Ok(())
    }
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable value '{}' for {}", raw, key);
            None
        }
    }
}

/// A category with its algorithm choices resolved to function pointers.
#[derive(Debug, Clone)]
pub struct CategoryPolicy {
    pub name: String,
    pub threshold: f64,
    pub field_weights: HashMap<String, f64>,
    pub algorithm: Algorithm,
    pub similarity: SimilarityFn,
    pub text_algorithm: Algorithm,
    pub text_similarity: SimilarityFn,
    pub aggregation: AggregationMode,
    pub normalizer: TextNormalizer,
    pub confidence: ConfidenceBands,
    pub display_fields: Vec<String>,
    pub max_candidates: usize,
}

impl CategoryPolicy {
    fn resolve(name: &str, settings: &CategorySettings, global_max_candidates: usize) -> Self {
        let text_algorithm = settings.text_algorithm.unwrap_or(settings.algorithm);
        Self {
            name: name.to_string(),
            threshold: settings.threshold,
            field_weights: settings
                .field_weights
                .iter()
                .map(|(f, w)| (f.clone(), *w))
                .collect(),
            algorithm: settings.algorithm,
            similarity: settings.algorithm.resolve(),
            text_algorithm,
            text_similarity: text_algorithm.resolve(),
            aggregation: settings.aggregation,
            normalizer: TextNormalizer::new(settings.normalization),
            confidence: settings.confidence,
            display_fields: settings.display_fields.clone(),
            max_candidates: settings.max_candidates.unwrap_or(global_max_candidates),
        }
    }

    /// Configured weight for `field`, 1.0 when the category doesn't mention it.
    pub fn weight(&self, field: &str) -> f64 {
        self.field_weights.get(field).copied().unwrap_or(1.0)
    }
}

#[derive(Debug, Clone)]
pub struct DuplicatePolicy {
    pub threshold: f64,
    pub algorithm: Algorithm,
    pub similarity: SimilarityFn,
    pub time_window: Duration,
    pub min_text_length: usize,
    pub exclude_patterns: Vec<String>,
    pub normalizer: TextNormalizer,
    pub max_candidates: usize,
    pub preview_length: usize,
}

impl DuplicatePolicy {
    fn resolve(settings: &DuplicateSettings) -> Self {
        Self {
            threshold: settings.threshold,
            algorithm: settings.algorithm,
            similarity: settings.algorithm.resolve(),
            time_window: Duration::days(settings.time_window_days.clamp(1, MAX_TIME_WINDOW_DAYS)),
            min_text_length: settings.min_text_length,
            exclude_patterns: settings.exclude_patterns.clone(),
            normalizer: TextNormalizer::new(settings.normalization),
            max_candidates: settings.max_candidates,
            preview_length: settings.preview_length,
        }
    }
}

/// Process-wide, read-only matching configuration.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    default_category: String,
    categories: HashMap<String, CategoryPolicy>,
    pub duplicates: DuplicatePolicy,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self::resolve(&ConfigDocument::default())
    }
}

impl MatchingConfig {
    pub fn from_document(document: &ConfigDocument) -> Result<Self, ConfigError> {
        document.validate()?;
        Ok(Self::resolve(document))
    }

    fn resolve(document: &ConfigDocument) -> Self {
        let categories = document
            .categories
            .iter()
            .map(|(name, settings)| {
                (
                    name.clone(),
                    CategoryPolicy::resolve(name, settings, document.max_candidates),
                )
            })
            .collect();
        Self {
            default_limit: document.default_limit,
            max_limit: document.max_limit,
            default_category: document.default_category.clone(),
            categories,
            duplicates: DuplicatePolicy::resolve(&document.duplicates),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument =
            serde_json::from_str(json).map_err(|source| ConfigError::Parse {
                path: "<inline>".into(),
                source,
            })?;
        Self::from_document(&document)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut document = read_document(path)?;
        document.apply_env_overrides();
        Self::from_document(&document)
    }

    /// Loads from `MATCHING_CONFIG_PATH` when set, otherwise from built-in defaults.
    /// Environment overrides apply in both cases.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        match env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(Path::new(path.trim())),
            _ => {
                info!("{} not set, using built-in matching defaults", CONFIG_PATH_ENV);
                let mut document = ConfigDocument::default();
                document.apply_env_overrides();
                Self::from_document(&document)
            }
        }
    }

    /// Policy for `category`, or the default category's when unknown or absent.
    pub fn category(&self, category: Option<&str>) -> &CategoryPolicy {
        if let Some(policy) = category.and_then(|name| self.categories.get(name)) {
            return policy;
        }
        if let Some(name) = category {
            debug!(
                "Unknown category '{}', using '{}' settings",
                name, self.default_category
            );
        }
        // Existence of the default category is checked when the config is built.
        &self.categories[&self.default_category]
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn category_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.categories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Clamps a caller-supplied limit to `max_limit`; `None` means the default.
    pub fn effective_limit(&self, limit: Option<usize>) -> usize {
        limit.unwrap_or(self.default_limit).min(self.max_limit)
    }

    pub fn log_config(&self) {
        info!("⚙️  Matching configuration loaded");
        for name in self.category_names() {
            let policy = &self.categories[name];
            info!(
                "   {}: threshold={}, algorithm={}, aggregation={:?}, weights={}, \
                 max_candidates={}",
                name,
                policy.threshold,
                policy.algorithm,
                policy.aggregation,
                policy.field_weights.len(),
                policy.max_candidates
            );
        }
        let dup = &self.duplicates;
        info!(
            "   duplicates: threshold={}, algorithm={}, window={} days, min_text_length={}",
            dup.threshold,
            dup.algorithm,
            dup.time_window.num_days(),
            dup.min_text_length
        );
        if dup.exclude_patterns.is_empty() {
            warn!("   duplicates: no exclusion patterns configured");
        }
    }
}

fn read_document(path: &Path) -> Result<ConfigDocument, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
