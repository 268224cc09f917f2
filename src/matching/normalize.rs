// src/matching/normalize.rs
// Surface-level canonicalization applied before any string comparison.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static URL_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9+.\-]*://").expect("static URL scheme pattern"));

fn enabled() -> bool {
    true
}

/// Independently toggleable normalization steps. Steps always run in the
/// order the fields are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationOptions {
    #[serde(default = "enabled")]
    pub lowercase: bool,
    #[serde(default = "enabled")]
    pub strip_punctuation: bool,
    #[serde(default = "enabled")]
    pub collapse_whitespace: bool,
    #[serde(default = "enabled")]
    pub trim: bool,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_punctuation: true,
            collapse_whitespace: true,
            trim: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextNormalizer {
    options: NormalizationOptions,
}

impl TextNormalizer {
    pub fn new(options: NormalizationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> NormalizationOptions {
        self.options
    }

    /// lowercase -> punctuation removal -> whitespace collapse -> trim.
    pub fn normalize(&self, text: &str) -> String {
        let mut normalized = if self.options.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        if self.options.strip_punctuation {
            normalized = normalized
                .chars()
                .filter(|c| c.is_alphanumeric() || c.is_whitespace())
                .collect();
        }

        if self.options.collapse_whitespace {
            normalized = collapse_whitespace(&normalized);
        }

        if self.options.trim {
            normalized = normalized.trim().to_string();
        }

        normalized
    }

    pub fn normalize_opt(&self, text: Option<&str>) -> String {
        text.map(|t| self.normalize(t)).unwrap_or_default()
    }
}

/// Every whitespace run becomes a single space. Leading and trailing runs are
/// kept (as one space) so that trimming stays a separate step.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

pub fn normalize_phone(phone: &str) -> String {
    let digits_only: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits_only.len() == 11 && digits_only.starts_with(|c: char| matches!(c, '1' | '7' | '8')) {
        return digits_only[1..].to_string();
    }
    if (7..=15).contains(&digits_only.len()) {
        return digits_only;
    }
    debug!(
        "Phone number '{}' normalized to '{}', considered invalid for matching.",
        phone, digits_only
    );
    String::new()
}

pub fn normalize_email(email: &str) -> String {
    let email_trimmed = email.trim().to_lowercase();
    let Some((local_part_full, domain_part)) = email_trimmed.split_once('@') else {
        return email_trimmed;
    };

    let local_part = local_part_full.split('+').next().unwrap_or("");
    let domain = match domain_part {
        "googlemail.com" => "gmail.com",
        other => other,
    };
    let local_part = if domain == "gmail.com" {
        local_part.replace('.', "")
    } else {
        local_part.to_string()
    };

    if local_part.is_empty() || domain.is_empty() {
        String::new()
    } else {
        format!("{}@{}", local_part, domain)
    }
}

pub fn normalize_url(url: &str) -> String {
    let lowered = url.trim().to_lowercase();
    let without_scheme = URL_SCHEME.replace(&lowered, "");
    let without_scheme: &str = without_scheme.as_ref();
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    let end = without_www
        .find(|c: char| c == '?' || c == '#')
        .unwrap_or(without_www.len());
    without_www[..end].trim_end_matches('/').to_string()
}
