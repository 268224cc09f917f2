// src/matching/fields.rs
// Static mapping from logical search fields to the candidate attributes that hold them.

use crate::matching::normalize::{normalize_email, normalize_phone, normalize_url, TextNormalizer};
use crate::models::CandidateAttributes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Phone,
    Email,
    Url,
}

impl FieldKind {
    /// Contact-style kinds have their own canonical form and skip the text normalizer.
    pub fn canonicalize(&self, value: &str, normalizer: &TextNormalizer) -> String {
        match self {
            FieldKind::Text => normalizer.normalize(value),
            FieldKind::Phone => normalize_phone(value),
            FieldKind::Email => normalize_email(value),
            FieldKind::Url => normalize_url(value),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: &'static str,
    pub kind: FieldKind,
    /// New multi-value attribute first, legacy single-value attribute after.
    pub attributes: &'static [&'static str],
}

pub const FIELD_ALIASES: [FieldSpec; 6] = [
    FieldSpec {
        field: "phone",
        kind: FieldKind::Phone,
        attributes: &["phones", "phone"],
    },
    FieldSpec {
        field: "phones",
        kind: FieldKind::Phone,
        attributes: &["phones", "phone"],
    },
    FieldSpec {
        field: "email",
        kind: FieldKind::Email,
        attributes: &["emails", "email"],
    },
    FieldSpec {
        field: "emails",
        kind: FieldKind::Email,
        attributes: &["emails", "email"],
    },
    FieldSpec {
        field: "website",
        kind: FieldKind::Url,
        attributes: &["websites", "website", "url"],
    },
    FieldSpec {
        field: "url",
        kind: FieldKind::Url,
        attributes: &["websites", "website", "url"],
    },
];

pub fn field_spec(field: &str) -> Option<&'static FieldSpec> {
    FIELD_ALIASES.iter().find(|spec| spec.field == field)
}

pub fn field_kind(field: &str) -> FieldKind {
    field_spec(field).map_or(FieldKind::Text, |spec| spec.kind)
}

/// Every non-blank value the candidate holds for `field`, across all aliases,
/// de-duplicated in first-seen order.
pub fn resolve_values<'a>(field: &str, candidate: &'a CandidateAttributes) -> Vec<&'a str> {
    let mut values: Vec<&'a str> = Vec::new();
    let mut push_from = |attribute: &str| {
        if let Some(value) = candidate.get(attribute) {
            for v in value.values() {
                let v = v.as_str();
                if !v.trim().is_empty() && !values.contains(&v) {
                    values.push(v);
                }
            }
        }
    };

    match field_spec(field) {
        Some(spec) => spec.attributes.iter().for_each(|a| push_from(a)),
        None => push_from(field),
    }
    values
}
