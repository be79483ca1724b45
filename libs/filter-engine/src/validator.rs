//! DSL validation and normalization.
//!
//! `DslValidator::validate` never fails: it returns a best-effort normalized
//! request together with every problem it found, so callers can choose between
//! rejecting the request and proceeding with warnings.
//!
//! Per entry, in order:
//! 1. key aliasing and registry lookup (unknown ids are dropped)
//! 2. bucket placement (misplaced filters move to the bucket they apply to)
//! 3. structural checks of the value (problems are flagged, value kept)
//! 4. exclusion / range / exists policy of the filter

use crate::definition::{EntityKind, FilterDefinition, FilterMode};
use crate::dsl::Dsl;
use crate::registry::FilterRegistry;
use crate::settings::RangePolicy;
use phf::phf_map;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use thiserror::Error;

pub const JOB_TITLE_FILTER: &str = "job_title";

static FILTER_ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "title" => "job_title",
    "titles" => "job_title",
    "job_titles" => "job_title",
    "industries" => "industry",
    "country" => "countries",
    "seniority_level" => "seniority",
    "department" => "departments",
    "employee_count" => "company_size",
    "headcount" => "company_size",
    "revenue" => "annual_revenue",
    "technology" => "technologies",
};

const VALUE_KEYS: [&str; 5] = ["include", "exclude", "range", "presence", "operator"];
const RANGE_KEYS: [&str; 4] = ["min", "max", "gte", "lte"];

/// Canonical filter id for a DSL key.
pub fn canonical_filter_id(key: &str) -> &str {
    FILTER_ALIASES.get(key).copied().unwrap_or(key)
}

/// A problem found while validating a DSL request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationIssue {
    #[error("Filter request must be an object")]
    InvalidRequest,

    #[error("Bucket '{bucket}' must be an object")]
    InvalidBucket { bucket: EntityKind },

    #[error("Unknown filter '{key}'")]
    UnknownFilter { key: String },

    #[error("Filter '{filter}' belongs to the {target} bucket, not {found}")]
    BucketPlacement {
        filter: String,
        found: EntityKind,
        target: EntityKind,
    },

    #[error("Duplicate filter '{key}' in {bucket} (already set as '{filter}')")]
    DuplicateFilter {
        key: String,
        filter: String,
        bucket: EntityKind,
    },

    #[error("Invalid value for {bucket}.{filter}: {reason}")]
    Structure {
        bucket: EntityKind,
        filter: String,
        reason: String,
    },

    #[error("Exclusion not supported for {bucket}.{filter}")]
    ExclusionUnsupported { bucket: EntityKind, filter: String },

    #[error("Range required for {bucket}.{filter}")]
    RangeRequired { bucket: EntityKind, filter: String },
}

impl ValidationIssue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest | Self::InvalidBucket { .. } | Self::Structure { .. } => {
                "structure"
            }
            Self::UnknownFilter { .. } => "unknown_filter",
            Self::BucketPlacement { .. } => "bucket_placement",
            Self::DuplicateFilter { .. } => "duplicate_filter",
            Self::ExclusionUnsupported { .. } => "exclusion_unsupported",
            Self::RangeRequired { .. } => "range_required",
        }
    }

    pub fn filter(&self) -> Option<&str> {
        match self {
            Self::InvalidRequest | Self::InvalidBucket { .. } => None,
            Self::UnknownFilter { key } => Some(key),
            Self::BucketPlacement { filter, .. }
            | Self::DuplicateFilter { filter, .. }
            | Self::Structure { filter, .. }
            | Self::ExclusionUnsupported { filter, .. }
            | Self::RangeRequired { filter, .. } => Some(filter),
        }
    }
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    #[serde(skip)]
    pub issues: Vec<ValidationIssue>,
    pub normalized: Dsl,
}

impl ValidationResult {
    /// Normalized request when valid, the error list otherwise.
    pub fn strict(self) -> std::result::Result<Dsl, Vec<String>> {
        if self.valid {
            Ok(self.normalized)
        } else {
            Err(self.errors)
        }
    }
}

/// Index a request should be run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTarget {
    Contacts,
    Companies,
}

impl SearchTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contacts => "contacts",
            Self::Companies => "companies",
        }
    }

    pub fn entity(&self) -> EntityKind {
        match self {
            Self::Contacts => EntityKind::Contact,
            Self::Companies => EntityKind::Company,
        }
    }
}

struct Placed {
    key: String,
    filter: String,
    value: JsonValue,
}

/// Validates and normalizes DSL requests against a registry snapshot.
#[derive(Debug, Clone)]
pub struct DslValidator {
    registry: Arc<FilterRegistry>,
    range_policy: RangePolicy,
}

impl DslValidator {
    pub fn new(registry: Arc<FilterRegistry>) -> Self {
        Self {
            registry,
            range_policy: RangePolicy::default(),
        }
    }

    pub fn with_range_policy(mut self, range_policy: RangePolicy) -> Self {
        self.range_policy = range_policy;
        self
    }

    /// Validate a raw JSON request.
    pub fn validate(&self, raw: &JsonValue) -> ValidationResult {
        let mut issues = Vec::new();
        let mut dsl = Dsl::new();

        match raw {
            JsonValue::Object(map) => {
                for entity in EntityKind::ALL {
                    match map.get(entity.as_str()) {
                        None | Some(JsonValue::Null) => {}
                        Some(JsonValue::Object(bucket)) => {
                            *dsl.bucket_mut(entity) = bucket.clone();
                        }
                        Some(_) => {
                            record(&mut issues, ValidationIssue::InvalidBucket { bucket: entity })
                        }
                    }
                }
            }
            JsonValue::Null => {}
            _ => record(&mut issues, ValidationIssue::InvalidRequest),
        }

        self.validate_buckets(&dsl, issues)
    }

    /// Validate an already-bucketed request.
    pub fn validate_dsl(&self, dsl: &Dsl) -> ValidationResult {
        self.validate_buckets(dsl, Vec::new())
    }

    fn validate_buckets(&self, dsl: &Dsl, mut issues: Vec<ValidationIssue>) -> ValidationResult {
        let mut native: Vec<(EntityKind, Placed)> = Vec::new();
        let mut relocated: Vec<(EntityKind, Placed)> = Vec::new();

        for found in EntityKind::ALL {
            for (key, value) in dsl.bucket(found) {
                let canonical = canonical_filter_id(key);
                let Some(def) = self.registry.get(canonical) else {
                    record(&mut issues, ValidationIssue::UnknownFilter { key: key.clone() });
                    continue;
                };

                let target = placement_for(def, found);
                if target != found {
                    if def.only_applies_to(EntityKind::Contact) {
                        tracing::warn!(
                            filter = %def.id,
                            found = %found,
                            "Contact-only filter submitted in the company bucket"
                        );
                    }
                    record(
                        &mut issues,
                        ValidationIssue::BucketPlacement {
                            filter: def.id.clone(),
                            found,
                            target,
                        },
                    );
                }

                let Some(value) = self.normalize_entry(def, target, value, &mut issues) else {
                    continue;
                };
                let placed = Placed {
                    key: key.clone(),
                    filter: def.id.clone(),
                    value,
                };
                if target == found {
                    native.push((target, placed));
                } else {
                    relocated.push((target, placed));
                }
            }
        }

        let mut normalized = Dsl::new();
        for (bucket, placed) in native {
            let out = normalized.bucket_mut(bucket);
            if out.contains_key(&placed.filter) {
                record(
                    &mut issues,
                    ValidationIssue::DuplicateFilter {
                        key: placed.key,
                        filter: placed.filter,
                        bucket,
                    },
                );
                continue;
            }
            out.insert(placed.filter, placed.value);
        }
        for (bucket, placed) in relocated {
            let out = normalized.bucket_mut(bucket);
            if out.contains_key(&placed.filter) {
                tracing::debug!(
                    filter = %placed.filter,
                    bucket = %bucket,
                    "Discarding relocated filter, bucket already holds a value"
                );
                continue;
            }
            out.insert(placed.filter, placed.value);
        }

        ValidationResult {
            valid: issues.is_empty(),
            errors: issues.iter().map(ToString::to_string).collect(),
            issues,
            normalized,
        }
    }

    /// Structural checks and filter policy for one entry. `None` drops the entry.
    fn normalize_entry(
        &self,
        def: &FilterDefinition,
        bucket: EntityKind,
        value: &JsonValue,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<JsonValue> {
        let structure = |reason: String| ValidationIssue::Structure {
            bucket,
            filter: def.id.clone(),
            reason,
        };

        let mut obj = match value {
            JsonValue::String(_) | JsonValue::Number(_) | JsonValue::Bool(_) => {
                // Include lists only carry strings and numbers.
                let item = match value {
                    JsonValue::Bool(b) => JsonValue::String(b.to_string()),
                    other => other.clone(),
                };
                let mut map = Map::new();
                map.insert("include".to_string(), JsonValue::Array(vec![item]));
                map
            }
            JsonValue::Object(map) => {
                for reason in structural_problems(map) {
                    record(issues, structure(reason));
                }
                map.clone()
            }
            _ => {
                record(issues, structure("expected a scalar or an object".to_string()));
                return Some(value.clone());
            }
        };

        if !def.supports_exclusion() {
            match obj.get_mut("exclude") {
                Some(JsonValue::Array(items)) if !items.is_empty() => {
                    items.clear();
                    record(
                        issues,
                        ValidationIssue::ExclusionUnsupported {
                            bucket,
                            filter: def.id.clone(),
                        },
                    );
                }
                // Non-array excludes were already flagged as a structure problem.
                Some(other) if !other.is_array() => *other = JsonValue::Array(Vec::new()),
                _ => {}
            }
        }

        match def.mode() {
            FilterMode::Range if !obj.contains_key("range") => {
                record(
                    issues,
                    ValidationIssue::RangeRequired {
                        bucket,
                        filter: def.id.clone(),
                    },
                );
                if self.range_policy == RangePolicy::Drop {
                    return None;
                }
            }
            FilterMode::Exists => {
                let presence = match obj.get("presence").and_then(JsonValue::as_str) {
                    Some(p @ ("known" | "unknown")) => p.to_string(),
                    _ => "known".to_string(),
                };
                let mut forced = Map::new();
                forced.insert("presence".to_string(), JsonValue::String(presence));
                forced.insert("include".to_string(), JsonValue::Array(Vec::new()));
                forced.insert("exclude".to_string(), JsonValue::Array(Vec::new()));
                obj = forced;
            }
            _ => {}
        }

        Some(JsonValue::Object(obj))
    }

    /// Index a request should target, judged purely from its filters.
    ///
    /// A job title in the contact bucket, or any contact-only filter, means
    /// contacts; otherwise a non-empty company bucket means companies.
    pub fn detect_entity(&self, dsl: &Dsl) -> SearchTarget {
        if dsl
            .contact
            .keys()
            .any(|key| canonical_filter_id(key) == JOB_TITLE_FILTER)
        {
            return SearchTarget::Contacts;
        }

        let contact_only = EntityKind::ALL.iter().any(|&entity| {
            dsl.bucket(entity).keys().any(|key| {
                self.registry
                    .get(canonical_filter_id(key))
                    .is_some_and(|def| def.only_applies_to(EntityKind::Contact))
            })
        });
        if contact_only {
            return SearchTarget::Contacts;
        }

        if !dsl.company.is_empty() {
            return SearchTarget::Companies;
        }
        SearchTarget::Contacts
    }
}

/// Bucket a filter found in `found` belongs in. Location filters stay put.
fn placement_for(def: &FilterDefinition, found: EntityKind) -> EntityKind {
    if def.applies_to(found) || def.is_location() {
        found
    } else {
        found.other()
    }
}

fn structural_problems(map: &Map<String, JsonValue>) -> Vec<String> {
    let mut problems = Vec::new();

    for key in map.keys() {
        if !VALUE_KEYS.contains(&key.as_str()) {
            problems.push(format!("unsupported key '{}'", key));
        }
    }

    for list in ["include", "exclude"] {
        if map.get(list).is_some_and(|v| !v.is_array()) {
            problems.push(format!("'{}' must be an array", list));
        }
    }

    match map.get("range") {
        None => {}
        Some(JsonValue::Object(range)) => {
            for key in range.keys() {
                if !RANGE_KEYS.contains(&key.as_str()) {
                    problems.push(format!("unsupported range key '{}'", key));
                }
            }
        }
        Some(_) => problems.push("'range' must be an object".to_string()),
    }

    if let Some(presence) = map.get("presence") {
        if !matches!(presence.as_str(), Some("known" | "unknown")) {
            problems.push("'presence' must be 'known' or 'unknown'".to_string());
        }
    }

    problems
}

fn record(issues: &mut Vec<ValidationIssue>, issue: ValidationIssue) {
    tracing::debug!(
        kind = issue.kind(),
        filter = issue.filter().unwrap_or(""),
        error = %issue,
        "DSL validation issue"
    );
    issues.push(issue);
}
