//! Engine settings.
//!
//! Every field has a default so a partial `[filters]` section (or none at all)
//! deserializes cleanly.

use crate::definition::{EntityKind, ValueSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the validator does with a range-mode filter submitted without a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    /// Keep the entry and record the error.
    #[default]
    Report,
    /// Remove the entry from the normalized request and record the error.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCacheTtls {
    #[serde(default = "default_long_ttl")]
    pub predefined: u64,
    #[serde(default = "default_long_ttl")]
    pub specialized: u64,
    #[serde(default = "default_search_ttl")]
    pub elasticsearch: u64,
    #[serde(default)]
    pub direct: u64,
}

fn default_long_ttl() -> u64 {
    24 * 60 * 60
}
fn default_search_ttl() -> u64 {
    30 * 60
}

impl Default for ValueCacheTtls {
    fn default() -> Self {
        Self {
            predefined: default_long_ttl(),
            specialized: default_long_ttl(),
            elasticsearch: default_search_ttl(),
            direct: 0,
        }
    }
}

impl ValueCacheTtls {
    /// TTL for value listings of a source; zero means "do not cache".
    pub fn for_source(&self, source: ValueSource) -> Duration {
        let secs = match source {
            ValueSource::Predefined => self.predefined,
            ValueSource::Specialized => self.specialized,
            ValueSource::Elasticsearch => self.elasticsearch,
            ValueSource::Direct => self.direct,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default = "default_registry_ttl_secs")]
    pub registry_ttl_secs: u64,
    #[serde(default)]
    pub range_policy: RangePolicy,
    #[serde(default)]
    pub value_cache: ValueCacheTtls,
    #[serde(default = "default_value_cache_capacity")]
    pub value_cache_capacity: usize,
    #[serde(default = "default_max_value_buckets")]
    pub max_value_buckets: usize,
    #[serde(default = "default_contacts_index")]
    pub contacts_index: String,
    #[serde(default = "default_companies_index")]
    pub companies_index: String,
}

fn default_registry_ttl_secs() -> u64 {
    60 * 60
}
fn default_value_cache_capacity() -> usize {
    1024
}
fn default_max_value_buckets() -> usize {
    10_000
}
fn default_contacts_index() -> String {
    "contacts".to_string()
}
fn default_companies_index() -> String {
    "companies".to_string()
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            registry_ttl_secs: default_registry_ttl_secs(),
            range_policy: RangePolicy::default(),
            value_cache: ValueCacheTtls::default(),
            value_cache_capacity: default_value_cache_capacity(),
            max_value_buckets: default_max_value_buckets(),
            contacts_index: default_contacts_index(),
            companies_index: default_companies_index(),
        }
    }
}

impl FilterSettings {
    pub fn registry_ttl(&self) -> Duration {
        Duration::from_secs(self.registry_ttl_secs)
    }

    pub fn index_for(&self, entity: EntityKind) -> &str {
        match entity {
            EntityKind::Contact => &self.contacts_index,
            EntityKind::Company => &self.companies_index,
        }
    }
}
