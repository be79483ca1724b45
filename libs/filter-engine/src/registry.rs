//! Filter registry snapshot and the sources it is loaded from.
//!
//! A `FilterRegistry` is built once from a list of definitions and never
//! mutated afterwards; refreshing the registry means building a new snapshot.

use crate::definition::{EntityKind, FilterDefinition};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Loads filter definitions from the registry's configuration source.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn load(&self) -> Result<Vec<FilterDefinition>>;

    /// Source name for debugging/logging
    fn source_name(&self) -> &'static str;
}

/// In-memory list of definitions.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    definitions: Vec<FilterDefinition>,
}

impl StaticSource {
    pub fn new(definitions: Vec<FilterDefinition>) -> Self {
        Self { definitions }
    }
}

#[async_trait]
impl RegistrySource for StaticSource {
    async fn load(&self) -> Result<Vec<FilterDefinition>> {
        Ok(self.definitions.clone())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// JSON file holding an array of definitions.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RegistrySource for JsonFileSource {
    async fn load(&self) -> Result<Vec<FilterDefinition>> {
        let raw = tokio::fs::read(&self.path).await?;
        let definitions: Vec<FilterDefinition> = serde_json::from_slice(&raw).map_err(|e| {
            Error::RegistrySource(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(definitions)
    }

    fn source_name(&self) -> &'static str {
        "json-file"
    }
}

/// Immutable, id-indexed set of active filter definitions in registry order.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    filters: Vec<FilterDefinition>,
    by_id: HashMap<String, usize>,
}

/// Filters of one group, for filter pickers.
#[derive(Debug, Clone, Serialize)]
pub struct FilterGroup {
    pub group: String,
    pub filters: Vec<FilterSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterSummary {
    pub id: String,
    pub label: String,
    pub searchable: bool,
    pub supports_exclusion: bool,
}

impl FilterRegistry {
    /// Build a snapshot. Inactive entries, entries that apply to no entity and
    /// repeated ids are skipped. Equal `sort_order` values keep source order.
    pub fn from_definitions(definitions: Vec<FilterDefinition>) -> Self {
        let mut filters: Vec<FilterDefinition> = Vec::with_capacity(definitions.len());
        let mut by_id = HashMap::new();

        for mut def in definitions {
            if !def.active {
                continue;
            }
            if let Err(e) = check_definition(&def) {
                tracing::warn!(filter = %def.id, error = %e, "Skipping filter definition");
                continue;
            }
            if by_id.contains_key(&def.id) {
                tracing::warn!(filter = %def.id, "Duplicate filter id in registry, keeping first");
                continue;
            }
            def.applies_to.dedup();
            by_id.insert(def.id.clone(), filters.len());
            filters.push(def);
        }

        filters.sort_by_key(|f| f.sort_order);
        for (idx, def) in filters.iter().enumerate() {
            by_id.insert(def.id.clone(), idx);
        }

        Self { filters, by_id }
    }

    pub fn get(&self, id: &str) -> Option<&FilterDefinition> {
        self.by_id.get(id).map(|&idx| &self.filters[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterDefinition> {
        self.filters.iter()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn applicable_to(&self, entity: EntityKind) -> impl Iterator<Item = &FilterDefinition> {
        self.filters.iter().filter(move |f| f.applies_to(entity))
    }

    /// Filters applicable to `entity`, grouped by `group` in first-seen order.
    pub fn grouped(&self, entity: EntityKind) -> Vec<FilterGroup> {
        let mut groups: Vec<FilterGroup> = Vec::new();
        for def in self.applicable_to(entity) {
            let summary = FilterSummary {
                id: def.id.clone(),
                label: def.label.clone(),
                searchable: def.search.enabled,
                supports_exclusion: def.supports_exclusion(),
            };
            match groups.iter_mut().find(|g| g.group == def.group) {
                Some(group) => group.filters.push(summary),
                None => groups.push(FilterGroup {
                    group: def.group.clone(),
                    filters: vec![summary],
                }),
            }
        }
        groups
    }
}

fn check_definition(def: &FilterDefinition) -> Result<()> {
    if def.id.trim().is_empty() {
        return Err(Error::InvalidDefinition {
            id: def.id.clone(),
            reason: "empty id".to_string(),
        });
    }
    if def.applies_to.is_empty() {
        return Err(Error::InvalidDefinition {
            id: def.id.clone(),
            reason: "applies_to must name at least one entity".to_string(),
        });
    }
    Ok(())
}
