//! Filter manager
//!
//! Orchestrates filter application and value listing:
//! - Holds the registry snapshot and refreshes it from its source on a TTL
//! - Applies filters to a `QueryBuilder` in priority order through their handlers
//! - Serves value listings through the read-through value cache

use crate::cache::{value_cache_key, value_cache_prefix, ValueCache, ValueCacheStore};
use crate::clock::{expiry, Clock};
use crate::definition::{EntityKind, FieldType, FilterDefinition};
use crate::dsl::Dsl;
use crate::handlers::{FilterHandler, ValuePage};
use crate::registry::{FilterRegistry, RegistrySource};
use crate::settings::FilterSettings;
use crate::validator::{canonical_filter_id, DslValidator};
use crate::value::normalize_filter_value;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use leadscope_query::{QueryBuilder, SearchBackend};
use serde_json::{Map, Value as JsonValue};
use std::sync::{Arc, RwLock};

/// Priority of filters without a resolvable definition; applied last.
const FALLBACK_PRIORITY: u8 = 10;

/// Apply-order bucket of a field type. Lower runs first.
pub fn apply_priority(field_type: FieldType) -> u8 {
    match field_type {
        FieldType::Boolean => 1,
        FieldType::Range | FieldType::Date => 2,
        FieldType::Keyword => 3,
        FieldType::Text | FieldType::Direct => 4,
    }
}

#[derive(Debug)]
struct Snapshot {
    registry: Arc<FilterRegistry>,
    loaded_at: DateTime<Utc>,
}

pub struct FilterManager {
    source: Arc<dyn RegistrySource>,
    backend: Arc<dyn SearchBackend>,
    cache: ValueCache,
    settings: FilterSettings,
    clock: Arc<dyn Clock>,
    snapshot: RwLock<Snapshot>,
}

impl FilterManager {
    /// Load the registry from `source` and build a manager around it.
    pub async fn load(
        source: Arc<dyn RegistrySource>,
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn ValueCacheStore>,
        settings: FilterSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let registry = Self::load_registry(source.as_ref()).await?;
        let loaded_at = clock.now();

        tracing::info!(
            source = source.source_name(),
            backend = backend.backend_name(),
            cache = store.backend_name(),
            filters = registry.len(),
            "Filter manager initialized"
        );

        Ok(Self {
            source,
            backend,
            cache: ValueCache::new(store),
            settings,
            clock,
            snapshot: RwLock::new(Snapshot {
                registry: Arc::new(registry),
                loaded_at,
            }),
        })
    }

    async fn load_registry(source: &dyn RegistrySource) -> Result<FilterRegistry> {
        let definitions = source.load().await?;
        Ok(FilterRegistry::from_definitions(definitions))
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Current registry snapshot. Never blocks on a reload.
    pub fn registry(&self) -> Arc<FilterRegistry> {
        let snapshot = self.snapshot.read().unwrap_or_else(|e| e.into_inner());
        snapshot.registry.clone()
    }

    fn is_stale(&self) -> bool {
        let snapshot = self.snapshot.read().unwrap_or_else(|e| e.into_inner());
        expiry(snapshot.loaded_at, self.settings.registry_ttl()) <= self.clock.now()
    }

    /// Reload the registry from its source, replacing the snapshot.
    pub async fn refresh(&self) -> Result<Arc<FilterRegistry>> {
        let registry = Arc::new(Self::load_registry(self.source.as_ref()).await?);
        let loaded_at = self.clock.now();
        {
            let mut snapshot = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
            snapshot.registry = registry.clone();
            snapshot.loaded_at = loaded_at;
        }
        tracing::debug!(
            source = self.source.source_name(),
            filters = registry.len(),
            "Filter registry refreshed"
        );
        Ok(registry)
    }

    /// Active filters in registry order, refreshing the snapshot when it is
    /// older than the registry TTL. A failed refresh keeps the old snapshot.
    pub async fn active_filters(&self) -> Vec<FilterDefinition> {
        let registry = if self.is_stale() {
            match self.refresh().await {
                Ok(registry) => registry,
                Err(e) => {
                    tracing::error!(
                        source = self.source.source_name(),
                        error = %e,
                        "Filter registry refresh failed, serving previous snapshot"
                    );
                    self.registry()
                }
            }
        } else {
            self.registry()
        };
        registry.iter().cloned().collect()
    }

    pub fn get_filter(&self, id: &str) -> Option<FilterDefinition> {
        self.registry().get(canonical_filter_id(id)).cloned()
    }

    /// Validator bound to the current snapshot and the configured range policy.
    pub fn validator(&self) -> DslValidator {
        DslValidator::new(self.registry()).with_range_policy(self.settings.range_policy)
    }

    /// Filter ids of `filters` in apply order. The sort is stable, so filters
    /// of equal priority keep their submitted order.
    pub fn apply_order<'f>(&self, filters: &'f Map<String, JsonValue>) -> Vec<&'f str> {
        let registry = self.registry();
        let mut ids: Vec<(u8, &str)> = filters
            .keys()
            .map(|id| {
                let priority = registry
                    .get(canonical_filter_id(id))
                    .map_or(FALLBACK_PRIORITY, |def| apply_priority(def.field_type));
                (priority, id.as_str())
            })
            .collect();
        ids.sort_by_key(|(priority, _)| *priority);
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Apply one bucket of filters under `entity`. Unknown ids are logged and
    /// skipped. Returns how many filters reached a handler.
    pub fn apply_filters(
        &self,
        query: &mut QueryBuilder,
        filters: &Map<String, JsonValue>,
        entity: EntityKind,
    ) -> usize {
        let registry = self.registry();
        let mut applied = 0;

        for id in self.apply_order(filters) {
            let Some(def) = registry.get(canonical_filter_id(id)) else {
                tracing::warn!(filter = id, entity = %entity, "Unknown filter, skipping");
                continue;
            };
            let Some(raw) = filters.get(id) else {
                continue;
            };

            let mut value = normalize_filter_value(raw);
            if !value.exclude.is_empty() && !def.supports_exclusion() {
                tracing::warn!(
                    filter = %def.id,
                    entity = %entity,
                    kind = "exclusion_unsupported",
                    dropped = value.exclude.len(),
                    "Exclusion not supported, dropping excluded values"
                );
                value.exclude.clear();
            }

            FilterHandler::for_definition(def, &self.settings).apply(query, &value, entity);
            applied += 1;
        }

        tracing::debug!(entity = %entity, submitted = filters.len(), applied, "Filters applied");
        applied
    }

    /// Apply the contact bucket under the contact context, then the company
    /// bucket under the company context.
    pub fn apply_dsl(&self, query: &mut QueryBuilder, dsl: &Dsl) -> usize {
        EntityKind::ALL
            .iter()
            .map(|&entity| self.apply_filters(query, dsl.bucket(entity), entity))
            .sum()
    }

    /// One page of selectable values of a filter.
    ///
    /// Listings with a search term always go to the handler; the rest are
    /// read through the value cache with the TTL of the filter's value source.
    pub async fn get_filter_values(
        &self,
        filter_id: &str,
        search: Option<&str>,
        page: usize,
        per_page: usize,
    ) -> Result<ValuePage> {
        let registry = self.registry();
        let def = registry
            .get(canonical_filter_id(filter_id))
            .ok_or_else(|| Error::FilterNotFound(filter_id.to_string()))?;
        let handler = FilterHandler::for_definition(def, &self.settings);
        let backend = self.backend.as_ref();

        let search = search.map(str::trim).filter(|s| !s.is_empty());
        if search.is_some() {
            return handler.get_values(backend, search, page, per_page).await;
        }

        let ttl = self.settings.value_cache.for_source(def.value_source);
        let key = value_cache_key(&def.id, page, per_page);
        self.cache
            .remember(&key, ttl, || handler.get_values(backend, None, page, per_page))
            .await
    }

    /// Drop every cached value page of a filter.
    pub async fn invalidate_values(&self, filter_id: &str) -> Result<u64> {
        let id = canonical_filter_id(filter_id);
        self.cache.invalidate_prefix(&value_cache_prefix(id)).await
    }
}

impl std::fmt::Debug for FilterManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterManager")
            .field("source", &self.source.source_name())
            .field("backend", &self.backend.backend_name())
            .field("cache", &self.cache)
            .field("filters", &self.registry().len())
            .finish()
    }
}
