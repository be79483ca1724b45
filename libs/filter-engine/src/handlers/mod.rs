//! Filter handlers, one per value source.
//!
//! A handler translates a normalized filter value into query clauses
//! (`apply`), lists the selectable values of its filter (`get_values`) and
//! checks values submitted for storage (`validate_values`). The handler for a
//! definition is picked from its `ValueSource` by `FilterHandler::for_definition`.

mod direct;
mod predefined;
mod search_index;
mod specialized;

pub use direct::DirectHandler;
pub use predefined::PredefinedHandler;
pub use search_index::SearchIndexHandler;
pub use specialized::SpecializedHandler;

use crate::definition::{EntityKind, FilterDefinition, FilterMode, ValueSource};
use crate::settings::FilterSettings;
use crate::value::{NormalizedFilterValue, Presence};
use crate::Result;
use leadscope_query::{clause, QueryBuilder, SearchBackend};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::borrow::Cow;

/// A selectable filter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterValue {
    pub id: String,
    pub name: String,
}

/// One page of filter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePage {
    pub data: Vec<FilterValue>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub last_page: usize,
}

impl ValuePage {
    /// Slice `values` to one 1-based page. A zero `per_page` yields an empty page.
    pub fn paginate(values: Vec<FilterValue>, page: usize, per_page: usize) -> Self {
        let total = values.len();
        let page = page.max(1);
        let last_page = if per_page == 0 {
            1
        } else {
            total.div_ceil(per_page).max(1)
        };
        let data = values
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect();
        Self {
            data,
            total,
            page,
            per_page,
            last_page,
        }
    }

    pub fn empty(page: usize, per_page: usize) -> Self {
        Self::paginate(Vec::new(), page, per_page)
    }
}

/// Handler variants, selected by value source.
#[derive(Debug, Clone)]
pub enum FilterHandler<'a> {
    SearchIndex(SearchIndexHandler<'a>),
    Predefined(PredefinedHandler<'a>),
    Direct(DirectHandler<'a>),
    Specialized(SpecializedHandler<'a>),
}

impl<'a> FilterHandler<'a> {
    pub fn for_definition(definition: &'a FilterDefinition, settings: &'a FilterSettings) -> Self {
        match definition.value_source {
            ValueSource::Elasticsearch => {
                Self::SearchIndex(SearchIndexHandler::new(definition, settings))
            }
            ValueSource::Predefined => Self::Predefined(PredefinedHandler::new(definition)),
            ValueSource::Direct => Self::Direct(DirectHandler::new(definition)),
            ValueSource::Specialized => Self::Specialized(SpecializedHandler::new(definition)),
        }
    }

    pub fn definition(&self) -> &'a FilterDefinition {
        match self {
            Self::SearchIndex(h) => h.definition(),
            Self::Predefined(h) => h.definition(),
            Self::Direct(h) => h.definition(),
            Self::Specialized(h) => h.definition(),
        }
    }

    /// Emit the clauses for `value`. Range-mode filters only honour `range`
    /// and `presence`; their include/exclude lists are ignored.
    pub fn apply(&self, query: &mut QueryBuilder, value: &NormalizedFilterValue, entity: EntityKind) {
        let definition = self.definition();
        let value = if definition.mode() == FilterMode::Range
            && (!value.include.is_empty() || !value.exclude.is_empty())
        {
            tracing::debug!(
                filter = %definition.id,
                entity = %entity,
                "Ignoring include/exclude on a range-mode filter"
            );
            Cow::Owned(NormalizedFilterValue {
                include: Vec::new(),
                exclude: Vec::new(),
                ..value.clone()
            })
        } else {
            Cow::Borrowed(value)
        };
        self.dispatch(query, &value, entity);
    }

    fn dispatch(&self, query: &mut QueryBuilder, value: &NormalizedFilterValue, entity: EntityKind) {
        match self {
            Self::SearchIndex(h) => h.apply(query, value, entity),
            Self::Predefined(h) => h.apply(query, value, entity),
            Self::Direct(h) => h.apply(query, value, entity),
            Self::Specialized(h) => h.apply(query, value, entity),
        }
    }

    pub async fn get_values(
        &self,
        backend: &dyn SearchBackend,
        search: Option<&str>,
        page: usize,
        per_page: usize,
    ) -> Result<ValuePage> {
        match self {
            Self::SearchIndex(h) => h.get_values(backend, search, page, per_page).await,
            Self::Predefined(h) => Ok(h.get_values(search, page, per_page)),
            Self::Direct(h) => Ok(h.get_values(page, per_page)),
            Self::Specialized(h) => Ok(h.get_values(search, page, per_page)),
        }
    }

    pub fn validate_values(&self, values: &[JsonValue]) -> bool {
        match self {
            Self::SearchIndex(_) | Self::Direct(_) => values_are_well_formed(values),
            Self::Predefined(h) => h.validate_values(values),
            Self::Specialized(h) => h.validate_values(values),
        }
    }
}

/// Field names for `entity`: the entity's own mapping, else the target entity's
/// mapping, else the legacy single field. Empty when none is configured.
pub(crate) fn resolve_fields(definition: &FilterDefinition, entity: EntityKind) -> &[String] {
    let own = definition.fields_by_entity.for_entity(entity);
    if !own.is_empty() {
        return own;
    }
    if let Some(target) = definition.target_entity {
        let mapped = definition.fields_by_entity.for_entity(target);
        if !mapped.is_empty() {
            return mapped;
        }
    }
    match &definition.legacy_field {
        Some(field) if !field.is_empty() => std::slice::from_ref(field),
        _ => &[],
    }
}

pub(crate) fn resolve_field(definition: &FilterDefinition, entity: EntityKind) -> Option<&str> {
    resolve_fields(definition, entity)
        .first()
        .map(String::as_str)
        .filter(|f| !f.is_empty())
}

pub(crate) fn apply_presence(query: &mut QueryBuilder, field: &str, presence: Option<Presence>) {
    match presence {
        Some(Presence::Known) => {
            query.filter(clause::exists(field));
        }
        Some(Presence::Unknown) => {
            query.must_not(clause::exists(field));
        }
        Some(Presence::Any) | None => {}
    }
}

pub(crate) fn apply_range(query: &mut QueryBuilder, field: &str, value: &NormalizedFilterValue) {
    if let Some(range) = value.range.filter(|r| !r.is_unbounded()) {
        query.filter(clause::range(field, range.min, range.max));
    }
}

/// Case-insensitive substring match of `search` against option id or name.
pub(crate) fn search_options(
    options: impl Iterator<Item = FilterValue>,
    search: Option<&str>,
) -> Vec<FilterValue> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    match needle {
        None => options.collect(),
        Some(needle) => options
            .filter(|o| {
                o.name.to_lowercase().contains(&needle) || o.id.to_lowercase().contains(&needle)
            })
            .collect(),
    }
}

/// Every entry carries a non-null `value` that is numeric or a non-blank string.
pub(crate) fn values_are_well_formed(values: &[JsonValue]) -> bool {
    values.iter().all(|entry| match entry.get("value") {
        Some(JsonValue::Number(_)) => true,
        Some(JsonValue::String(s)) => !s.trim().is_empty(),
        _ => false,
    })
}

pub(crate) fn submitted_text(entry: &JsonValue) -> Option<String> {
    match entry.get("value")? {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
