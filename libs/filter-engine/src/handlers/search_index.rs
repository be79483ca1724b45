//! Handler for filters whose values live in the search index.
//!
//! Clause shapes depend on the field type:
//! - keyword: one `terms` clause for all includes, one negative `terms` for all excludes
//! - text: `match_phrase` per value; includes are ANDed unless the operator is `or`,
//!   in which case they go into a single `bool.should` with `minimum_should_match = 1`

use super::{apply_presence, apply_range, resolve_field, FilterValue, ValuePage};
use crate::definition::{EntityKind, FieldType, FilterDefinition};
use crate::settings::FilterSettings;
use crate::value::{NormalizedFilterValue, Operator};
use crate::Result;
use leadscope_query::{
    clause, AggregationOrder, MultiMatchOptions, QueryBuilder, SearchBackend,
    TermsAggregationOptions,
};

const VALUES_AGGREGATION: &str = "values";

#[derive(Debug, Clone)]
pub struct SearchIndexHandler<'a> {
    definition: &'a FilterDefinition,
    settings: &'a FilterSettings,
}

impl<'a> SearchIndexHandler<'a> {
    pub fn new(definition: &'a FilterDefinition, settings: &'a FilterSettings) -> Self {
        Self {
            definition,
            settings,
        }
    }

    pub fn definition(&self) -> &'a FilterDefinition {
        self.definition
    }

    fn is_text(&self) -> bool {
        self.definition.field_type == FieldType::Text
    }

    pub fn apply(&self, query: &mut QueryBuilder, value: &NormalizedFilterValue, entity: EntityKind) {
        let Some(field) = resolve_field(self.definition, entity) else {
            tracing::debug!(
                filter = %self.definition.id,
                entity = %entity,
                "No field mapping for entity, skipping filter"
            );
            return;
        };

        apply_presence(query, field, value.presence);
        apply_range(query, field, value);

        if !value.include.is_empty() {
            if !self.is_text() {
                query.filter(clause::terms(field, &value.include));
            } else if value.operator() == Operator::Or {
                let phrases = value
                    .include
                    .iter()
                    .map(|v| clause::match_phrase(field, v))
                    .collect();
                query.filter(clause::bool_should(phrases, 1));
            } else {
                for v in &value.include {
                    query.filter(clause::match_phrase(field, v));
                }
            }
        }

        if !value.exclude.is_empty() {
            if self.is_text() {
                for v in &value.exclude {
                    query.must_not(clause::match_phrase(field, v));
                }
            } else {
                query.must_not(clause::terms(field, &value.exclude));
            }
        }
    }

    /// Distinct values of the field, optionally narrowed by `search`, sorted by key.
    pub async fn get_values(
        &self,
        backend: &dyn SearchBackend,
        search: Option<&str>,
        page: usize,
        per_page: usize,
    ) -> Result<ValuePage> {
        let entity = self.definition.default_entity();
        let Some(field) = resolve_field(self.definition, entity) else {
            return Ok(ValuePage::empty(page, per_page));
        };

        let mut query = QueryBuilder::new(self.settings.index_for(entity));

        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            if self.definition.field_type == FieldType::Keyword {
                query.filter(clause::bool_should(
                    vec![
                        clause::prefix(field, search, false),
                        clause::prefix(field, search, true),
                    ],
                    1,
                ));
            } else {
                let suggest = &self.definition.search.suggest_fields;
                let fields = if suggest.is_empty() {
                    vec![field.to_string()]
                } else {
                    suggest.clone()
                };
                query.multi_match(
                    search,
                    &fields,
                    MultiMatchOptions {
                        operator: Some("and".to_string()),
                        minimum_should_match: Some("70%".to_string()),
                        match_type: None,
                    },
                );
            }
        }

        query.terms_aggregation(
            VALUES_AGGREGATION,
            &self.aggregation_field(field),
            TermsAggregationOptions {
                size: Some(self.settings.max_value_buckets),
                order: Some(AggregationOrder::KeyAsc),
            },
        );

        let result = query.paginate(backend, 1, 0).await?;
        let values = result
            .buckets(VALUES_AGGREGATION)
            .into_iter()
            .map(|bucket| FilterValue {
                id: bucket.key.clone(),
                name: bucket.key,
            })
            .collect();

        Ok(ValuePage::paginate(values, page, per_page))
    }

    fn aggregation_field(&self, field: &str) -> String {
        if self.definition.field_type == FieldType::Keyword || field.ends_with(".keyword") {
            field.to_string()
        } else {
            format!("{}.keyword", field)
        }
    }
}
