//! Handler for free-entry filters matched directly against a stored field.
//!
//! Direct filters have no value listing; the caller types the value.

use super::{apply_presence, apply_range, resolve_field, ValuePage};
use crate::definition::{EntityKind, FilterDefinition};
use crate::value::NormalizedFilterValue;
use leadscope_query::{clause, QueryBuilder};

#[derive(Debug, Clone)]
pub struct DirectHandler<'a> {
    definition: &'a FilterDefinition,
}

impl<'a> DirectHandler<'a> {
    pub fn new(definition: &'a FilterDefinition) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &'a FilterDefinition {
        self.definition
    }

    pub fn apply(&self, query: &mut QueryBuilder, value: &NormalizedFilterValue, entity: EntityKind) {
        let Some(field) = resolve_field(self.definition, entity) else {
            return;
        };

        apply_presence(query, field, value.presence);
        apply_range(query, field, value);
        match value.include.as_slice() {
            [] => {}
            [single] => {
                query.filter(clause::term(field, single));
            }
            many => {
                query.filter(clause::terms(field, many));
            }
        }
        if !value.exclude.is_empty() {
            query.must_not(clause::terms(field, &value.exclude));
        }
    }

    pub fn get_values(&self, page: usize, per_page: usize) -> ValuePage {
        ValuePage::empty(page, per_page)
    }
}
