//! Handler for hierarchical filters.
//!
//! Values are paths such as `"Technology > Software > Security"`. Each segment
//! matches the field at the same depth in the definition's field list, so a
//! path compiles to a conjunction of `term` clauses. Several included paths are
//! alternatives; each excluded path is negated on its own.

use super::{
    apply_presence, apply_range, resolve_fields, search_options, submitted_text,
    values_are_well_formed, FilterValue, ValuePage,
};
use crate::definition::{EntityKind, FilterDefinition};
use crate::value::NormalizedFilterValue;
use leadscope_query::{clause, QueryBuilder};
use serde_json::Value as JsonValue;

const PATH_SEPARATOR: char = '>';

#[derive(Debug, Clone)]
pub struct SpecializedHandler<'a> {
    definition: &'a FilterDefinition,
}

impl<'a> SpecializedHandler<'a> {
    pub fn new(definition: &'a FilterDefinition) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &'a FilterDefinition {
        self.definition
    }

    pub fn apply(&self, query: &mut QueryBuilder, value: &NormalizedFilterValue, entity: EntityKind) {
        let fields = resolve_fields(self.definition, entity);
        let Some(first) = fields.first().filter(|f| !f.is_empty()) else {
            return;
        };

        apply_presence(query, first, value.presence);
        apply_range(query, first, value);

        let mut included: Vec<JsonValue> = value
            .include
            .iter()
            .filter_map(|path| path_clause(fields, path))
            .collect();
        match included.len() {
            0 => {}
            1 => {
                query.filter(included.remove(0));
            }
            _ => {
                query.filter(clause::bool_should(included, 1));
            }
        }

        for path in &value.exclude {
            if let Some(negated) = path_clause(fields, path) {
                query.must_not(negated);
            }
        }
    }

    pub fn get_values(&self, search: Option<&str>, page: usize, per_page: usize) -> ValuePage {
        let options = self.definition.options.iter().map(|o| FilterValue {
            id: o.id.clone(),
            name: o.name.clone(),
        });
        ValuePage::paginate(search_options(options, search), page, per_page)
    }

    /// Well-formed, and no path is deeper than the configured hierarchy.
    pub fn validate_values(&self, values: &[JsonValue]) -> bool {
        let depth = self.max_depth();
        values_are_well_formed(values)
            && values.iter().all(|entry| {
                submitted_text(entry).is_some_and(|path| {
                    let segments = split_path(&path);
                    !segments.is_empty() && segments.len() <= depth
                })
            })
    }

    fn max_depth(&self) -> usize {
        EntityKind::ALL
            .iter()
            .map(|entity| resolve_fields(self.definition, *entity).len())
            .max()
            .unwrap_or(0)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split(PATH_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// `term` for a one-segment path, `bool.filter` of terms for deeper ones.
/// Segments beyond the configured fields are ignored.
fn path_clause(fields: &[String], path: &str) -> Option<JsonValue> {
    let mut terms: Vec<JsonValue> = fields
        .iter()
        .zip(split_path(path))
        .map(|(field, segment)| clause::term(field, segment))
        .collect();
    match terms.len() {
        0 => None,
        1 => Some(terms.remove(0)),
        _ => Some(clause::bool_filter(terms)),
    }
}
