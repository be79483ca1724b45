//! Handler for filters with a fixed list of options published in the registry.

use super::{
    apply_presence, apply_range, resolve_field, search_options, submitted_text,
    values_are_well_formed, FilterValue, ValuePage,
};
use crate::definition::{EntityKind, FilterDefinition};
use crate::value::NormalizedFilterValue;
use leadscope_query::{clause, QueryBuilder};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone)]
pub struct PredefinedHandler<'a> {
    definition: &'a FilterDefinition,
}

impl<'a> PredefinedHandler<'a> {
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
        if !value.include.is_empty() {
            query.filter(clause::terms(field, &value.include));
        }
        if !value.exclude.is_empty() {
            query.must_not(clause::terms(field, &value.exclude));
        }
    }

    pub fn get_values(&self, search: Option<&str>, page: usize, per_page: usize) -> ValuePage {
        let options = self.definition.options.iter().map(|o| FilterValue {
            id: o.id.clone(),
            name: o.name.clone(),
        });
        ValuePage::paginate(search_options(options, search), page, per_page)
    }

    /// Well-formed, and each value is one of the published option ids.
    pub fn validate_values(&self, values: &[JsonValue]) -> bool {
        values_are_well_formed(values)
            && values.iter().all(|entry| {
                submitted_text(entry)
                    .is_some_and(|v| self.definition.options.iter().any(|o| o.id == v))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seniority() -> FilterDefinition {
        serde_json::from_value(json!({
            "id": "seniority",
            "applies_to": ["contact"],
            "data_source": "predefined",
            "type": "keyword",
            "fields": { "contact": ["seniority"] },
            "filtering": { "supports_exclusion": true },
            "options": [
                { "id": "c_suite", "name": "C-Suite" },
                { "id": "vp", "name": "Vice President" },
                { "id": "director", "name": "Director" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn apply_emits_terms_for_include_and_exclude() {
        let def = seniority();
        let mut query = QueryBuilder::new("contacts");
        let value = NormalizedFilterValue {
            include: vec!["vp".to_string()],
            exclude: vec!["director".to_string()],
            ..Default::default()
        };
        PredefinedHandler::new(&def).apply(&mut query, &value, EntityKind::Contact);

        assert_eq!(query.filter_clauses(), [json!({ "terms": { "seniority": ["vp"] } })]);
        assert_eq!(
            query.must_not_clauses(),
            [json!({ "terms": { "seniority": ["director"] } })]
        );
    }

    #[test]
    fn get_values_searches_names_case_insensitively() {
        let def = seniority();
        let handler = PredefinedHandler::new(&def);

        let page = handler.get_values(Some("VICE"), 1, 10);
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].id, "vp");

        let all = handler.get_values(None, 1, 2);
        assert_eq!(all.total, 3);
        assert_eq!(all.data.len(), 2);
        assert_eq!(all.last_page, 2);
    }

    #[test]
    fn validate_values_requires_known_option() {
        let def = seniority();
        let handler = PredefinedHandler::new(&def);
        assert!(handler.validate_values(&[json!({ "value": "vp" })]));
        assert!(!handler.validate_values(&[json!({ "value": "intern" })]));
    }
}
