//! Boolean query clause primitives.
//!
//! Each function renders one clause as a JSON object in the shape the search
//! engine expects. Clauses are placed into a query through `QueryBuilder`.

use serde_json::{json, Map, Value as JsonValue};

fn keyed(kind: &str, field: &str, body: JsonValue) -> JsonValue {
    let mut inner = Map::new();
    inner.insert(field.to_string(), body);
    let mut outer = Map::new();
    outer.insert(kind.to_string(), JsonValue::Object(inner));
    JsonValue::Object(outer)
}

/// Exact match of a single value.
pub fn term(field: &str, value: &str) -> JsonValue {
    keyed("term", field, JsonValue::String(value.to_string()))
}

/// Exact membership: the field matches any of `values`.
pub fn terms(field: &str, values: &[String]) -> JsonValue {
    keyed(
        "terms",
        field,
        JsonValue::Array(values.iter().cloned().map(JsonValue::String).collect()),
    )
}

/// Phrase match against a tokenized field.
pub fn match_phrase(field: &str, value: &str) -> JsonValue {
    keyed("match_phrase", field, JsonValue::String(value.to_string()))
}

/// Numeric range with only the provided bounds. Both bounds are inclusive.
pub fn range(field: &str, gte: Option<f64>, lte: Option<f64>) -> JsonValue {
    let mut bounds = Map::new();
    if let Some(min) = gte {
        bounds.insert("gte".to_string(), json!(min));
    }
    if let Some(max) = lte {
        bounds.insert("lte".to_string(), json!(max));
    }
    keyed("range", field, JsonValue::Object(bounds))
}

/// Field presence.
pub fn exists(field: &str) -> JsonValue {
    json!({ "exists": { "field": field } })
}

/// Prefix match; `case_insensitive` asks the engine to fold case.
pub fn prefix(field: &str, value: &str, case_insensitive: bool) -> JsonValue {
    if case_insensitive {
        keyed(
            "prefix",
            field,
            json!({ "value": value, "case_insensitive": true }),
        )
    } else {
        keyed("prefix", field, JsonValue::String(value.to_string()))
    }
}

/// Disjunction: at least `minimum_should_match` of `clauses` must match.
pub fn bool_should(clauses: Vec<JsonValue>, minimum_should_match: u32) -> JsonValue {
    json!({
        "bool": {
            "should": clauses,
            "minimum_should_match": minimum_should_match
        }
    })
}

/// Conjunction of non-scoring clauses.
pub fn bool_filter(clauses: Vec<JsonValue>) -> JsonValue {
    json!({ "bool": { "filter": clauses } })
}
