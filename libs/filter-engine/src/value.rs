//! Canonical filter values and the raw-value normalizer.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Known,
    Unknown,
    Any,
}

impl Presence {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "known" => Some(Self::Known),
            "unknown" => Some(Self::Unknown),
            "any" => Some(Self::Any),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeBound {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeBound {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Filter value in canonical form, as handed to handlers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedFilterValue {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub range: Option<RangeBound>,
    pub presence: Option<Presence>,
    pub operator: Option<Operator>,
}

impl NormalizedFilterValue {
    pub fn operator(&self) -> Operator {
        self.operator.unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
            && self.exclude.is_empty()
            && self.range.map_or(true, |r| r.is_unbounded())
            && matches!(self.presence, None | Some(Presence::Any))
    }
}

/// Coerce a raw DSL value into its canonical record.
///
/// Scalars become a single include. Objects contribute `include`/`exclude`
/// (string and numeric entries only), `range` (`min`/`max`, with `gte`/`lte`
/// as fallbacks), `presence` and `operator`; anything unrecognised is dropped.
pub fn normalize_filter_value(raw: &JsonValue) -> NormalizedFilterValue {
    match raw {
        JsonValue::Object(map) => NormalizedFilterValue {
            include: value_list(map.get("include")),
            exclude: value_list(map.get("exclude")),
            range: map.get("range").and_then(range_bound),
            presence: map
                .get("presence")
                .and_then(JsonValue::as_str)
                .and_then(Presence::parse),
            operator: match map.get("operator").and_then(JsonValue::as_str) {
                Some("and") => Some(Operator::And),
                Some("or") => Some(Operator::Or),
                _ => None,
            },
        },
        other => NormalizedFilterValue {
            include: scalar_text(other).into_iter().collect(),
            ..Default::default()
        },
    }
}

/// Text form of a string, number or boolean; `None` for anything else.
pub(crate) fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_list(raw: Option<&JsonValue>) -> Vec<String> {
    let Some(JsonValue::Array(items)) = raw else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let text = match item {
            JsonValue::String(s) => s.clone(),
            JsonValue::Number(n) => n.to_string(),
            _ => continue,
        };
        if !out.contains(&text) {
            out.push(text);
        }
    }
    out
}

fn range_bound(raw: &JsonValue) -> Option<RangeBound> {
    let map = raw.as_object()?;
    let pick = |primary: &str, fallback: &str| {
        map.get(primary)
            .and_then(as_float)
            .or_else(|| map.get(fallback).and_then(as_float))
    };
    Some(RangeBound {
        min: pick("min", "gte"),
        max: pick("max", "lte"),
    })
}

fn as_float(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
