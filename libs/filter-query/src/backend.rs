//! Search backend port and response types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::Result;

/// Executes query documents against a search index.
///
/// The concrete client lives outside this crate; implementations translate
/// transport failures into [`crate::Error::Backend`].
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run `body` against `index` and return the raw engine response.
    async fn search(&self, index: &str, body: &JsonValue) -> Result<SearchResponse>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}

/// Search engine response (subset of fields the builder reads).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Hits,
    #[serde(default)]
    pub aggregations: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: TotalHits,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TotalHits {
    pub value: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_source", default)]
    pub source: JsonValue,
}

impl SearchResponse {
    /// Parse a raw JSON response body.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// One page of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub data: Vec<JsonValue>,
    pub aggregations: Map<String, JsonValue>,
    pub total: u64,
    pub last_page: usize,
}

/// A distinct value bucket from a terms aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationBucket {
    pub key: String,
    pub doc_count: u64,
}

impl Page {
    pub(crate) fn from_response(response: SearchResponse, per_page: usize) -> Self {
        let total = response.hits.total.value;
        let last_page = if per_page == 0 {
            1
        } else {
            (total as usize).div_ceil(per_page).max(1)
        };
        Self {
            data: response.hits.hits.into_iter().map(|h| h.source).collect(),
            aggregations: response.aggregations,
            total,
            last_page,
        }
    }

    /// Buckets of the named terms aggregation, in response order.
    ///
    /// Numeric and boolean keys are rendered as strings; buckets without a key are skipped.
    pub fn buckets(&self, name: &str) -> Vec<AggregationBucket> {
        let Some(buckets) = self
            .aggregations
            .get(name)
            .and_then(|agg| agg.get("buckets"))
            .and_then(JsonValue::as_array)
        else {
            return Vec::new();
        };

        buckets
            .iter()
            .filter_map(|bucket| {
                let key = match bucket.get("key")? {
                    JsonValue::String(s) => s.clone(),
                    JsonValue::Number(n) => n.to_string(),
                    JsonValue::Bool(b) => b.to_string(),
                    _ => return None,
                };
                let doc_count = bucket
                    .get("doc_count")
                    .and_then(JsonValue::as_u64)
                    .unwrap_or(0);
                Some(AggregationBucket { key, doc_count })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_computes_last_page() {
        let response = SearchResponse::from_value(json!({
            "hits": { "total": { "value": 41 }, "hits": [] }
        }))
        .unwrap();
        assert_eq!(Page::from_response(response.clone(), 20).last_page, 3);
        assert_eq!(Page::from_response(response, 0).last_page, 1);
    }

    #[test]
    fn buckets_stringify_keys() {
        let response = SearchResponse::from_value(json!({
            "hits": { "total": { "value": 0 }, "hits": [] },
            "aggregations": {
                "values": { "buckets": [
                    { "key": "Software", "doc_count": 12 },
                    { "key": 50, "doc_count": 3 },
                    { "doc_count": 1 }
                ] }
            }
        }))
        .unwrap();
        let page = Page::from_response(response, 0);
        let buckets = page.buckets("values");
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].key, "Software");
        assert_eq!(buckets[1].key, "50");
        assert!(page.buckets("missing").is_empty());
    }
}
