//! Query builder for filtered index searches.
//!
//! Clauses are grouped into the three boolean buckets of the engine's `bool`
//! query:
//! - `filter`: required, non-scoring
//! - `must`: required, scoring (free-text matching)
//! - `must_not`: excluded
//!
//! Insertion order is kept so the rendered document is reproducible.

use serde_json::{json, Map, Value as JsonValue};

use crate::backend::{Page, SearchBackend};
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct MultiMatchOptions {
    pub operator: Option<String>,
    pub minimum_should_match: Option<String>,
    pub match_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationOrder {
    KeyAsc,
    KeyDesc,
    CountDesc,
}

#[derive(Debug, Clone, Default)]
pub struct TermsAggregationOptions {
    pub size: Option<usize>,
    pub order: Option<AggregationOrder>,
}

/// Accumulates clauses and aggregations for one index.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    index: String,
    filter: Vec<JsonValue>,
    must: Vec<JsonValue>,
    must_not: Vec<JsonValue>,
    aggregations: Map<String, JsonValue>,
}

impl QueryBuilder {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            filter: Vec::new(),
            must: Vec::new(),
            must_not: Vec::new(),
            aggregations: Map::new(),
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn filter(&mut self, clause: JsonValue) -> &mut Self {
        self.filter.push(clause);
        self
    }

    pub fn must(&mut self, clause: JsonValue) -> &mut Self {
        self.must.push(clause);
        self
    }

    pub fn must_not(&mut self, clause: JsonValue) -> &mut Self {
        self.must_not.push(clause);
        self
    }

    /// Free-text match of `query` across `fields` (placed under `must`).
    pub fn multi_match(
        &mut self,
        query: &str,
        fields: &[String],
        options: MultiMatchOptions,
    ) -> &mut Self {
        let mut body = Map::new();
        body.insert("query".to_string(), json!(query));
        body.insert("fields".to_string(), json!(fields));
        if let Some(operator) = options.operator {
            body.insert("operator".to_string(), json!(operator));
        }
        if let Some(msm) = options.minimum_should_match {
            body.insert("minimum_should_match".to_string(), json!(msm));
        }
        if let Some(match_type) = options.match_type {
            body.insert("type".to_string(), json!(match_type));
        }
        self.must.push(json!({ "multi_match": body }));
        self
    }

    /// Request the distinct values of `field` under the aggregation `name`.
    pub fn terms_aggregation(
        &mut self,
        name: &str,
        field: &str,
        options: TermsAggregationOptions,
    ) -> &mut Self {
        let mut terms = Map::new();
        terms.insert("field".to_string(), json!(field));
        if let Some(size) = options.size {
            terms.insert("size".to_string(), json!(size));
        }
        if let Some(order) = options.order {
            let order = match order {
                AggregationOrder::KeyAsc => json!({ "_key": "asc" }),
                AggregationOrder::KeyDesc => json!({ "_key": "desc" }),
                AggregationOrder::CountDesc => json!({ "_count": "desc" }),
            };
            terms.insert("order".to_string(), order);
        }
        self.aggregations
            .insert(name.to_string(), json!({ "terms": terms }));
        self
    }

    pub fn filter_clauses(&self) -> &[JsonValue] {
        &self.filter
    }

    pub fn must_clauses(&self) -> &[JsonValue] {
        &self.must
    }

    pub fn must_not_clauses(&self) -> &[JsonValue] {
        &self.must_not
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_empty() && self.must.is_empty() && self.must_not.is_empty()
    }

    /// Render the query document (without paging).
    pub fn to_document(&self) -> JsonValue {
        let query = if self.is_empty() {
            json!({ "match_all": {} })
        } else {
            let mut bool_query = Map::new();
            if !self.filter.is_empty() {
                bool_query.insert("filter".to_string(), json!(self.filter));
            }
            if !self.must.is_empty() {
                bool_query.insert("must".to_string(), json!(self.must));
            }
            if !self.must_not.is_empty() {
                bool_query.insert("must_not".to_string(), json!(self.must_not));
            }
            json!({ "bool": bool_query })
        };

        let mut document = Map::new();
        document.insert("query".to_string(), query);
        if !self.aggregations.is_empty() {
            document.insert(
                "aggs".to_string(),
                JsonValue::Object(self.aggregations.clone()),
            );
        }
        JsonValue::Object(document)
    }

    /// Render the document for one page. Pages are 1-based; page 0 is treated as 1.
    pub fn to_page_document(&self, page: usize, per_page: usize) -> JsonValue {
        let mut document = self.to_document();
        let from = page.max(1).saturating_sub(1).saturating_mul(per_page);
        if let JsonValue::Object(map) = &mut document {
            map.insert("from".to_string(), json!(from));
            map.insert("size".to_string(), json!(per_page));
            map.insert("track_total_hits".to_string(), json!(true));
        }
        document
    }

    /// Execute the query against `backend` and return one page of hits.
    pub async fn paginate(
        &self,
        backend: &dyn SearchBackend,
        page: usize,
        per_page: usize,
    ) -> Result<Page> {
        let body = self.to_page_document(page, per_page);
        tracing::debug!(
            index = %self.index,
            backend = backend.backend_name(),
            page,
            per_page,
            "Executing search"
        );
        let response = backend.search(&self.index, &body).await?;
        Ok(Page::from_response(response, per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SearchResponse;
    use crate::clause;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingBackend {
        response: JsonValue,
        seen: Mutex<Vec<(String, JsonValue)>>,
    }

    #[async_trait]
    impl SearchBackend for RecordingBackend {
        async fn search(&self, index: &str, body: &JsonValue) -> Result<SearchResponse> {
            self.seen
                .lock()
                .unwrap()
                .push((index.to_string(), body.clone()));
            SearchResponse::from_value(self.response.clone())
        }

        fn backend_name(&self) -> &'static str {
            "recording"
        }
    }

    #[test]
    fn empty_builder_renders_match_all() {
        let query = QueryBuilder::new("contacts");
        assert_eq!(query.to_document(), json!({ "query": { "match_all": {} } }));
    }

    #[test]
    fn clauses_land_in_their_buckets_in_order() {
        let mut query = QueryBuilder::new("contacts");
        query
            .filter(clause::exists("email"))
            .filter(clause::terms("seniority", &["vp".to_string()]))
            .must_not(clause::terms("seniority", &["intern".to_string()]));

        let doc = query.to_document();
        assert_eq!(doc["query"]["bool"]["filter"][0], clause::exists("email"));
        assert_eq!(
            doc["query"]["bool"]["filter"][1],
            json!({ "terms": { "seniority": ["vp"] } })
        );
        assert_eq!(
            doc["query"]["bool"]["must_not"][0],
            json!({ "terms": { "seniority": ["intern"] } })
        );
        assert!(doc["query"]["bool"].get("must").is_none());
    }

    #[test]
    fn multi_match_and_aggregation_render_options() {
        let mut query = QueryBuilder::new("companies");
        query
            .multi_match(
                "acme",
                &["name".to_string(), "domain".to_string()],
                MultiMatchOptions {
                    operator: Some("and".to_string()),
                    minimum_should_match: Some("70%".to_string()),
                    match_type: None,
                },
            )
            .terms_aggregation(
                "values",
                "industry.keyword",
                TermsAggregationOptions {
                    size: Some(10_000),
                    order: Some(AggregationOrder::KeyAsc),
                },
            );

        let doc = query.to_document();
        assert_eq!(
            doc["query"]["bool"]["must"][0]["multi_match"]["minimum_should_match"],
            json!("70%")
        );
        assert_eq!(
            doc["aggs"]["values"],
            json!({ "terms": { "field": "industry.keyword", "size": 10000, "order": { "_key": "asc" } } })
        );
    }

    #[tokio::test]
    async fn paginate_sends_paging_and_collects_sources() {
        let backend = RecordingBackend {
            response: json!({
                "hits": { "total": { "value": 3 }, "hits": [
                    { "_id": "1", "_source": { "name": "Ada" } }
                ] }
            }),
            seen: Mutex::new(Vec::new()),
        };
        let query = QueryBuilder::new("contacts");
        let page = query.paginate(&backend, 2, 2).await.unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.last_page, 2);
        assert_eq!(page.data, vec![json!({ "name": "Ada" })]);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].0, "contacts");
        assert_eq!(seen[0].1["from"], json!(2));
        assert_eq!(seen[0].1["size"], json!(2));
    }
}
