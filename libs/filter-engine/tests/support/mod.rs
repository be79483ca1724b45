#![allow(dead_code)]

use async_trait::async_trait;
use leadscope_filters::{
    FilterDefinition, FilterManager, FilterRegistry, FilterSettings, LruValueStore, ManualClock,
    StaticSource,
};
use leadscope_query::{SearchBackend, SearchResponse};
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Registry covering every value source, field type and filter mode.
pub fn definitions() -> Vec<FilterDefinition> {
    let raw = json!([
        {
            "id": "job_title",
            "label": "Job Title",
            "group": "role",
            "applies_to": ["contact"],
            "data_source": "elasticsearch",
            "type": "keyword",
            "fields": { "contact": ["job_title.keyword"] },
            "search": { "enabled": true, "suggest_fields": ["job_title"] },
            "filtering": { "supports_exclusion": true },
            "sort_order": 1
        },
        {
            "id": "seniority",
            "label": "Seniority",
            "group": "role",
            "applies_to": ["contact"],
            "data_source": "predefined",
            "type": "keyword",
            "fields": { "contact": ["seniority"] },
            "filtering": { "supports_exclusion": true },
            "options": [
                { "id": "c_suite", "name": "C-Suite" },
                { "id": "vp", "name": "Vice President" },
                { "id": "director", "name": "Director" },
                { "id": "manager", "name": "Manager" }
            ],
            "sort_order": 2
        },
        {
            "id": "bio",
            "label": "Bio",
            "group": "role",
            "applies_to": ["contact"],
            "data_source": "elasticsearch",
            "type": "text",
            "fields": { "contact": ["bio"] },
            "search": { "enabled": true, "suggest_fields": ["bio", "headline"] },
            "filtering": { "supports_exclusion": true },
            "sort_order": 3
        },
        {
            "id": "years_experience",
            "label": "Years of Experience",
            "group": "role",
            "applies_to": ["contact"],
            "data_source": "elasticsearch",
            "type": "range",
            "fields": { "contact": ["years_experience"] },
            "filtering": { "mode": "range" },
            "sort_order": 4
        },
        {
            "id": "has_email",
            "label": "Has Email",
            "group": "contact_info",
            "applies_to": ["contact"],
            "data_source": "direct",
            "type": "boolean",
            "fields": { "contact": ["email"] },
            "filtering": { "mode": "exists" },
            "sort_order": 5
        },
        {
            "id": "is_verified",
            "label": "Verified",
            "group": "contact_info",
            "applies_to": ["contact"],
            "data_source": "direct",
            "type": "boolean",
            "fields": { "contact": ["verified"] },
            "sort_order": 6
        },
        {
            "id": "industry",
            "label": "Industry",
            "group": "company",
            "applies_to": ["contact", "company"],
            "data_source": "elasticsearch",
            "type": "keyword",
            "fields": { "contact": ["company_industry"], "company": ["industry"] },
            "filtering": { "supports_exclusion": true },
            "sort_order": 10
        },
        {
            "id": "company_size",
            "label": "Company Size",
            "group": "company",
            "applies_to": ["company"],
            "data_source": "elasticsearch",
            "type": "keyword",
            "fields": { "company": ["employee_count_range"] },
            "sort_order": 11
        },
        {
            "id": "annual_revenue",
            "label": "Annual Revenue",
            "group": "company",
            "applies_to": ["company"],
            "data_source": "elasticsearch",
            "type": "range",
            "fields": { "company": ["annual_revenue"] },
            "filtering": { "mode": "range" },
            "sort_order": 12
        },
        {
            "id": "countries",
            "label": "Country",
            "group": "location",
            "applies_to": ["contact"],
            "data_source": "specialized",
            "type": "keyword",
            "fields": { "contact": ["country", "region", "city"] },
            "filtering": { "supports_exclusion": true },
            "options": [
                { "id": "Germany", "name": "Germany" },
                { "id": "Germany > Bavaria", "name": "Bavaria" }
            ],
            "sort_order": 20
        }
    ]);
    serde_json::from_value(raw).unwrap()
}

pub fn registry() -> Arc<FilterRegistry> {
    Arc::new(FilterRegistry::from_definitions(definitions()))
}

/// Backend answering every search with a fixed response and recording requests.
pub struct StubBackend {
    response: JsonValue,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, JsonValue)>>,
}

impl StubBackend {
    pub fn new(response: JsonValue) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Response carrying a `values` terms aggregation with `keys`.
    pub fn with_values(keys: &[&str]) -> Self {
        let buckets: Vec<JsonValue> = keys
            .iter()
            .map(|key| json!({ "key": key, "doc_count": 1 }))
            .collect();
        Self::new(json!({
            "hits": { "total": { "value": 0 }, "hits": [] },
            "aggregations": { "values": { "buckets": buckets } }
        }))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(String, JsonValue)> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SearchBackend for StubBackend {
    async fn search(
        &self,
        index: &str,
        body: &JsonValue,
    ) -> leadscope_query::Result<SearchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((index.to_string(), body.clone()));
        SearchResponse::from_value(self.response.clone())
    }

    fn backend_name(&self) -> &'static str {
        "stub"
    }
}

pub struct Harness {
    pub manager: FilterManager,
    pub backend: Arc<StubBackend>,
    pub store: Arc<LruValueStore>,
    pub clock: Arc<ManualClock>,
}

pub async fn harness(backend: StubBackend) -> Harness {
    harness_with(backend, FilterSettings::default()).await
}

pub async fn harness_with(backend: StubBackend, settings: FilterSettings) -> Harness {
    let clock = Arc::new(ManualClock::default());
    let backend = Arc::new(backend);
    let store = Arc::new(LruValueStore::new(64, clock.clone()));
    let manager = FilterManager::load(
        Arc::new(StaticSource::new(definitions())),
        backend.clone(),
        store.clone(),
        settings,
        clock.clone(),
    )
    .await
    .unwrap();
    Harness {
        manager,
        backend,
        store,
        clock,
    }
}
