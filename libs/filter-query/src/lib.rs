//! Search query document builder
//!
//! Accumulates boolean query clauses and aggregation requests and renders them
//! into a search-engine query document:
//! - Clause primitives (`term`, `terms`, `match_phrase`, `range`, `exists`, `prefix`, `bool`)
//! - `QueryBuilder` with `filter` / `must` / `must_not` buckets and terms aggregations
//! - `SearchBackend` port used to execute a document and page through hits

pub mod backend;
pub mod builder;
pub mod clause;
pub mod error;

pub use backend::{AggregationBucket, Page, SearchBackend, SearchResponse};
pub use builder::{AggregationOrder, MultiMatchOptions, QueryBuilder, TermsAggregationOptions};
pub use error::{Error, Result};
