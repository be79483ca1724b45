//! Filter DSL validation and filter-to-query compilation
//!
//! Turns a bucketed contact/company filter request into search query clauses:
//! - `FilterRegistry`: immutable, id-indexed snapshot of filter definitions
//! - `DslValidator`: key aliasing, bucket placement, structure and policy checks
//! - `normalize_filter_value`: raw value to `{include, exclude, range, presence, operator}`
//! - `FilterHandler`: per value-source clause emission and value listing
//! - `FilterManager`: apply ordering, registry refresh and the value cache
//!
//! ```ignore
//! let manager = FilterManager::load(source, backend, store, settings, clock).await?;
//! let result = manager.validator().validate(&request);
//! let mut query = QueryBuilder::new("contacts");
//! manager.apply_dsl(&mut query, &result.normalized);
//! ```

pub mod cache;
pub mod clock;
pub mod definition;
pub mod dsl;
pub mod error;
pub mod handlers;
pub mod manager;
pub mod registry;
pub mod settings;
pub mod validator;
pub mod value;

pub use cache::{LruValueStore, ValueCache, ValueCacheStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use definition::{EntityKind, FieldType, FilterDefinition, FilterMode, ValueSource};
pub use dsl::Dsl;
pub use error::{Error, Result};
pub use handlers::{FilterHandler, FilterValue, ValuePage};
pub use manager::FilterManager;
pub use registry::{FilterRegistry, JsonFileSource, RegistrySource, StaticSource};
pub use settings::{FilterSettings, RangePolicy};
pub use validator::{DslValidator, SearchTarget, ValidationIssue, ValidationResult};
pub use value::{normalize_filter_value, NormalizedFilterValue, Operator, Presence};
