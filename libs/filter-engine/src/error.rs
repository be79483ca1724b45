//! Error types for the filter engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Filter not found: {0}")]
    FilterNotFound(String),

    #[error("Invalid filter definition '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("Registry source error: {0}")]
    RegistrySource(String),

    #[error("Value cache error: {0}")]
    Cache(String),

    #[error("Search error: {0}")]
    Search(#[from] leadscope_query::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
