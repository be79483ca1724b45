//! Error types for query building and execution

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Search backend error: {0}")]
    Backend(String),

    #[error("Invalid search response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}
