use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid query clause {index}: {reason}")]
    InvalidClause { index: usize, reason: String },
    #[error("Malformed query: {0}")]
    MalformedQuery(#[from] serde_json::Error),
}
