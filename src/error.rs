use thiserror::Error;

/// Failures raised by a [`Store`](crate::store::Store) or by operations that
/// delegate to one.
///
/// Duplicate keys during a bulk create are not errors; they come back as
/// failed keys in a [`BulkOutcome`](crate::store::BulkOutcome).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("program '{0}' does not exist")]
    ProgramNotFound(String),

    #[error("program '{0}' already exists")]
    ProgramExists(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CidrError {
    #[error("invalid IP address: {0}")]
    InvalidAddress(String),

    #[error("invalid CIDR network: {0}")]
    InvalidNetwork(String),
}
