//! Error types for the persistence layer.

/// Errors that can occur while reading or writing form data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database operation failed.
    #[error("store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored JSON document could not be encoded or decoded.
    #[error("store document error: {0}")]
    Document(#[from] serde_json::Error),
}
