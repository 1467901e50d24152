/// Errors that can occur while persisting captured frames.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying database failure. The whole batch is reported failed;
    /// a failed batch is not retriable.
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
