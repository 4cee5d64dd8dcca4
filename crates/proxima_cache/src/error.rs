use tokio_rusqlite::rusqlite;

/// Failures inside a persistent store.
///
/// These never leave the store: `CacheStore` implementations log them
/// and answer as if the key were absent.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cache database error: {0}")]
    Database(tokio_rusqlite::Error),

    #[error("cannot (de)serialize cached headers: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("invalid cache table name '{0}'")]
    InvalidTable(String),
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for StoreError {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        StoreError::Database(err)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(tokio_rusqlite::Error::Error(err))
    }
}
