/// Persistence failures for exam sessions.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Database(String),

    /// No such session, or it belongs to someone else.
    #[error("{0} not found")]
    NotFound(String),

    /// A stored row (context JSON, timestamp) could not be decoded.
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    #[error("io: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::CorruptRow(e.to_string())
    }
}
