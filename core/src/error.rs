use thiserror::Error;

#[derive(Error, Debug)]
pub enum EconError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: i64, supported: i64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EconResult<T> = Result<T, EconError>;
