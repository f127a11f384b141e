use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid {field} in store: '{value}'")]
    Corrupt { field: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
