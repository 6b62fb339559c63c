use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrmError>;

#[derive(Debug, Error)]
pub enum OrmError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Statement `{sql}` failed: {message}")]
    Statement { sql: String, message: String },

    #[error("Connection is not open")]
    NotOpen,

    #[error("Engine cannot be replaced while the connection is open")]
    EngineLocked,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Driver error: {0}")]
    Sqlx(#[from] sqlx::Error),
}
