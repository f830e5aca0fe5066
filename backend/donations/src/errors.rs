//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DonationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Unknown donation amount: {0}")]
    UnknownAmount(String),

    #[error("Submission is disabled until a custom amount is entered")]
    SubmitDisabled,
}

pub type Result<T> = std::result::Result<T, DonationError>;
