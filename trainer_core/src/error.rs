//! Error types for the trainer_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for trainer_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid credentials or rejected sign-up
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Missing workout or record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport or query failure against the data store
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// An operation needed a signed-in user and there was none
    #[error("No signed-in user")]
    NoIdentity,

    /// An operation needed a loaded workout and there was none
    #[error("No workout loaded")]
    NoWorkout,

    /// The view that started the operation went away before it finished
    #[error("Operation cancelled")]
    Cancelled,

    /// Rejected user input (empty name, negative weight, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timer state machine was driven through an invalid transition
    #[error("Timer error: {0}")]
    Timer(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors the UI shows as an empty/placeholder state
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
