// ⚠️ Error Taxonomy
// Validation happens before any store call, store failures propagate untouched,
// configuration failures abort startup.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the accounts engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),
}

// ============================================================================
// VALIDATION
// ============================================================================

/// A required field is missing or malformed on save
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn required(field: &str) -> Self {
        Self::new(field, "Required field is empty")
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Any failure talking to the persistence collaborator
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Request to remote store failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote store answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed record from store: {0}")]
    Decode(String),

    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store connection lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// True when the failure came from the network call timing out
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Http(e) if e.is_timeout())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}
