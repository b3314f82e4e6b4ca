//! Error types for the wagerline betting core
//!
//! Every fallible core operation returns [`CasinoResult`]. The variants mirror
//! how a caller must react: validation and conflict errors are rejected with no
//! state mutated, stale-state errors are benign retries, and external
//! dependency errors are safe to retry later.

use std::fmt;

/// Root error type for all core operations
#[derive(Debug, thiserror::Error)]
pub enum CasinoError {
    /// Bad bet size, invalid game parameters, out-of-range settings
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Session already active, code already used, cooldown running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No active session, unknown account, unknown promo code
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient funds: requested {requested:.2}, available {available:.2}")]
    InsufficientFunds { requested: f64, available: f64 },

    /// Retried request against state that already moved on
    #[error("Already processed: {0}")]
    StaleState(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Too many requests: {0}")]
    RateLimited(String),

    /// Settings or persistence unavailable
    #[error("External dependency unavailable: {0}")]
    ExternalDependency(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl CasinoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CasinoError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        CasinoError::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CasinoError::NotFound(msg.into())
    }

    pub fn stale(msg: impl Into<String>) -> Self {
        CasinoError::StaleState(msg.into())
    }

    /// Benign errors are surfaced as no-ops so that retries are tolerated.
    pub fn is_benign(&self) -> bool {
        matches!(self, CasinoError::StaleState(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CasinoError::ExternalDependency(_))
    }
}

/// Configuration and validation errors
#[derive(Debug)]
pub enum ConfigurationError {
    ValidationFailed(String),
    MissingRequired(String),
    InvalidValue { field: String, value: String, reason: String },
    LoadFailed(String),
    SaveFailed(String),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            ConfigurationError::MissingRequired(field) => write!(f, "Missing required field: {}", field),
            ConfigurationError::InvalidValue { field, value, reason } => {
                write!(f, "Invalid value for {}: '{}' ({})", field, value, reason)
            }
            ConfigurationError::LoadFailed(msg) => write!(f, "Failed to load configuration: {}", msg),
            ConfigurationError::SaveFailed(msg) => write!(f, "Failed to save configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigurationError {}

impl From<std::io::Error> for CasinoError {
    fn from(e: std::io::Error) -> Self {
        CasinoError::ExternalDependency(e.to_string())
    }
}

// Convenience type alias for Results
pub type CasinoResult<T> = Result<T, CasinoError>;
