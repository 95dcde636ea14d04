//! Error types for the Lightning assets client

use thiserror::Error;

/// Main error type for the Lightning assets client
#[derive(Error, Debug)]
pub enum LacError {
    // ============ Request Errors ============
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Contract not found: {0}")]
    NotFound(String),

    #[error("Price unavailable: {0}")]
    PriceUnavailable(String),

    // ============ Collaborator Errors ============
    #[error("Remote contract service failure: {0}")]
    RemoteFailure(String),

    #[error("Payment failed: {0}")]
    PaymentFailure(String),

    // ============ Storage Errors ============
    #[error("Corrupt contract record: {0}")]
    Corrupt(String),

    #[error("Storage error: {0}")]
    StoreFailure(String),

    #[error("Contract {0} was modified concurrently")]
    Conflict(String),

    // ============ Configuration Errors ============
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LacError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            LacError::InvalidArgument(_) => "invalid_argument",
            LacError::NotFound(_) => "not_found",
            LacError::PriceUnavailable(_) => "price_unavailable",
            LacError::RemoteFailure(_) => "remote_failure",
            LacError::PaymentFailure(_) => "payment_failure",
            LacError::Corrupt(_) => "corrupt",
            LacError::StoreFailure(_) => "store_failure",
            LacError::Conflict(_) => "conflict",
            LacError::Config(_) => "config",
        }
    }
}

impl From<std::io::Error> for LacError {
    fn from(err: std::io::Error) -> Self {
        LacError::StoreFailure(err.to_string())
    }
}

impl From<serde_json::Error> for LacError {
    fn from(err: serde_json::Error) -> Self {
        LacError::Corrupt(err.to_string())
    }
}
