//! Unified error hierarchy for peakform
//!
//! Calculator modules never fail on missing data (every metric has an
//! explicit zero/neutral default); errors originate at the store and model
//! boundaries and are propagated unmodified.

use thiserror::Error;

use crate::llm::LlmError;
use crate::store::StoreError;

/// Top-level error type for all peakform operations
#[derive(Debug, Error)]
pub enum PeakformError {
    /// Log store read/write errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Completion endpoint errors
    #[error("Model client error: {0}")]
    Llm(#[from] LlmError),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for peakform operations
pub type Result<T> = std::result::Result<T, PeakformError>;

impl PeakformError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PeakformError::Store(StoreError::NotFound(what)) => {
                format!("No such record: {what}")
            }
            PeakformError::Llm(LlmError::MissingApiKey) => {
                "No API key configured. Set PEAKFORM_API_KEY or add one to the config file."
                    .to_string()
            }
            PeakformError::Validation(reason) => format!("Invalid input: {reason}"),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_for_missing_key() {
        let err = PeakformError::Llm(LlmError::MissingApiKey);
        assert!(err.user_message().contains("PEAKFORM_API_KEY"));
    }

    #[test]
    fn test_store_error_converts() {
        let err: PeakformError = StoreError::NotFound("users.42".to_string()).into();
        assert!(err.user_message().contains("users.42"));
    }
}
