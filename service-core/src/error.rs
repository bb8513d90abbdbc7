use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        hint: String,
        details: Value,
    },

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Invalid operation: {0}")]
    InvalidOperation(anyhow::Error),

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>, hint: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            hint: hint.into(),
            details: Value::Null,
        }
    }

    pub fn validation_with_details(
        message: impl Into<String>,
        hint: impl Into<String>,
        details: Value,
    ) -> Self {
        AppError::Validation {
            message: message.into(),
            hint: hint.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(anyhow::anyhow!(message.into()))
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        AppError::InvalidOperation(anyhow::anyhow!(message.into()))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation { .. })
    }
}
