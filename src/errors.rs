//! # Application Error Types
//!
//! This module defines common error types used throughout the ChilliPizza bot.
//! It provides structured error handling for various application components.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Validation errors (names, phone numbers, addresses, prices)
    Validation(String),
    /// Database operation errors
    Database(String),
    /// Payment provider errors (rates, invoices, status polling)
    Payment(String),
    /// Network/communication errors
    Network(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::Database(msg) => write!(f, "[DATABASE] {}", msg),
            AppError::Payment(msg) => write!(f, "[PAYMENT] {}", msg),
            AppError::Network(msg) => write!(f, "[NETWORK] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::error;

    /// Log database operation errors with contextual information
    pub fn log_database_error(
        error: &impl std::fmt::Display,
        operation: &str,
        user_id: Option<i64>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            user_id = ?user_id,
            "Database operation failed"
        );
    }

    /// Log payment errors with invoice context
    pub fn log_payment_error(
        error: &impl std::fmt::Display,
        operation: &str,
        user_id: i64,
        invoice_id: Option<i64>,
        asset: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            user_id = %user_id,
            invoice_id = ?invoice_id,
            asset = ?asset,
            "Payment operation failed"
        );
    }

    /// Log order processing errors
    pub fn log_order_error(
        error: &impl std::fmt::Display,
        operation: &str,
        user_id: i64,
        order_id: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            user_id = %user_id,
            order_id = ?order_id,
            "Order processing failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_category() {
        assert_eq!(
            AppError::Payment("invoice expired".to_string()).to_string(),
            "[PAYMENT] invoice expired"
        );
        assert_eq!(
            AppError::Validation("phone".to_string()).to_string(),
            "[VALIDATION] phone"
        );
    }

    #[test]
    fn test_sqlx_error_maps_to_database() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Database(_)));
    }
}
