//! Unified error handling for the payflow backend
//!
//! Provides a single error type with HTTP status mapping, machine-readable
//! error codes, and user-facing messages for the API layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic client handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx)
    #[serde(rename = "INVOICE_NOT_FOUND")]
    InvoiceNotFound,
    #[serde(rename = "PAYMENT_METHOD_NOT_FOUND")]
    PaymentMethodNotFound,
    #[serde(rename = "MISMATCHED_GATEWAY")]
    MismatchedGateway,
    #[serde(rename = "INVALID_CALLBACK_TOKEN")]
    InvalidCallbackToken,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors (502, 503, 504)
    #[serde(rename = "GATEWAY_ERROR")]
    GatewayError,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

/// Domain-specific business logic errors
#[derive(Debug, Clone)]
pub enum DomainError {
    /// No invoice matches the presented unique hash
    InvoiceNotFound { hash: String },
    /// Invoice is not bound to a resolvable payment method
    PaymentMethodNotFound { invoice_id: String },
    /// The invoice's payment method belongs to a different gateway driver
    MismatchedGateway { expected: String, found: String },
    /// Callback token does not match the invoice's external reference
    InvalidCallbackToken { hash: String },
}

/// Infrastructure-level errors (database, configuration)
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    /// Database connection or query failure
    Database { message: String, is_retryable: bool },
    /// Missing or invalid configuration
    Configuration { message: String },
}

/// External service errors (the remote payment processor)
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// Processor rejected or failed the payment request
    Gateway {
        driver: String,
        message: String,
        is_retryable: bool,
    },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InvoiceNotFound { .. } => 404,
                DomainError::PaymentMethodNotFound { .. } => 500,
                DomainError::MismatchedGateway { .. } => 409, // Conflict
                DomainError::InvalidCallbackToken { .. } => 403,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => 500,
                InfrastructureError::Configuration { .. } => 500,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::Gateway { .. } => 502, // Bad Gateway
            },
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InvoiceNotFound { .. } => ErrorCode::InvoiceNotFound,
                DomainError::PaymentMethodNotFound { .. } => ErrorCode::PaymentMethodNotFound,
                DomainError::MismatchedGateway { .. } => ErrorCode::MismatchedGateway,
                DomainError::InvalidCallbackToken { .. } => ErrorCode::InvalidCallbackToken,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::Gateway { .. } => ErrorCode::GatewayError,
            },
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InvoiceNotFound { .. } => "Invoice not found".to_string(),
                DomainError::PaymentMethodNotFound { .. } => {
                    "Payment method not found".to_string()
                }
                DomainError::MismatchedGateway { .. } => "Invalid payment method".to_string(),
                DomainError::InvalidCallbackToken { .. } => "Invalid token".to_string(),
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(err) => match err {
                ExternalError::Gateway {
                    driver,
                    is_retryable,
                    ..
                } => {
                    if *is_retryable {
                        format!(
                            "Payment processor ({}) is temporarily unavailable. Please try again",
                            driver
                        )
                    } else {
                        "Payment processing failed. Please contact support".to_string()
                    }
                }
            },
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(_) => false,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::Gateway { is_retryable, .. } => *is_retryable,
            },
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;
