use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Malformed processor response: {message}")]
    MalformedResponse { message: String },

    #[error("Processor error: driver={driver}, message={message}")]
    ProviderError {
        driver: String,
        message: String,
        retryable: bool,
    },
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::ValidationError { .. } => false,
            GatewayError::NetworkError { .. } => true,
            GatewayError::MalformedResponse { .. } => false,
            GatewayError::ProviderError { retryable, .. } => *retryable,
        }
    }
}

impl From<GatewayError> for crate::error::AppError {
    fn from(err: GatewayError) -> Self {
        use crate::error::{AppError, AppErrorKind, ExternalError};

        let is_retryable = err.is_retryable();
        AppError::new(AppErrorKind::External(ExternalError::Gateway {
            driver: "gateway".to_string(),
            message: err.to_string(),
            is_retryable,
        }))
    }
}
