use crate::gateway::error::GatewayError;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Gateway driver identity, used for the callback ownership check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GatewayDriver {
    PaypalExpress,
}

impl GatewayDriver {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayDriver::PaypalExpress => "paypal_express",
        }
    }
}

impl std::fmt::Display for GatewayDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GatewayDriver {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "paypal_express" | "paypal-express" => Ok(GatewayDriver::PaypalExpress),
            _ => Err(GatewayError::ValidationError {
                message: format!("unsupported gateway driver: {}", value),
                field: Some("gateway_driver".to_string()),
            }),
        }
    }
}

/// Requested processor action for the capture.
///
/// Anything other than an explicit authorize configuration is treated as a
/// purchase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CardAction {
    Purchase,
    AuthorizeOnly,
}

impl CardAction {
    pub fn from_config(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "authorize" | "authorize_only" => CardAction::AuthorizeOnly,
            _ => CardAction::Purchase,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Money {
    pub amount: String,
    pub currency: String,
}

impl Money {
    pub fn validate_positive(&self, field: &str) -> Result<(), GatewayError> {
        let parsed =
            BigDecimal::from_str(&self.amount).map_err(|_| GatewayError::ValidationError {
                message: format!("invalid decimal amount: {}", self.amount),
                field: Some(field.to_string()),
            })?;
        if parsed <= BigDecimal::from(0) {
            return Err(GatewayError::ValidationError {
                message: "amount must be greater than zero".to_string(),
                field: Some(field.to_string()),
            });
        }
        if self.currency.trim().is_empty() {
            return Err(GatewayError::ValidationError {
                message: "currency is required".to_string(),
                field: Some("currency".to_string()),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayerName {
    pub first_name: String,
    pub last_name: String,
}

/// Request handed to a gateway driver to start a capture.
///
/// `return_url` and `cancel_url` already carry the invoice hash suffix; the
/// driver passes them through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub amount: Money,
    pub payer: PayerName,
    pub return_url: String,
    pub cancel_url: String,
    pub action: CardAction,
}

/// The three-outcome result of initiating a capture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GatewayOutcome {
    /// Processor completed the payment without a redirect hop.
    Paid { transaction_reference: String },
    /// Payer must be sent to the processor's hosted page. The expected,
    /// common path.
    RedirectRequired {
        redirect_url: String,
        transaction_reference: String,
        message: Option<String>,
    },
    /// Processor rejected the request; fatal for this attempt.
    Failed { message: String },
}
