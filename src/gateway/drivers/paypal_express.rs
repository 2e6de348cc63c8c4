use crate::gateway::adapter::PaymentGateway;
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::http::GatewayHttpClient;
use crate::gateway::types::{CaptureRequest, CardAction, GatewayDriver, GatewayOutcome};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

const NVP_VERSION: &str = "204.0";

#[derive(Debug, Clone)]
pub struct PaypalExpressConfig {
    pub api_username: String,
    pub api_password: String,
    pub api_signature: String,
    pub test_mode: bool,
    pub timeout_secs: u64,
}

impl PaypalExpressConfig {
    pub fn from_env() -> GatewayResult<Self> {
        let required = |name: &str| {
            std::env::var(name).map_err(|_| GatewayError::ValidationError {
                message: format!("{} environment variable is required", name),
                field: Some(name.to_string()),
            })
        };

        Ok(Self {
            api_username: required("PAYPAL_API_USERNAME")?,
            api_password: required("PAYPAL_API_PASSWORD")?,
            api_signature: required("PAYPAL_API_SIGNATURE")?,
            test_mode: std::env::var("PAYPAL_TEST_MODE")
                .map(|v| v != "false")
                .unwrap_or(true),
            timeout_secs: std::env::var("PAYPAL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        })
    }

    fn api_endpoint(&self) -> &'static str {
        if self.test_mode {
            "https://api-3t.sandbox.paypal.com/nvp"
        } else {
            "https://api-3t.paypal.com/nvp"
        }
    }

    fn redirect_endpoint(&self, token: &str) -> String {
        let host = if self.test_mode {
            "https://www.sandbox.paypal.com"
        } else {
            "https://www.paypal.com"
        };
        let query = serde_urlencoded::to_string([("cmd", "_express-checkout"), ("token", token)])
            .unwrap_or_default();
        format!("{}/cgi-bin/webscr?{}", host, query)
    }
}

/// PayPal Express Checkout driver, speaking the classic NVP API.
///
/// `SetExpressCheckout` never completes a payment inline, so this driver only
/// ever produces the redirect or failure outcomes; the `Paid` arm of the
/// contract is for processors that can capture without a hop.
pub struct PaypalExpressGateway {
    config: PaypalExpressConfig,
    http: GatewayHttpClient,
}

impl PaypalExpressGateway {
    pub fn new(config: PaypalExpressConfig) -> GatewayResult<Self> {
        let http = GatewayHttpClient::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, http })
    }

    pub fn from_env() -> GatewayResult<Self> {
        Self::new(PaypalExpressConfig::from_env()?)
    }

    fn payment_action(action: CardAction) -> &'static str {
        match action {
            CardAction::Purchase => "Sale",
            CardAction::AuthorizeOnly => "Authorization",
        }
    }

    fn build_request_body(&self, request: &CaptureRequest) -> GatewayResult<String> {
        let pairs = [
            ("METHOD", "SetExpressCheckout"),
            ("VERSION", NVP_VERSION),
            ("USER", self.config.api_username.as_str()),
            ("PWD", self.config.api_password.as_str()),
            ("SIGNATURE", self.config.api_signature.as_str()),
            ("PAYMENTREQUEST_0_AMT", request.amount.amount.as_str()),
            (
                "PAYMENTREQUEST_0_CURRENCYCODE",
                request.amount.currency.as_str(),
            ),
            (
                "PAYMENTREQUEST_0_PAYMENTACTION",
                Self::payment_action(request.action),
            ),
            ("RETURNURL", request.return_url.as_str()),
            ("CANCELURL", request.cancel_url.as_str()),
            ("NOSHIPPING", "1"),
        ];

        serde_urlencoded::to_string(pairs).map_err(|e| GatewayError::ValidationError {
            message: format!("failed to encode NVP request: {}", e),
            field: None,
        })
    }

    fn outcome_from_response(&self, body: &str) -> GatewayResult<GatewayOutcome> {
        let fields = parse_nvp(body)?;

        let ack = fields.get("ACK").map(String::as_str).unwrap_or("");
        if matches!(ack, "Success" | "SuccessWithWarning") {
            let token = fields
                .get("TOKEN")
                .filter(|t| !t.is_empty())
                .ok_or_else(|| GatewayError::MalformedResponse {
                    message: "successful SetExpressCheckout response without TOKEN".to_string(),
                })?;
            return Ok(GatewayOutcome::RedirectRequired {
                redirect_url: self.config.redirect_endpoint(token),
                transaction_reference: token.clone(),
                message: fields.get("L_SHORTMESSAGE0").cloned(),
            });
        }

        let message = fields
            .get("L_LONGMESSAGE0")
            .or_else(|| fields.get("L_SHORTMESSAGE0"))
            .cloned()
            .unwrap_or_else(|| format!("processor returned ACK={}", ack));

        Ok(GatewayOutcome::Failed { message })
    }
}

fn parse_nvp(body: &str) -> GatewayResult<HashMap<String, String>> {
    serde_urlencoded::from_str(body).map_err(|e| GatewayError::MalformedResponse {
        message: format!("invalid NVP response: {}", e),
    })
}

#[async_trait]
impl PaymentGateway for PaypalExpressGateway {
    async fn initiate(&self, request: CaptureRequest) -> GatewayResult<GatewayOutcome> {
        request.amount.validate_positive("amount")?;

        let body = self.build_request_body(&request)?;
        let response = self.http.post_form(self.config.api_endpoint(), &body).await?;
        let outcome = self.outcome_from_response(&response)?;

        match &outcome {
            GatewayOutcome::RedirectRequired {
                transaction_reference,
                ..
            } => {
                info!(reference = %transaction_reference, "paypal express checkout started");
            }
            GatewayOutcome::Failed { message } => {
                info!(message = %message, "paypal express checkout rejected");
            }
            GatewayOutcome::Paid { .. } => {}
        }

        Ok(outcome)
    }

    fn driver(&self) -> GatewayDriver {
        GatewayDriver::PaypalExpress
    }
}
