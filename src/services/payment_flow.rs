//! Payment flow orchestrator
//!
//! Drives the invoice payment state machine: starting a capture against the
//! gateway, and verifying the untrusted return/cancel callbacks the processor
//! redirects the payer back through. Every meaningful event lands in the
//! append-only attempt log.

use crate::config::CallbackConfig;
use crate::database::attempt_log_repository::NewPaymentAttempt;
use crate::database::error::DatabaseError;
use crate::database::invoice_repository::Invoice;
use crate::database::payment_method_repository::PaymentMethodRecord;
use crate::database::repository::{AttemptLog, InvoiceStore, PaymentMethodStore};
use crate::error::{AppError, AppErrorKind, DomainError, ExternalError, InfrastructureError};
use crate::gateway::{CaptureRequest, CardAction, GatewayDriver, GatewayOutcome, Money, PayerName, PaymentGateway};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

// ============================================================================
// Flow Result Types
// ============================================================================

/// Result of starting a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Processor completed without a redirect; the invoice is paid.
    Completed,
    /// Send the payer to the processor's hosted page.
    RedirectTo { url: String },
}

/// Redirect target produced by a callback handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackRedirect {
    pub url: String,
}

// ============================================================================
// Flow Error Types
// ============================================================================

/// Payment flow error types
#[derive(Debug)]
pub enum PaymentFlowError {
    /// Missing or unresolvable invoice hash
    NotFound,
    /// Invoice's payment method is missing or misconfigured
    Configuration { message: String },
    /// Invoice's payment method belongs to a different gateway driver
    MismatchedGateway { expected: String, found: String },
    /// Callback token missing or not equal to the invoice's external reference
    InvalidToken,
    /// Processor rejected or failed the capture request
    GatewayRejected { message: String },
    /// Store failure
    Store(DatabaseError),
}

impl std::fmt::Display for PaymentFlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "Invoice not found"),
            Self::Configuration { message } => write!(f, "{}", message),
            Self::MismatchedGateway { .. } => write!(f, "Invalid payment method"),
            Self::InvalidToken => write!(f, "Invalid token"),
            Self::GatewayRejected { message } => write!(f, "{}", message),
            Self::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for PaymentFlowError {}

impl From<DatabaseError> for PaymentFlowError {
    fn from(err: DatabaseError) -> Self {
        Self::Store(err)
    }
}

impl From<PaymentFlowError> for AppError {
    fn from(err: PaymentFlowError) -> Self {
        let kind = match &err {
            PaymentFlowError::NotFound => AppErrorKind::Domain(DomainError::InvoiceNotFound {
                hash: "unknown".to_string(),
            }),
            PaymentFlowError::Configuration { .. } => {
                AppErrorKind::Domain(DomainError::PaymentMethodNotFound {
                    invoice_id: "unknown".to_string(),
                })
            }
            PaymentFlowError::MismatchedGateway { expected, found } => {
                AppErrorKind::Domain(DomainError::MismatchedGateway {
                    expected: expected.clone(),
                    found: found.clone(),
                })
            }
            PaymentFlowError::InvalidToken => {
                AppErrorKind::Domain(DomainError::InvalidCallbackToken {
                    hash: "unknown".to_string(),
                })
            }
            PaymentFlowError::GatewayRejected { message } => {
                AppErrorKind::External(ExternalError::Gateway {
                    driver: "gateway".to_string(),
                    message: message.clone(),
                    is_retryable: false,
                })
            }
            PaymentFlowError::Store(db_err) => {
                AppErrorKind::Infrastructure(InfrastructureError::Database {
                    message: db_err.to_string(),
                    is_retryable: db_err.is_retryable(),
                })
            }
        };
        AppError::new(kind)
    }
}

/// Result type for payment flow operations
pub type FlowResult<T> = Result<T, PaymentFlowError>;

// ============================================================================
// Orchestrator
// ============================================================================

/// Orchestrates the invoice payment lifecycle against a single gateway.
pub struct PaymentFlow {
    invoices: Arc<dyn InvoiceStore>,
    methods: Arc<dyn PaymentMethodStore>,
    attempts: Arc<dyn AttemptLog>,
    gateway: Arc<dyn PaymentGateway>,
    urls: CallbackConfig,
}

impl PaymentFlow {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        methods: Arc<dyn PaymentMethodStore>,
        attempts: Arc<dyn AttemptLog>,
        gateway: Arc<dyn PaymentGateway>,
        urls: CallbackConfig,
    ) -> Self {
        Self {
            invoices,
            methods,
            attempts,
            gateway,
            urls,
        }
    }

    /// Start a payment for a pending invoice.
    ///
    /// The invoice is not mutated until the gateway's answer is known; no
    /// invoice-level lock is held across the network call.
    pub async fn start_payment(
        &self,
        invoice: &Invoice,
        method: &PaymentMethodRecord,
    ) -> FlowResult<StartOutcome> {
        let request = CaptureRequest {
            amount: Money {
                amount: invoice.total_amount.to_string(),
                currency: invoice.currency.clone(),
            },
            payer: PayerName {
                first_name: invoice.first_name.clone(),
                last_name: invoice.last_name.clone(),
            },
            return_url: hash_url(&self.urls.return_base, &invoice.unique_hash),
            cancel_url: hash_url(&self.urls.cancel_base, &invoice.unique_hash),
            action: CardAction::from_config(&method.card_action),
        };

        match self.gateway.initiate(request.clone()).await {
            Ok(GatewayOutcome::Paid {
                transaction_reference,
            }) => {
                self.attempts
                    .append(NewPaymentAttempt::new(
                        invoice.id,
                        "Successful payment",
                        true,
                    ))
                    .await?;
                self.invoices
                    .set_external_reference(invoice.id, &transaction_reference)
                    .await?;
                self.invoices.mark_payment_processed(invoice.id).await?;
                self.invoices
                    .update_invoice_status(invoice.id, &method.paid_status)
                    .await?;

                info!(invoice_id = %invoice.id, "payment completed without redirect");
                Ok(StartOutcome::Completed)
            }
            Ok(GatewayOutcome::RedirectRequired {
                redirect_url,
                transaction_reference,
                message,
            }) => {
                let mut attempt = NewPaymentAttempt::new(invoice.id, "Started payment", false)
                    .with_request(serde_json::to_value(&request).unwrap_or(JsonValue::Null))
                    .with_response(serde_json::json!({
                        "transaction_reference": transaction_reference
                    }));
                if let Some(message) = message {
                    attempt = attempt.with_external_actor(message);
                }
                self.attempts.append(attempt).await?;
                self.invoices
                    .set_external_reference(invoice.id, &transaction_reference)
                    .await?;

                info!(
                    invoice_id = %invoice.id,
                    reference = %transaction_reference,
                    "payment started, redirecting payer"
                );
                Ok(StartOutcome::RedirectTo { url: redirect_url })
            }
            Ok(GatewayOutcome::Failed { message }) => {
                self.attempts
                    .append(NewPaymentAttempt::new(invoice.id, message.clone(), false))
                    .await?;
                warn!(invoice_id = %invoice.id, message = %message, "payment rejected by processor");
                Err(PaymentFlowError::GatewayRejected { message })
            }
            Err(err) => {
                let message = err.to_string();
                self.attempts
                    .append(NewPaymentAttempt::new(invoice.id, message.clone(), false))
                    .await?;
                warn!(invoice_id = %invoice.id, message = %message, "payment initiation failed");
                Err(PaymentFlowError::GatewayRejected { message })
            }
        }
    }

    /// Handle the processor's return callback.
    ///
    /// Every input here arrives via the payer's browser and is untrusted.
    /// Any fault after the invoice was resolved gets one best-effort audit
    /// entry with the raw callback payload before the error is surfaced.
    pub async fn handle_return(
        &self,
        hash: &str,
        token: Option<&str>,
        params: &JsonValue,
    ) -> FlowResult<CallbackRedirect> {
        let invoice = self.resolve_invoice(hash).await?;

        match self.verify_and_complete(&invoice, token, params).await {
            Ok(redirect) => Ok(redirect),
            Err(err) => {
                self.audit_fault(invoice.id, &err, params).await;
                Err(err)
            }
        }
    }

    /// Handle the processor's cancel callback.
    ///
    /// The invoice stays pending; the cancellation is logged and the payer is
    /// sent to the configured cancel page.
    pub async fn handle_cancel(
        &self,
        hash: &str,
        params: &JsonValue,
    ) -> FlowResult<CallbackRedirect> {
        let invoice = self.resolve_invoice(hash).await?;

        match self.record_cancellation(&invoice, params).await {
            Ok(redirect) => Ok(redirect),
            Err(err) => {
                self.audit_fault(invoice.id, &err, params).await;
                Err(err)
            }
        }
    }

    async fn resolve_invoice(&self, hash: &str) -> FlowResult<Invoice> {
        if hash.trim().is_empty() {
            return Err(PaymentFlowError::NotFound);
        }

        self.invoices
            .find_by_unique_hash(hash)
            .await?
            .ok_or(PaymentFlowError::NotFound)
    }

    /// Resolve the invoice's payment method and check that it belongs to
    /// this flow's gateway driver. Defends against cross-gateway hash reuse
    /// or misrouted callbacks.
    async fn resolve_owned_method(&self, invoice: &Invoice) -> FlowResult<PaymentMethodRecord> {
        let method = self
            .methods
            .find_by_id(invoice.payment_method_id)
            .await?
            .ok_or(PaymentFlowError::Configuration {
                message: "Payment method not found".to_string(),
            })?;

        let owned = method
            .gateway_driver
            .parse::<GatewayDriver>()
            .map(|driver| driver == self.gateway.driver())
            .unwrap_or(false);
        if !owned {
            return Err(PaymentFlowError::MismatchedGateway {
                expected: self.gateway.driver().to_string(),
                found: method.gateway_driver.clone(),
            });
        }

        Ok(method)
    }

    async fn verify_and_complete(
        &self,
        invoice: &Invoice,
        token: Option<&str>,
        params: &JsonValue,
    ) -> FlowResult<CallbackRedirect> {
        let method = self.resolve_owned_method(invoice).await?;

        // Sole authentication of the callback: the presented token must
        // exactly equal the reference recorded when the attempt started.
        let token = token.unwrap_or("").trim();
        if token.is_empty() || invoice.external_reference.as_deref() != Some(token) {
            return Err(PaymentFlowError::InvalidToken);
        }

        if self.invoices.mark_payment_processed(invoice.id).await? {
            let mut attempt = NewPaymentAttempt::new(invoice.id, "Successful payment", true)
                .with_response(params.clone());
            if let Some(payer_id) = params.get("PayerID").and_then(|v| v.as_str()) {
                attempt = attempt.with_external_actor(payer_id);
            }
            self.attempts.append(attempt).await?;
            self.invoices
                .update_invoice_status(invoice.id, &method.paid_status)
                .await?;

            info!(invoice_id = %invoice.id, "payment confirmed via return callback");
            Ok(CallbackRedirect {
                url: page_url(&self.urls.pages_base, &method.success_page, &invoice.unique_hash),
            })
        } else {
            // Duplicate or replayed notification. Not an error to the payer;
            // degrade to the cancel page.
            self.attempts
                .append(
                    NewPaymentAttempt::new(invoice.id, "Invalid payment notification", false)
                        .with_response(params.clone()),
                )
                .await?;

            warn!(invoice_id = %invoice.id, "duplicate or invalid payment notification");
            Ok(CallbackRedirect {
                url: page_url(&self.urls.pages_base, &method.cancel_page, &invoice.unique_hash),
            })
        }
    }

    async fn record_cancellation(
        &self,
        invoice: &Invoice,
        params: &JsonValue,
    ) -> FlowResult<CallbackRedirect> {
        let method = self.resolve_owned_method(invoice).await?;

        self.attempts
            .append(
                NewPaymentAttempt::new(invoice.id, "Payment cancelled by payer", false)
                    .with_response(params.clone()),
            )
            .await?;

        info!(invoice_id = %invoice.id, "payment cancelled by payer");
        Ok(CallbackRedirect {
            url: page_url(&self.urls.pages_base, &method.cancel_page, &invoice.unique_hash),
        })
    }

    /// Best-effort audit entry for a callback fault. Log failures here must
    /// not mask the original error.
    async fn audit_fault(&self, invoice_id: Uuid, err: &PaymentFlowError, params: &JsonValue) {
        let attempt = NewPaymentAttempt::new(invoice_id, err.to_string(), false)
            .with_response(params.clone());
        if let Err(log_err) = self.attempts.append(attempt).await {
            warn!(
                invoice_id = %invoice_id,
                error = %log_err,
                "failed to record callback fault"
            );
        }
    }
}

/// Append the invoice hash as a path segment to a callback base URL.
pub fn hash_url(base: &str, hash: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), hash)
}

/// Resolve a merchant page slug to a URL carrying the invoice hash.
pub fn page_url(pages_base: &str, slug: &str, hash: &str) -> String {
    format!(
        "{}/{}?hash={}",
        pages_base.trim_end_matches('/'),
        slug.trim_matches('/'),
        hash
    )
}
