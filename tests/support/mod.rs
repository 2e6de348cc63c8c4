//! Shared test fixtures: in-memory stores and a scripted gateway.

// Each test binary compiles this module separately and uses a subset of it.
#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use payflow_backend::config::CallbackConfig;
use payflow_backend::database::attempt_log_repository::{NewPaymentAttempt, PaymentAttempt};
use payflow_backend::database::error::{DatabaseError, DatabaseErrorKind};
use payflow_backend::database::invoice_repository::Invoice;
use payflow_backend::database::payment_method_repository::PaymentMethodRecord;
use payflow_backend::database::repository::{AttemptLog, InvoiceStore, PaymentMethodStore};
use payflow_backend::gateway::{
    CaptureRequest, GatewayDriver, GatewayError, GatewayOutcome, GatewayResult, PaymentGateway,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct BackendState {
    invoices: HashMap<Uuid, Invoice>,
    methods: HashMap<Uuid, PaymentMethodRecord>,
    attempts: Vec<PaymentAttempt>,
}

/// In-memory implementation of all three store traits, shared behind one
/// mutex so the conditional processed-flag update is atomic.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_invoice(&self, invoice: Invoice) {
        let mut state = self.state.lock().unwrap();
        state.invoices.insert(invoice.id, invoice);
    }

    pub fn insert_method(&self, method: PaymentMethodRecord) {
        let mut state = self.state.lock().unwrap();
        state.methods.insert(method.id, method);
    }

    pub fn invoice(&self, id: Uuid) -> Invoice {
        let state = self.state.lock().unwrap();
        state.invoices[&id].clone()
    }

    pub fn attempts(&self) -> Vec<PaymentAttempt> {
        let state = self.state.lock().unwrap();
        state.attempts.clone()
    }
}

#[async_trait]
impl InvoiceStore for MemoryBackend {
    async fn find_by_unique_hash(&self, hash: &str) -> Result<Option<Invoice>, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .invoices
            .values()
            .find(|inv| inv.unique_hash == hash)
            .cloned())
    }

    async fn set_external_reference(
        &self,
        invoice_id: Uuid,
        reference: &str,
    ) -> Result<(), DatabaseError> {
        let mut state = self.state.lock().unwrap();
        match state.invoices.get_mut(&invoice_id) {
            Some(invoice) => {
                invoice.external_reference = Some(reference.to_string());
                Ok(())
            }
            None => Err(DatabaseError::new(DatabaseErrorKind::NotFound {
                entity: "invoice".to_string(),
                id: invoice_id.to_string(),
            })),
        }
    }

    async fn mark_payment_processed(&self, invoice_id: Uuid) -> Result<bool, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        match state.invoices.get_mut(&invoice_id) {
            Some(invoice) if !invoice.payment_processed => {
                invoice.payment_processed = true;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(DatabaseError::new(DatabaseErrorKind::NotFound {
                entity: "invoice".to_string(),
                id: invoice_id.to_string(),
            })),
        }
    }

    async fn update_invoice_status(
        &self,
        invoice_id: Uuid,
        status: &str,
    ) -> Result<(), DatabaseError> {
        let mut state = self.state.lock().unwrap();
        match state.invoices.get_mut(&invoice_id) {
            Some(invoice) => {
                invoice.status = status.to_string();
                Ok(())
            }
            None => Err(DatabaseError::new(DatabaseErrorKind::NotFound {
                entity: "invoice".to_string(),
                id: invoice_id.to_string(),
            })),
        }
    }
}

#[async_trait]
impl PaymentMethodStore for MemoryBackend {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentMethodRecord>, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state.methods.get(&id).cloned())
    }
}

#[async_trait]
impl AttemptLog for MemoryBackend {
    async fn append(&self, attempt: NewPaymentAttempt) -> Result<PaymentAttempt, DatabaseError> {
        let entry = PaymentAttempt {
            id: Uuid::new_v4(),
            invoice_id: attempt.invoice_id,
            message: attempt.message,
            is_successful: attempt.is_successful,
            request_snapshot: attempt.request_snapshot,
            response_snapshot: attempt.response_snapshot,
            external_actor_id: attempt.external_actor_id,
            created_at: Utc::now(),
        };
        let mut state = self.state.lock().unwrap();
        state.attempts.push(entry.clone());
        Ok(entry)
    }
}

/// Gateway double that yields a single pre-scripted outcome and records
/// the requests it received.
pub struct ScriptedGateway {
    outcome: Mutex<Option<GatewayResult<GatewayOutcome>>>,
    requests: Mutex<Vec<CaptureRequest>>,
}

impl ScriptedGateway {
    pub fn with_outcome(outcome: GatewayResult<GatewayOutcome>) -> Self {
        Self {
            outcome: Mutex::new(Some(outcome)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// For callback tests where the gateway should never be called.
    pub fn unreachable() -> Self {
        Self {
            outcome: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CaptureRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initiate(&self, request: CaptureRequest) -> GatewayResult<GatewayOutcome> {
        self.requests.lock().unwrap().push(request);
        self.outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| {
                Err(GatewayError::ProviderError {
                    driver: "scripted".to_string(),
                    message: "no scripted outcome".to_string(),
                    retryable: false,
                })
            })
    }

    fn driver(&self) -> GatewayDriver {
        GatewayDriver::PaypalExpress
    }
}

pub fn test_callback_config() -> CallbackConfig {
    CallbackConfig {
        return_base: "https://shop.example.com/payments/paypal-express/return".to_string(),
        cancel_base: "https://shop.example.com/payments/paypal-express/cancel".to_string(),
        pages_base: "https://shop.example.com".to_string(),
    }
}

pub fn test_method() -> PaymentMethodRecord {
    PaymentMethodRecord {
        id: Uuid::new_v4(),
        gateway_driver: "paypal_express".to_string(),
        test_mode: true,
        card_action: "purchase".to_string(),
        paid_status: "paid".to_string(),
        success_page: "checkout/success".to_string(),
        cancel_page: "checkout/cancel".to_string(),
        credentials: serde_json::json!({}),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn test_invoice(method_id: Uuid, hash: &str) -> Invoice {
    Invoice {
        id: Uuid::new_v4(),
        unique_hash: hash.to_string(),
        payment_method_id: method_id,
        total_amount: BigDecimal::from(100),
        currency: "USD".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        status: "pending".to_string(),
        payment_processed: false,
        external_reference: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
