//! Store traits at the orchestrator seam.
//!
//! The payment flow is written against these traits rather than the concrete
//! sqlx repositories so the state machine can be exercised without a
//! database.

use crate::database::attempt_log_repository::{NewPaymentAttempt, PaymentAttempt};
use crate::database::error::DatabaseError;
use crate::database::invoice_repository::Invoice;
use crate::database::payment_method_repository::PaymentMethodRecord;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn find_by_unique_hash(&self, hash: &str) -> Result<Option<Invoice>, DatabaseError>;

    async fn set_external_reference(
        &self,
        invoice_id: Uuid,
        reference: &str,
    ) -> Result<(), DatabaseError>;

    /// Terminal pending-to-processed transition.
    ///
    /// Must be atomic (single conditional update): returns `true` only for
    /// the one caller that flips the flag, `false` for an invoice that was
    /// already processed.
    async fn mark_payment_processed(&self, invoice_id: Uuid) -> Result<bool, DatabaseError>;

    /// Apply the merchant-defined status code (e.g. the configured paid status).
    async fn update_invoice_status(
        &self,
        invoice_id: Uuid,
        status: &str,
    ) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait PaymentMethodStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentMethodRecord>, DatabaseError>;
}

/// Append-only audit trail. Entries are never updated or deleted.
#[async_trait]
pub trait AttemptLog: Send + Sync {
    async fn append(&self, attempt: NewPaymentAttempt) -> Result<PaymentAttempt, DatabaseError>;
}
