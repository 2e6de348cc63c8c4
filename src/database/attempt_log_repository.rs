use crate::database::error::DatabaseError;
use crate::database::repository::AttemptLog;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Payment attempt audit entry. Rows are insert-only.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentAttempt {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub message: String,
    pub is_successful: bool,
    pub request_snapshot: Option<serde_json::Value>,
    pub response_snapshot: Option<serde_json::Value>,
    pub external_actor_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Attempt entry to be appended
#[derive(Debug, Clone)]
pub struct NewPaymentAttempt {
    pub invoice_id: Uuid,
    pub message: String,
    pub is_successful: bool,
    pub request_snapshot: Option<serde_json::Value>,
    pub response_snapshot: Option<serde_json::Value>,
    pub external_actor_id: Option<String>,
}

impl NewPaymentAttempt {
    pub fn new(invoice_id: Uuid, message: impl Into<String>, is_successful: bool) -> Self {
        Self {
            invoice_id,
            message: message.into(),
            is_successful,
            request_snapshot: None,
            response_snapshot: None,
            external_actor_id: None,
        }
    }

    pub fn with_request(mut self, snapshot: serde_json::Value) -> Self {
        self.request_snapshot = Some(snapshot);
        self
    }

    pub fn with_response(mut self, snapshot: serde_json::Value) -> Self {
        self.response_snapshot = Some(snapshot);
        self
    }

    pub fn with_external_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.external_actor_id = Some(actor_id.into());
        self
    }
}

/// Repository for the append-only payment attempt log.
///
/// There is deliberately no update or delete here.
pub struct AttemptLogRepository {
    pool: PgPool,
}

impl AttemptLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<PaymentAttempt>, DatabaseError> {
        sqlx::query_as::<_, PaymentAttempt>(
            "SELECT id, invoice_id, message, is_successful, request_snapshot, response_snapshot,
                    external_actor_id, created_at
             FROM payment_attempts
             WHERE invoice_id = $1
             ORDER BY created_at ASC",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}

#[async_trait]
impl AttemptLog for AttemptLogRepository {
    async fn append(&self, attempt: NewPaymentAttempt) -> Result<PaymentAttempt, DatabaseError> {
        sqlx::query_as::<_, PaymentAttempt>(
            "INSERT INTO payment_attempts
             (invoice_id, message, is_successful, request_snapshot, response_snapshot,
              external_actor_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, invoice_id, message, is_successful, request_snapshot,
                       response_snapshot, external_actor_id, created_at",
        )
        .bind(attempt.invoice_id)
        .bind(&attempt.message)
        .bind(attempt.is_successful)
        .bind(&attempt.request_snapshot)
        .bind(&attempt.response_snapshot)
        .bind(&attempt.external_actor_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
