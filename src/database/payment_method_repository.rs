use crate::database::error::DatabaseError;
use crate::database::repository::PaymentMethodStore;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Configured payment method entity, read-only to the payment flow.
///
/// `gateway_driver` names the gateway implementation that owns invoices
/// assigned to this method; the flow rejects callbacks whose method resolves
/// to a different driver.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentMethodRecord {
    pub id: Uuid,
    pub gateway_driver: String,
    pub test_mode: bool,
    pub card_action: String,
    pub paid_status: String,
    pub success_page: String,
    pub cancel_page: String,
    pub credentials: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Repository for configured payment methods
pub struct PaymentMethodRepository {
    pool: PgPool,
}

impl PaymentMethodRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_driver(
        &self,
        gateway_driver: &str,
    ) -> Result<Vec<PaymentMethodRecord>, DatabaseError> {
        sqlx::query_as::<_, PaymentMethodRecord>(
            "SELECT id, gateway_driver, test_mode, card_action, paid_status, success_page,
                    cancel_page, credentials, created_at, updated_at
             FROM payment_methods
             WHERE gateway_driver = $1
             ORDER BY created_at ASC",
        )
        .bind(gateway_driver)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}

#[async_trait]
impl PaymentMethodStore for PaymentMethodRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentMethodRecord>, DatabaseError> {
        sqlx::query_as::<_, PaymentMethodRecord>(
            "SELECT id, gateway_driver, test_mode, card_action, paid_status, success_page,
                    cancel_page, credentials, created_at, updated_at
             FROM payment_methods WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
