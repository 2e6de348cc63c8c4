use crate::database::error::DatabaseError;
use crate::database::repository::InvoiceStore;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{types::BigDecimal, FromRow, PgPool};
use uuid::Uuid;

/// Invoice entity
///
/// `payment_processed` is the protocol-level terminal flag (an invoice can be
/// processed exactly once); `status` carries the merchant-defined status code
/// the paid status is written into on success.
#[derive(Debug, Clone, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub unique_hash: String,
    pub payment_method_id: Uuid,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub first_name: String,
    pub last_name: String,
    pub status: String,
    pub payment_processed: bool,
    pub external_reference: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Generate an opaque, unguessable hash for callback URLs.
///
/// The hash is a lookup key, never an authorization credential on its own;
/// the callback token check in the payment flow is the actual authentication.
pub fn generate_unique_hash(invoice_id: Uuid) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let raw = format!("{}:{}:{}", invoice_id, nanos, Uuid::new_v4());

    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Repository for managing invoices
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new pending invoice with a freshly generated unique hash
    pub async fn create_invoice(
        &self,
        payment_method_id: Uuid,
        total_amount: BigDecimal,
        currency: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Invoice, DatabaseError> {
        let id = Uuid::new_v4();
        let unique_hash = generate_unique_hash(id);

        sqlx::query_as::<_, Invoice>(
            "INSERT INTO invoices
             (id, unique_hash, payment_method_id, total_amount, currency, first_name, last_name)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, unique_hash, payment_method_id, total_amount, currency, first_name,
                       last_name, status, payment_processed, external_reference,
                       created_at, updated_at",
        )
        .bind(id)
        .bind(&unique_hash)
        .bind(payment_method_id)
        .bind(total_amount)
        .bind(currency)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, DatabaseError> {
        sqlx::query_as::<_, Invoice>(
            "SELECT id, unique_hash, payment_method_id, total_amount, currency, first_name,
                    last_name, status, payment_processed, external_reference,
                    created_at, updated_at
             FROM invoices WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}

#[async_trait]
impl InvoiceStore for InvoiceRepository {
    async fn find_by_unique_hash(&self, hash: &str) -> Result<Option<Invoice>, DatabaseError> {
        sqlx::query_as::<_, Invoice>(
            "SELECT id, unique_hash, payment_method_id, total_amount, currency, first_name,
                    last_name, status, payment_processed, external_reference,
                    created_at, updated_at
             FROM invoices WHERE unique_hash = $1",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn set_external_reference(
        &self,
        invoice_id: Uuid,
        reference: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE invoices
             SET external_reference = $2, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(invoice_id)
        .bind(reference)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    async fn mark_payment_processed(&self, invoice_id: Uuid) -> Result<bool, DatabaseError> {
        // Conditional update keyed on the current flag: concurrent duplicate
        // callbacks race here and exactly one of them gets rows_affected = 1.
        let result = sqlx::query(
            "UPDATE invoices
             SET payment_processed = true, updated_at = NOW()
             WHERE id = $1 AND payment_processed = false",
        )
        .bind(invoice_id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_invoice_status(
        &self,
        invoice_id: Uuid,
        status: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE invoices
             SET status = $2, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(invoice_id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }
}
