//! Payment, transaction and payment method repositories

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AccountId, Currency, DomainPort, InvoiceId, Money, PaymentId, PaymentMethodId, PortError,
    TransactionId,
};
use domain_payments::payment::normalized_invoices;
use domain_payments::{
    BillingAddress, Instrument, Payment, PaymentMethod, PaymentMethodRepository, PaymentRepository,
    PaymentStatus, PaymentType, Transaction, TransactionRepository,
};

use crate::error::port_error;

const PAYMENT_COLUMNS: &str = r#"
    payment_id, account_id, payment_method_id, payment_type, amount_minor, currency,
    invoice_ids, status, original_payment_id, external_ref_id, gateway_transaction_id,
    processed_at, is_batch_payment, created_at, updated_at
"#;

/// Database row for a payment
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub account_id: Uuid,
    pub payment_method_id: Uuid,
    pub payment_type: String,
    pub amount_minor: i64,
    pub currency: String,
    pub invoice_ids: Vec<Uuid>,
    pub status: String,
    pub original_payment_id: Option<Uuid>,
    pub external_ref_id: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub is_batch_payment: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = PortError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from(row.payment_id),
            account_id: AccountId::from(row.account_id),
            payment_method_id: PaymentMethodId::from(row.payment_method_id),
            payment_type: row.payment_type.parse::<PaymentType>()?,
            amount: money(row.amount_minor, &row.currency)?,
            invoice_ids: row.invoice_ids.into_iter().map(InvoiceId::from).collect(),
            status: row.status.parse::<PaymentStatus>()?,
            original_payment_id: row.original_payment_id.map(PaymentId::from),
            external_ref_id: row.external_ref_id,
            gateway_transaction_id: row.gateway_transaction_id,
            processed_at: row.processed_at,
            is_batch_payment: row.is_batch_payment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) fn money(amount_minor: i64, currency: &str) -> Result<Money, PortError> {
    let currency = currency
        .parse::<Currency>()
        .map_err(|e| PortError::transformation(e.to_string()))?;
    Ok(Money::from_minor(amount_minor, currency))
}

pub(crate) fn invoice_uuids(invoice_ids: &[InvoiceId]) -> Vec<Uuid> {
    normalized_invoices(invoice_ids)
        .into_iter()
        .map(Uuid::from)
        .collect()
}

/// PostgreSQL-backed payment store
#[derive(Debug, Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_optional(
        &self,
        query: sqlx::query::QueryAs<'_, sqlx::Postgres, PaymentRow, sqlx::postgres::PgArguments>,
    ) -> Result<Option<Payment>, PortError> {
        let row = query.fetch_optional(&self.pool).await.map_err(port_error)?;
        row.map(Payment::try_from).transpose()
    }
}

impl DomainPort for PgPaymentRepository {}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    #[instrument(skip(self, payment), fields(payment_id = %payment.id))]
    async fn insert(&self, payment: &Payment) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, account_id, payment_method_id, payment_type, amount_minor, currency,
                invoice_ids, status, original_payment_id, external_ref_id, gateway_transaction_id,
                processed_at, is_batch_payment, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(Uuid::from(payment.id))
        .bind(Uuid::from(payment.account_id))
        .bind(Uuid::from(payment.payment_method_id))
        .bind(payment.payment_type.as_str())
        .bind(payment.amount.amount_minor())
        .bind(payment.amount.currency().code())
        .bind(invoice_uuids(&payment.invoice_ids))
        .bind(payment.status.as_str())
        .bind(payment.original_payment_id.map(Uuid::from))
        .bind(payment.external_ref_id.as_deref())
        .bind(payment.gateway_transaction_id.as_deref())
        .bind(payment.processed_at)
        .bind(payment.is_batch_payment)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(port_error)?;

        debug!(status = %payment.status, "Inserted payment");
        Ok(())
    }

    #[instrument(skip(self, payment), fields(payment_id = %payment.id))]
    async fn update(&self, payment: &Payment) -> Result<(), PortError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = $2,
                external_ref_id = $3,
                gateway_transaction_id = $4,
                processed_at = $5,
                updated_at = $6
            WHERE payment_id = $1
            "#,
        )
        .bind(Uuid::from(payment.id))
        .bind(payment.status.as_str())
        .bind(payment.external_ref_id.as_deref())
        .bind(payment.gateway_transaction_id.as_deref())
        .bind(payment.processed_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(port_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("Payment", payment.id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(payment_id = %id))]
    async fn get(&self, id: PaymentId) -> Result<Payment, PortError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1");
        self.fetch_optional(sqlx::query_as(&sql).bind(Uuid::from(id)))
            .await?
            .ok_or_else(|| PortError::not_found("Payment", id))
    }

    #[instrument(skip(self, invoice_ids), fields(account_id = %account_id, invoices = invoice_ids.len()))]
    async fn latest_successful_batch_payment(
        &self,
        account_id: AccountId,
        invoice_ids: &[InvoiceId],
    ) -> Result<Option<Payment>, PortError> {
        let sql = format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE account_id = $1
              AND is_batch_payment
              AND original_payment_id IS NULL
              AND status IN ('AUTHORIZED', 'CAPTURED', 'PROCESSED', 'SETTLED')
              AND invoice_ids = $2
            ORDER BY COALESCE(processed_at, created_at) DESC, payment_id DESC
            LIMIT 1
            "#
        );
        let query = sqlx::query_as(&sql)
            .bind(Uuid::from(account_id))
            .bind(invoice_uuids(invoice_ids));
        self.fetch_optional(query).await
    }

    #[instrument(skip(self), fields(payment_id = %payment_id))]
    async fn latest_suspended_or_terminated_in_lineage(
        &self,
        payment_id: PaymentId,
    ) -> Result<Option<Payment>, PortError> {
        let sql = format!(
            r#"
            WITH target AS (
                SELECT payment_id, COALESCE(original_payment_id, payment_id) AS root
                FROM payments WHERE payment_id = $1
            )
            SELECT {PAYMENT_COLUMNS} FROM payments p
            WHERE EXISTS (
                SELECT 1 FROM target t
                WHERE p.payment_id = t.payment_id
                   OR p.payment_id = t.root
                   OR p.original_payment_id = t.root
            )
              AND p.status IN ('SUSPENDED', 'TERMINATED')
            ORDER BY p.updated_at DESC, p.payment_id DESC
            LIMIT 1
            "#
        );
        self.fetch_optional(sqlx::query_as(&sql).bind(Uuid::from(payment_id)))
            .await
    }

    #[instrument(skip(self), fields(original_payment_id = %original_id))]
    async fn refunded_amount_minor(
        &self,
        original_id: PaymentId,
        excluding: Option<PaymentId>,
    ) -> Result<i64, PortError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_minor), 0)::BIGINT
            FROM payments
            WHERE original_payment_id = $1
              AND status IN ('CREDITING', 'CREDITED')
              AND ($2::UUID IS NULL OR payment_id <> $2)
            "#,
        )
        .bind(Uuid::from(original_id))
        .bind(excluding.map(Uuid::from))
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;

        debug!(total, "Summed refunds");
        Ok(total)
    }

    #[instrument(skip(self))]
    async fn max_synthetic_external_ref_id(&self, floor: u64) -> Result<Option<u64>, PortError> {
        let floor = i64::try_from(floor)
            .map_err(|_| PortError::validation(format!("synthetic ref floor {floor} out of range")))?;
        // CASE keeps the cast away from non-numeric refs; 18 digits always fit in BIGINT
        let max: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(numeric_ref) FROM (
                SELECT CASE WHEN external_ref_id ~ '^[0-9]{1,18}$'
                            THEN external_ref_id::BIGINT END AS numeric_ref
                FROM payments
            ) refs
            WHERE numeric_ref >= $1
            "#,
        )
        .bind(floor)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;

        Ok(max.and_then(|m| u64::try_from(m).ok()))
    }
}

/// Database row for a gateway transaction
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    pub transaction_id: Uuid,
    pub payment_id: Uuid,
    pub operation: String,
    pub successful: bool,
    pub response_code: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub raw_response: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = PortError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: TransactionId::from(row.transaction_id),
            payment_id: PaymentId::from(row.payment_id),
            operation: row.operation.parse()?,
            successful: row.successful,
            response_code: row.response_code,
            gateway_transaction_id: row.gateway_transaction_id,
            raw_response: row.raw_response,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}

/// Append-only gateway transaction log
#[derive(Debug, Clone)]
pub struct PgTransactionRepository {
    pool: PgPool,
}

impl PgTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PgTransactionRepository {}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    #[instrument(skip(self, transaction), fields(payment_id = %transaction.payment_id, operation = %transaction.operation))]
    async fn append(&self, transaction: &Transaction) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                transaction_id, payment_id, operation, successful, response_code,
                gateway_transaction_id, raw_response, error_message, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::from(transaction.id))
        .bind(Uuid::from(transaction.payment_id))
        .bind(transaction.operation.as_str())
        .bind(transaction.successful)
        .bind(transaction.response_code.as_deref())
        .bind(transaction.gateway_transaction_id.as_deref())
        .bind(transaction.raw_response.as_deref())
        .bind(transaction.error_message.as_deref())
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(payment_id = %payment_id))]
    async fn list_for_payment(&self, payment_id: PaymentId) -> Result<Vec<Transaction>, PortError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT transaction_id, payment_id, operation, successful, response_code,
                   gateway_transaction_id, raw_response, error_message, created_at
            FROM transactions
            WHERE payment_id = $1
            ORDER BY created_at, transaction_id
            "#,
        )
        .bind(Uuid::from(payment_id))
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        rows.into_iter().map(Transaction::try_from).collect()
    }
}

/// Database row for a stored payment method
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentMethodRow {
    pub payment_method_id: Uuid,
    pub account_id: Uuid,
    pub instrument: sqlx::types::Json<Instrument>,
    pub name_on_account: Option<String>,
    pub billing_address: sqlx::types::Json<BillingAddress>,
    pub email: Option<String>,
}

impl From<PaymentMethodRow> for PaymentMethod {
    fn from(row: PaymentMethodRow) -> Self {
        PaymentMethod {
            id: PaymentMethodId::from(row.payment_method_id),
            account_id: AccountId::from(row.account_id),
            instrument: row.instrument.0,
            name_on_account: row.name_on_account,
            billing_address: row.billing_address.0,
            email: row.email,
        }
    }
}

/// Read access to stored payment methods
#[derive(Debug, Clone)]
pub struct PgPaymentMethodRepository {
    pool: PgPool,
}

impl PgPaymentMethodRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores a payment method; used by seeding and tests
    pub async fn insert(&self, method: &PaymentMethod) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO payment_methods (
                payment_method_id, account_id, instrument, name_on_account, billing_address, email
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::from(method.id))
        .bind(Uuid::from(method.account_id))
        .bind(sqlx::types::Json(&method.instrument))
        .bind(method.name_on_account.as_deref())
        .bind(sqlx::types::Json(&method.billing_address))
        .bind(method.email.as_deref())
        .execute(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(())
    }
}

impl DomainPort for PgPaymentMethodRepository {}

#[async_trait]
impl PaymentMethodRepository for PgPaymentMethodRepository {
    #[instrument(skip(self), fields(payment_method_id = %id))]
    async fn get(&self, id: PaymentMethodId) -> Result<PaymentMethod, PortError> {
        let row = sqlx::query_as::<_, PaymentMethodRow>(
            r#"
            SELECT payment_method_id, account_id, instrument, name_on_account, billing_address, email
            FROM payment_methods
            WHERE payment_method_id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;

        row.map(PaymentMethod::from)
            .ok_or_else(|| PortError::not_found("PaymentMethod", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> PaymentRow {
        let now = Utc::now();
        PaymentRow {
            payment_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            payment_method_id: Uuid::new_v4(),
            payment_type: "CREDIT_CARD".to_string(),
            amount_minor: 12_500,
            currency: "USD".to_string(),
            invoice_ids: vec![Uuid::new_v4()],
            status: "CAPTURED".to_string(),
            original_payment_id: None,
            external_ref_id: Some("1000000001".to_string()),
            gateway_transaction_id: Some("gw_1".to_string()),
            processed_at: Some(now),
            is_batch_payment: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_payment_row_maps_to_domain() {
        let payment = Payment::try_from(row()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Captured);
        assert_eq!(payment.payment_type, PaymentType::CreditCard);
        assert_eq!(payment.amount, Money::from_minor(12_500, Currency::USD));
        assert!(payment.is_batch_payment);
    }

    #[test]
    fn test_unknown_status_is_transformation_error() {
        let mut bad = row();
        bad.status = "PENDING_REVIEW".to_string();
        assert!(matches!(
            Payment::try_from(bad),
            Err(PortError::Transformation { .. })
        ));
    }

    #[test]
    fn test_invoice_uuids_are_normalized() {
        let a = InvoiceId::new();
        let b = InvoiceId::new();
        assert_eq!(invoice_uuids(&[b, a, b]), invoice_uuids(&[a, b]));
    }
}
