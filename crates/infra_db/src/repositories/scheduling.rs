//! Scheduled payment repository and subscription lookup

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AccountId, DomainPort, InvoiceId, Page, PageRequest, PaymentId, PaymentMethodId, PortError,
    ScheduledPaymentId, SubscriptionId,
};
use domain_scheduling::{
    ScheduledPayment, ScheduledPaymentRepository, Subscription, SubscriptionLookup,
};

use crate::error::port_error;
use crate::repositories::payments::{invoice_uuids, money};

/// Database row for a scheduled payment
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduledPaymentRow {
    pub scheduled_payment_id: Uuid,
    pub area: String,
    pub account_id: Uuid,
    pub payment_method_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub invoice_ids: Vec<Uuid>,
    pub trigger_type: String,
    pub metadata: sqlx::types::Json<Map<String, Value>>,
    pub status: String,
    pub payment_id: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Pending items in the area at query time
    pub total: i64,
}

impl TryFrom<ScheduledPaymentRow> for ScheduledPayment {
    type Error = PortError;

    fn try_from(row: ScheduledPaymentRow) -> Result<Self, Self::Error> {
        Ok(ScheduledPayment {
            id: ScheduledPaymentId::from(row.scheduled_payment_id),
            area: row.area,
            account_id: AccountId::from(row.account_id),
            payment_method_id: PaymentMethodId::from(row.payment_method_id),
            amount: money(row.amount_minor, &row.currency)?,
            invoice_ids: row.invoice_ids.into_iter().map(InvoiceId::from).collect(),
            trigger_type: row.trigger_type.parse()?,
            metadata: row.metadata.0,
            status: row.status.parse()?,
            payment_id: row.payment_id.map(PaymentId::from),
            cancellation_reason: row.cancellation_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgScheduledPaymentRepository {
    pool: PgPool,
}

impl PgScheduledPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores a new scheduled payment
    pub async fn insert(&self, scheduled: &ScheduledPayment) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_payments (
                scheduled_payment_id, area, account_id, payment_method_id, amount_minor, currency,
                invoice_ids, trigger_type, metadata, status, payment_id, cancellation_reason,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(Uuid::from(scheduled.id))
        .bind(&scheduled.area)
        .bind(Uuid::from(scheduled.account_id))
        .bind(Uuid::from(scheduled.payment_method_id))
        .bind(scheduled.amount.amount_minor())
        .bind(scheduled.amount.currency().code())
        .bind(invoice_uuids(&scheduled.invoice_ids))
        .bind(scheduled.trigger_type.as_str())
        .bind(sqlx::types::Json(&scheduled.metadata))
        .bind(scheduled.status.as_str())
        .bind(scheduled.payment_id.map(Uuid::from))
        .bind(scheduled.cancellation_reason.as_deref())
        .bind(scheduled.created_at)
        .bind(scheduled.updated_at)
        .execute(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(())
    }
}

impl DomainPort for PgScheduledPaymentRepository {}

#[async_trait]
impl ScheduledPaymentRepository for PgScheduledPaymentRepository {
    #[instrument(skip(self), fields(offset = page.offset, limit = page.limit))]
    async fn find_pending(
        &self,
        area: &str,
        page: PageRequest,
    ) -> Result<Page<ScheduledPayment>, PortError> {
        let offset = i64::try_from(page.offset)
            .map_err(|_| PortError::validation("page offset out of range"))?;
        let limit = i64::try_from(page.limit)
            .map_err(|_| PortError::validation("page limit out of range"))?;

        let rows = sqlx::query_as::<_, ScheduledPaymentRow>(
            r#"
            SELECT scheduled_payment_id, area, account_id, payment_method_id, amount_minor,
                   currency, invoice_ids, trigger_type, metadata, status, payment_id,
                   cancellation_reason, created_at, updated_at,
                   COUNT(*) OVER () AS total
            FROM scheduled_payments
            WHERE area = $1 AND status = 'PENDING'
            ORDER BY created_at, scheduled_payment_id
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(area)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        // Past the end no row carries the window count
        let Some(total) = rows.first().map(|r| r.total) else {
            return Ok(Page::empty());
        };
        let items = rows
            .into_iter()
            .map(ScheduledPayment::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(returned = items.len(), total, "Fetched pending scheduled payments");

        Ok(Page::new(items, u64::try_from(total).unwrap_or(0)))
    }

    #[instrument(skip(self, scheduled), fields(scheduled_payment_id = %scheduled.id, status = %scheduled.status))]
    async fn update(&self, scheduled: &ScheduledPayment) -> Result<(), PortError> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_payments SET
                status = $2,
                payment_id = $3,
                cancellation_reason = $4,
                updated_at = $5
            WHERE scheduled_payment_id = $1
            "#,
        )
        .bind(Uuid::from(scheduled.id))
        .bind(scheduled.status.as_str())
        .bind(scheduled.payment_id.map(Uuid::from))
        .bind(scheduled.cancellation_reason.as_deref())
        .bind(scheduled.updated_at)
        .execute(&self.pool)
        .await
        .map_err(port_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("ScheduledPayment", scheduled.id));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SubscriptionRow {
    subscription_id: Uuid,
    account_id: Uuid,
    is_active: bool,
}

#[derive(Debug, Clone)]
pub struct PgSubscriptionLookup {
    pool: PgPool,
}

impl PgSubscriptionLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PgSubscriptionLookup {}

#[async_trait]
impl SubscriptionLookup for PgSubscriptionLookup {
    #[instrument(skip(self), fields(subscription_id = %id))]
    async fn get_subscription(&self, id: SubscriptionId) -> Result<Subscription, PortError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT subscription_id, account_id, is_active FROM subscriptions WHERE subscription_id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .ok_or_else(|| PortError::not_found("Subscription", id))?;

        Ok(Subscription {
            id: SubscriptionId::from(row.subscription_id),
            account_id: AccountId::from(row.account_id),
            is_active: row.is_active,
        })
    }
}
