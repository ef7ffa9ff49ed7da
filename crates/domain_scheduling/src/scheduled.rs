//! Scheduled payment entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    AccountId, InvoiceId, Money, PaymentId, PaymentMethodId, PortError, ScheduledPaymentId,
    SubscriptionId,
};

/// Metadata key linking a scheduled payment to its subscription
pub const SUBSCRIPTION_ID_KEY: &str = "subscription_id";

/// Lifecycle of a scheduled payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduledPaymentStatus {
    Pending,
    Cancelled,
    Submitted,
}

impl ScheduledPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduledPaymentStatus::Pending => "PENDING",
            ScheduledPaymentStatus::Cancelled => "CANCELLED",
            ScheduledPaymentStatus::Submitted => "SUBMITTED",
        }
    }
}

impl fmt::Display for ScheduledPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduledPaymentStatus {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ScheduledPaymentStatus::Pending),
            "CANCELLED" => Ok(ScheduledPaymentStatus::Cancelled),
            "SUBMITTED" => Ok(ScheduledPaymentStatus::Submitted),
            other => Err(PortError::transformation(format!(
                "unknown scheduled payment status: {other}"
            ))),
        }
    }
}

/// Event that makes a scheduled payment due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    /// First service visit of a subscription has been completed
    InitialServiceCompleted,
    /// Reserved; no handler yet
    NextServiceCompleted,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::InitialServiceCompleted => "INITIAL_SERVICE_COMPLETED",
            TriggerType::NextServiceCompleted => "NEXT_SERVICE_COMPLETED",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerType {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIAL_SERVICE_COMPLETED" => Ok(TriggerType::InitialServiceCompleted),
            "NEXT_SERVICE_COMPLETED" => Ok(TriggerType::NextServiceCompleted),
            other => Err(PortError::transformation(format!("unknown trigger type: {other}"))),
        }
    }
}

/// A payment waiting for a business event before it is charged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPayment {
    pub id: ScheduledPaymentId,
    /// Operating area the payment belongs to; runs are partitioned by area
    pub area: String,
    pub account_id: AccountId,
    pub payment_method_id: PaymentMethodId,
    pub amount: Money,
    pub invoice_ids: Vec<InvoiceId>,
    pub trigger_type: TriggerType,
    pub metadata: Map<String, Value>,
    pub status: ScheduledPaymentStatus,
    /// Payment created on submission
    pub payment_id: Option<PaymentId>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledPayment {
    pub fn new(
        area: impl Into<String>,
        account_id: AccountId,
        payment_method_id: PaymentMethodId,
        amount: Money,
        trigger_type: TriggerType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ScheduledPaymentId::new_v7(),
            area: area.into(),
            account_id,
            payment_method_id,
            amount,
            invoice_ids: Vec::new(),
            trigger_type,
            metadata: Map::new(),
            status: ScheduledPaymentStatus::Pending,
            payment_id: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_invoices(mut self, invoice_ids: Vec<InvoiceId>) -> Self {
        self.invoice_ids = invoice_ids;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_subscription(self, subscription_id: SubscriptionId) -> Self {
        self.with_metadata(SUBSCRIPTION_ID_KEY, Value::String(subscription_id.to_string()))
    }

    pub fn is_pending(&self) -> bool {
        self.status == ScheduledPaymentStatus::Pending
    }

    /// Reads the linked subscription id from metadata
    ///
    /// Accepts both the prefixed (`SUB-...`) and bare uuid forms.
    pub fn subscription_id(&self) -> Result<SubscriptionId, String> {
        let raw = match self.metadata.get(SUBSCRIPTION_ID_KEY) {
            None | Some(Value::Null) => {
                return Err(format!("metadata is missing {SUBSCRIPTION_ID_KEY}"));
            }
            Some(Value::String(s)) => s.trim(),
            Some(other) => {
                return Err(format!("{SUBSCRIPTION_ID_KEY} must be a string, got {other}"));
            }
        };
        raw.parse::<SubscriptionId>()
            .map_err(|_| format!("{SUBSCRIPTION_ID_KEY} '{raw}' is not a valid subscription id"))
    }

    pub fn cancel(&mut self, reason: impl Into<String>) {
        self.status = ScheduledPaymentStatus::Cancelled;
        self.cancellation_reason = Some(reason.into());
        self.updated_at = Utc::now();
    }

    pub fn mark_submitted(&mut self, payment_id: PaymentId) {
        self.status = ScheduledPaymentStatus::Submitted;
        self.payment_id = Some(payment_id);
        self.updated_at = Utc::now();
    }
}

/// Subscription as seen by the trigger handlers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub account_id: AccountId,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use serde_json::json;

    fn scheduled() -> ScheduledPayment {
        ScheduledPayment::new(
            "north",
            AccountId::new(),
            PaymentMethodId::new(),
            Money::from_minor(4999, Currency::USD),
            TriggerType::InitialServiceCompleted,
        )
    }

    #[test]
    fn test_subscription_id_accepts_prefixed_and_bare() {
        let id = SubscriptionId::new();
        assert_eq!(scheduled().with_subscription(id).subscription_id(), Ok(id));

        let bare = scheduled().with_metadata(SUBSCRIPTION_ID_KEY, json!(id.as_uuid().to_string()));
        assert_eq!(bare.subscription_id(), Ok(id));
    }

    #[test]
    fn test_subscription_id_errors() {
        assert!(scheduled().subscription_id().unwrap_err().contains("missing"));

        let numeric = scheduled().with_metadata(SUBSCRIPTION_ID_KEY, json!(42));
        assert!(numeric.subscription_id().unwrap_err().contains("must be a string"));

        let garbage = scheduled().with_metadata(SUBSCRIPTION_ID_KEY, json!("not-an-id"));
        assert!(garbage.subscription_id().unwrap_err().contains("not a valid"));
    }

    #[test]
    fn test_cancel_and_submit() {
        let mut item = scheduled();
        item.cancel("subscription not found");
        assert_eq!(item.status, ScheduledPaymentStatus::Cancelled);
        assert_eq!(item.cancellation_reason.as_deref(), Some("subscription not found"));

        let mut item = scheduled();
        let payment_id = PaymentId::new();
        item.mark_submitted(payment_id);
        assert_eq!(item.status, ScheduledPaymentStatus::Submitted);
        assert_eq!(item.payment_id, Some(payment_id));
    }

    #[test]
    fn test_trigger_type_round_trips_through_str() {
        for trigger in [TriggerType::InitialServiceCompleted, TriggerType::NextServiceCompleted] {
            assert_eq!(trigger.as_str().parse::<TriggerType>().unwrap(), trigger);
        }
    }
}
