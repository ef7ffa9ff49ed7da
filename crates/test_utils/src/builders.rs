//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults.
//! Tests set only the fields that matter to them.

use chrono::{DateTime, Utc};
use core_kernel::{AccountId, InvoiceId, Money, PaymentId, PaymentMethodId, SubscriptionId};
use domain_payments::{BillingAddress, Instrument, Payment, PaymentMethod, PaymentStatus, PaymentType};
use domain_scheduling::{ScheduledPayment, Subscription, TriggerType};
use serde_json::Value;

use crate::fixtures::{FakeFixtures, IdFixtures, InstrumentFixtures, MoneyFixtures, StringFixtures};

/// Builder for stored payments in any status
pub struct PaymentBuilder {
    account_id: AccountId,
    payment_method_id: PaymentMethodId,
    payment_type: PaymentType,
    amount: Money,
    status: PaymentStatus,
    invoice_ids: Vec<InvoiceId>,
    original_payment_id: Option<PaymentId>,
    external_ref_id: Option<String>,
    gateway_transaction_id: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    is_batch_payment: bool,
    updated_at: Option<DateTime<Utc>>,
}

impl Default for PaymentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentBuilder {
    /// A captured $100 card payment processed just now
    pub fn new() -> Self {
        Self {
            account_id: IdFixtures::account_id(),
            payment_method_id: IdFixtures::payment_method_id(),
            payment_type: PaymentType::CreditCard,
            amount: MoneyFixtures::usd_100(),
            status: PaymentStatus::Captured,
            invoice_ids: Vec::new(),
            original_payment_id: None,
            external_ref_id: None,
            gateway_transaction_id: Some("gw_txn_0001".to_string()),
            processed_at: Some(Utc::now()),
            is_batch_payment: false,
            updated_at: None,
        }
    }

    pub fn with_account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = account_id;
        self
    }

    pub fn with_payment_method_id(mut self, id: PaymentMethodId) -> Self {
        self.payment_method_id = id;
        self
    }

    pub fn with_payment_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = payment_type;
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_invoices(mut self, invoice_ids: Vec<InvoiceId>) -> Self {
        self.invoice_ids = invoice_ids;
        self
    }

    /// Makes this a reversal of `original`
    pub fn reversing(mut self, original: &Payment) -> Self {
        self.original_payment_id = Some(original.id);
        self.account_id = original.account_id;
        self.payment_method_id = original.payment_method_id;
        self.invoice_ids = original.invoice_ids.clone();
        self
    }

    pub fn with_external_ref(mut self, reference: impl Into<String>) -> Self {
        self.external_ref_id = Some(reference.into());
        self
    }

    pub fn with_gateway_transaction_id(mut self, id: Option<&str>) -> Self {
        self.gateway_transaction_id = id.map(str::to_string);
        self
    }

    pub fn processed_at(mut self, at: DateTime<Utc>) -> Self {
        self.processed_at = Some(at);
        self
    }

    pub fn batch(mut self) -> Self {
        self.is_batch_payment = true;
        self
    }

    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    pub fn build(self) -> Payment {
        let mut payment = Payment::new(
            self.account_id,
            self.payment_method_id,
            self.payment_type,
            self.amount,
            self.status,
        )
        .with_invoices(self.invoice_ids)
        .as_batch(self.is_batch_payment);
        payment.original_payment_id = self.original_payment_id;
        payment.external_ref_id = self.external_ref_id;
        payment.gateway_transaction_id = self.gateway_transaction_id;
        payment.processed_at = self.processed_at;
        if let Some(at) = self.processed_at {
            payment.created_at = at;
            payment.updated_at = at;
        }
        if let Some(at) = self.updated_at {
            payment.updated_at = at;
        }
        payment
    }
}

/// Builder for stored payment methods
pub struct PaymentMethodBuilder {
    account_id: AccountId,
    instrument: Instrument,
    name_on_account: Option<String>,
    billing_address: BillingAddress,
    email: Option<String>,
}

impl Default for PaymentMethodBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentMethodBuilder {
    /// A card method with a full billing address and email
    pub fn new() -> Self {
        Self {
            account_id: IdFixtures::account_id(),
            instrument: InstrumentFixtures::card(),
            name_on_account: Some(StringFixtures::name_on_account().to_string()),
            billing_address: InstrumentFixtures::billing_address(),
            email: Some(StringFixtures::email().to_string()),
        }
    }

    pub fn for_account(mut self, account_id: AccountId) -> Self {
        self.account_id = account_id;
        self
    }

    pub fn with_instrument(mut self, instrument: Instrument) -> Self {
        self.instrument = instrument;
        self
    }

    pub fn ach(self) -> Self {
        self.with_instrument(InstrumentFixtures::ach())
    }

    pub fn offline(self, payment_type: PaymentType) -> Self {
        self.with_instrument(Instrument::Offline { payment_type })
    }

    /// Randomizes name and email
    pub fn with_random_contact(mut self) -> Self {
        self.name_on_account = Some(FakeFixtures::name_on_account());
        self.email = Some(FakeFixtures::email());
        self
    }

    pub fn without_email(mut self) -> Self {
        self.email = None;
        self
    }

    pub fn build(self) -> PaymentMethod {
        let mut method = PaymentMethod::new(self.account_id, self.instrument)
            .with_address(self.billing_address);
        if let Some(name) = self.name_on_account {
            method = method.with_name(name);
        }
        if let Some(email) = self.email {
            method = method.with_email(email);
        }
        method
    }
}

/// Builder for scheduled payments
pub struct ScheduledPaymentBuilder {
    area: String,
    account_id: AccountId,
    payment_method_id: PaymentMethodId,
    amount: Money,
    invoice_ids: Vec<InvoiceId>,
    trigger_type: TriggerType,
    metadata: Vec<(String, Value)>,
    created_at: Option<DateTime<Utc>>,
}

impl Default for ScheduledPaymentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduledPaymentBuilder {
    /// A pending initial-service payment without subscription metadata
    pub fn new() -> Self {
        Self {
            area: StringFixtures::area().to_string(),
            account_id: IdFixtures::account_id(),
            payment_method_id: IdFixtures::payment_method_id(),
            amount: MoneyFixtures::usd_subscription(),
            invoice_ids: IdFixtures::invoice_ids(1),
            trigger_type: TriggerType::InitialServiceCompleted,
            metadata: Vec::new(),
            created_at: None,
        }
    }

    pub fn in_area(mut self, area: impl Into<String>) -> Self {
        self.area = area.into();
        self
    }

    pub fn for_method(mut self, method: &PaymentMethod) -> Self {
        self.account_id = method.account_id;
        self.payment_method_id = method.id;
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_trigger(mut self, trigger_type: TriggerType) -> Self {
        self.trigger_type = trigger_type;
        self
    }

    pub fn with_subscription(mut self, subscription_id: SubscriptionId) -> Self {
        self.metadata.push((
            domain_scheduling::SUBSCRIPTION_ID_KEY.to_string(),
            Value::String(subscription_id.to_string()),
        ));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.push((key.into(), value));
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn build(self) -> ScheduledPayment {
        let mut scheduled = ScheduledPayment::new(
            self.area,
            self.account_id,
            self.payment_method_id,
            self.amount,
            self.trigger_type,
        )
        .with_invoices(self.invoice_ids);
        for (key, value) in self.metadata {
            scheduled = scheduled.with_metadata(key, value);
        }
        if let Some(at) = self.created_at {
            scheduled.created_at = at;
            scheduled.updated_at = at;
        }
        scheduled
    }
}

/// An active subscription owned by `account_id`
pub fn active_subscription(account_id: AccountId) -> Subscription {
    Subscription {
        id: SubscriptionId::new(),
        account_id,
        is_active: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_builder_defaults() {
        let payment = PaymentBuilder::new().build();
        assert_eq!(payment.status, PaymentStatus::Captured);
        assert!(payment.processed_at.is_some());
        assert!(!payment.is_reversal());
    }

    #[test]
    fn test_reversing_links_original() {
        let original = PaymentBuilder::new().batch().build();
        let refund = PaymentBuilder::new()
            .reversing(&original)
            .with_status(PaymentStatus::Credited)
            .build();
        assert_eq!(refund.original_payment_id, Some(original.id));
        assert_eq!(refund.account_id, original.account_id);
    }

    #[test]
    fn test_scheduled_builder_links_subscription() {
        let subscription_id = SubscriptionId::new();
        let scheduled = ScheduledPaymentBuilder::new()
            .with_subscription(subscription_id)
            .build();
        assert_eq!(scheduled.subscription_id(), Ok(subscription_id));
        assert!(scheduled.is_pending());
    }
}
