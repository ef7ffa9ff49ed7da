//! Payment records
//!
//! A `Payment` is the aggregate root for billing: it owns its transaction
//! log and carries the lineage link (`original_payment_id`) from a refund
//! back to the charge it reverses. Lineage is at most one hop deep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{AccountId, InvoiceId, Money, PaymentId, PaymentMethodId, PortError};

use crate::operation::{OperationResult, OperationType};
use crate::status::{PaymentStateMachine, PaymentStatus};

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    /// Tokenized credit card
    CreditCard,
    /// ACH with account and routing numbers
    Ach,
    /// Tokenized ACH account
    AchToken,
    /// Paper check
    Check,
    /// Cash
    Cash,
    /// Money order
    MoneyOrder,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::CreditCard => "CREDIT_CARD",
            PaymentType::Ach => "ACH",
            PaymentType::AchToken => "ACH_TOKEN",
            PaymentType::Check => "CHECK",
            PaymentType::Cash => "CASH",
            PaymentType::MoneyOrder => "MONEY_ORDER",
        }
    }

    /// Whether the payment went through a gateway and can be reversed by one
    pub fn is_electronic(&self) -> bool {
        matches!(
            self,
            PaymentType::CreditCard | PaymentType::Ach | PaymentType::AchToken
        )
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT_CARD" => Ok(PaymentType::CreditCard),
            "ACH" => Ok(PaymentType::Ach),
            "ACH_TOKEN" => Ok(PaymentType::AchToken),
            "CHECK" => Ok(PaymentType::Check),
            "CASH" => Ok(PaymentType::Cash),
            "MONEY_ORDER" => Ok(PaymentType::MoneyOrder),
            other => Err(PortError::transformation(format!(
                "unknown payment type '{}'",
                other
            ))),
        }
    }
}

/// A payment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Account being charged or refunded
    pub account_id: AccountId,
    /// Stored payment method used
    pub payment_method_id: PaymentMethodId,
    /// Instrument family
    pub payment_type: PaymentType,
    /// Amount in minor units
    pub amount: Money,
    /// Invoices this payment settles
    pub invoice_ids: Vec<InvoiceId>,
    /// Lifecycle status
    pub status: PaymentStatus,
    /// The payment this one reverses (refunds and terminations)
    pub original_payment_id: Option<PaymentId>,
    /// Reference in the external ledger, or a synthetic placeholder
    pub external_ref_id: Option<String>,
    /// Gateway transaction id of the last approved operation
    pub gateway_transaction_id: Option<String>,
    /// When the gateway last approved an operation on this payment
    pub processed_at: Option<DateTime<Utc>>,
    /// Originated by scheduled or bulk processing
    pub is_batch_payment: bool,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new payment about to be submitted for `status`
    ///
    /// # Arguments
    ///
    /// * `account_id` - Account being charged
    /// * `payment_method_id` - Stored payment method
    /// * `payment_type` - Instrument family of that method
    /// * `amount` - Charge amount
    /// * `status` - Initial (usually in-flight) status
    pub fn new(
        account_id: AccountId,
        payment_method_id: PaymentMethodId,
        payment_type: PaymentType,
        amount: Money,
        status: PaymentStatus,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: PaymentId::new_v7(),
            account_id,
            payment_method_id,
            payment_type,
            amount,
            invoice_ids: Vec::new(),
            status,
            original_payment_id: None,
            external_ref_id: None,
            gateway_transaction_id: None,
            processed_at: None,
            is_batch_payment: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates the refund payment reversing `original`
    pub fn refund_of(original: &Payment, amount: Money, status: PaymentStatus) -> Self {
        let mut refund = Self::new(
            original.account_id,
            original.payment_method_id,
            original.payment_type,
            amount,
            status,
        );
        refund.invoice_ids = original.invoice_ids.clone();
        refund.original_payment_id = Some(original.id);
        refund
    }

    /// Sets the invoices this payment settles
    pub fn with_invoices(mut self, invoice_ids: Vec<InvoiceId>) -> Self {
        self.invoice_ids = invoice_ids;
        self
    }

    /// Flags the payment as originating from batch processing
    pub fn as_batch(mut self, is_batch_payment: bool) -> Self {
        self.is_batch_payment = is_batch_payment;
        self
    }

    /// Sets the external ledger reference
    pub fn with_external_ref(mut self, external_ref_id: impl Into<String>) -> Self {
        self.external_ref_id = Some(external_ref_id.into());
        self
    }

    /// Moves the payment to `status`
    pub fn transition_to(&mut self, status: PaymentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Records a gateway approval
    pub fn mark_processed(&mut self, gateway_transaction_id: Option<String>, at: DateTime<Utc>) {
        if gateway_transaction_id.is_some() {
            self.gateway_transaction_id = gateway_transaction_id;
        }
        self.processed_at = Some(at);
    }

    /// Applies the gateway outcome of `operation`
    ///
    /// `prior` is the status held before the in-flight marker was written.
    pub fn apply_result(
        &mut self,
        operation: OperationType,
        prior: PaymentStatus,
        result: &OperationResult,
        at: DateTime<Utc>,
    ) {
        if !operation.moves_status() {
            return;
        }
        if result.is_successful() {
            if let Some(target) = PaymentStateMachine::on_success(operation) {
                self.transition_to(target);
            }
            self.mark_processed(result.transaction_id.clone(), at);
        } else {
            self.transition_to(PaymentStateMachine::on_failure(operation, prior));
        }
    }

    /// The timestamp time-window rules are measured from
    pub fn effective_processed_at(&self) -> DateTime<Utc> {
        self.processed_at.unwrap_or(self.created_at)
    }

    /// True for refund and termination records
    pub fn is_reversal(&self) -> bool {
        self.original_payment_id.is_some()
    }

    /// Compares invoice sets ignoring order and repeats
    pub fn covers_same_invoices(&self, invoice_ids: &[InvoiceId]) -> bool {
        normalized_invoices(&self.invoice_ids) == normalized_invoices(invoice_ids)
    }
}

/// Sorted, de-duplicated copy of an invoice set
pub fn normalized_invoices(invoice_ids: &[InvoiceId]) -> Vec<InvoiceId> {
    let mut ids = invoice_ids.to_vec();
    ids.sort();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    fn payment() -> Payment {
        Payment::new(
            AccountId::new(),
            PaymentMethodId::new(),
            PaymentType::CreditCard,
            Money::from_minor(5000, Currency::USD),
            PaymentStatus::AuthCapturing,
        )
    }

    #[test]
    fn test_refund_links_to_original() {
        let original = payment().with_invoices(vec![InvoiceId::new()]);
        let refund = Payment::refund_of(&original, Money::from_minor(1000, Currency::USD), PaymentStatus::Crediting);

        assert_eq!(refund.original_payment_id, Some(original.id));
        assert_eq!(refund.account_id, original.account_id);
        assert_eq!(refund.invoice_ids, original.invoice_ids);
        assert!(refund.is_reversal());
        assert!(!refund.is_batch_payment);
    }

    #[test]
    fn test_invoice_set_comparison_ignores_order() {
        let a = InvoiceId::new();
        let b = InvoiceId::new();
        let p = payment().with_invoices(vec![a, b]);

        assert!(p.covers_same_invoices(&[b, a]));
        assert!(p.covers_same_invoices(&[a, b, a]));
        assert!(!p.covers_same_invoices(&[a]));
    }

    #[test]
    fn test_mark_processed_keeps_previous_gateway_id_when_absent() {
        let mut p = payment();
        let now = Utc::now();
        p.mark_processed(Some("txn-1".to_string()), now);
        p.mark_processed(None, now);
        assert_eq!(p.gateway_transaction_id.as_deref(), Some("txn-1"));
        assert_eq!(p.effective_processed_at(), now);
    }

    #[test]
    fn test_apply_result_success_and_failure() {
        use crate::gateway::GatewayResponse;

        let mut p = payment();
        let approved = OperationResult::from_gateway(
            OperationType::AuthCapture,
            GatewayResponse::approved("gw-9", "CAPTURED"),
        );
        let now = Utc::now();
        p.apply_result(OperationType::AuthCapture, PaymentStatus::AuthCapturing, &approved, now);
        assert_eq!(p.status, PaymentStatus::Captured);
        assert_eq!(p.gateway_transaction_id.as_deref(), Some("gw-9"));
        assert_eq!(p.processed_at, Some(now));

        p.transition_to(PaymentStatus::Cancelling);
        let declined = OperationResult::transport_failure(OperationType::Cancel, "timeout");
        p.apply_result(OperationType::Cancel, PaymentStatus::Captured, &declined, Utc::now());
        assert_eq!(p.status, PaymentStatus::Captured);
        assert_eq!(p.processed_at, Some(now));
    }

    #[test]
    fn test_electronic_types() {
        assert!(PaymentType::CreditCard.is_electronic());
        assert!(PaymentType::AchToken.is_electronic());
        assert!(!PaymentType::Check.is_electronic());
        assert!(!PaymentType::Cash.is_electronic());
    }
}
