//! Duplicate batch payment detection
//!
//! Scheduled and bulk runs can fire twice for the same invoices. Before a
//! new charge is created the detector looks for the most recent successful
//! batch payment covering the same account and invoice set and compares it
//! with the candidate.
//!
//! A suspended or terminated payment anywhere in the prior payment's
//! lineage is an upstream hard stop and wins over every other fact.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info};

use core_kernel::{AccountId, InvoiceId, Money, PaymentMethodId};

use crate::error::PaymentError;
use crate::payment::Payment;
use crate::ports::PaymentRepository;
use crate::status::PaymentStatus;

/// The charge about to be created
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentCandidate {
    pub account_id: AccountId,
    pub payment_method_id: PaymentMethodId,
    pub amount: Money,
    pub invoice_ids: Vec<InvoiceId>,
}

/// Outcome of a duplicate check
#[derive(Debug, Clone, PartialEq)]
pub enum DuplicateCheck {
    /// Safe to charge
    Unique,
    /// A matching batch payment already went through
    Duplicate { original: Box<Payment> },
}

impl DuplicateCheck {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DuplicateCheck::Duplicate { .. })
    }

    /// The matched prior payment, if any
    pub fn original(&self) -> Option<&Payment> {
        match self {
            DuplicateCheck::Duplicate { original } => Some(original),
            DuplicateCheck::Unique => None,
        }
    }
}

/// The five facts compared against the prior payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateFacts {
    pub same_amount: bool,
    pub within_window: bool,
    pub same_payment_method: bool,
    pub same_invoices: bool,
    pub prior_was_batch: bool,
}

impl DuplicateFacts {
    pub fn compare(
        prior: &Payment,
        candidate: &PaymentCandidate,
        window_days: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            same_amount: prior.amount == candidate.amount,
            within_window: within_trailing_days(prior.effective_processed_at(), window_days, now),
            same_payment_method: prior.payment_method_id == candidate.payment_method_id,
            same_invoices: prior.covers_same_invoices(&candidate.invoice_ids),
            prior_was_batch: prior.is_batch_payment,
        }
    }

    pub fn all(&self) -> bool {
        self.same_amount
            && self.within_window
            && self.same_payment_method
            && self.same_invoices
            && self.prior_was_batch
    }
}

/// True when `processed_at` falls on one of the last `days` calendar days (inclusive)
pub fn within_trailing_days(processed_at: DateTime<Utc>, days: i64, now: DateTime<Utc>) -> bool {
    let elapsed = now.date_naive().signed_duration_since(processed_at.date_naive());
    elapsed.num_days() <= days
}

pub struct DuplicatePaymentDetector {
    payments: Arc<dyn PaymentRepository>,
    window_days: i64,
}

impl DuplicatePaymentDetector {
    pub fn new(payments: Arc<dyn PaymentRepository>, window_days: i64) -> Self {
        Self {
            payments,
            window_days,
        }
    }

    pub async fn check(&self, candidate: &PaymentCandidate) -> Result<DuplicateCheck, PaymentError> {
        self.check_at(candidate, Utc::now()).await
    }

    /// Runs the check as of `now`
    pub async fn check_at(
        &self,
        candidate: &PaymentCandidate,
        now: DateTime<Utc>,
    ) -> Result<DuplicateCheck, PaymentError> {
        let Some(prior) = self
            .payments
            .latest_successful_batch_payment(candidate.account_id, &candidate.invoice_ids)
            .await?
        else {
            debug!(account_id = %candidate.account_id, "No prior batch payment for invoice set");
            return Ok(DuplicateCheck::Unique);
        };

        if let Some(halted) = self
            .payments
            .latest_suspended_or_terminated_in_lineage(prior.id)
            .await?
        {
            let context = format!(
                "payment {} in the lineage of {} for account {} is {}",
                halted.id, prior.id, candidate.account_id, halted.status
            );
            error!(
                account_id = %candidate.account_id,
                prior_payment_id = %prior.id,
                halted_payment_id = %halted.id,
                status = %halted.status,
                "Payment lineage halted upstream"
            );
            return match halted.status {
                PaymentStatus::Terminated => Err(PaymentError::PaymentTerminated(context)),
                _ => Err(PaymentError::PaymentSuspended(context)),
            };
        }

        let facts = DuplicateFacts::compare(&prior, candidate, self.window_days, now);
        info!(
            account_id = %candidate.account_id,
            prior_payment_id = %prior.id,
            same_amount = facts.same_amount,
            within_window = facts.within_window,
            same_payment_method = facts.same_payment_method,
            same_invoices = facts.same_invoices,
            prior_was_batch = facts.prior_was_batch,
            "Compared candidate with prior batch payment"
        );

        if facts.all() {
            Ok(DuplicateCheck::Duplicate {
                original: Box::new(prior),
            })
        } else {
            Ok(DuplicateCheck::Unique)
        }
    }
}
