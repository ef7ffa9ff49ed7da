//! Refund eligibility and orchestration
//!
//! Refunds go back through the gateway that took the money, so only
//! electronic payments qualify, and only inside the refund window measured
//! from when the original was processed. The window is configurable but can
//! never exceed [`TECHNICAL_REFUND_DAYS_LIMIT`].
//!
//! A captured original is refunded with a Credit against a new refund
//! payment linked through `original_payment_id`. An original that was only
//! authorized is voided in full instead.
//!
//! Refunds of one original run under the `refund:{payment}` lock, and the
//! CREDITING and CREDITED refunds already recorded against it count towards
//! the original amount.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use core_kernel::{Currency, Money, PaymentId};

use crate::config::{ensure_refund_days_allowed, PaymentsConfig, TECHNICAL_REFUND_DAYS_LIMIT};
use crate::error::PaymentError;
use crate::operation::{validate, OperationRequest, OperationResult, OperationType};
use crate::payment::{Payment, PaymentType};
use crate::lock::{refund_lock_key, SubjectLockProvider};
use crate::ports::PaymentRepository;
use crate::processor::PaymentProcessor;
use crate::service::{default_reference_id, run_on_existing};
use crate::status::{PaymentStateMachine, PaymentStatus};

/// A single refund
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefundRequest {
    pub original_payment_id: PaymentId,
    /// Defaults to the full original amount
    pub amount: Option<Money>,
    /// Reference recorded on the refund payment
    pub external_ref_id: Option<String>,
    /// A refund payment from an earlier attempt to reuse
    pub existing_refund_id: Option<PaymentId>,
    /// Defaults to the configured window
    pub days_allowed: Option<u32>,
}

impl RefundRequest {
    pub fn full(original_payment_id: PaymentId) -> Self {
        Self {
            original_payment_id,
            ..Default::default()
        }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_days_allowed(mut self, days: u32) -> Self {
        self.days_allowed = Some(days);
        self
    }

    pub fn resuming(mut self, refund_id: PaymentId) -> Self {
        self.existing_refund_id = Some(refund_id);
        self
    }
}

/// How the money went back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod {
    /// Credit against a captured transaction
    Credit,
    /// Void of a never-captured authorization
    Void,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefundOutcome {
    pub method: RefundMethod,
    /// The original after the attempt (CANCELLED after a successful void)
    pub original: Payment,
    /// The refund payment; absent for voids
    pub refund: Option<Payment>,
    pub result: OperationResult,
}

impl RefundOutcome {
    pub fn is_successful(&self) -> bool {
        self.result.is_successful()
    }
}

/// Whether a payment processed at `processed_at` may still be refunded
pub fn refund_window_open(processed_at: DateTime<Utc>, days_allowed: u32, now: DateTime<Utc>) -> bool {
    now < processed_at + Duration::days(i64::from(days_allowed))
}

/// Options for a batch refund run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchRefundOptions {
    pub days_allowed: Option<u32>,
    /// Stamp each refund with a synthetic external reference id
    pub fake_external_ref: bool,
}

/// Per payment type tallies, amounts in minor units of `currency`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefundBucket {
    /// Currency of the first payment tallied; absent until one is
    pub currency: Option<Currency>,
    pub succeeded: u32,
    pub succeeded_amount_minor: i64,
    pub failed: u32,
    pub failed_amount_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundFailure {
    pub payment_id: PaymentId,
    pub payment_type: Option<PaymentType>,
    pub reason: String,
}

/// Outcome of a batch refund run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefundSummary {
    pub by_type: BTreeMap<PaymentType, RefundBucket>,
    pub failures: Vec<RefundFailure>,
}

impl RefundSummary {
    pub fn record_success(&mut self, payment_type: PaymentType, amount: Money) {
        let bucket = self.bucket(payment_type, amount.currency());
        bucket.succeeded += 1;
        bucket.succeeded_amount_minor = bucket.succeeded_amount_minor.saturating_add(amount.amount_minor());
    }

    pub fn record_failure(
        &mut self,
        payment_id: PaymentId,
        original: Option<&Payment>,
        reason: impl Into<String>,
    ) {
        let payment_type = original.map(|p| p.payment_type);
        if let Some(original) = original {
            let bucket = self.bucket(original.payment_type, original.amount.currency());
            bucket.failed += 1;
            bucket.failed_amount_minor = bucket.failed_amount_minor.saturating_add(original.amount.amount_minor());
        }
        self.failures.push(RefundFailure {
            payment_id,
            payment_type,
            reason: reason.into(),
        });
    }

    fn bucket(&mut self, payment_type: PaymentType, currency: Currency) -> &mut RefundBucket {
        let bucket = self.by_type.entry(payment_type).or_default();
        match bucket.currency {
            None => bucket.currency = Some(currency),
            Some(existing) if existing != currency => {
                warn!(%payment_type, %existing, %currency, "Refund summary mixes currencies in one bucket");
            }
            Some(_) => {}
        }
        bucket
    }

    /// The currency shared by every bucket, if there is exactly one
    pub fn currency(&self) -> Option<Currency> {
        let mut currencies = self.by_type.values().filter_map(|b| b.currency);
        let first = currencies.next()?;
        currencies.all(|c| c == first).then_some(first)
    }

    pub fn succeeded(&self) -> u32 {
        self.by_type.values().map(|b| b.succeeded).sum()
    }

    /// Failed items, including ones whose payment could not be loaded
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total_refunded_minor(&self) -> i64 {
        self.by_type.values().map(|b| b.succeeded_amount_minor).sum()
    }
}

pub struct RefundService {
    payments: Arc<dyn PaymentRepository>,
    processor: PaymentProcessor,
    locks: Arc<dyn SubjectLockProvider>,
    config: PaymentsConfig,
}

impl RefundService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        processor: PaymentProcessor,
        locks: Arc<dyn SubjectLockProvider>,
        config: PaymentsConfig,
    ) -> Self {
        Self {
            payments,
            processor,
            locks,
            config,
        }
    }

    /// Refunds one payment
    ///
    /// The refund window is checked against the technical ceiling before
    /// the original payment is looked up.
    #[instrument(skip(self, request), fields(payment_id = %request.original_payment_id))]
    pub async fn refund(&self, request: RefundRequest) -> Result<RefundOutcome, PaymentError> {
        let days_allowed = self.days_allowed(request.days_allowed)?;
        self.ensure_gateway()?;
        let original = self.load(request.original_payment_id).await?;
        self.refund_original(original, &request, days_allowed, Utc::now()).await
    }

    /// Refunds every payment in `payment_ids`, never stopping on a failed item
    #[instrument(skip(self, payment_ids), fields(count = payment_ids.len()))]
    pub async fn refund_all_by_id(
        &self,
        payment_ids: &[PaymentId],
        options: BatchRefundOptions,
    ) -> Result<RefundSummary, PaymentError> {
        let days_allowed = self.days_allowed(options.days_allowed)?;
        self.ensure_gateway()?;

        let mut summary = RefundSummary::default();
        for &payment_id in payment_ids {
            let original = match self.load(payment_id).await {
                Ok(original) => original,
                Err(e) => {
                    warn!(%payment_id, error = %e, "Refund skipped; payment could not be loaded");
                    summary.record_failure(payment_id, None, e.to_string());
                    continue;
                }
            };

            let mut request = RefundRequest::full(payment_id);
            if options.fake_external_ref {
                match self.next_synthetic_external_ref().await {
                    Ok(reference) => request.external_ref_id = Some(reference.to_string()),
                    Err(e) => {
                        summary.record_failure(payment_id, Some(&original), e.to_string());
                        continue;
                    }
                }
            }

            match self
                .refund_original(original.clone(), &request, days_allowed, Utc::now())
                .await
            {
                Ok(outcome) if outcome.is_successful() => {
                    summary.record_success(original.payment_type, original.amount);
                }
                Ok(outcome) => {
                    summary.record_failure(payment_id, Some(&original), outcome.result.failure_reason());
                }
                Err(e) => {
                    warn!(%payment_id, error = %e, "Refund rejected");
                    summary.record_failure(payment_id, Some(&original), e.to_string());
                }
            }
        }

        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            refunded_minor = summary.total_refunded_minor(),
            "Batch refund finished"
        );
        Ok(summary)
    }

    /// Next synthetic external reference id
    ///
    /// One above the highest id handed out so far, or the configured base
    /// when none exist.
    pub async fn next_synthetic_external_ref(&self) -> Result<u64, PaymentError> {
        let base = self.config.synthetic_external_ref_base;
        let next = match self.payments.max_synthetic_external_ref_id(base).await? {
            Some(max) => max.checked_add(1).ok_or_else(|| {
                PaymentError::Configuration("synthetic external reference ids exhausted".to_string())
            })?,
            None => base,
        };
        Ok(next)
    }

    /// Refunds an already-loaded original as of `now`
    pub async fn refund_original(
        &self,
        original: Payment,
        request: &RefundRequest,
        days_allowed: u32,
        now: DateTime<Utc>,
    ) -> Result<RefundOutcome, PaymentError> {
        if !original.payment_type.is_electronic() {
            warn!(payment_id = %original.id, payment_type = %original.payment_type, "Refund rejected: not electronic");
            return Err(PaymentError::RefundNotElectronic(original.id));
        }
        if original.is_reversal() {
            return Err(PaymentError::invalid_refund(format!(
                "payment {} is itself a reversal",
                original.id
            )));
        }

        let processed_at = original.effective_processed_at();
        if !refund_window_open(processed_at, days_allowed, now) {
            warn!(payment_id = %original.id, %processed_at, days_allowed, "Refund window exceeded");
            return Err(PaymentError::RefundWindowExceeded {
                payment_id: original.id,
                days_allowed,
            });
        }

        let amount = request.amount.unwrap_or(original.amount);
        check_refund_amount(&original, amount)?;

        let key = refund_lock_key(original.id);
        let Some(_guard) = self.locks.try_acquire(&key, self.config.lock_ttl()).await? else {
            warn!(lock_key = %key, "Refund already in progress for payment");
            return Err(PaymentError::SubjectLocked(key));
        };

        match original.status {
            PaymentStatus::Authorized => self.void_authorization(original, amount).await,
            status => {
                PaymentStateMachine::check_source(original.id, OperationType::Credit, status)?;
                self.credit(original, request, amount).await
            }
        }
    }

    async fn void_authorization(&self, original: Payment, amount: Money) -> Result<RefundOutcome, PaymentError> {
        if amount != original.amount {
            return Err(PaymentError::invalid_refund(format!(
                "payment {} was never captured and can only be voided in full",
                original.id
            )));
        }

        let mut request = OperationRequest::new()
            .with_payment_type(original.payment_type)
            .for_payment(original.id);
        if let Some(transaction_id) = &original.gateway_transaction_id {
            request = request.with_reference_transaction_id(transaction_id.clone());
        }

        let outcome = run_on_existing(&*self.payments, &self.processor, original, OperationType::Cancel, request).await?;
        Ok(RefundOutcome {
            method: RefundMethod::Void,
            original: outcome.payment,
            refund: None,
            result: outcome.result,
        })
    }

    async fn credit(
        &self,
        original: Payment,
        request: &RefundRequest,
        amount: Money,
    ) -> Result<RefundOutcome, PaymentError> {
        let (mut refund, prior, is_new) = match request.existing_refund_id {
            Some(refund_id) => {
                let existing = self.load(refund_id).await?;
                if existing.original_payment_id != Some(original.id) {
                    return Err(PaymentError::invalid_refund(format!(
                        "payment {} is not a refund of {}",
                        refund_id, original.id
                    )));
                }
                if existing.status == PaymentStatus::Credited {
                    return Err(PaymentError::invalid_refund(format!(
                        "refund {} was already credited",
                        refund_id
                    )));
                }
                let prior = existing.status;
                (existing, prior, false)
            }
            None => {
                let mut refund = Payment::refund_of(&original, amount, PaymentStatus::Crediting);
                if let Some(reference) = &request.external_ref_id {
                    refund = refund.with_external_ref(reference.clone());
                }
                (refund, PaymentStatus::Declined, true)
            }
        };

        let already_refunded = self
            .payments
            .refunded_amount_minor(original.id, request.existing_refund_id)
            .await?;
        check_cumulative_refund(&original, already_refunded, refund.amount)?;

        let mut operation_request = OperationRequest::new()
            .with_amount(refund.amount)
            .with_reference_id(default_reference_id(refund.id))
            .with_payment_type(original.payment_type)
            .for_payment(refund.id);
        if let Some(transaction_id) = &original.gateway_transaction_id {
            operation_request = operation_request.with_reference_transaction_id(transaction_id.clone());
        }

        let violations = validate(OperationType::Credit, &operation_request);
        if !violations.is_empty() {
            warn!(payment_id = %original.id, violations = %violations, "Refund failed validation");
            return Err(PaymentError::OperationValidationFailed(violations));
        }

        refund.transition_to(PaymentStatus::Crediting);
        if is_new {
            self.payments.insert(&refund).await?;
        } else {
            self.payments.update(&refund).await?;
        }

        let result = self.processor.credit(&operation_request).await?;
        refund.apply_result(OperationType::Credit, prior, &result, Utc::now());
        self.payments.update(&refund).await?;

        if result.is_successful() {
            info!(payment_id = %original.id, refund_id = %refund.id, amount = refund.amount.amount_minor(), "Refund credited");
        } else {
            error!(
                payment_id = %original.id,
                refund_id = %refund.id,
                error = %result.failure_reason(),
                "Refund declined by gateway"
            );
        }

        Ok(RefundOutcome {
            method: RefundMethod::Credit,
            original,
            refund: Some(refund),
            result,
        })
    }

    fn days_allowed(&self, requested: Option<u32>) -> Result<u32, PaymentError> {
        let days = requested.unwrap_or(self.config.refund_days_allowed);
        ensure_refund_days_allowed(days).map_err(|e| {
            error!(requested = days, limit = TECHNICAL_REFUND_DAYS_LIMIT, "Refund window above technical limit");
            e
        })
    }

    async fn load(&self, payment_id: PaymentId) -> Result<Payment, PaymentError> {
        self.payments
            .get(payment_id)
            .await
            .map_err(|e| PaymentError::from_lookup(payment_id, e))
    }

    fn ensure_gateway(&self) -> Result<(), PaymentError> {
        match self.processor.gateway_name() {
            Some(_) => Ok(()),
            None => Err(PaymentError::MissingGateway),
        }
    }
}

fn check_refund_amount(original: &Payment, amount: Money) -> Result<(), PaymentError> {
    if amount.currency() != original.amount.currency() {
        return Err(PaymentError::invalid_refund(format!(
            "refund currency {} does not match payment currency {}",
            amount.currency(),
            original.amount.currency()
        )));
    }
    if !amount.is_positive() {
        return Err(PaymentError::invalid_refund("refund amount must be positive"));
    }
    if amount.amount_minor() > original.amount.amount_minor() {
        return Err(PaymentError::invalid_refund(format!(
            "refund amount {} exceeds payment amount {}",
            amount, original.amount
        )));
    }
    Ok(())
}

/// Rejects a refund that would take the refunded total past the original amount
fn check_cumulative_refund(original: &Payment, already_refunded_minor: i64, amount: Money) -> Result<(), PaymentError> {
    let total = already_refunded_minor.saturating_add(amount.amount_minor());
    if total > original.amount.amount_minor() {
        warn!(
            payment_id = %original.id,
            already_refunded_minor,
            requested_minor = amount.amount_minor(),
            "Refund would exceed the original amount"
        );
        return Err(PaymentError::invalid_refund(format!(
            "refund of {} would take payment {} past its amount {} ({} already refunded)",
            amount,
            original.id,
            original.amount,
            Money::from_minor(already_refunded_minor, original.amount.currency())
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{AccountId, PaymentMethodId};

    #[test]
    fn test_refund_window_is_exclusive_at_the_end() {
        let processed_at = Utc::now();
        let deadline = processed_at + Duration::days(45);

        assert!(refund_window_open(processed_at, 45, deadline - Duration::seconds(1)));
        assert!(!refund_window_open(processed_at, 45, deadline));
        assert!(!refund_window_open(processed_at, 0, processed_at));
    }

    #[test]
    fn test_refund_amount_rules() {
        let original = Payment::new(
            AccountId::new(),
            PaymentMethodId::new(),
            PaymentType::CreditCard,
            Money::from_minor(5000, Currency::USD),
            PaymentStatus::Captured,
        );

        assert!(check_refund_amount(&original, Money::from_minor(5000, Currency::USD)).is_ok());
        assert!(check_refund_amount(&original, Money::from_minor(1, Currency::USD)).is_ok());
        assert!(check_refund_amount(&original, Money::from_minor(5001, Currency::USD)).is_err());
        assert!(check_refund_amount(&original, Money::from_minor(0, Currency::USD)).is_err());
        assert!(check_refund_amount(&original, Money::from_minor(100, Currency::EUR)).is_err());
    }

    #[test]
    fn test_cumulative_refund_cap() {
        let original = Payment::new(
            AccountId::new(),
            PaymentMethodId::new(),
            PaymentType::CreditCard,
            Money::from_minor(10_000, Currency::USD),
            PaymentStatus::Captured,
        );

        assert!(check_cumulative_refund(&original, 0, Money::from_minor(10_000, Currency::USD)).is_ok());
        assert!(check_cumulative_refund(&original, 6_000, Money::from_minor(4_000, Currency::USD)).is_ok());
        assert!(check_cumulative_refund(&original, 6_000, Money::from_minor(6_000, Currency::USD)).is_err());
        assert!(check_cumulative_refund(&original, 10_000, Money::from_minor(1, Currency::USD)).is_err());
    }

    #[test]
    fn test_summary_buckets_by_type() {
        let mut summary = RefundSummary::default();
        summary.record_success(PaymentType::CreditCard, Money::from_minor(1000, Currency::USD));
        summary.record_success(PaymentType::CreditCard, Money::from_minor(500, Currency::USD));
        summary.record_success(PaymentType::Ach, Money::from_minor(200, Currency::USD));
        summary.record_failure(PaymentId::new(), None, "not found");

        assert_eq!(summary.succeeded(), 3);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.total_refunded_minor(), 1700);
        assert_eq!(summary.by_type[&PaymentType::CreditCard].succeeded_amount_minor, 1500);
    }
}
