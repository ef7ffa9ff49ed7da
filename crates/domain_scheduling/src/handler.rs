//! Trigger handlers
//!
//! A handler turns a due scheduled payment into a payment-creation call.
//! Metadata problems surface as `ScheduledPaymentTriggerMetadataInvalid` so
//! the pipeline can cancel the item; submission problems are per-item
//! outcomes and leave the item pending for the next run.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::PaymentId;
use domain_payments::{CreatePaymentOutcome, CreatePaymentRequest, PaymentError};

use crate::error::SchedulingError;
use crate::ports::{PaymentSubmitter, SubscriptionLookup};
use crate::scheduled::ScheduledPayment;

/// Per-item result of a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A payment was created and approved
    Submitted(PaymentId),
    /// Nothing usable was created; retry on the next run
    Failed(String),
}

/// Handles `TriggerType::InitialServiceCompleted`
pub struct InitialServiceCompletedHandler {
    subscriptions: Arc<dyn SubscriptionLookup>,
    submitter: Arc<dyn PaymentSubmitter>,
}

impl InitialServiceCompletedHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionLookup>,
        submitter: Arc<dyn PaymentSubmitter>,
    ) -> Self {
        Self {
            subscriptions,
            submitter,
        }
    }

    #[instrument(skip(self, scheduled), fields(scheduled_payment_id = %scheduled.id, account_id = %scheduled.account_id))]
    pub async fn handle(&self, scheduled: &ScheduledPayment) -> Result<TriggerOutcome, SchedulingError> {
        let subscription_id = scheduled
            .subscription_id()
            .map_err(|reason| SchedulingError::metadata_invalid(scheduled.id, reason))?;

        let subscription = match self.subscriptions.get_subscription(subscription_id).await {
            Ok(subscription) => subscription,
            Err(e) if e.is_not_found() => {
                return Err(SchedulingError::metadata_invalid(
                    scheduled.id,
                    format!("subscription {subscription_id} not found"),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        if subscription.account_id != scheduled.account_id {
            return Err(SchedulingError::metadata_invalid(
                scheduled.id,
                format!(
                    "subscription {subscription_id} belongs to account {}",
                    subscription.account_id
                ),
            ));
        }
        if !subscription.is_active {
            return Err(SchedulingError::metadata_invalid(
                scheduled.id,
                format!("subscription {subscription_id} is not active"),
            ));
        }

        let request = CreatePaymentRequest::new(
            scheduled.account_id,
            scheduled.payment_method_id,
            scheduled.amount,
            scheduled.invoice_ids.clone(),
        )
        .batch()
        .with_description(format!("Initial service for subscription {subscription_id}"));

        match self.submitter.submit_batch_payment(request).await {
            Ok(CreatePaymentOutcome::Processed(outcome)) if outcome.is_approved() => {
                info!(payment_id = %outcome.payment.id, status = %outcome.payment.status, "Scheduled payment submitted");
                Ok(TriggerOutcome::Submitted(outcome.payment.id))
            }
            Ok(CreatePaymentOutcome::Processed(outcome)) => {
                let reason = outcome.result.failure_reason();
                warn!(payment_id = %outcome.payment.id, reason = %reason, "Scheduled payment declined");
                Ok(TriggerOutcome::Failed(reason))
            }
            Ok(CreatePaymentOutcome::Duplicate { original }) => {
                // already charged; link the item so later runs stop resubmitting it
                info!(payment_id = %original.id, "Scheduled payment already charged by an earlier batch payment");
                Ok(TriggerOutcome::Submitted(original.id))
            }
            Err(e @ (PaymentError::MissingGateway | PaymentError::Configuration(_))) => Err(e.into()),
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Scheduled payment submission failed");
                Ok(TriggerOutcome::Failed(e.to_string()))
            }
        }
    }
}
