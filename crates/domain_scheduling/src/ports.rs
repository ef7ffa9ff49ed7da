//! Ports consumed by the trigger pipeline

use async_trait::async_trait;

use core_kernel::{DomainPort, Page, PageRequest, PortError, SubscriptionId};
use domain_payments::{CreatePaymentOutcome, CreatePaymentRequest, PaymentError};

use crate::scheduled::{ScheduledPayment, Subscription};

/// Storage for scheduled payments
#[async_trait]
pub trait ScheduledPaymentRepository: DomainPort {
    /// One page of PENDING scheduled payments in `area`
    ///
    /// `total` counts every pending item in the area at query time.
    async fn find_pending(
        &self,
        area: &str,
        page: PageRequest,
    ) -> Result<Page<ScheduledPayment>, PortError>;

    /// Persists status, payment id and cancellation reason
    async fn update(&self, scheduled: &ScheduledPayment) -> Result<(), PortError>;
}

/// Resolves subscriptions referenced from scheduled payment metadata
#[async_trait]
pub trait SubscriptionLookup: DomainPort {
    /// Fails with `PortError::NotFound` for unknown ids
    async fn get_subscription(&self, id: SubscriptionId) -> Result<Subscription, PortError>;
}

/// Entry into the payment-creation path
#[async_trait]
pub trait PaymentSubmitter: Send + Sync {
    async fn submit_batch_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<CreatePaymentOutcome, PaymentError>;
}
