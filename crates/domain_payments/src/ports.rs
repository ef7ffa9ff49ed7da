//! Payment domain ports
//!
//! Persistence seams for the payment engine. The Postgres adapters live in
//! `infra_db`; in-memory adapters for tests live in
//! [`adapters::memory`](crate::adapters).
//!
//! ```rust,ignore
//! pub struct PaymentService {
//!     payments: Arc<dyn PaymentRepository>,
//!     transactions: Arc<dyn TransactionRepository>,
//! }
//! ```

use async_trait::async_trait;

use core_kernel::{AccountId, DomainPort, InvoiceId, PaymentId, PaymentMethodId, PortError};

use crate::method::PaymentMethod;
use crate::payment::Payment;
use crate::transaction::Transaction;

/// Storage for payment records
#[async_trait]
pub trait PaymentRepository: DomainPort {
    /// Stores a new payment
    async fn insert(&self, payment: &Payment) -> Result<(), PortError>;

    /// Overwrites an existing payment
    ///
    /// Returns `PortError::NotFound` if the payment does not exist.
    async fn update(&self, payment: &Payment) -> Result<(), PortError>;

    /// Retrieves a payment or `PortError::NotFound`
    async fn get(&self, id: PaymentId) -> Result<Payment, PortError>;

    /// Most recent successful batch charge for this account and invoice set
    ///
    /// Reversals are never returned. Invoice sets compare order-insensitively.
    async fn latest_successful_batch_payment(
        &self,
        account_id: AccountId,
        invoice_ids: &[InvoiceId],
    ) -> Result<Option<Payment>, PortError>;

    /// Most recent SUSPENDED or TERMINATED payment in the lineage of `payment_id`
    ///
    /// The lineage is the payment itself, its original (if any) and every
    /// payment whose `original_payment_id` points at either of them.
    async fn latest_suspended_or_terminated_in_lineage(
        &self,
        payment_id: PaymentId,
    ) -> Result<Option<Payment>, PortError>;

    /// Sum in minor units of the CREDITING and CREDITED refunds of `original_id`
    ///
    /// `excluding` leaves one refund out of the sum, for resuming it.
    async fn refunded_amount_minor(
        &self,
        original_id: PaymentId,
        excluding: Option<PaymentId>,
    ) -> Result<i64, PortError>;

    /// Highest numeric external reference id at or above `floor`
    async fn max_synthetic_external_ref_id(&self, floor: u64) -> Result<Option<u64>, PortError>;
}

/// Append-only gateway transaction log
#[async_trait]
pub trait TransactionRepository: DomainPort {
    async fn append(&self, transaction: &Transaction) -> Result<(), PortError>;

    /// Transactions of a payment, oldest first
    async fn list_for_payment(&self, payment_id: PaymentId) -> Result<Vec<Transaction>, PortError>;
}

/// Stored payment methods
#[async_trait]
pub trait PaymentMethodRepository: DomainPort {
    async fn get(&self, id: PaymentMethodId) -> Result<PaymentMethod, PortError>;
}
