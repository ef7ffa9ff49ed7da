//! In-memory port implementations

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use core_kernel::{AccountId, DomainPort, InvoiceId, PaymentId, PaymentMethodId, PortError};

use crate::method::PaymentMethod;
use crate::payment::Payment;
use crate::ports::{PaymentMethodRepository, PaymentRepository, TransactionRepository};
use crate::status::PaymentStatus;
use crate::transaction::Transaction;

/// In-memory payment store
#[derive(Debug, Default, Clone)]
pub struct InMemoryPaymentRepository {
    payments: Arc<RwLock<HashMap<PaymentId, Payment>>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates with payments for testing
    pub async fn with_payments(payments: Vec<Payment>) -> Self {
        let repo = Self::new();
        {
            let mut store = repo.payments.write().await;
            for payment in payments {
                store.insert(payment.id, payment);
            }
        }
        repo
    }

    /// Every stored payment, oldest first
    pub async fn all(&self) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self.payments.read().await.values().cloned().collect();
        payments.sort_by_key(|p| (p.created_at, p.id));
        payments
    }

    /// Refund and termination records pointing at `original`
    pub async fn reversals_of(&self, original: PaymentId) -> Vec<Payment> {
        self.all()
            .await
            .into_iter()
            .filter(|p| p.original_payment_id == Some(original))
            .collect()
    }
}

impl DomainPort for InMemoryPaymentRepository {}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<(), PortError> {
        let mut payments = self.payments.write().await;
        if payments.contains_key(&payment.id) {
            return Err(PortError::Conflict {
                message: format!("payment {} already exists", payment.id),
            });
        }
        payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), PortError> {
        let mut payments = self.payments.write().await;
        match payments.get_mut(&payment.id) {
            Some(stored) => {
                *stored = payment.clone();
                Ok(())
            }
            None => Err(PortError::not_found("Payment", payment.id)),
        }
    }

    async fn get(&self, id: PaymentId) -> Result<Payment, PortError> {
        self.payments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Payment", id))
    }

    async fn latest_successful_batch_payment(
        &self,
        account_id: AccountId,
        invoice_ids: &[InvoiceId],
    ) -> Result<Option<Payment>, PortError> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .filter(|p| {
                p.account_id == account_id
                    && p.is_batch_payment
                    && !p.is_reversal()
                    && p.status.is_successful_charge()
                    && p.covers_same_invoices(invoice_ids)
            })
            .max_by_key(|p| (p.effective_processed_at(), p.id))
            .cloned())
    }

    async fn latest_suspended_or_terminated_in_lineage(
        &self,
        payment_id: PaymentId,
    ) -> Result<Option<Payment>, PortError> {
        let payments = self.payments.read().await;
        let Some(payment) = payments.get(&payment_id) else {
            return Ok(None);
        };
        let root = payment.original_payment_id.unwrap_or(payment.id);

        Ok(payments
            .values()
            .filter(|p| p.id == payment_id || p.id == root || p.original_payment_id == Some(root))
            .filter(|p| p.status.is_halted())
            .max_by_key(|p| (p.updated_at, p.id))
            .cloned())
    }

    async fn refunded_amount_minor(
        &self,
        original_id: PaymentId,
        excluding: Option<PaymentId>,
    ) -> Result<i64, PortError> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .filter(|p| p.original_payment_id == Some(original_id) && Some(p.id) != excluding)
            .filter(|p| matches!(p.status, PaymentStatus::Crediting | PaymentStatus::Credited))
            .map(|p| p.amount.amount_minor())
            .fold(0_i64, i64::saturating_add))
    }

    async fn max_synthetic_external_ref_id(&self, floor: u64) -> Result<Option<u64>, PortError> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .filter_map(|p| p.external_ref_id.as_deref())
            .filter_map(|r| r.parse::<u64>().ok())
            .filter(|r| *r >= floor)
            .max())
    }
}

/// In-memory transaction log
#[derive(Debug, Default, Clone)]
pub struct InMemoryTransactionRepository {
    transactions: Arc<RwLock<Vec<Transaction>>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Transaction> {
        self.transactions.read().await.clone()
    }
}

impl DomainPort for InMemoryTransactionRepository {}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn append(&self, transaction: &Transaction) -> Result<(), PortError> {
        self.transactions.write().await.push(transaction.clone());
        Ok(())
    }

    async fn list_for_payment(&self, payment_id: PaymentId) -> Result<Vec<Transaction>, PortError> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .filter(|t| t.payment_id == payment_id)
            .cloned()
            .collect())
    }
}

/// In-memory payment method store
#[derive(Debug, Default, Clone)]
pub struct InMemoryPaymentMethodRepository {
    methods: Arc<RwLock<HashMap<PaymentMethodId, PaymentMethod>>>,
}

impl InMemoryPaymentMethodRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_methods(methods: Vec<PaymentMethod>) -> Self {
        let repo = Self::new();
        {
            let mut store = repo.methods.write().await;
            for method in methods {
                store.insert(method.id, method);
            }
        }
        repo
    }

    pub async fn insert(&self, method: PaymentMethod) {
        self.methods.write().await.insert(method.id, method);
    }
}

impl DomainPort for InMemoryPaymentMethodRepository {}

#[async_trait]
impl PaymentMethodRepository for InMemoryPaymentMethodRepository {
    async fn get(&self, id: PaymentMethodId) -> Result<PaymentMethod, PortError> {
        self.methods
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("PaymentMethod", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::PaymentType;
    use crate::status::PaymentStatus;
    use core_kernel::{Currency, Money};

    fn charge(account_id: AccountId, status: PaymentStatus) -> Payment {
        Payment::new(
            account_id,
            PaymentMethodId::new(),
            PaymentType::CreditCard,
            Money::from_minor(1000, Currency::USD),
            status,
        )
    }

    #[tokio::test]
    async fn test_lineage_includes_original_and_siblings() {
        let account = AccountId::new();
        let original = charge(account, PaymentStatus::Captured);
        let mut terminated = Payment::refund_of(&original, original.amount, PaymentStatus::Terminated);
        terminated.transition_to(PaymentStatus::Terminated);
        let unrelated = charge(account, PaymentStatus::Suspended);

        let repo = InMemoryPaymentRepository::with_payments(vec![
            original.clone(),
            terminated.clone(),
            unrelated,
        ])
        .await;

        let found = repo
            .latest_suspended_or_terminated_in_lineage(original.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, terminated.id);
    }

    #[tokio::test]
    async fn test_max_synthetic_ref_ignores_non_numeric_and_low_refs() {
        let account = AccountId::new();
        let repo = InMemoryPaymentRepository::with_payments(vec![
            charge(account, PaymentStatus::Credited).with_external_ref("1000000054"),
            charge(account, PaymentStatus::Credited).with_external_ref("QB-778"),
            charge(account, PaymentStatus::Credited).with_external_ref("42"),
        ])
        .await;

        assert_eq!(
            repo.max_synthetic_external_ref_id(1_000_000_000).await.unwrap(),
            Some(1_000_000_054)
        );
    }

    #[tokio::test]
    async fn test_update_missing_payment_is_not_found() {
        let repo = InMemoryPaymentRepository::new();
        let result = repo.update(&charge(AccountId::new(), PaymentStatus::Captured)).await;
        assert!(result.unwrap_err().is_not_found());
    }
}
