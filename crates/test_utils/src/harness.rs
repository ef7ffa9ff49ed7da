//! In-memory Service Harness
//!
//! Wires the payment and scheduling services against in-memory adapters
//! and a `ScriptedGateway`, keeping handles on every store so tests can
//! seed data and inspect the results.

use std::sync::Arc;

use core_kernel::AccountId;
use domain_payments::adapters::memory::{
    InMemoryPaymentMethodRepository, InMemoryPaymentRepository, InMemoryTransactionRepository,
};
use domain_payments::{
    InMemorySubjectLockProvider, Payment, PaymentMethod, PaymentProcessor, PaymentService,
    PaymentsConfig, RefundService,
};
use domain_scheduling::adapters::memory::{
    InMemoryScheduledPaymentRepository, InMemorySubscriptionLookup,
};
use domain_scheduling::{
    InitialServiceCompletedHandler, PaymentSubmitter, SchedulingConfig, TriggerPipeline,
};

use crate::builders::PaymentMethodBuilder;
use crate::gateway::ScriptedGateway;

pub struct PaymentHarness {
    pub payments: Arc<InMemoryPaymentRepository>,
    pub transactions: Arc<InMemoryTransactionRepository>,
    pub methods: Arc<InMemoryPaymentMethodRepository>,
    pub locks: Arc<InMemorySubjectLockProvider>,
    pub gateway: Arc<ScriptedGateway>,
    pub scheduled: Arc<InMemoryScheduledPaymentRepository>,
    pub subscriptions: Arc<InMemorySubscriptionLookup>,
    pub config: PaymentsConfig,
}

impl Default for PaymentHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentHarness {
    pub fn new() -> Self {
        Self::with_gateway(ScriptedGateway::new())
    }

    pub fn with_gateway(gateway: ScriptedGateway) -> Self {
        Self {
            payments: Arc::new(InMemoryPaymentRepository::new()),
            transactions: Arc::new(InMemoryTransactionRepository::new()),
            methods: Arc::new(InMemoryPaymentMethodRepository::new()),
            locks: Arc::new(InMemorySubjectLockProvider::new()),
            gateway: Arc::new(gateway),
            scheduled: Arc::new(InMemoryScheduledPaymentRepository::new()),
            subscriptions: Arc::new(InMemorySubscriptionLookup::new()),
            config: PaymentsConfig::default(),
        }
    }

    pub fn processor(&self) -> PaymentProcessor {
        PaymentProcessor::new(self.transactions.clone()).with_gateway(self.gateway.clone())
    }

    /// A processor with no gateway configured
    pub fn processor_without_gateway(&self) -> PaymentProcessor {
        PaymentProcessor::new(self.transactions.clone())
    }

    pub fn payment_service(&self) -> PaymentService {
        self.payment_service_with(self.processor())
    }

    pub fn payment_service_with(&self, processor: PaymentProcessor) -> PaymentService {
        PaymentService::new(
            self.payments.clone(),
            self.methods.clone(),
            processor,
            self.locks.clone(),
            self.config.clone(),
        )
    }

    pub fn refund_service(&self) -> RefundService {
        RefundService::new(
            self.payments.clone(),
            self.processor(),
            self.locks.clone(),
            self.config.clone(),
        )
    }

    pub fn trigger_pipeline(&self) -> TriggerPipeline {
        let submitter: Arc<dyn PaymentSubmitter> = Arc::new(self.payment_service());
        self.trigger_pipeline_with(submitter)
    }

    pub fn trigger_pipeline_with(&self, submitter: Arc<dyn PaymentSubmitter>) -> TriggerPipeline {
        let handler = InitialServiceCompletedHandler::new(self.subscriptions.clone(), submitter);
        TriggerPipeline::new(self.scheduled.clone(), handler, SchedulingConfig::default())
            .expect("default scheduling config is valid")
    }

    /// Stores a card payment method for `account_id`
    pub async fn card_method(&self, account_id: AccountId) -> PaymentMethod {
        let method = PaymentMethodBuilder::new().for_account(account_id).build();
        self.methods.insert(method.clone()).await;
        method
    }

    pub async fn store_method(&self, method: PaymentMethod) -> PaymentMethod {
        self.methods.insert(method.clone()).await;
        method
    }

    pub async fn store(&self, payments: Vec<Payment>) {
        use domain_payments::PaymentRepository;
        for payment in payments {
            self.payments
                .insert(&payment)
                .await
                .expect("seed payment ids are unique");
        }
    }
}
