//! Payment orchestration
//!
//! `PaymentService` is the write path for charges: it creates payments under
//! the per-account lock, runs duplicate detection, and drives capture,
//! cancel and status checks through the processor while keeping the stored
//! payment in step with the state machine.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{AccountId, InvoiceId, Money, PaymentId, PaymentMethodId};

use crate::config::{PaymentsConfig, CAPTURE_WINDOW_DAYS};
use crate::duplicate::{DuplicateCheck, DuplicatePaymentDetector, PaymentCandidate};
use crate::error::PaymentError;
use crate::lock::{create_payment_lock_key, SubjectLockProvider};
use crate::operation::{validate, OperationRequest, OperationResult, OperationType};
use crate::payment::Payment;
use crate::ports::{PaymentMethodRepository, PaymentRepository};
use crate::processor::PaymentProcessor;
use crate::status::PaymentStateMachine;

/// A new charge
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePaymentRequest {
    pub account_id: AccountId,
    pub payment_method_id: PaymentMethodId,
    pub amount: Money,
    pub invoice_ids: Vec<InvoiceId>,
    /// Originated by scheduled or bulk processing
    pub is_batch_payment: bool,
    /// Authorize only; capture later
    pub authorize_only: bool,
    /// Merchant reference sent to the gateway; derived from the payment id when absent
    pub reference_id: Option<String>,
    pub charge_description: Option<String>,
}

impl CreatePaymentRequest {
    pub fn new(
        account_id: AccountId,
        payment_method_id: PaymentMethodId,
        amount: Money,
        invoice_ids: Vec<InvoiceId>,
    ) -> Self {
        Self {
            account_id,
            payment_method_id,
            amount,
            invoice_ids,
            is_batch_payment: false,
            authorize_only: false,
            reference_id: None,
            charge_description: None,
        }
    }

    pub fn batch(mut self) -> Self {
        self.is_batch_payment = true;
        self
    }

    pub fn authorize_only(mut self) -> Self {
        self.authorize_only = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.charge_description = Some(description.into());
        self
    }

    fn operation(&self) -> OperationType {
        if self.authorize_only {
            OperationType::Authorize
        } else {
            OperationType::AuthCapture
        }
    }

    pub fn candidate(&self) -> PaymentCandidate {
        PaymentCandidate {
            account_id: self.account_id,
            payment_method_id: self.payment_method_id,
            amount: self.amount,
            invoice_ids: self.invoice_ids.clone(),
        }
    }
}

/// A payment after a gateway round trip
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub payment: Payment,
    pub result: OperationResult,
}

impl PaymentOutcome {
    pub fn is_approved(&self) -> bool {
        self.result.is_successful()
    }
}

/// Result of a create-payment call
#[derive(Debug, Clone, PartialEq)]
pub enum CreatePaymentOutcome {
    /// The charge was sent to the gateway
    Processed(PaymentOutcome),
    /// An identical batch payment already went through; nothing was charged
    Duplicate { original: Box<Payment> },
}

/// Whether an authorization processed at `processed_at` can still be captured
pub fn capture_window_open(processed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - processed_at <= Duration::days(CAPTURE_WINDOW_DAYS)
}

/// Reference id sent with a charge when the caller supplies none
pub fn default_reference_id(payment_id: PaymentId) -> String {
    format!("PAY{}", payment_id.as_uuid().simple())
}

pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    methods: Arc<dyn PaymentMethodRepository>,
    processor: PaymentProcessor,
    locks: Arc<dyn SubjectLockProvider>,
    duplicates: DuplicatePaymentDetector,
    config: PaymentsConfig,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        methods: Arc<dyn PaymentMethodRepository>,
        processor: PaymentProcessor,
        locks: Arc<dyn SubjectLockProvider>,
        config: PaymentsConfig,
    ) -> Self {
        let duplicates = DuplicatePaymentDetector::new(payments.clone(), config.duplicate_window_days);
        Self {
            payments,
            methods,
            processor,
            locks,
            duplicates,
            config,
        }
    }

    pub fn processor(&self) -> &PaymentProcessor {
        &self.processor
    }

    /// Creates and submits a charge
    ///
    /// Runs under the `create-payment:{account}` lock. A concurrent request
    /// for the same account fails with the retryable `SubjectLocked`.
    #[instrument(skip(self, request), fields(account_id = %request.account_id, amount = request.amount.amount_minor()))]
    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<CreatePaymentOutcome, PaymentError> {
        self.ensure_gateway()?;

        let key = create_payment_lock_key(request.account_id);
        let Some(_guard) = self.locks.try_acquire(&key, self.config.lock_ttl()).await? else {
            warn!(lock_key = %key, "Payment creation already in progress for account");
            return Err(PaymentError::SubjectLocked(key));
        };

        let check = self.duplicates.check(&request.candidate()).await?;
        if let DuplicateCheck::Duplicate { original } = check {
            warn!(original_payment_id = %original.id, "Duplicate batch payment suppressed");
            return Ok(CreatePaymentOutcome::Duplicate { original });
        }

        let method = self
            .methods
            .get(request.payment_method_id)
            .await
            .map_err(PaymentError::Port)?;
        let payment_type = method.payment_type();
        if !payment_type.is_electronic() {
            warn!(payment_method_id = %method.id, %payment_type, "Payment method cannot be charged through a gateway");
            return Err(PaymentError::UnsupportedInstrument(payment_type.to_string()));
        }

        let operation = request.operation();
        let marker = PaymentStateMachine::in_flight(operation)
            .ok_or_else(|| PaymentError::Configuration(format!("{} does not create payments", operation)))?;
        let mut payment = Payment::new(
            request.account_id,
            request.payment_method_id,
            payment_type,
            request.amount,
            marker,
        )
        .with_invoices(request.invoice_ids.clone())
        .as_batch(request.is_batch_payment);

        let reference_id = request
            .reference_id
            .clone()
            .unwrap_or_else(|| default_reference_id(payment.id));
        let mut operation_request = method
            .apply_to(OperationRequest::new())
            .with_amount(request.amount)
            .with_reference_id(reference_id)
            .for_payment(payment.id);
        if let Some(description) = &request.charge_description {
            operation_request = operation_request.with_charge_description(description.clone());
        }

        let violations = validate(operation, &operation_request);
        if !violations.is_empty() {
            warn!(violations = %violations, "Payment request failed validation");
            return Err(PaymentError::OperationValidationFailed(violations));
        }

        self.payments.insert(&payment).await?;
        let result = self.dispatch(operation, &operation_request).await?;
        payment.apply_result(operation, marker, &result, Utc::now());
        self.payments.update(&payment).await?;

        info!(payment_id = %payment.id, status = %payment.status, "Payment created");
        Ok(CreatePaymentOutcome::Processed(PaymentOutcome { payment, result }))
    }

    /// Captures a previously authorized payment
    ///
    /// `amount` defaults to the authorized amount.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn capture(
        &self,
        payment_id: PaymentId,
        amount: Option<Money>,
    ) -> Result<PaymentOutcome, PaymentError> {
        self.capture_at(payment_id, amount, Utc::now()).await
    }

    /// Captures as of `now`
    pub async fn capture_at(
        &self,
        payment_id: PaymentId,
        amount: Option<Money>,
        now: DateTime<Utc>,
    ) -> Result<PaymentOutcome, PaymentError> {
        self.ensure_gateway()?;
        let payment = self.load(payment_id).await?;
        PaymentStateMachine::check_source(payment.id, OperationType::Capture, payment.status)?;

        let processed_at = payment.effective_processed_at();
        if !capture_window_open(processed_at, now) {
            warn!(%processed_at, "Authorization too old to capture");
            return Err(PaymentError::CaptureWindowExpired {
                payment_id,
                processed_at,
            });
        }

        let request = self
            .existing_request(&payment)
            .with_amount(amount.unwrap_or(payment.amount));
        self.run_on_existing(payment, OperationType::Capture, request).await
    }

    /// Voids an authorization or unsettled capture
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn cancel(&self, payment_id: PaymentId) -> Result<PaymentOutcome, PaymentError> {
        self.ensure_gateway()?;
        let payment = self.load(payment_id).await?;
        PaymentStateMachine::check_source(payment.id, OperationType::Cancel, payment.status)?;

        let request = self.existing_request(&payment);
        self.run_on_existing(payment, OperationType::Cancel, request).await
    }

    /// Asks the gateway for the payment's transaction state; never changes the payment
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn check_status(&self, payment_id: PaymentId) -> Result<OperationResult, PaymentError> {
        self.ensure_gateway()?;
        let payment = self.load(payment_id).await?;
        let request = self.existing_request(&payment);
        self.processor.status(&request).await?.into_validated()
    }

    /// Runs `operation` against a stored payment
    ///
    /// Validation happens before the in-flight marker is written, so a
    /// rejected request leaves the payment untouched.
    pub(crate) async fn run_on_existing(
        &self,
        payment: Payment,
        operation: OperationType,
        request: OperationRequest,
    ) -> Result<PaymentOutcome, PaymentError> {
        run_on_existing(&*self.payments, &self.processor, payment, operation, request).await
    }

    async fn dispatch(
        &self,
        operation: OperationType,
        request: &OperationRequest,
    ) -> Result<OperationResult, PaymentError> {
        dispatch(&self.processor, operation, request).await
    }

    fn existing_request(&self, payment: &Payment) -> OperationRequest {
        let mut request = OperationRequest::new()
            .with_payment_type(payment.payment_type)
            .for_payment(payment.id);
        if let Some(transaction_id) = &payment.gateway_transaction_id {
            request = request.with_reference_transaction_id(transaction_id.clone());
        }
        request
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

/// Routes an operation to the matching processor entry point
pub(crate) async fn dispatch(
    processor: &PaymentProcessor,
    operation: OperationType,
    request: &OperationRequest,
) -> Result<OperationResult, PaymentError> {
    match operation {
        OperationType::Authorize => processor.authorize(request).await,
        OperationType::AuthCapture => processor.sale(request).await,
        OperationType::Capture => processor.capture(request).await,
        OperationType::Cancel => processor.cancel(request).await,
        OperationType::Credit => processor.credit(request).await,
        OperationType::CheckStatus => processor.status(request).await,
        OperationType::Tokenize => processor.tokenize(request).await,
    }
}

pub(crate) async fn run_on_existing(
    payments: &dyn PaymentRepository,
    processor: &PaymentProcessor,
    mut payment: Payment,
    operation: OperationType,
    request: OperationRequest,
) -> Result<PaymentOutcome, PaymentError> {
    let violations = validate(operation, &request);
    if !violations.is_empty() {
        warn!(payment_id = %payment.id, %operation, violations = %violations, "Operation failed validation");
        return Err(PaymentError::OperationValidationFailed(violations));
    }

    let prior = payment.status;
    if let Some(marker) = PaymentStateMachine::in_flight(operation) {
        payment.transition_to(marker);
        payments.update(&payment).await?;
    }

    let result = dispatch(processor, operation, &request).await?;
    payment.apply_result(operation, prior, &result, Utc::now());
    payments.update(&payment).await?;

    if result.is_successful() {
        info!(payment_id = %payment.id, %operation, status = %payment.status, "Operation applied");
    } else {
        warn!(
            payment_id = %payment.id,
            %operation,
            status = %payment.status,
            error = %result.failure_reason(),
            "Operation failed; payment restored"
        );
    }
    Ok(PaymentOutcome { payment, result })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_window_boundary() {
        let processed_at = Utc::now();
        let seven_days = Duration::days(7);

        assert!(capture_window_open(processed_at, processed_at + seven_days));
        assert!(capture_window_open(processed_at, processed_at + seven_days - Duration::seconds(1)));
        assert!(!capture_window_open(processed_at, processed_at + seven_days + Duration::seconds(1)));
    }

    #[test]
    fn test_default_reference_id_is_valid() {
        use crate::operation::OperationField;
        let reference = default_reference_id(PaymentId::new());
        assert!(OperationField::ReferenceId.check(&reference).is_ok());
    }
}
