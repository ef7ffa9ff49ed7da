//! Gateway-agnostic payment processor
//!
//! Every public operation runs the same pipeline: validate, dispatch,
//! interpret, log. Validation failures stop before the gateway is
//! contacted. Transport errors are reported as failed results carrying the
//! error text, indistinguishable from a decline.
//!
//! Once the gateway has answered, the result is returned even if the
//! transaction log write fails; the failure is logged at error level with
//! the gateway transaction id so the entry can be reconciled.
//!
//! The processor holds no per-call state, so a single instance can be
//! shared across tasks.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::error::PaymentError;
use crate::gateway::Gateway;
use crate::operation::{validate, OperationField, OperationRequest, OperationResult, OperationType};
use crate::ports::TransactionRepository;
use crate::transaction::Transaction;

/// Warning attached when the gateway wants an email the request lacks
pub const MISSING_EMAIL_WARNING: &str = "gateway requires an email address but none was provided";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Logging {
    Logged,
    Unlogged,
}

/// Dispatches operations to the configured gateway
#[derive(Clone)]
pub struct PaymentProcessor {
    gateway: Option<Arc<dyn Gateway>>,
    transactions: Arc<dyn TransactionRepository>,
}

impl PaymentProcessor {
    /// Creates a processor with no gateway; every operation fails with
    /// `MissingGateway` until one is attached
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self {
            gateway: None,
            transactions,
        }
    }

    /// Attaches the gateway all operations go through
    pub fn with_gateway(mut self, gateway: Arc<dyn Gateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn gateway_name(&self) -> Option<&str> {
        self.gateway.as_deref().map(|g| g.name())
    }

    /// Authorize and capture in one step
    pub async fn sale(&self, request: &OperationRequest) -> Result<OperationResult, PaymentError> {
        self.execute(OperationType::AuthCapture, request, Logging::Logged).await
    }

    pub async fn authorize(&self, request: &OperationRequest) -> Result<OperationResult, PaymentError> {
        self.execute(OperationType::Authorize, request, Logging::Logged).await
    }

    pub async fn capture(&self, request: &OperationRequest) -> Result<OperationResult, PaymentError> {
        self.execute(OperationType::Capture, request, Logging::Logged).await
    }

    pub async fn cancel(&self, request: &OperationRequest) -> Result<OperationResult, PaymentError> {
        self.execute(OperationType::Cancel, request, Logging::Logged).await
    }

    /// Cancel without a transaction log entry
    pub async fn void(&self, request: &OperationRequest) -> Result<OperationResult, PaymentError> {
        self.execute(OperationType::Cancel, request, Logging::Unlogged).await
    }

    pub async fn status(&self, request: &OperationRequest) -> Result<OperationResult, PaymentError> {
        self.execute(OperationType::CheckStatus, request, Logging::Unlogged).await
    }

    pub async fn credit(&self, request: &OperationRequest) -> Result<OperationResult, PaymentError> {
        self.execute(OperationType::Credit, request, Logging::Logged).await
    }

    pub async fn tokenize(&self, request: &OperationRequest) -> Result<OperationResult, PaymentError> {
        self.execute(OperationType::Tokenize, request, Logging::Unlogged).await
    }

    #[instrument(skip(self, request), fields(operation = %operation, payment_id))]
    async fn execute(
        &self,
        operation: OperationType,
        request: &OperationRequest,
        logging: Logging,
    ) -> Result<OperationResult, PaymentError> {
        let gateway = self.gateway.as_deref().ok_or(PaymentError::MissingGateway)?;
        if let Some(payment_id) = request.payment_id() {
            tracing::Span::current().record("payment_id", tracing::field::display(payment_id));
        }

        let mut warnings = Vec::new();
        if gateway.requires_email() && !request.has(OperationField::Email) {
            warn!(gateway = gateway.name(), "{}", MISSING_EMAIL_WARNING);
            warnings.push(MISSING_EMAIL_WARNING.to_string());
        }

        let violations = validate(operation, request);
        if !violations.is_empty() {
            warn!(violations = %violations, "Operation rejected by validation");
            return Ok(OperationResult::rejected(operation, violations).with_warnings(warnings));
        }

        debug!(gateway = gateway.name(), "Dispatching operation");
        let result = match gateway.submit(operation, request).await {
            Ok(response) => OperationResult::from_gateway(operation, response),
            Err(e) => {
                warn!(gateway = gateway.name(), error = %e, "Gateway call failed");
                OperationResult::transport_failure(operation, e.to_string())
            }
        }
        .with_warnings(warnings);

        if result.is_successful() {
            info!(transaction_id = ?result.transaction_id, "Operation approved");
        } else {
            warn!(error = ?result.error_message, status = ?result.transaction_status, "Operation declined");
        }

        if logging == Logging::Logged {
            if let Some(payment_id) = request.payment_id() {
                if let Err(e) = self
                    .transactions
                    .append(&Transaction::record(payment_id, &result))
                    .await
                {
                    error!(
                        %payment_id,
                        transaction_id = ?result.transaction_id,
                        successful = result.is_successful(),
                        error = %e,
                        "Failed to record gateway transaction"
                    );
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryTransactionRepository;
    use crate::gateway::GatewayResponse;
    use async_trait::async_trait;
    use core_kernel::{Currency, Money, PaymentId, PortError};
    use std::sync::Mutex;

    struct StubGateway {
        requires_email: bool,
        outcome: Result<GatewayResponse, String>,
        calls: Mutex<Vec<OperationType>>,
    }

    impl StubGateway {
        fn approving() -> Self {
            Self {
                requires_email: false,
                outcome: Ok(GatewayResponse::approved("gw-1", "APPROVED")),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                outcome: Err(message.to_string()),
                ..Self::approving()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Gateway for StubGateway {
        fn name(&self) -> &str {
            "stub"
        }

        fn requires_email(&self) -> bool {
            self.requires_email
        }

        async fn submit(
            &self,
            operation: OperationType,
            _request: &OperationRequest,
        ) -> Result<GatewayResponse, PortError> {
            self.calls.lock().unwrap().push(operation);
            self.outcome.clone().map_err(PortError::connection)
        }
    }

    fn processor(gateway: Arc<StubGateway>) -> (PaymentProcessor, Arc<InMemoryTransactionRepository>) {
        let transactions = Arc::new(InMemoryTransactionRepository::new());
        let processor = PaymentProcessor::new(transactions.clone()).with_gateway(gateway);
        (processor, transactions)
    }

    fn sale_request(payment_id: PaymentId) -> OperationRequest {
        OperationRequest::new()
            .with_amount(Money::from_minor(2500, Currency::USD))
            .with_reference_id("INV-1001")
            .with_token("tok_4242abcd")
            .for_payment(payment_id)
    }

    #[tokio::test]
    async fn test_missing_gateway_is_fatal() {
        let processor = PaymentProcessor::new(Arc::new(InMemoryTransactionRepository::new()));
        let result = processor.sale(&sale_request(PaymentId::new())).await;
        assert!(matches!(result, Err(PaymentError::MissingGateway)));
    }

    #[tokio::test]
    async fn test_validation_failure_skips_gateway_and_log() {
        let gateway = Arc::new(StubGateway::approving());
        let (processor, transactions) = processor(gateway.clone());
        let payment_id = PaymentId::new();
        let request = OperationRequest::new().for_payment(payment_id);

        let result = processor.sale(&request).await.unwrap();

        assert!(!result.is_successful());
        assert!(result.is_validation_failure());
        assert_eq!(gateway.call_count(), 0);
        assert!(transactions.list_for_payment(payment_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logged_operation_records_transaction() {
        let gateway = Arc::new(StubGateway::approving());
        let (processor, transactions) = processor(gateway);
        let payment_id = PaymentId::new();

        let result = processor.sale(&sale_request(payment_id)).await.unwrap();
        assert!(result.is_successful());

        let logged = transactions.list_for_payment(payment_id).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].operation, OperationType::AuthCapture);
        assert_eq!(logged[0].gateway_transaction_id.as_deref(), Some("gw-1"));
    }

    #[tokio::test]
    async fn test_void_is_never_logged() {
        let gateway = Arc::new(StubGateway::approving());
        let (processor, transactions) = processor(gateway.clone());
        let payment_id = PaymentId::new();
        let request = OperationRequest::new()
            .with_reference_transaction_id("gw-1")
            .for_payment(payment_id);

        let result = processor.void(&request).await.unwrap();

        assert!(result.is_successful());
        assert_eq!(gateway.call_count(), 1);
        assert!(transactions.list_for_payment(payment_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_becomes_failed_result() {
        let gateway = Arc::new(StubGateway::failing("connection reset by peer"));
        let (processor, transactions) = processor(gateway);
        let payment_id = PaymentId::new();

        let result = processor.sale(&sale_request(payment_id)).await.unwrap();

        assert!(!result.is_successful());
        assert!(result.failure_reason().contains("connection reset by peer"));
        let logged = transactions.list_for_payment(payment_id).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert!(!logged[0].successful);
    }

    struct UnavailableLog;

    impl core_kernel::DomainPort for UnavailableLog {}

    #[async_trait]
    impl TransactionRepository for UnavailableLog {
        async fn append(&self, _transaction: &Transaction) -> Result<(), PortError> {
            Err(PortError::ServiceUnavailable {
                service: "transaction log".to_string(),
            })
        }

        async fn list_for_payment(&self, _payment_id: PaymentId) -> Result<Vec<Transaction>, PortError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_log_failure_keeps_gateway_result() {
        let gateway = Arc::new(StubGateway::approving());
        let processor = PaymentProcessor::new(Arc::new(UnavailableLog)).with_gateway(gateway.clone());

        let result = processor.sale(&sale_request(PaymentId::new())).await.unwrap();

        assert!(result.is_successful());
        assert_eq!(result.transaction_id.as_deref(), Some("gw-1"));
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_email_warning() {
        let gateway = Arc::new(StubGateway {
            requires_email: true,
            ..StubGateway::approving()
        });
        let (processor, _) = processor(gateway);

        let result = processor.sale(&sale_request(PaymentId::new())).await.unwrap();
        assert!(result.is_successful());
        assert_eq!(result.warnings, vec![MISSING_EMAIL_WARNING.to_string()]);

        let with_email = sale_request(PaymentId::new()).with_email("ada@example.com");
        let result = processor.sale(&with_email).await.unwrap();
        assert!(result.warnings.is_empty());
    }
}
