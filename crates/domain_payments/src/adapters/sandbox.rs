//! Deterministic sandbox gateway
//!
//! Approves every operation except charges and refunds whose amount ends in
//! 13 minor units (e.g. $10.13), which are declined. Useful for manual runs
//! of the batch CLI without gateway credentials.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use core_kernel::PortError;

use crate::gateway::{Gateway, GatewayResponse};
use crate::operation::{OperationField, OperationRequest, OperationType};

const DECLINE_SUFFIX: i64 = 13;

#[derive(Debug, Clone, Default)]
pub struct SandboxGateway {
    requires_email: bool,
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the sandbox behave like a gateway that insists on an email
    pub fn requiring_email(mut self) -> Self {
        self.requires_email = true;
        self
    }

    fn declines(request: &OperationRequest) -> bool {
        request
            .amount()
            .is_some_and(|a| a.amount_minor().rem_euclid(100) == DECLINE_SUFFIX)
    }
}

#[async_trait]
impl Gateway for SandboxGateway {
    fn name(&self) -> &str {
        "sandbox"
    }

    fn requires_email(&self) -> bool {
        self.requires_email
    }

    async fn submit(
        &self,
        operation: OperationType,
        request: &OperationRequest,
    ) -> Result<GatewayResponse, PortError> {
        debug!(operation = %operation, "Sandbox gateway received operation");

        if Self::declines(request) {
            let raw = json!({ "operation": operation.as_str(), "result": "declined", "code": "05" });
            return Ok(GatewayResponse::declined("DECLINED", "Do not honor").with_raw_response(raw.to_string()));
        }

        let transaction_id = match operation {
            OperationType::CheckStatus | OperationType::Cancel | OperationType::Capture => request
                .text(OperationField::ReferenceTransactionId)
                .map(str::to_string)
                .unwrap_or_else(|| format!("sbx_{}", Uuid::new_v4().simple())),
            OperationType::Tokenize => format!("tok_{}", Uuid::new_v4().simple()),
            _ => format!("sbx_{}", Uuid::new_v4().simple()),
        };
        let status = match operation {
            OperationType::Authorize => "AUTHORIZED",
            OperationType::AuthCapture | OperationType::Capture => "CAPTURED",
            OperationType::Cancel => "VOIDED",
            OperationType::Credit => "REFUNDED",
            OperationType::CheckStatus => "SETTLED",
            OperationType::Tokenize => "TOKENIZED",
        };
        let raw = json!({ "operation": operation.as_str(), "result": "approved", "id": transaction_id });

        Ok(GatewayResponse::approved(transaction_id, status).with_raw_response(raw.to_string()))
    }
}
