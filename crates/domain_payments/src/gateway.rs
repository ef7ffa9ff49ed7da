//! Payment gateway port
//!
//! The engine talks to exactly one gateway per processor. A gateway turns
//! an operation into whatever wire format it speaks; the engine only sees
//! the normalized [`GatewayResponse`]. Declines are successful calls with
//! `is_successful == false`; an `Err` means the call itself failed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::PortError;

use crate::operation::{OperationRequest, OperationType};

/// Normalized gateway reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub is_successful: bool,
    pub transaction_id: Option<String>,
    pub transaction_status: Option<String>,
    pub raw_response: Option<String>,
    pub error_message: Option<String>,
}

impl GatewayResponse {
    /// An approval carrying the gateway's transaction id
    pub fn approved(transaction_id: impl Into<String>, transaction_status: impl Into<String>) -> Self {
        Self {
            is_successful: true,
            transaction_id: Some(transaction_id.into()),
            transaction_status: Some(transaction_status.into()),
            ..Default::default()
        }
    }

    /// A decline with the gateway's error text
    pub fn declined(transaction_status: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            is_successful: false,
            transaction_status: Some(transaction_status.into()),
            error_message: Some(error_message.into()),
            ..Default::default()
        }
    }

    pub fn with_raw_response(mut self, raw: impl Into<String>) -> Self {
        self.raw_response = Some(raw.into());
        self
    }
}

/// A payment gateway
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether the gateway expects an email on every request
    fn requires_email(&self) -> bool {
        false
    }

    /// Submits one operation
    async fn submit(
        &self,
        operation: OperationType,
        request: &OperationRequest,
    ) -> Result<GatewayResponse, PortError>;
}
