//! Gateway transaction log
//!
//! One append-only row per logged gateway call. A payment accumulates
//! several rows as it moves through authorize, capture and cancel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{PaymentId, TransactionId};

use crate::operation::{OperationResult, OperationType};

/// A logged gateway call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,
    /// Owning payment
    pub payment_id: PaymentId,
    /// Operation that was submitted
    pub operation: OperationType,
    /// Whether the gateway approved it
    pub successful: bool,
    /// Gateway response / transaction status code
    pub response_code: Option<String>,
    /// Gateway transaction id
    pub gateway_transaction_id: Option<String>,
    /// Raw gateway payload
    pub raw_response: Option<String>,
    /// Gateway error text, verbatim
    pub error_message: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Records the outcome of a dispatched operation against `payment_id`
    pub fn record(payment_id: PaymentId, result: &OperationResult) -> Self {
        Self {
            id: TransactionId::new_v7(),
            payment_id,
            operation: result.operation,
            successful: result.is_successful(),
            response_code: result.transaction_status.clone(),
            gateway_transaction_id: result.transaction_id.clone(),
            raw_response: result.raw_response.clone(),
            error_message: result.error_message.clone(),
            created_at: Utc::now(),
        }
    }
}
