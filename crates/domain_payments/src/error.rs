//! Payment domain errors

use chrono::{DateTime, Utc};
use thiserror::Error;

use core_kernel::{MoneyError, PaymentId, PortError};

use crate::operation::{OperationType, ValidationErrors};
use crate::status::PaymentStatus;

/// Errors that can occur in the payment domain
///
/// Gateway declines are *not* errors: they come back as an unsuccessful
/// [`OperationResult`](crate::operation::OperationResult). This type covers
/// preconditions, validation, policy hard stops and infrastructure failures.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// An operation was attempted before a gateway was configured
    #[error("No payment gateway configured")]
    MissingGateway,

    /// The operation request failed field validation
    #[error("Operation validation failed: {0}")]
    OperationValidationFailed(ValidationErrors),

    /// A prior payment in the lineage is suspended
    #[error("Payment suspended: {0}")]
    PaymentSuspended(String),

    /// A prior payment in the lineage is terminated
    #[error("Payment terminated: {0}")]
    PaymentTerminated(String),

    /// The refund is outside the allowed number of days
    #[error("Refund window of {days_allowed} days exceeded for payment {payment_id}")]
    RefundWindowExceeded {
        payment_id: PaymentId,
        days_allowed: u32,
    },

    /// A configured refund window above the hard ceiling
    #[error("Refund days allowed ({requested}) exceeds technical limit of {limit}")]
    RefundDaysAllowedExceedsTechnicalLimit {
        requested: u32,
        limit: u32,
    },

    /// The original payment was not made with an electronic instrument
    #[error("Payment {0} was not made with an electronic instrument and cannot be refunded")]
    RefundNotElectronic(PaymentId),

    /// The refund request is inconsistent with the original payment
    #[error("Invalid refund: {0}")]
    InvalidRefund(String),

    /// The authorization is too old to capture
    #[error("Capture window expired for payment {payment_id} (processed at {processed_at})")]
    CaptureWindowExpired {
        payment_id: PaymentId,
        processed_at: DateTime<Utc>,
    },

    /// The operation is not legal from the payment's current status
    #[error("Cannot {operation} payment {payment_id} in status {status}")]
    InvalidStateTransition {
        payment_id: PaymentId,
        operation: OperationType,
        status: PaymentStatus,
    },

    /// The payment method cannot be charged through a gateway
    #[error("Unsupported payment instrument: {0}")]
    UnsupportedInstrument(String),

    /// Another request holds the lock for this subject
    #[error("Subject '{0}' is locked by another request; retry later")]
    SubjectLocked(String),

    /// Payment not found
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Money arithmetic failure
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// Repository, lookup or lock provider failure
    #[error("Port error: {0}")]
    Port(#[from] PortError),
}

impl PaymentError {
    /// Creates an invalid refund error
    pub fn invalid_refund(message: impl Into<String>) -> Self {
        PaymentError::InvalidRefund(message.into())
    }

    /// Maps a repository `NotFound` onto `PaymentNotFound`
    pub fn from_lookup(id: PaymentId, error: PortError) -> Self {
        if error.is_not_found() {
            PaymentError::PaymentNotFound(id)
        } else {
            PaymentError::Port(error)
        }
    }

    /// Returns true if the caller may retry the same request later
    ///
    /// Lock contention maps to a too-many-requests response at the API edge.
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::SubjectLocked(_) => true,
            PaymentError::Port(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns true for the lineage hard stops raised by duplicate detection
    pub fn is_policy_hard_stop(&self) -> bool {
        matches!(
            self,
            PaymentError::PaymentSuspended(_) | PaymentError::PaymentTerminated(_)
        )
    }
}
