//! Payment status lifecycle
//!
//! Statuses only move as the result of an operation. Each operation type
//! owns its legal source statuses, an in-flight marker written just before
//! the gateway call, and its success and failure targets:
//!
//! | Operation   | Legal source                                   | Success   | Failure   |
//! |-------------|------------------------------------------------|-----------|-----------|
//! | Authorize   | new payment                                    | AUTHORIZED| DECLINED  |
//! | AuthCapture | new payment                                    | CAPTURED  | DECLINED  |
//! | Capture     | AUTHORIZED                                     | CAPTURED  | unchanged |
//! | Cancel      | CAPTURED, CAPTURING, AUTHORIZING, AUTHORIZED, AUTH_CAPTURING | CANCELLED | unchanged |
//! | Credit      | original CAPTURED                              | CREDITED  | unchanged |
//!
//! CheckStatus and Tokenize never move a payment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{PaymentId, PortError};

use crate::error::PaymentError;
use crate::operation::OperationType;

/// Lifecycle status of a payment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    AuthCapturing,
    Captured,
    Authorizing,
    Authorized,
    Capturing,
    Cancelling,
    Cancelled,
    Crediting,
    Credited,
    Declined,
    Suspended,
    Terminated,
    Processed,
    Returned,
    Settled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::AuthCapturing => "AUTH_CAPTURING",
            PaymentStatus::Captured => "CAPTURED",
            PaymentStatus::Authorizing => "AUTHORIZING",
            PaymentStatus::Authorized => "AUTHORIZED",
            PaymentStatus::Capturing => "CAPTURING",
            PaymentStatus::Cancelling => "CANCELLING",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Crediting => "CREDITING",
            PaymentStatus::Credited => "CREDITED",
            PaymentStatus::Declined => "DECLINED",
            PaymentStatus::Suspended => "SUSPENDED",
            PaymentStatus::Terminated => "TERMINATED",
            PaymentStatus::Processed => "PROCESSED",
            PaymentStatus::Returned => "RETURNED",
            PaymentStatus::Settled => "SETTLED",
        }
    }

    /// In-flight markers, replaced once the gateway responds
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PaymentStatus::AuthCapturing
                | PaymentStatus::Authorizing
                | PaymentStatus::Capturing
                | PaymentStatus::Cancelling
                | PaymentStatus::Crediting
        )
    }

    /// Statuses that represent money successfully taken or held
    pub fn is_successful_charge(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Authorized
                | PaymentStatus::Captured
                | PaymentStatus::Processed
                | PaymentStatus::Settled
        )
    }

    /// Upstream hard-stop statuses consulted by duplicate detection
    pub fn is_halted(&self) -> bool {
        matches!(self, PaymentStatus::Suspended | PaymentStatus::Terminated)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "AUTH_CAPTURING" => PaymentStatus::AuthCapturing,
            "CAPTURED" => PaymentStatus::Captured,
            "AUTHORIZING" => PaymentStatus::Authorizing,
            "AUTHORIZED" => PaymentStatus::Authorized,
            "CAPTURING" => PaymentStatus::Capturing,
            "CANCELLING" => PaymentStatus::Cancelling,
            "CANCELLED" => PaymentStatus::Cancelled,
            "CREDITING" => PaymentStatus::Crediting,
            "CREDITED" => PaymentStatus::Credited,
            "DECLINED" => PaymentStatus::Declined,
            "SUSPENDED" => PaymentStatus::Suspended,
            "TERMINATED" => PaymentStatus::Terminated,
            "PROCESSED" => PaymentStatus::Processed,
            "RETURNED" => PaymentStatus::Returned,
            "SETTLED" => PaymentStatus::Settled,
            other => {
                return Err(PortError::transformation(format!(
                    "unknown payment status '{}'",
                    other
                )))
            }
        };
        Ok(status)
    }
}

/// Operation-scoped transition rules
pub struct PaymentStateMachine;

impl PaymentStateMachine {
    /// Statuses an existing payment must be in before `operation` may run
    ///
    /// `None` means the operation creates the payment and has no source.
    pub fn legal_sources(operation: OperationType) -> Option<&'static [PaymentStatus]> {
        match operation {
            OperationType::Authorize | OperationType::AuthCapture => None,
            OperationType::Capture => Some(&[PaymentStatus::Authorized]),
            OperationType::Cancel => Some(&[
                PaymentStatus::Captured,
                PaymentStatus::Capturing,
                PaymentStatus::Authorizing,
                PaymentStatus::Authorized,
                PaymentStatus::AuthCapturing,
            ]),
            OperationType::Credit => Some(&[PaymentStatus::Captured]),
            OperationType::CheckStatus | OperationType::Tokenize => None,
        }
    }

    /// Checks that `operation` may run against a payment in `current`
    ///
    /// For Credit, `current` is the status of the original payment being
    /// refunded.
    pub fn check_source(
        payment_id: PaymentId,
        operation: OperationType,
        current: PaymentStatus,
    ) -> Result<(), PaymentError> {
        let legal = match Self::legal_sources(operation) {
            Some(sources) => sources.contains(&current),
            // creating operations never target an existing payment; read-only ones may target any
            None => !operation.moves_status(),
        };
        if legal {
            Ok(())
        } else {
            Err(PaymentError::InvalidStateTransition {
                payment_id,
                operation,
                status: current,
            })
        }
    }

    /// Marker written before the gateway call
    pub fn in_flight(operation: OperationType) -> Option<PaymentStatus> {
        match operation {
            OperationType::Authorize => Some(PaymentStatus::Authorizing),
            OperationType::AuthCapture => Some(PaymentStatus::AuthCapturing),
            OperationType::Capture => Some(PaymentStatus::Capturing),
            OperationType::Cancel => Some(PaymentStatus::Cancelling),
            OperationType::Credit => Some(PaymentStatus::Crediting),
            OperationType::CheckStatus | OperationType::Tokenize => None,
        }
    }

    /// Target status once the gateway approves
    pub fn on_success(operation: OperationType) -> Option<PaymentStatus> {
        match operation {
            OperationType::Authorize => Some(PaymentStatus::Authorized),
            OperationType::AuthCapture | OperationType::Capture => Some(PaymentStatus::Captured),
            OperationType::Cancel => Some(PaymentStatus::Cancelled),
            OperationType::Credit => Some(PaymentStatus::Credited),
            OperationType::CheckStatus | OperationType::Tokenize => None,
        }
    }

    /// Target status once the gateway declines or errors
    ///
    /// Operations that created the payment land in DECLINED. Everything else
    /// restores `prior`; a refund payment created for the attempt passes
    /// DECLINED as its prior status.
    pub fn on_failure(operation: OperationType, prior: PaymentStatus) -> PaymentStatus {
        match operation {
            OperationType::Authorize | OperationType::AuthCapture => PaymentStatus::Declined,
            OperationType::Capture
            | OperationType::Cancel
            | OperationType::Credit
            | OperationType::CheckStatus
            | OperationType::Tokenize => prior,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            PaymentStatus::AuthCapturing,
            PaymentStatus::Captured,
            PaymentStatus::Credited,
            PaymentStatus::Settled,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("PENDING".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_transient_markers() {
        assert!(PaymentStatus::Capturing.is_transient());
        assert!(!PaymentStatus::Captured.is_transient());
        assert!(!PaymentStatus::Declined.is_transient());
    }

    #[test]
    fn test_capture_requires_authorized() {
        let id = PaymentId::new();
        assert!(PaymentStateMachine::check_source(id, OperationType::Capture, PaymentStatus::Authorized).is_ok());
        for status in [PaymentStatus::Captured, PaymentStatus::Declined, PaymentStatus::Authorizing] {
            assert!(matches!(
                PaymentStateMachine::check_source(id, OperationType::Capture, status),
                Err(PaymentError::InvalidStateTransition { .. })
            ));
        }
    }

    #[test]
    fn test_cancel_sources() {
        let id = PaymentId::new();
        assert!(PaymentStateMachine::check_source(id, OperationType::Cancel, PaymentStatus::AuthCapturing).is_ok());
        assert!(PaymentStateMachine::check_source(id, OperationType::Cancel, PaymentStatus::Cancelled).is_err());
        assert!(PaymentStateMachine::check_source(id, OperationType::Cancel, PaymentStatus::Credited).is_err());
    }

    #[test]
    fn test_failure_targets() {
        assert_eq!(
            PaymentStateMachine::on_failure(OperationType::Capture, PaymentStatus::Authorized),
            PaymentStatus::Authorized
        );
        assert_eq!(
            PaymentStateMachine::on_failure(OperationType::AuthCapture, PaymentStatus::AuthCapturing),
            PaymentStatus::Declined
        );
    }
}
