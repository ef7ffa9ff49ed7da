//! Scheduling domain errors

use thiserror::Error;

use core_kernel::{PortError, ScheduledPaymentId};
use domain_payments::PaymentError;

use crate::scheduled::TriggerType;

/// Errors raised by the scheduled payment pipeline
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// A trigger type has no handler; the run is aborted
    #[error("Scheduled payment trigger not implemented: {0}")]
    ScheduledPaymentTriggerNotImplemented(TriggerType),

    /// The scheduled payment's metadata cannot drive its trigger
    #[error("Scheduled payment {scheduled_payment_id} has invalid metadata: {reason}")]
    ScheduledPaymentTriggerMetadataInvalid {
        scheduled_payment_id: ScheduledPaymentId,
        reason: String,
    },

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Payment creation failed fatally
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Repository or lookup failure
    #[error("Port error: {0}")]
    Port(#[from] PortError),
}

impl SchedulingError {
    /// Creates a metadata error
    pub fn metadata_invalid(scheduled_payment_id: ScheduledPaymentId, reason: impl Into<String>) -> Self {
        SchedulingError::ScheduledPaymentTriggerMetadataInvalid {
            scheduled_payment_id,
            reason: reason.into(),
        }
    }

    /// Returns true if the whole run must stop
    ///
    /// Metadata and port failures only affect the item being handled.
    pub fn is_fatal(&self) -> bool {
        match self {
            SchedulingError::ScheduledPaymentTriggerNotImplemented(_)
            | SchedulingError::Configuration(_) => true,
            SchedulingError::Payment(e) => matches!(
                e,
                PaymentError::MissingGateway | PaymentError::Configuration(_)
            ),
            SchedulingError::ScheduledPaymentTriggerMetadataInvalid { .. }
            | SchedulingError::Port(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(SchedulingError::ScheduledPaymentTriggerNotImplemented(TriggerType::NextServiceCompleted).is_fatal());
        assert!(SchedulingError::Payment(PaymentError::MissingGateway).is_fatal());
        assert!(!SchedulingError::metadata_invalid(ScheduledPaymentId::new(), "missing").is_fatal());
        assert!(!SchedulingError::Port(PortError::connection("reset")).is_fatal());
    }
}
