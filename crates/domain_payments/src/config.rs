//! Payment engine configuration
//!
//! Business parameters are deserialized (the CLI loads them through the
//! `config` crate); technical ceilings are constants and cannot be raised
//! by configuration.

use serde::Deserialize;
use std::time::Duration;

use crate::error::PaymentError;

/// Hard upper bound on the refund window, in days
pub const TECHNICAL_REFUND_DAYS_LIMIT: u32 = 45;

/// Authorizations older than this many days can no longer be captured
pub const CAPTURE_WINDOW_DAYS: i64 = 7;

/// First synthetic external reference id handed out by batch refunds
pub const SYNTHETIC_EXTERNAL_REF_BASE: u64 = 1_000_000_000;

/// Tunable payment engine settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Days after processing during which a refund is allowed
    pub refund_days_allowed: u32,
    /// Trailing window, in calendar days, for duplicate batch detection
    pub duplicate_window_days: i64,
    /// How long a per-subject lock is held before it expires
    pub lock_ttl_secs: u64,
    /// Base value for synthetic external reference ids
    pub synthetic_external_ref_base: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            refund_days_allowed: TECHNICAL_REFUND_DAYS_LIMIT,
            duplicate_window_days: 7,
            lock_ttl_secs: 5,
            synthetic_external_ref_base: SYNTHETIC_EXTERNAL_REF_BASE,
        }
    }
}

impl PaymentsConfig {
    /// Checks configured values against the technical ceilings
    pub fn validate(&self) -> Result<(), PaymentError> {
        ensure_refund_days_allowed(self.refund_days_allowed)?;
        if self.duplicate_window_days < 0 {
            return Err(PaymentError::Configuration(format!(
                "duplicate_window_days must not be negative, got {}",
                self.duplicate_window_days
            )));
        }
        if self.lock_ttl_secs == 0 {
            return Err(PaymentError::Configuration(
                "lock_ttl_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }
}

/// Rejects a refund window above [`TECHNICAL_REFUND_DAYS_LIMIT`]
pub fn ensure_refund_days_allowed(days_allowed: u32) -> Result<u32, PaymentError> {
    if days_allowed > TECHNICAL_REFUND_DAYS_LIMIT {
        return Err(PaymentError::RefundDaysAllowedExceedsTechnicalLimit {
            requested: days_allowed,
            limit: TECHNICAL_REFUND_DAYS_LIMIT,
        });
    }
    Ok(days_allowed)
}
