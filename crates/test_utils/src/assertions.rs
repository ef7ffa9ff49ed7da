//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful failure
//! messages than plain `assert_eq!`.

use core_kernel::Money;
use domain_payments::{Payment, PaymentStatus, ValidationErrors, ViolationKind};

use crate::gateway::ScriptedGateway;

/// Asserts a payment's status, printing the payment on failure
pub fn assert_status(payment: &Payment, expected: PaymentStatus) {
    assert_eq!(
        payment.status, expected,
        "Payment {} has status {}, expected {}: {:?}",
        payment.id, payment.status, expected, payment
    );
}

/// Asserts two Money values are identical in amount and currency
pub fn assert_money_eq(actual: &Money, expected: &Money) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_eq!(
        actual.amount_minor(),
        expected.amount_minor(),
        "Amount mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts the violated fields, in order
pub fn assert_violation_fields(errors: &ValidationErrors, expected: &[&str]) {
    let fields: Vec<&str> = errors.iter().map(|v| v.field).collect();
    assert_eq!(fields, expected, "Unexpected violations: {}", errors);
}

/// Asserts at least one violation of `kind` on `field`
pub fn assert_violation(errors: &ValidationErrors, field: &str, kind: ViolationKind) {
    assert!(
        errors.iter().any(|v| v.field == field && v.kind == kind),
        "Expected {:?} violation on {}, got: {}",
        kind,
        field,
        errors
    );
}

/// Asserts that nothing was sent to the gateway
pub fn assert_no_gateway_calls(gateway: &ScriptedGateway) {
    assert_eq!(
        gateway.call_count(),
        0,
        "Expected no gateway calls, got {:?}",
        gateway.operations()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    #[test]
    fn test_assert_money_eq() {
        assert_money_eq(
            &Money::from_minor(500, Currency::USD),
            &Money::from_minor(500, Currency::USD),
        );
    }

    #[test]
    #[should_panic(expected = "Currency mismatch")]
    fn test_assert_money_eq_currency_mismatch() {
        assert_money_eq(
            &Money::from_minor(500, Currency::USD),
            &Money::from_minor(500, Currency::EUR),
        );
    }
}
