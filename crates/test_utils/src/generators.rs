//! Property-Based Test Generators
//!
//! Proptest strategies producing amounts, instruments and requests that
//! respect the validator's formats.

use core_kernel::{Currency, Money};
use domain_payments::{OperationRequest, PaymentType};
use proptest::prelude::*;

/// Strategy for generating Currency values
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::JPY),
        Just(Currency::CHF),
        Just(Currency::AUD),
        Just(Currency::CAD),
    ]
}

/// Strategy for positive amounts in minor units
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..1_000_000_000i64
}

/// Strategy for strictly negative amounts in minor units
pub fn negative_amount_minor_strategy() -> impl Strategy<Value = i64> {
    -1_000_000_000i64..0i64
}

pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (positive_amount_minor_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::from_minor(amount, currency))
}

pub fn negative_money_strategy() -> impl Strategy<Value = Money> {
    (negative_amount_minor_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::from_minor(amount, currency))
}

/// Strategy for gateway tokens
pub fn token_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_]{8,64}"
}

/// Strategy for merchant reference ids
pub fn reference_id_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{1,64}"
}

pub fn routing_number_strategy() -> impl Strategy<Value = String> {
    "[0-9]{9}"
}

pub fn account_number_strategy() -> impl Strategy<Value = String> {
    "[0-9]{4,17}"
}

/// Strategy for electronic payment types
pub fn electronic_payment_type_strategy() -> impl Strategy<Value = PaymentType> {
    prop_oneof![
        Just(PaymentType::CreditCard),
        Just(PaymentType::Ach),
        Just(PaymentType::AchToken),
    ]
}

/// A charge request with exactly one complete instrument group
pub fn valid_charge_request_strategy() -> impl Strategy<Value = OperationRequest> {
    let instrument = prop_oneof![
        token_strategy().prop_map(|t| OperationRequest::new().with_token(t)),
        (account_number_strategy(), routing_number_strategy())
            .prop_map(|(a, r)| OperationRequest::new().with_ach_account(a, r)),
        token_strategy().prop_map(|t| OperationRequest::new().with_ach_token(t)),
    ];
    (instrument, reference_id_strategy(), positive_money_strategy()).prop_map(
        |(request, reference, amount)| request.with_reference_id(reference).with_amount(amount),
    )
}
