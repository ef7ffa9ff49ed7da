//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for common entities across the payment
//! engine. These fixtures are consistent and predictable for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::{AccountId, Currency, InvoiceId, Money, PaymentMethodId, SubscriptionId};
use domain_payments::{BillingAddress, Instrument};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A standard USD charge ($100.00)
    pub fn usd_100() -> Money {
        Money::from_minor(10_000, Currency::USD)
    }

    /// A typical subscription charge ($49.99)
    pub fn usd_subscription() -> Money {
        Money::from_minor(4_999, Currency::USD)
    }

    /// An amount the sandbox gateway always declines ($10.13)
    pub fn usd_sandbox_decline() -> Money {
        Money::from_minor(1_013, Currency::USD)
    }

    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }

    /// A EUR amount for currency mismatch tests
    pub fn eur_100() -> Money {
        Money::from_minor(10_000, Currency::EUR)
    }

    /// One cent below zero
    pub fn usd_minus_one_cent() -> Money {
        Money::from_minor(-1, Currency::USD)
    }
}

/// Fixture for time-dependent tests
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// A fixed "now" (Mar 15, 2024 09:00 UTC)
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()
    }

    pub fn days_before_now(days: i64) -> DateTime<Utc> {
        Self::now() - Duration::days(days)
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn account_id() -> AccountId {
        AccountId::new()
    }

    pub fn payment_method_id() -> PaymentMethodId {
        PaymentMethodId::new()
    }

    pub fn subscription_id() -> SubscriptionId {
        SubscriptionId::new()
    }

    pub fn invoice_ids(count: usize) -> Vec<InvoiceId> {
        (0..count).map(|_| InvoiceId::new()).collect()
    }
}

/// Fixture for instrument and contact strings
pub struct StringFixtures;

impl StringFixtures {
    pub fn card_token() -> &'static str {
        "tok_4242424242424242"
    }

    pub fn ach_account_number() -> &'static str {
        "000123456789"
    }

    /// A routing number with a valid ABA checksum
    pub fn ach_routing_number() -> &'static str {
        "021000021"
    }

    pub fn ach_token() -> &'static str {
        "achtok_7f3a91"
    }

    pub fn email() -> &'static str {
        "jane.doe@example.com"
    }

    pub fn name_on_account() -> &'static str {
        "Jane Doe"
    }

    pub fn area() -> &'static str {
        "north-east"
    }
}

/// Randomized contact details for tests that store many methods
pub struct FakeFixtures;

impl FakeFixtures {
    pub fn email() -> String {
        SafeEmail().fake()
    }

    pub fn name_on_account() -> String {
        Name().fake()
    }
}

/// Fixture for payment instruments
pub struct InstrumentFixtures;

impl InstrumentFixtures {
    pub fn card() -> Instrument {
        Instrument::Card {
            token: StringFixtures::card_token().to_string(),
        }
    }

    pub fn ach() -> Instrument {
        Instrument::Ach {
            account_number: StringFixtures::ach_account_number().to_string(),
            routing_number: StringFixtures::ach_routing_number().to_string(),
        }
    }

    pub fn billing_address() -> BillingAddress {
        BillingAddress {
            line1: Some("100 Main Street".to_string()),
            city: Some("Springfield".to_string()),
            state: Some("IL".to_string()),
            zip: Some("62701".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_fixtures() {
        assert!(MoneyFixtures::usd_100().is_positive());
        assert!(MoneyFixtures::usd_zero().is_zero());
        assert!(MoneyFixtures::usd_minus_one_cent().is_negative());
        assert_eq!(MoneyFixtures::usd_sandbox_decline().amount_minor() % 100, 13);
    }

    #[test]
    fn test_fake_email_is_valid_for_the_gateway() {
        let email = FakeFixtures::email();
        assert!(domain_payments::OperationField::Email.check(&email).is_ok(), "{email}");
    }

    #[test]
    fn test_temporal_fixtures() {
        assert!(TemporalFixtures::days_before_now(1) < TemporalFixtures::now());
    }
}
