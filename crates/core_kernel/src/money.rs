//! Money types with exact minor-unit arithmetic
//!
//! Amounts are held as an `i64` count of the currency's minor unit (cents for
//! USD) so that no operation on the charge path ever touches floating point.
//! `rust_decimal` is only used at the edges, for rendering and for parsing
//! human-entered amounts.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    CHF,
    AUD,
    CAD,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::CHF => "CHF",
            Currency::AUD => "A$",
            Currency::CAD => "C$",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::CHF => "CHF",
            Currency::AUD => "AUD",
            Currency::CAD => "CAD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "JPY" => Ok(Currency::JPY),
            "CHF" => Ok(Currency::CHF),
            "AUD" => Ok(Currency::AUD),
            "CAD" => Ok(Currency::CAD),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount in integer minor units with its currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: Currency,
}

impl Money {
    /// Creates Money from an integer amount in minor units (e.g., cents)
    pub fn from_minor(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    /// Creates Money from a decimal major-unit amount
    ///
    /// Fails if the amount carries more precision than the currency allows
    /// (`12.345` USD is rejected rather than silently rounded).
    pub fn from_decimal(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        let scale = Decimal::from(10_i64.pow(currency.decimal_places()));
        let minor = amount * scale;
        if minor.fract() != Decimal::ZERO {
            return Err(MoneyError::InvalidAmount(format!(
                "{} has more than {} decimal places",
                amount,
                currency.decimal_places()
            )));
        }
        let minor = minor.to_i64().ok_or(MoneyError::Overflow)?;
        Ok(Self::from_minor(minor, currency))
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self::from_minor(0, currency)
    }

    /// Returns the amount in minor units
    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns the amount as a decimal in major units
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount_minor, self.currency.decimal_places())
    }

    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    pub fn is_positive(&self) -> bool {
        self.amount_minor > 0
    }

    pub fn is_negative(&self) -> bool {
        self.amount_minor < 0
    }

    /// Checked addition that returns an error on currency mismatch or overflow
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        self.amount_minor
            .checked_add(other.amount_minor)
            .map(|minor| Self::from_minor(minor, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction that returns an error on currency mismatch or overflow
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        self.amount_minor
            .checked_sub(other.amount_minor)
            .map(|minor| Self::from_minor(minor, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.currency.symbol(), self.to_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_from_minor() {
        let m = Money::from_minor(10050, Currency::USD);
        assert_eq!(m.to_decimal(), dec!(100.50));
        assert_eq!(m.amount_minor(), 10050);
    }

    #[test]
    fn test_from_decimal_rejects_sub_cent_precision() {
        let result = Money::from_decimal(dec!(12.345), Currency::USD);
        assert!(matches!(result, Err(MoneyError::InvalidAmount(_))));
    }

    #[test]
    fn test_from_decimal_jpy() {
        let m = Money::from_decimal(dec!(1500), Currency::JPY).unwrap();
        assert_eq!(m.amount_minor(), 1500);
    }

    #[test]
    fn test_currency_mismatch() {
        let usd = Money::from_minor(100, Currency::USD);
        let eur = Money::from_minor(100, Currency::EUR);

        let result = usd.checked_add(&eur);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_overflow_is_reported() {
        let big = Money::from_minor(i64::MAX, Currency::USD);
        let one = Money::from_minor(1, Currency::USD);
        assert_eq!(big.checked_add(&one), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(5000, Currency::USD).to_string(), "$ 50.00");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn decimal_round_trip_preserves_minor_units(amount in -1_000_000_000i64..1_000_000_000i64) {
            let money = Money::from_minor(amount, Currency::USD);
            let back = Money::from_decimal(money.to_decimal(), Currency::USD).unwrap();
            prop_assert_eq!(back, money);
        }

        #[test]
        fn add_then_sub_is_identity(
            a in -1_000_000i64..1_000_000i64,
            b in -1_000_000i64..1_000_000i64
        ) {
            let ma = Money::from_minor(a, Currency::USD);
            let mb = Money::from_minor(b, Currency::USD);
            prop_assert_eq!(ma.checked_add(&mb).unwrap().checked_sub(&mb).unwrap(), ma);
        }
    }
}
