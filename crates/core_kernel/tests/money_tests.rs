//! Unit tests for the minor-unit Money type
//!
//! Tests cover construction, decimal conversion, checked arithmetic and
//! currency handling.

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_from_minor_keeps_exact_units() {
        let m = Money::from_minor(5000, Currency::USD);
        assert_eq!(m.amount_minor(), 5000);
        assert_eq!(m.to_decimal(), dec!(50.00));
    }

    #[test]
    fn test_from_minor_handles_jpy_no_decimals() {
        let m = Money::from_minor(10000, Currency::JPY);
        assert_eq!(m.to_decimal(), dec!(10000));
    }

    #[test]
    fn test_from_decimal_converts_to_cents() {
        let m = Money::from_decimal(dec!(100.5), Currency::USD).unwrap();
        assert_eq!(m.amount_minor(), 10050);
    }

    #[test]
    fn test_zero() {
        let m = Money::zero(Currency::EUR);
        assert!(m.is_zero());
        assert!(!m.is_positive());
        assert!(!m.is_negative());
    }

    #[test]
    fn test_negative_amounts_are_representable() {
        let m = Money::from_minor(-1, Currency::USD);
        assert!(m.is_negative());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_add() {
        let a = Money::from_minor(1000, Currency::USD);
        let b = Money::from_minor(250, Currency::USD);
        assert_eq!(a.checked_add(&b).unwrap().amount_minor(), 1250);
    }

    #[test]
    fn test_checked_sub_can_go_negative() {
        let a = Money::from_minor(100, Currency::USD);
        let b = Money::from_minor(250, Currency::USD);
        assert_eq!(a.checked_sub(&b).unwrap().amount_minor(), -150);
    }

    #[test]
    fn test_currency_mismatch_is_an_error() {
        let usd = Money::from_minor(100, Currency::USD);
        let gbp = Money::from_minor(100, Currency::GBP);
        assert_eq!(
            usd.checked_sub(&gbp),
            Err(MoneyError::CurrencyMismatch("USD".to_string(), "GBP".to_string()))
        );
    }
}

mod currency {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::USD);
        assert_eq!(" CAD ".parse::<Currency>().unwrap(), Currency::CAD);
    }

    #[test]
    fn test_unknown_code() {
        assert!(matches!("XYZ".parse::<Currency>(), Err(MoneyError::UnknownCurrency(_))));
    }

    #[test]
    fn test_serde_uses_uppercase_codes() {
        let json = serde_json::to_string(&Currency::EUR).unwrap();
        assert_eq!(json, "\"EUR\"");
    }
}
