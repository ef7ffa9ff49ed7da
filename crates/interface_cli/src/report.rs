//! Plain-text reports printed at the end of a batch run

use std::io::{self, Write};

use core_kernel::{Currency, Money};
use domain_payments::RefundSummary;
use domain_scheduling::TriggerRunSummary;

/// Renders minor units in the currency's major unit
///
/// Without a single known currency the raw minor units are printed.
fn amount(minor: i64, currency: Option<Currency>) -> String {
    match currency {
        Some(currency) => format!("{} {}", Money::from_minor(minor, currency).to_decimal(), currency.code()),
        None => minor.to_string(),
    }
}

/// Writes the per payment type refund table followed by each failure
pub fn write_refund_summary(out: &mut impl Write, summary: &RefundSummary) -> io::Result<()> {
    writeln!(
        out,
        "{:<14} {:>9} {:>14} {:>9} {:>14}",
        "PAYMENT TYPE", "REFUNDED", "AMOUNT", "FAILED", "AMOUNT"
    )?;
    for (payment_type, bucket) in &summary.by_type {
        writeln!(
            out,
            "{:<14} {:>9} {:>14} {:>9} {:>14}",
            payment_type.as_str(),
            bucket.succeeded,
            amount(bucket.succeeded_amount_minor, bucket.currency),
            bucket.failed,
            amount(bucket.failed_amount_minor, bucket.currency)
        )?;
    }
    let failed_amount: i64 = summary.by_type.values().map(|b| b.failed_amount_minor).sum();
    writeln!(
        out,
        "{:<14} {:>9} {:>14} {:>9} {:>14}",
        "TOTAL",
        summary.succeeded(),
        amount(summary.total_refunded_minor(), summary.currency()),
        summary.failed(),
        amount(failed_amount, summary.currency())
    )?;

    if !summary.failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "FAILURES")?;
        for failure in &summary.failures {
            let payment_type = failure.payment_type.map_or("-", |t| t.as_str());
            writeln!(out, "{} {:<10} {}", failure.payment_id, payment_type, failure.reason)?;
        }
    }
    Ok(())
}

pub fn write_trigger_summary(out: &mut impl Write, summary: &TriggerRunSummary) -> io::Result<()> {
    writeln!(out, "{:<10} {}", "AREA", summary.area)?;
    writeln!(out, "{:<10} {}", "FETCHED", summary.fetched)?;
    writeln!(out, "{:<10} {}", "SUBMITTED", summary.submitted)?;
    writeln!(out, "{:<10} {}", "CANCELLED", summary.cancelled)?;
    writeln!(out, "{:<10} {}", "FAILED", summary.failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Currency, Money, PaymentId};
    use domain_payments::PaymentType;

    fn render(summary: &RefundSummary) -> String {
        let mut out = Vec::new();
        write_refund_summary(&mut out, summary).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_refund_summary_rows_and_totals() {
        let mut summary = RefundSummary::default();
        summary.record_success(PaymentType::CreditCard, Money::from_minor(10_000, Currency::USD));
        summary.record_success(PaymentType::CreditCard, Money::from_minor(2_550, Currency::USD));
        summary.record_failure(PaymentId::new(), None, "payment not found");

        let text = render(&summary);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("PAYMENT TYPE"));
        assert!(lines[1].starts_with(PaymentType::CreditCard.as_str()));
        assert!(lines[1].contains("125.50 USD"));
        assert!(lines[2].starts_with("TOTAL"));
        assert!(text.contains("FAILURES"));
        assert!(text.contains("payment not found"));
    }

    #[test]
    fn test_amounts_follow_currency_exponent() {
        let mut summary = RefundSummary::default();
        summary.record_success(PaymentType::CreditCard, Money::from_minor(1_500, Currency::JPY));

        let text = render(&summary);

        assert!(text.contains("1500 JPY"));
        assert!(!text.contains("15.00"));
    }

    #[test]
    fn test_mixed_currency_total_prints_minor_units() {
        let mut summary = RefundSummary::default();
        summary.record_success(PaymentType::CreditCard, Money::from_minor(1_000, Currency::USD));
        summary.record_success(PaymentType::Ach, Money::from_minor(2_000, Currency::EUR));

        let text = render(&summary);
        let total = text.lines().find(|l| l.starts_with("TOTAL")).unwrap();

        assert!(text.contains("10.00 USD"));
        assert!(text.contains("20.00 EUR"));
        assert!(total.contains("3000"));
    }

    #[test]
    fn test_empty_refund_summary_has_no_failure_section() {
        let text = render(&RefundSummary::default());
        assert_eq!(text.lines().count(), 2);
        assert!(!text.contains("FAILURES"));
    }

    #[test]
    fn test_trigger_summary() {
        let summary = TriggerRunSummary {
            area: "north-east".to_string(),
            fetched: 3,
            submitted: 1,
            cancelled: 1,
            failed: 1,
        };
        let mut out = Vec::new();
        write_trigger_summary(&mut out, &summary).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("north-east"));
        assert_eq!(text.lines().count(), 5);
    }
}
