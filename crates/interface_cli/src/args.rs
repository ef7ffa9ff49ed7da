//! Command-line arguments

use clap::{Args, Parser, Subcommand};

use core_kernel::PaymentId;
use domain_payments::BatchRefundOptions;

/// Batch operations for the payment engine
#[derive(Parser, Debug)]
#[command(name = "payments-cli")]
#[command(about = "Batch refunds and scheduled payment runs", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Refund every listed payment, continuing past failed items
    RefundAllById(RefundAllByIdArgs),
    /// Run the scheduled payment trigger pipeline for one area
    RunScheduled(RunScheduledArgs),
}

#[derive(Args, Debug)]
pub struct RefundAllByIdArgs {
    /// Payments to refund, as `PAY-<uuid>` or a bare uuid
    #[arg(
        long = "payment-id",
        value_name = "ID",
        required = true,
        value_delimiter = ',',
        help = "Payment to refund; repeat or comma-separate for several"
    )]
    pub payment_ids: Vec<PaymentId>,

    /// Refund window in days, at most 45
    #[arg(
        long = "days-allowed",
        value_name = "DAYS",
        help = "Refund window in days (default: configured window, maximum 45)"
    )]
    pub days_allowed: Option<u32>,

    /// Stamp each refund with a synthetic external reference id
    #[arg(long = "fake-external-ref", help = "Assign synthetic external reference ids")]
    pub fake_external_ref: bool,
}

impl RefundAllByIdArgs {
    pub fn options(&self) -> BatchRefundOptions {
        BatchRefundOptions {
            days_allowed: self.days_allowed,
            fake_external_ref: self.fake_external_ref,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunScheduledArgs {
    #[arg(long = "area", value_name = "AREA", help = "Service area whose pending items are processed")]
    pub area: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST: &str = "0190a1b2-c3d4-7e5f-8a9b-0c1d2e3f4a5b";
    const SECOND: &str = "0190a1b2-c3d4-7e5f-8a9b-0c1d2e3f4a5c";

    fn refund_args(args: &[&str]) -> RefundAllByIdArgs {
        match CliArgs::try_parse_from(args.iter().copied()).unwrap().command {
            Command::RefundAllById(args) => args,
            other => panic!("expected refund-all-by-id, got {other:?}"),
        }
    }

    #[test]
    fn test_refund_all_by_id_repeated_and_prefixed_ids() {
        let prefixed = format!("PAY-{SECOND}");
        let args = refund_args(&["payments-cli", "refund-all-by-id", "--payment-id", FIRST, "--payment-id", &prefixed]);

        assert_eq!(args.payment_ids.len(), 2);
        assert_eq!(args.payment_ids[0], FIRST.parse::<PaymentId>().unwrap());
        assert_eq!(args.payment_ids[1], SECOND.parse::<PaymentId>().unwrap());
        assert_eq!(args.options(), BatchRefundOptions::default());
    }

    #[test]
    fn test_refund_all_by_id_comma_separated_with_options() {
        let ids = format!("{FIRST},{SECOND}");
        let args = refund_args(&[
            "payments-cli",
            "refund-all-by-id",
            "--payment-id",
            &ids,
            "--days-allowed",
            "30",
            "--fake-external-ref",
        ]);

        assert_eq!(args.payment_ids.len(), 2);
        assert_eq!(
            args.options(),
            BatchRefundOptions {
                days_allowed: Some(30),
                fake_external_ref: true,
            }
        );
    }

    #[test]
    fn test_days_allowed_above_ceiling_parses() {
        // The ceiling is enforced by the refund service, not the parser
        let args = refund_args(&["payments-cli", "refund-all-by-id", "--payment-id", FIRST, "--days-allowed", "46"]);
        assert_eq!(args.days_allowed, Some(46));
    }

    #[test]
    fn test_run_scheduled() {
        let parsed = CliArgs::try_parse_from(["payments-cli", "run-scheduled", "--area", "north-east"]).unwrap();
        match parsed.command {
            Command::RunScheduled(args) => assert_eq!(args.area, "north-east"),
            other => panic!("expected run-scheduled, got {other:?}"),
        }
    }

    #[test]
    fn test_parsing_errors() {
        for args in [
            vec!["payments-cli"],
            vec!["payments-cli", "refund-all-by-id"],
            vec!["payments-cli", "refund-all-by-id", "--payment-id", "not-a-uuid"],
            vec!["payments-cli", "refund-all-by-id", "--payment-id", FIRST, "--days-allowed", "-1"],
            vec!["payments-cli", "run-scheduled"],
        ] {
            assert!(CliArgs::try_parse_from(args.iter().copied()).is_err(), "{args:?} should not parse");
        }
    }
}
