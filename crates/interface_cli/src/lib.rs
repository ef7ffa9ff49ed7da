//! Batch Command-Line Interface
//!
//! Operator entry points for the payment engine:
//!
//! - **refund-all-by-id**: refunds a list of payments and prints a summary table
//! - **run-scheduled**: runs the scheduled payment trigger pipeline for one area
//!
//! # Example
//!
//! ```bash
//! payments-cli refund-all-by-id --payment-id PAY-... --payment-id PAY-... --fake-external-ref
//! payments-cli run-scheduled --area north-east
//! ```

pub mod args;
pub mod commands;
pub mod config;
pub mod error;
pub mod report;

pub use args::{CliArgs, Command, RefundAllByIdArgs, RunScheduledArgs};
pub use config::CliConfig;
pub use error::CliError;
