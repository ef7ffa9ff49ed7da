//! Payment engine batch CLI
//!
//! # Usage
//!
//! ```bash
//! payments-cli refund-all-by-id --payment-id PAY-... [--days-allowed 30] [--fake-external-ref]
//! payments-cli run-scheduled --area north-east
//! ```
//!
//! # Environment Variables
//!
//! * `PAYMENTS_DATABASE_URL` (or `DATABASE_URL`) - PostgreSQL connection string
//! * `PAYMENTS_LOG_LEVEL` - Log filter when `RUST_LOG` is unset (default: info)
//! * `PAYMENTS_JSON_LOGS` - Emit JSON log lines (default: false)
//! * `PAYMENTS_PAYMENTS__REFUND_DAYS_ALLOWED` - Default refund window, at most 45
//! * `PAYMENTS_SCHEDULING__PAGE_SIZE` - Scheduled payments fetched per page (default: 500)
//!
//! # Exit Codes
//!
//! - 0: the batch ran, even if individual items failed (see the printed summary)
//! - 1: configuration, database or fatal precondition error

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use interface_cli::{commands, report, CliArgs, CliConfig, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    let config = CliConfig::from_env().context("loading configuration")?;
    init_tracing(&config.log_level, config.json_logs);

    let pool = commands::connect(&config)
        .await
        .context("connecting to the payments database")?;

    let mut stdout = std::io::stdout().lock();
    match &args.command {
        Command::RefundAllById(refund_args) => {
            let summary = commands::refund_all_by_id(&pool, &config, refund_args).await?;
            report::write_refund_summary(&mut stdout, &summary)?;
        }
        Command::RunScheduled(run_args) => {
            let summary = commands::run_scheduled(&pool, &config, run_args).await?;
            report::write_trigger_summary(&mut stdout, &summary)?;
        }
    }

    pool.close().await;
    Ok(())
}

/// Initializes the tracing subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
