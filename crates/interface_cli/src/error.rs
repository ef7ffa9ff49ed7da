//! CLI error handling

use thiserror::Error;

use domain_payments::PaymentError;
use domain_scheduling::SchedulingError;
use infra_db::DatabaseError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to load configuration: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
