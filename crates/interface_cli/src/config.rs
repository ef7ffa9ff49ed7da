//! CLI configuration
//!
//! Loaded from `PAYMENTS_*` environment variables (a `.env` file is read
//! first by the binary). Nested domain settings use a double underscore,
//! e.g. `PAYMENTS_PAYMENTS__REFUND_DAYS_ALLOWED=30` or
//! `PAYMENTS_SCHEDULING__PAGE_SIZE=200`. `DATABASE_URL` is honoured when
//! `PAYMENTS_DATABASE_URL` is not set.

use serde::Deserialize;

use domain_payments::PaymentsConfig;
use domain_scheduling::SchedulingConfig;

use crate::error::CliError;

const ENV_PREFIX: &str = "PAYMENTS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// PostgreSQL connection string
    pub database_url: String,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
    /// Maximum pooled connections
    pub max_connections: u32,
    pub payments: PaymentsConfig,
    pub scheduling: SchedulingConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/payments".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            max_connections: 5,
            payments: PaymentsConfig::default(),
            scheduling: SchedulingConfig::default(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self, CliError> {
        let mut config = Self::load(Self::environment())?;
        if std::env::var(format!("{ENV_PREFIX}_DATABASE_URL")).is_err() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                config.database_url = url;
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load(source: config::Environment) -> Result<Self, CliError> {
        let config = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Checks the nested domain settings against their ceilings
    pub fn validate(&self) -> Result<(), CliError> {
        self.payments.validate()?;
        self.scheduling.validate()?;
        if self.max_connections == 0 {
            return Err(CliError::Configuration(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_from(vars: &[(&str, &str)]) -> Result<CliConfig, CliError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CliConfig::load(CliConfig::environment().source(Some(vars)))
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let config = load_from(&[]).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.payments.refund_days_allowed, 45);
        assert_eq!(config.scheduling.page_size, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_top_level_and_nested_overrides() {
        let config = load_from(&[
            ("PAYMENTS_DATABASE_URL", "postgres://db.internal/payments"),
            ("PAYMENTS_JSON_LOGS", "true"),
            ("PAYMENTS_PAYMENTS__REFUND_DAYS_ALLOWED", "30"),
            ("PAYMENTS_SCHEDULING__PAGE_SIZE", "200"),
        ])
        .unwrap();

        assert_eq!(config.database_url, "postgres://db.internal/payments");
        assert!(config.json_logs);
        assert_eq!(config.payments.refund_days_allowed, 30);
        assert_eq!(config.payments.lock_ttl_secs, 5);
        assert_eq!(config.scheduling.page_size, 200);
    }

    #[test]
    fn test_refund_window_above_ceiling_rejected() {
        let config = load_from(&[("PAYMENTS_PAYMENTS__REFUND_DAYS_ALLOWED", "46")]).unwrap();
        assert!(matches!(config.validate(), Err(CliError::Payment(_))));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let config = load_from(&[("PAYMENTS_SCHEDULING__PAGE_SIZE", "0")]).unwrap();
        assert!(matches!(config.validate(), Err(CliError::Scheduling(_))));
    }
}
