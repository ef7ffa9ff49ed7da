//! Scheduling configuration

use serde::Deserialize;

use crate::error::SchedulingError;

/// Number of pending scheduled payments fetched per page
pub const DEFAULT_PAGE_SIZE: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub page_size: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> Result<(), SchedulingError> {
        if self.page_size == 0 {
            return Err(SchedulingError::Configuration(
                "page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
