//! Engine configuration
//!
//! Values come from environment variables on top of serde defaults.

use crate::WorkflowError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Quiet period of the repository filter debounce, in milliseconds
    #[serde(default = "default_filter_debounce_ms")]
    pub filter_debounce_ms: u64,

    /// `EnvFilter` directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON logs instead of pretty ones
    #[serde(default)]
    pub json_logs: bool,
}

fn default_filter_debounce_ms() -> u64 {
    500
}

fn default_log_filter() -> String {
    "info,wizflow=debug".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            filter_debounce_ms: default_filter_debounce_ms(),
            log_filter: default_log_filter(),
            json_logs: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self, WorkflowError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn load_from<F>(lookup: F) -> Result<Self, WorkflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(debounce) = lookup("WIZFLOW_FILTER_DEBOUNCE_MS") {
            match debounce.parse::<u64>() {
                Ok(ms) => config.filter_debounce_ms = ms,
                Err(_) => warn!("Invalid WIZFLOW_FILTER_DEBOUNCE_MS value: {}", debounce),
            }
        }

        if let Some(filter) = lookup("WIZFLOW_LOG_FILTER") {
            config.log_filter = filter;
        }

        if let Some(json_logs) = lookup("WIZFLOW_JSON_LOGS") {
            match json_logs.to_lowercase().as_str() {
                "1" | "true" | "yes" => config.json_logs = true,
                "0" | "false" | "no" => config.json_logs = false,
                _ => warn!("Invalid WIZFLOW_JSON_LOGS value: {}", json_logs),
            }
        }

        config.validate()?;

        info!(
            filter_debounce_ms = config.filter_debounce_ms,
            json_logs = config.json_logs,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Check the configuration for unusable values
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.filter_debounce_ms == 0 {
            return Err(WorkflowError::ConfigurationError(
                "filter_debounce_ms must be greater than zero".to_string(),
            ));
        }
        if self.log_filter.trim().is_empty() {
            return Err(WorkflowError::ConfigurationError(
                "log_filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Quiet period of the repository filter debounce
    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.filter_debounce_ms)
    }
}
