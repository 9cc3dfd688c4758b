//! Ledger and billing configuration.
//!
//! Loaded from environment variables with fallback to defaults.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stockbook_core::MissingProductPolicy;

/// What the ledger does when one product update in a movement fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFailureMode {
    /// Stop; updates already written stay written and are reported.
    #[default]
    Partial,
    /// Stop and apply reverse deltas to the updates already written.
    Compensate,
}

impl FromStr for BatchFailureMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "partial" => Ok(BatchFailureMode::Partial),
            "compensate" => Ok(BatchFailureMode::Compensate),
            _ => Err(ConfigError::InvalidValue("STOCKBOOK_BATCH_FAILURE_MODE".to_string())),
        }
    }
}

/// Stock ledger configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Lines naming unknown products: skip (default) or reject the movement.
    pub missing_product_policy: MissingProductPolicy,

    pub batch_failure_mode: BatchFailureMode,

    /// Compare-and-set attempts per product before giving up (default: 8)
    pub max_cas_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            missing_product_policy: MissingProductPolicy::Lenient,
            batch_failure_mode: BatchFailureMode::Partial,
            max_cas_retries: 8,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = LedgerConfig {
            missing_product_policy: env::var("STOCKBOOK_MISSING_PRODUCT_POLICY")
                .unwrap_or_else(|_| "lenient".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("STOCKBOOK_MISSING_PRODUCT_POLICY".to_string())
                })?,

            batch_failure_mode: env::var("STOCKBOOK_BATCH_FAILURE_MODE")
                .unwrap_or_else(|_| "partial".to_string())
                .parse()?,

            max_cas_retries: env::var("STOCKBOOK_MAX_CAS_RETRIES")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("STOCKBOOK_MAX_CAS_RETRIES".to_string()))?,
        };

        if config.max_cas_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "STOCKBOOK_MAX_CAS_RETRIES".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn strict(mut self) -> Self {
        self.missing_product_policy = MissingProductPolicy::Strict;
        self
    }

    pub fn compensating(mut self) -> Self {
        self.batch_failure_mode = BatchFailureMode::Compensate;
        self
    }
}

/// Billing configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Freeze catalog prices onto bill items at creation (default: false)
    pub snapshot_prices: bool,

    /// Issue stock for bill items through the ledger (default: false)
    pub issue_stock_on_bill: bool,
}

impl BillingConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(BillingConfig {
            snapshot_prices: parse_flag("STOCKBOOK_SNAPSHOT_PRICES")?,
            issue_stock_on_bill: parse_flag("STOCKBOOK_ISSUE_STOCK_ON_BILL")?,
        })
    }
}

fn parse_flag(name: &str) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(false),
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::InvalidValue(name.to_string())),
        },
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment is process-global; each test uses its own variable names
    // where it sets anything.

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.missing_product_policy, MissingProductPolicy::Lenient);
        assert_eq!(config.batch_failure_mode, BatchFailureMode::Partial);
        assert_eq!(config.max_cas_retries, 8);

        let billing = BillingConfig::default();
        assert!(!billing.snapshot_prices);
        assert!(!billing.issue_stock_on_bill);
    }

    #[test]
    fn test_batch_failure_mode_parse() {
        assert_eq!("Compensate".parse::<BatchFailureMode>().unwrap(), BatchFailureMode::Compensate);
        assert_eq!(" partial ".parse::<BatchFailureMode>().unwrap(), BatchFailureMode::Partial);
        assert!("rollback".parse::<BatchFailureMode>().is_err());
    }

    #[test]
    fn test_parse_flag() {
        env::set_var("STOCKBOOK_TEST_FLAG_ON", "yes");
        env::set_var("STOCKBOOK_TEST_FLAG_BAD", "maybe");
        assert!(parse_flag("STOCKBOOK_TEST_FLAG_ON").unwrap());
        assert!(!parse_flag("STOCKBOOK_TEST_FLAG_UNSET").unwrap());
        assert!(parse_flag("STOCKBOOK_TEST_FLAG_BAD").is_err());
    }

    // The only tests that touch the loaders' own variables.
    #[test]
    fn test_ledger_config_from_env() {
        env::set_var("STOCKBOOK_MISSING_PRODUCT_POLICY", "Strict");
        env::set_var("STOCKBOOK_BATCH_FAILURE_MODE", "compensate");
        env::set_var("STOCKBOOK_MAX_CAS_RETRIES", "17");
        let config = LedgerConfig::from_env().unwrap();
        assert_eq!(config.missing_product_policy, MissingProductPolicy::Strict);
        assert_eq!(config.batch_failure_mode, BatchFailureMode::Compensate);
        assert_eq!(config.max_cas_retries, 17);

        env::set_var("STOCKBOOK_MAX_CAS_RETRIES", "0");
        assert!(LedgerConfig::from_env().is_err());
        env::set_var("STOCKBOOK_MAX_CAS_RETRIES", "many");
        assert!(LedgerConfig::from_env().is_err());

        for name in [
            "STOCKBOOK_MISSING_PRODUCT_POLICY",
            "STOCKBOOK_BATCH_FAILURE_MODE",
            "STOCKBOOK_MAX_CAS_RETRIES",
        ] {
            env::remove_var(name);
        }
        assert_eq!(LedgerConfig::from_env().unwrap(), LedgerConfig::default());
    }

    #[test]
    fn test_billing_config_from_env() {
        env::set_var("STOCKBOOK_SNAPSHOT_PRICES", "on");
        env::set_var("STOCKBOOK_ISSUE_STOCK_ON_BILL", "0");
        let config = BillingConfig::from_env().unwrap();
        assert!(config.snapshot_prices);
        assert!(!config.issue_stock_on_bill);

        env::set_var("STOCKBOOK_ISSUE_STOCK_ON_BILL", "sometimes");
        assert!(BillingConfig::from_env().is_err());

        env::remove_var("STOCKBOOK_SNAPSHOT_PRICES");
        env::remove_var("STOCKBOOK_ISSUE_STOCK_ON_BILL");
        assert_eq!(BillingConfig::from_env().unwrap(), BillingConfig::default());
    }

    #[test]
    fn test_builders() {
        let config = LedgerConfig::default().strict().compensating();
        assert_eq!(config.missing_product_policy, MissingProductPolicy::Strict);
        assert_eq!(config.batch_failure_mode, BatchFailureMode::Compensate);
    }
}
