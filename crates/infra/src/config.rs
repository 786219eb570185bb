//! Runtime configuration, read from `WAREHOUSE_*` environment variables.

use anyhow::Context;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use warehouse_inventory::timestamp::offset_text;
use warehouse_inventory::{parse_utc_offset, TimestampNormalizer};

use crate::ledger::DEFAULT_MAX_CONFLICT_RETRIES;
use crate::reporting::DEFAULT_DASHBOARD_LIMIT;

pub const ENV_REPORTING_OFFSET: &str = "WAREHOUSE_REPORTING_OFFSET";
pub const ENV_MAX_CONFLICT_RETRIES: &str = "WAREHOUSE_MAX_CONFLICT_RETRIES";
pub const ENV_DASHBOARD_LOW_STOCK_LIMIT: &str = "WAREHOUSE_DASHBOARD_LOW_STOCK_LIMIT";
pub const ENV_DASHBOARD_RECENT_ACTIVITY_LIMIT: &str = "WAREHOUSE_DASHBOARD_RECENT_ACTIVITY_LIMIT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Offset every stored `occurred_at` is expressed in; also assumed for
    /// wall-clock input that carries no offset.
    #[serde(with = "offset_text")]
    pub reporting_offset: FixedOffset,
    pub max_conflict_retries: u32,
    pub dashboard_low_stock_limit: usize,
    pub dashboard_recent_activity_limit: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            reporting_offset: TimestampNormalizer::default().reporting_offset(),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            dashboard_low_stock_limit: DEFAULT_DASHBOARD_LIMIT,
            dashboard_recent_activity_limit: DEFAULT_DASHBOARD_LIMIT,
        }
    }
}

impl WarehouseConfig {
    /// Load from the process environment. Unset variables keep their defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key: &str| std::env::var(key).ok())
    }

    /// Load using `lookup` as the environment (handy for tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_REPORTING_OFFSET) {
            config.reporting_offset =
                parse_utc_offset(&raw).with_context(|| format!("invalid {ENV_REPORTING_OFFSET}='{raw}'"))?;
        }
        if let Some(raw) = lookup(ENV_MAX_CONFLICT_RETRIES) {
            config.max_conflict_retries = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_MAX_CONFLICT_RETRIES}='{raw}'"))?;
        }
        if let Some(raw) = lookup(ENV_DASHBOARD_LOW_STOCK_LIMIT) {
            config.dashboard_low_stock_limit = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_DASHBOARD_LOW_STOCK_LIMIT}='{raw}'"))?;
        }
        if let Some(raw) = lookup(ENV_DASHBOARD_RECENT_ACTIVITY_LIMIT) {
            config.dashboard_recent_activity_limit = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_DASHBOARD_RECENT_ACTIVITY_LIMIT}='{raw}'"))?;
        }

        Ok(config)
    }

    pub fn normalizer(&self) -> TimestampNormalizer {
        TimestampNormalizer::new(self.reporting_offset)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn unset_variables_keep_defaults() {
        let config = WarehouseConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, WarehouseConfig::default());
        assert_eq!(config.reporting_offset.local_minus_utc(), 7 * 3600);
        assert_eq!(config.max_conflict_retries, 3);
        assert_eq!(config.dashboard_low_stock_limit, 5);
    }

    #[test]
    fn values_are_parsed() {
        let config = WarehouseConfig::from_lookup(lookup(&[
            (ENV_REPORTING_OFFSET, "+08:00"),
            (ENV_MAX_CONFLICT_RETRIES, "7"),
            (ENV_DASHBOARD_RECENT_ACTIVITY_LIMIT, " 10 "),
        ]))
        .unwrap();
        assert_eq!(config.reporting_offset.local_minus_utc(), 8 * 3600);
        assert_eq!(config.max_conflict_retries, 7);
        assert_eq!(config.dashboard_recent_activity_limit, 10);
        assert_eq!(config.normalizer().reporting_offset(), config.reporting_offset);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = WarehouseConfig::from_lookup(lookup(&[(ENV_MAX_CONFLICT_RETRIES, "lots")])).unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_CONFLICT_RETRIES));

        let err = WarehouseConfig::from_lookup(lookup(&[(ENV_REPORTING_OFFSET, "Asia/Jakarta")])).unwrap_err();
        assert!(err.to_string().contains(ENV_REPORTING_OFFSET));
    }
}
