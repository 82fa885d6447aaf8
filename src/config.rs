use std::time::Duration;

use anyhow::{Context, Result};

pub const LOCK_TIMEOUT_ENV: &str = "PEER_LEDGER_LOCK_TIMEOUT_MS";
pub const TRANSFER_RETRIES_ENV: &str = "PEER_LEDGER_TRANSFER_RETRIES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// How long a mutation waits for exclusive access to a single account.
    pub lock_timeout: Duration,
    /// Extra attempts of a whole transfer after a lock timeout.
    pub transfer_retries: u32,
    /// Description used for accepted requests that carry none.
    pub accepted_request_description: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(250),
            transfer_retries: 3,
            accepted_request_description: "Money request accepted".to_owned(),
        }
    }
}

impl LedgerConfig {
    /// Defaults, overridden by environment variables when present.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(ms) = lookup(LOCK_TIMEOUT_ENV) {
            let ms: u64 = ms
                .trim()
                .parse()
                .with_context(|| format!("{LOCK_TIMEOUT_ENV} must be a number, got `{ms}`"))?;
            config.lock_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = lookup(TRANSFER_RETRIES_ENV) {
            config.transfer_retries = retries.trim().parse().with_context(|| {
                format!("{TRANSFER_RETRIES_ENV} must be a number, got `{retries}`")
            })?;
        }
        Ok(config)
    }
}
