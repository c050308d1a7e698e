//! Run configuration
//!
//! Read once at startup and passed explicitly to validation and deploy, so
//! two configurations can coexist in one process.

use crate::errors::{RabvalError, Result};
use std::time::Duration;

pub const ENV_REQUEST_DELAY: &str = "RABVAL_REQUEST_DELAY";
pub const ENV_THRESHOLD_VHOST: &str = "RABVAL_UNUSED_FAIL_THRESHOLD_VHOST";
pub const ENV_THRESHOLD_EXCHANGE: &str = "RABVAL_UNUSED_FAIL_THRESHOLD_EXCHANGE";
pub const ENV_THRESHOLD_QUEUE: &str = "RABVAL_UNUSED_FAIL_THRESHOLD_QUEUE";
pub const ENV_STRING_ALLOW: &str = "RABVAL_STRING_ALLOW";

pub const DEFAULT_REQUEST_DELAY_MS: u64 = 9;
pub const DEFAULT_UNUSED_THRESHOLD: f64 = 0.3;

/// Unused-to-total ratios above which unused resources fail a check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnusedThresholds {
    pub vhost: f64,
    pub exchange: f64,
    pub queue: f64,
}

impl Default for UnusedThresholds {
    fn default() -> Self {
        Self {
            vhost: DEFAULT_UNUSED_THRESHOLD,
            exchange: DEFAULT_UNUSED_THRESHOLD,
            queue: DEFAULT_UNUSED_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RabvalConfig {
    /// Pause between consecutive mutating management API calls
    pub request_delay: Duration,
    pub unused_thresholds: UnusedThresholds,
    /// Literal strings exempt from the identifier charset check
    pub string_allow_list: Vec<String>,
}

impl Default for RabvalConfig {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            unused_thresholds: UnusedThresholds::default(),
            string_allow_list: Vec::new(),
        }
    }
}

impl RabvalConfig {
    /// Read configuration from the process environment
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when a variable is set but unparsable or out of range.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    ///
    /// Unset and empty values fall back to the defaults.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when a value is unparsable or out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(ENV_REQUEST_DELAY) {
            let ms: u64 = raw.trim().parse().map_err(|_| RabvalError::InvalidConfig {
                key: ENV_REQUEST_DELAY.to_string(),
                value: raw.clone(),
                reason: "expected a whole number of milliseconds".to_string(),
            })?;
            config.request_delay = Duration::from_millis(ms);
        }

        let thresholds = &mut config.unused_thresholds;
        for (key, slot) in [
            (ENV_THRESHOLD_VHOST, &mut thresholds.vhost),
            (ENV_THRESHOLD_EXCHANGE, &mut thresholds.exchange),
            (ENV_THRESHOLD_QUEUE, &mut thresholds.queue),
        ] {
            if let Some(raw) = get(key) {
                *slot = parse_ratio(key, &raw)?;
            }
        }

        // Entries are literal: surrounding spaces belong to the allowed string.
        if let Some(raw) = get(ENV_STRING_ALLOW) {
            config.string_allow_list = raw
                .split(',')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(config)
    }
}

fn parse_ratio(key: &str, raw: &str) -> Result<f64> {
    let invalid = |reason: &str| RabvalError::InvalidConfig {
        key: key.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid("expected a number"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid("must be within [0, 1]").into());
    }
    Ok(value)
}
