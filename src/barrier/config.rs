//! Timing configuration for the animation fail-safe.
//!
//! Every tracked animation gets an expiry after which it is forcibly dropped
//! from the barrier, so a stuck animation can never starve pending requests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BarrierError, Result};

/// Floor applied to computed animation expiries (milliseconds).
pub const DEFAULT_MIN_TIMEOUT_MS: u64 = 500;

/// Expiry used when an animation declares no duration (milliseconds).
pub const DEFAULT_DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Barrier timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrierConfig {
    /// Lower bound for `2 × duration` expiries.
    pub min_timeout_ms: u64,
    /// Expiry for animations registered without a duration.
    pub default_timeout_ms: u64,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            min_timeout_ms: DEFAULT_MIN_TIMEOUT_MS,
            default_timeout_ms: DEFAULT_DEFAULT_TIMEOUT_MS,
        }
    }
}

impl BarrierConfig {
    /// Create config with custom values.
    pub fn new(min_timeout_ms: u64, default_timeout_ms: u64) -> Self {
        Self {
            min_timeout_ms,
            default_timeout_ms,
        }
    }

    /// Set the expiry floor.
    pub fn with_min_timeout(mut self, ms: u64) -> Self {
        self.min_timeout_ms = ms;
        self
    }

    /// Set the expiry used when no duration is declared.
    pub fn with_default_timeout(mut self, ms: u64) -> Self {
        self.default_timeout_ms = ms;
        self
    }

    /// Reject values that would expire animations instantly.
    pub fn validate(&self) -> Result<()> {
        if self.min_timeout_ms == 0 {
            return Err(BarrierError::InvalidConfig("min_timeout_ms must be positive".to_string()));
        }
        if self.default_timeout_ms == 0 {
            return Err(BarrierError::InvalidConfig(
                "default_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn min_timeout(&self) -> Duration {
        Duration::from_millis(self.min_timeout_ms)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Fail-safe expiry for an animation of the given declared duration.
    ///
    /// `max(2 × duration, min_timeout)`, or `default_timeout` when the
    /// duration is absent or zero.
    pub fn expiry_for(&self, duration: Option<Duration>) -> Duration {
        match duration {
            Some(d) if !d.is_zero() => d.saturating_mul(2).max(self.min_timeout()),
            _ => self.default_timeout(),
        }
    }
}
