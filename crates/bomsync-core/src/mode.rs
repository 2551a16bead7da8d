//! Trigger mode and scheduler configuration.
//!
//! `ModeMachine` only records state. Reacting to a change (restarting the
//! periodic scheduler) is the orchestrator's job; the change router reads
//! the mode fresh on every event.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::types::SyncMode;

pub const MIN_INTERVAL_SECS: u32 = 10;
pub const MAX_INTERVAL_SECS: u32 = 300;
pub const DEFAULT_INTERVAL_SECS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub interval_seconds: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECS,
        }
    }
}

/// Validate an interval and snap it to the nearest multiple of 10.
///
/// Values outside `[MIN_INTERVAL_SECS, MAX_INTERVAL_SECS]` are rejected,
/// never clamped.
pub fn normalize_interval(seconds: i64) -> Result<u32> {
    let (min, max) = (MIN_INTERVAL_SECS as i64, MAX_INTERVAL_SECS as i64);
    if !(min..=max).contains(&seconds) {
        return Err(SyncError::ConfigInvalid(format!(
            "interval must be {min}-{max} seconds, got {seconds}"
        )));
    }
    let rounded = ((seconds + 5) / 10 * 10).clamp(min, max);
    Ok(rounded as u32)
}

#[derive(Debug, Clone, Default)]
pub struct ModeMachine {
    mode: SyncMode,
    config: SchedulerConfig,
}

impl ModeMachine {
    pub fn new(mode: SyncMode, interval_seconds: i64) -> Result<Self> {
        Ok(Self {
            mode,
            config: SchedulerConfig {
                interval_seconds: normalize_interval(interval_seconds)?,
            },
        })
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn interval_seconds(&self) -> u32 {
        self.config.interval_seconds
    }

    /// Replace the active mode. Returns `true` if it differed.
    pub fn set_mode(&mut self, mode: SyncMode) -> bool {
        let changed = self.mode != mode;
        self.mode = mode;
        changed
    }

    /// Parse and apply a mode string; an unknown value leaves state untouched.
    pub fn set_mode_str(&mut self, mode: &str) -> Result<bool> {
        let mode = mode.parse::<SyncMode>()?;
        Ok(self.set_mode(mode))
    }

    /// Update the interval. Returns the normalized value that was stored.
    pub fn set_interval(&mut self, seconds: i64) -> Result<u32> {
        let interval = normalize_interval(seconds)?;
        self.config.interval_seconds = interval;
        Ok(interval)
    }
}
