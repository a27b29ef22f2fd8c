//! Parameters for one tick scheduling session.

use crate::mode::{BeatMultiplier, TickMode};
use serde::{Deserialize, Serialize};

/// Parameters consulted each time the next tick delay is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    pub mode: TickMode,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub constant_delay_ms: u64,
    /// Nominally 0..=100; higher sweeps the sine faster.
    pub sine_rate_percent: i32,
    /// Detected or user-entered tempo.
    pub beats_per_minute: Option<f64>,
    /// Signed multiplier, see [`BeatMultiplier`].
    pub beat_multiplier: i32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            mode: TickMode::Random,
            min_delay_ms: 200,
            max_delay_ms: 1200,
            constant_delay_ms: 1000,
            sine_rate_percent: 50,
            beats_per_minute: None,
            beat_multiplier: 1,
        }
    }
}

impl TickConfig {
    pub fn multiplier(&self) -> BeatMultiplier {
        BeatMultiplier::from_signed(self.beat_multiplier)
    }

    /// The delay range ordered low to high, whatever order the caller left
    /// min and max in.
    pub fn delay_range(&self) -> (u64, u64) {
        if self.min_delay_ms <= self.max_delay_ms {
            (self.min_delay_ms, self.max_delay_ms)
        } else {
            (self.max_delay_ms, self.min_delay_ms)
        }
    }
}

/// Ticking switch plus parameters, as the owning panel sees them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickSettings {
    pub enabled: bool,
    pub config: TickConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_range_ordering() {
        let mut config = TickConfig { min_delay_ms: 100, max_delay_ms: 300, ..Default::default() };
        assert_eq!(config.delay_range(), (100, 300));
        config.min_delay_ms = 900;
        assert_eq!(config.delay_range(), (300, 900));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TickConfig = serde_json::from_str(r#"{"mode":"beat_synced","beats_per_minute":98.5}"#).unwrap();
        assert_eq!(config.mode, TickMode::BeatSynced);
        assert_eq!(config.beats_per_minute, Some(98.5));
        assert_eq!(config.beat_multiplier, 1);
        assert_eq!(config.constant_delay_ms, 1000);
    }
}
