//! Tick timing modes and the beat multiplier encoding.

use serde::{Deserialize, Serialize};

/// How the delay between ticks is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickMode {
    /// Uniform random delay between min and max.
    #[default]
    Random,
    /// Delay swept between min and max by a sine of wall-clock time.
    SineWave,
    /// Fixed delay.
    Constant,
    /// Delay derived from the track's BPM and a beat multiplier.
    BeatSynced,
    /// No timer; ticks follow upstream sequence changes.
    SceneLinked,
}

impl TickMode {
    pub const ALL: [TickMode; 5] = [
        TickMode::Random,
        TickMode::SineWave,
        TickMode::Constant,
        TickMode::BeatSynced,
        TickMode::SceneLinked,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TickMode::Random => "random",
            TickMode::SineWave => "sine wave",
            TickMode::Constant => "constant",
            TickMode::BeatSynced => "bpm",
            TickMode::SceneLinked => "scene change",
        }
    }

    /// Whether this mode arms its own timer.
    pub fn is_timed(&self) -> bool {
        !matches!(self, TickMode::SceneLinked)
    }

    /// Whether the min/max delay pair is consulted.
    pub fn uses_delay_range(&self) -> bool {
        matches!(self, TickMode::Random | TickMode::SineWave)
    }
}

/// Beat period multiplier.
///
/// Stored on disk as a single signed integer: a positive `n` ticks `n` times
/// per beat, zero and below tick once every `2 - n` beats (0 is 1/2x, -1 is
/// 1/3x, and so on). One slider range covers both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatMultiplier {
    Multiply(u32),
    Divide(u32),
}

impl BeatMultiplier {
    pub fn from_signed(n: i32) -> Self {
        if n > 0 {
            BeatMultiplier::Multiply(n as u32)
        } else {
            BeatMultiplier::Divide((2 - n as i64) as u32)
        }
    }

    /// Delay in milliseconds for one tick at `bpm`. May be non-finite.
    pub fn beat_delay_ms(self, bpm: f64) -> f64 {
        match self {
            BeatMultiplier::Multiply(n) => 60_000.0 / (bpm * n as f64),
            BeatMultiplier::Divide(n) => 60_000.0 * n as f64 / bpm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_encoding() {
        assert_eq!(BeatMultiplier::from_signed(1), BeatMultiplier::Multiply(1));
        assert_eq!(BeatMultiplier::from_signed(4), BeatMultiplier::Multiply(4));
        assert_eq!(BeatMultiplier::from_signed(0), BeatMultiplier::Divide(2));
        assert_eq!(BeatMultiplier::from_signed(-1), BeatMultiplier::Divide(3));
        assert_eq!(BeatMultiplier::from_signed(-6), BeatMultiplier::Divide(8));
    }

    #[test]
    fn test_signed_encoding_extremes() {
        assert_eq!(BeatMultiplier::from_signed(i32::MAX), BeatMultiplier::Multiply(i32::MAX as u32));
        assert_eq!(BeatMultiplier::from_signed(i32::MIN), BeatMultiplier::Divide(2 + (1u32 << 31)));
    }

    #[test]
    fn test_beat_delay() {
        assert_eq!(BeatMultiplier::Multiply(1).beat_delay_ms(120.0), 500.0);
        assert_eq!(BeatMultiplier::Multiply(2).beat_delay_ms(120.0), 250.0);
        assert_eq!(BeatMultiplier::Divide(2).beat_delay_ms(120.0), 1000.0);
        assert!(!BeatMultiplier::Multiply(1).beat_delay_ms(0.0).is_finite());
    }

    #[test]
    fn test_mode_flags() {
        assert!(TickMode::Random.uses_delay_range());
        assert!(TickMode::SineWave.uses_delay_range());
        assert!(!TickMode::Constant.uses_delay_range());
        assert!(!TickMode::SceneLinked.is_timed());
        assert!(TickMode::ALL.iter().filter(|m| m.is_timed()).count() == 4);
    }
}
