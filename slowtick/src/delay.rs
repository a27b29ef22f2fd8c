//! Next-tick delay computation for each timing mode.
//!
//! Every call reads the config fresh, so edits between ticks take effect
//! on the following computation. Nothing here keeps state between calls:
//! randomness and wall-clock time come in from the caller.

use crate::config::TickConfig;
use crate::mode::TickMode;
use rand::Rng;

/// Substituted when a BPM-derived delay is zero, negative, or non-finite.
pub const FALLBACK_DELAY_MS: u64 = 1000;

/// A computed delay until the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delay {
    pub ms: u64,
    /// Set when the computed value was degenerate and replaced.
    pub fallback: bool,
}

impl Delay {
    fn exact(ms: u64) -> Self {
        Self { ms, fallback: false }
    }

    pub fn as_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ms)
    }
}

/// Source of wall-clock milliseconds for the sine sweep.
pub trait WallClock {
    fn now_ms(&self) -> i64;
}

/// Real time since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock(pub i64);

impl WallClock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

/// Period divisor for the sine sweep, in milliseconds.
///
/// 100% gives the fastest sweep (2 s), 0% and 200% the slowest in range.
pub fn sine_rate(sine_rate_percent: i32) -> f64 {
    ((sine_rate_percent as i64 - 100).abs() + 2) as f64 * 1000.0
}

/// Number of whole milliseconds in `lo..=hi`, as a float so the full
/// `u64` range does not overflow.
fn range_span(lo: u64, hi: u64) -> f64 {
    (hi - lo) as f64 + 1.0
}

/// Compute the delay before the next tick. `None` for modes with no timer.
pub fn next_delay<R: Rng + ?Sized>(config: &TickConfig, rng: &mut R, now_ms: i64) -> Option<Delay> {
    match config.mode {
        TickMode::Random => {
            let (lo, hi) = config.delay_range();
            let offset = (rng.gen::<f64>() * range_span(lo, hi)).floor() as u64;
            Some(Delay::exact(lo.saturating_add(offset).min(hi)))
        }
        TickMode::SineWave => {
            let (lo, hi) = config.delay_range();
            let wave = (now_ms as f64 / sine_rate(config.sine_rate_percent)).sin().abs();
            // |sin| reaches 1.0 exactly at the crest, which would land on hi + 1
            let offset = (wave * range_span(lo, hi)).floor() as u64;
            Some(Delay::exact(lo.saturating_add(offset).min(hi)))
        }
        TickMode::Constant => Some(Delay::exact(config.constant_delay_ms)),
        TickMode::BeatSynced => {
            let bpm = config.beats_per_minute.unwrap_or(0.0);
            let ms = config.multiplier().beat_delay_ms(bpm);
            if ms.is_finite() && ms > 0.0 {
                Some(Delay::exact(ms.round().max(1.0) as u64))
            } else {
                log::warn!("degenerate beat delay ({ms}) for bpm {bpm}, using {FALLBACK_DELAY_MS} ms");
                Some(Delay { ms: FALLBACK_DELAY_MS, fallback: true })
            }
        }
        TickMode::SceneLinked => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(mode: TickMode) -> TickConfig {
        TickConfig { mode, ..Default::default() }
    }

    fn beat(bpm: Option<f64>, multiplier: i32) -> u64 {
        let mut rng = StdRng::seed_from_u64(1);
        let config = TickConfig {
            mode: TickMode::BeatSynced,
            beats_per_minute: bpm,
            beat_multiplier: multiplier,
            ..Default::default()
        };
        next_delay(&config, &mut rng, 0).unwrap().ms
    }

    #[test]
    fn test_random_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for (min, max) in [(0, 0), (0, 10), (250, 251), (100, 5000)] {
            let c = TickConfig { min_delay_ms: min, max_delay_ms: max, ..config(TickMode::Random) };
            for _ in 0..2000 {
                let d = next_delay(&c, &mut rng, 0).unwrap();
                assert!(d.ms >= min && d.ms <= max, "{} outside {min}..={max}", d.ms);
                assert!(!d.fallback);
            }
        }
    }

    #[test]
    fn test_random_reaches_both_ends() {
        let mut rng = StdRng::seed_from_u64(3);
        let c = TickConfig { min_delay_ms: 10, max_delay_ms: 12, ..config(TickMode::Random) };
        let seen: Vec<u64> = (0..500).map(|_| next_delay(&c, &mut rng, 0).unwrap().ms).collect();
        assert!(seen.contains(&10));
        assert!(seen.contains(&12));
    }

    #[test]
    fn test_random_tolerates_swapped_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        let c = TickConfig { min_delay_ms: 800, max_delay_ms: 200, ..config(TickMode::Random) };
        for _ in 0..500 {
            let d = next_delay(&c, &mut rng, 0).unwrap().ms;
            assert!((200..=800).contains(&d));
        }
    }

    #[test]
    fn test_sine_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(0);
        for rate in [-50, 0, 37, 100, 150] {
            let c = TickConfig {
                min_delay_ms: 300,
                max_delay_ms: 900,
                sine_rate_percent: rate,
                ..config(TickMode::SineWave)
            };
            for now in (0..200_000i64).step_by(997) {
                let d = next_delay(&c, &mut rng, now).unwrap().ms;
                assert!((300..=900).contains(&d), "{d} at {now} rate {rate}");
            }
        }
    }

    #[test]
    fn test_sine_crest_reaches_max() {
        let mut rng = StdRng::seed_from_u64(0);
        // rate 100% -> divisor 2000 ms; sin(pi/2) == 1 at now = 1000 * pi
        let c = TickConfig { min_delay_ms: 0, max_delay_ms: 10, sine_rate_percent: 100, ..config(TickMode::SineWave) };
        let now = (std::f64::consts::FRAC_PI_2 * 2000.0).round() as i64;
        assert_eq!(next_delay(&c, &mut rng, now).unwrap().ms, 10);
        assert_eq!(next_delay(&c, &mut rng, 0).unwrap().ms, 0);
    }

    #[test]
    fn test_full_width_range_does_not_overflow() {
        let mut rng = StdRng::seed_from_u64(4);
        for mode in [TickMode::Random, TickMode::SineWave] {
            let c = TickConfig { min_delay_ms: 0, max_delay_ms: u64::MAX, ..config(mode) };
            for now in [0, 1_000, 3_142, 77_777] {
                assert!(next_delay(&c, &mut rng, now).is_some());
            }
            let c = TickConfig { min_delay_ms: u64::MAX - 1, max_delay_ms: u64::MAX, ..config(mode) };
            let d = next_delay(&c, &mut rng, 3_142).unwrap().ms;
            assert!(d >= u64::MAX - 1);
        }
    }

    #[test]
    fn test_sine_rate_formula() {
        assert_eq!(sine_rate(100), 2000.0);
        assert_eq!(sine_rate(0), 102_000.0);
        assert_eq!(sine_rate(50), 52_000.0);
        assert_eq!(sine_rate(150), 52_000.0);
    }

    #[test]
    fn test_constant_is_fixed() {
        let mut rng = StdRng::seed_from_u64(5);
        let c = TickConfig { constant_delay_ms: 1234, ..config(TickMode::Constant) };
        for now in [0, 1, 99_999] {
            assert_eq!(next_delay(&c, &mut rng, now), Some(Delay { ms: 1234, fallback: false }));
        }
    }

    #[test]
    fn test_beat_synced_delays() {
        assert_eq!(beat(Some(120.0), 1), 500);
        assert_eq!(beat(Some(120.0), 0), 1000);
        assert_eq!(beat(Some(120.0), -1), 1500);
        assert_eq!(beat(Some(120.0), 2), 250);
        assert_eq!(beat(Some(60.0), 1), 1000);
    }

    #[test]
    fn test_beat_synced_fallback() {
        assert_eq!(beat(None, 1), FALLBACK_DELAY_MS);
        assert_eq!(beat(Some(0.0), 1), FALLBACK_DELAY_MS);
        assert_eq!(beat(Some(0.0), -3), FALLBACK_DELAY_MS);
        assert_eq!(beat(Some(-90.0), 1), FALLBACK_DELAY_MS);
        assert_eq!(beat(Some(f64::NAN), 1), FALLBACK_DELAY_MS);

        let mut rng = StdRng::seed_from_u64(1);
        let c = TickConfig { beats_per_minute: None, ..config(TickMode::BeatSynced) };
        assert!(next_delay(&c, &mut rng, 0).unwrap().fallback);
    }

    #[test]
    fn test_scene_linked_has_no_delay() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(next_delay(&config(TickMode::SceneLinked), &mut rng, 0), None);
    }
}
