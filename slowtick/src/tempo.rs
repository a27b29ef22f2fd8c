//! Tempo detection from decoded audio.
//!
//! The energy detector builds an onset-strength envelope (positive jumps in
//! per-block energy) and picks the autocorrelation peak among lags that fall
//! inside the tempo range. Ties go to the shorter lag, so a steady pulse
//! reports its own tempo rather than half of it.

use crate::bpm::round_bpm;
use crate::error::BpmError;
use rodio::{Decoder, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub trait TempoDetector {
    /// Tempo of mono samples in `[-1, 1]`, or `None` when nothing periodic
    /// stands out.
    fn detect_samples(&self, samples: &[f32], sample_rate: u32) -> Option<f64>;

    fn detect_file(&self, path: &Path) -> Result<f64, BpmError> {
        let (samples, sample_rate) = decode_mono(path)?;
        self.detect_samples(&samples, sample_rate)
            .map(round_bpm)
            .ok_or(BpmError::NoTempo)
    }
}

#[derive(Debug, Clone)]
pub struct EnergyTempoDetector {
    /// Samples per energy block.
    pub hop: usize,
    pub min_bpm: f64,
    pub max_bpm: f64,
}

impl Default for EnergyTempoDetector {
    fn default() -> Self {
        Self { hop: 512, min_bpm: 60.0, max_bpm: 180.0 }
    }
}

impl EnergyTempoDetector {
    fn onset_envelope(&self, samples: &[f32]) -> Vec<f32> {
        let mut previous = 0.0f32;
        samples
            .chunks(self.hop)
            .map(|block| {
                let energy = block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32;
                let onset = (energy - previous).max(0.0);
                previous = energy;
                onset
            })
            .collect()
    }

    fn autocorrelation(envelope: &[f32], lag: usize) -> f32 {
        envelope.iter().zip(&envelope[lag..]).map(|(a, b)| a * b).sum()
    }
}

impl TempoDetector for EnergyTempoDetector {
    fn detect_samples(&self, samples: &[f32], sample_rate: u32) -> Option<f64> {
        if self.hop == 0 || sample_rate == 0 {
            return None;
        }
        let envelope = self.onset_envelope(samples);
        let blocks_per_minute = 60.0 * sample_rate as f64 / self.hop as f64;
        let lag_min = ((blocks_per_minute / self.max_bpm).floor() as usize).max(1);
        let lag_max = ((blocks_per_minute / self.min_bpm).ceil() as usize).min(envelope.len().saturating_sub(1));
        if lag_min > lag_max {
            return None;
        }

        let scores: Vec<f32> = (lag_min..=lag_max)
            .map(|lag| Self::autocorrelation(&envelope, lag))
            .collect();
        let (best, &peak) = scores
            .iter()
            .enumerate()
            .fold(None, |acc: Option<(usize, &f32)>, (i, s)| match acc {
                Some((_, top)) if *s <= *top => acc,
                _ => Some((i, s)),
            })?;
        if peak <= 0.0 {
            return None;
        }

        // parabolic refinement around the peak
        let mut lag = (lag_min + best) as f64;
        if best > 0 && best + 1 < scores.len() {
            let (l, c, r) = (scores[best - 1] as f64, peak as f64, scores[best + 1] as f64);
            let denom = l - 2.0 * c + r;
            if denom.abs() > f64::EPSILON {
                lag += 0.5 * (l - r) / denom;
            }
        }
        Some(blocks_per_minute / lag)
    }
}

/// Decode a file and mix it down to mono floats.
pub fn decode_mono(path: &Path) -> Result<(Vec<f32>, u32), BpmError> {
    let decoder = Decoder::new(BufReader::new(File::open(path)?))?;
    let channels = decoder.channels().max(1) as usize;
    let sample_rate = decoder.sample_rate();
    let interleaved: Vec<f32> = decoder.map(|s| s as f32 / i16::MAX as f32).collect();
    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((mono, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Short bursts every `60 / bpm` seconds.
    fn click_track(bpm: f64, sample_rate: u32, seconds: f64) -> Vec<f32> {
        let total = (sample_rate as f64 * seconds) as usize;
        let period = (60.0 / bpm * sample_rate as f64) as usize;
        (0..total).map(|i| if i % period < 20 { 1.0 } else { 0.0 }).collect()
    }

    fn detector() -> EnergyTempoDetector {
        EnergyTempoDetector { hop: 100, ..Default::default() }
    }

    #[test]
    fn test_detects_click_tempo() {
        let samples = click_track(120.0, 8000, 20.0);
        let bpm = detector().detect_samples(&samples, 8000).unwrap();
        assert!((bpm - 120.0).abs() < 0.5, "got {bpm}");
    }

    #[test]
    fn test_detects_slower_tempo() {
        let samples = click_track(75.0, 8000, 30.0);
        let bpm = detector().detect_samples(&samples, 8000).unwrap();
        assert!((bpm - 75.0).abs() < 1.0, "got {bpm}");
    }

    #[test]
    fn test_silence_has_no_tempo() {
        let samples = vec![0.0; 8000 * 10];
        assert_eq!(detector().detect_samples(&samples, 8000), None);
    }

    #[test]
    fn test_too_short_has_no_tempo() {
        let samples = click_track(120.0, 8000, 0.2);
        assert_eq!(detector().detect_samples(&samples, 8000), None);
    }

    #[test]
    fn test_undecodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"RIFF????").unwrap();
        assert!(detector().detect_file(&path).is_err());
    }
}
