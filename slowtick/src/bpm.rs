//! BPM acquisition: tag reads, value parsing, and request status.

use crate::error::BpmError;
use lofty::prelude::*;
use std::path::Path;
use std::time::{Duration, Instant};

/// How long a success or failure indicator stays up.
pub const STATUS_HOLD: Duration = Duration::from_secs(3);

/// Read the BPM tag from an audio file.
pub fn read_bpm_tag(path: &Path) -> Result<f64, BpmError> {
    let tagged = lofty::read_from_path(path)?;
    for tag in tagged.tags() {
        for key in [ItemKey::Bpm, ItemKey::IntegerBpm] {
            if let Some(text) = tag.get_string(&key) {
                return parse_bpm(text);
            }
        }
    }
    Err(BpmError::MissingTag(path.display().to_string()))
}

/// Parse a user- or tag-supplied tempo. Rejects non-positive and
/// non-finite values.
pub fn parse_bpm(text: &str) -> Result<f64, BpmError> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| BpmError::InvalidValue(text.to_string()))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(BpmError::InvalidValue(text.to_string()));
    }
    Ok(round_bpm(value))
}

/// Stored tempos keep two decimal places.
pub fn round_bpm(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Progress of one BPM request, shown next to its button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BpmStatus {
    #[default]
    Idle,
    Loading,
    Success(Instant),
    Failed(Instant),
}

impl BpmStatus {
    /// Start a request. Returns false if one is already running.
    pub fn begin(&mut self) -> bool {
        if *self == BpmStatus::Loading {
            return false;
        }
        *self = BpmStatus::Loading;
        true
    }

    pub fn finish<T, E: std::fmt::Display>(&mut self, result: &Result<T, E>, now: Instant) {
        *self = match result {
            Ok(_) => BpmStatus::Success(now),
            Err(e) => {
                log::warn!("bpm request failed: {e}");
                BpmStatus::Failed(now)
            }
        };
    }

    /// Drop a finished indicator once it has been shown long enough.
    pub fn settle(&mut self, now: Instant) {
        match *self {
            BpmStatus::Success(at) | BpmStatus::Failed(at) if now.duration_since(at) >= STATUS_HOLD => {
                *self = BpmStatus::Idle;
            }
            _ => {}
        }
    }

    /// When this indicator will next change on its own.
    pub fn deadline(&self) -> Option<Instant> {
        match *self {
            BpmStatus::Success(at) | BpmStatus::Failed(at) => Some(at + STATUS_HOLD),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        *self == BpmStatus::Loading
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            BpmStatus::Idle => "",
            BpmStatus::Loading => "…",
            BpmStatus::Success(_) => "✓",
            BpmStatus::Failed(_) => "!",
        }
    }
}
