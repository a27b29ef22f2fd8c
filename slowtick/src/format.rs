//! Text shown in the panel.

/// Label for the signed beat multiplier: `"3x"`, or `"1 / 2x"` for 0.
pub fn multiplier_label(beat_multiplier: i32) -> String {
    if beat_multiplier > 0 {
        format!("{beat_multiplier}x")
    } else {
        format!("1 / {}x", 2 - beat_multiplier as i64)
    }
}

/// `m:ss`, or `h:mm:ss` once past an hour.
pub fn timestamp(ms: u64) -> String {
    let total = ms / 1000;
    let (h, m, s) = (total / 3600, (total / 60) % 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Playback speed stored in tenths.
pub fn speed_label(speed: u8) -> String {
    format!("{}x", speed as f32 / 10.0)
}
