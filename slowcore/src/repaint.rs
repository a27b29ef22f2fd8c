//! Repaint scheduling for timer-driven apps.
//!
//! egui only runs `update()` when something asks it to. An app whose state
//! changes on its own (a tick timer fires, playback advances) has to say
//! when it next needs a frame. `RepaintController` collects those requests
//! during a frame and issues a single repaint request at the end of it:
//!
//! 1. **One-shot**: `mark_needs_repaint()` after state changed outside input.
//! 2. **Wake deadline**: `wake_at(instant)` for the next armed timer. The
//!    earliest deadline of the frame wins.
//! 3. **Continuous**: `set_continuous(true)` while something animates, at a
//!    governed interval.
//!
//! With none of these set, egui sleeps until the next input event.

use std::time::{Duration, Instant};

/// Interval for continuous repaints (~4 Hz keeps a position readout live).
const DEFAULT_REPAINT_INTERVAL: Duration = Duration::from_millis(250);

pub struct RepaintController {
    continuous: bool,
    needs_repaint: bool,
    interval: Duration,
    /// Earliest wake requested during the current frame.
    wake: Option<Instant>,
}

impl Default for RepaintController {
    fn default() -> Self {
        Self::new()
    }
}

impl RepaintController {
    pub fn new() -> Self {
        Self {
            continuous: false,
            needs_repaint: false,
            interval: DEFAULT_REPAINT_INTERVAL,
            wake: None,
        }
    }

    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
    }

    pub fn mark_needs_repaint(&mut self) {
        self.needs_repaint = true;
    }

    /// Ask for a frame no later than `deadline`. Several calls in one frame
    /// keep the earliest.
    pub fn wake_at(&mut self, deadline: Instant) {
        self.wake = Some(match self.wake {
            Some(current) => current.min(deadline),
            None => deadline,
        });
    }

    /// Call at the start of `update()`.
    pub fn begin_frame(&mut self) {
        self.needs_repaint = false;
        self.wake = None;
    }

    /// Call at the end of `update()`.
    pub fn end_frame(&mut self, ctx: &egui::Context) {
        if let Some(after) = self.next_request(Instant::now()) {
            ctx.request_repaint_after(after);
        }
    }

    /// Delay until the next frame should run, if any.
    fn next_request(&self, now: Instant) -> Option<Duration> {
        if self.needs_repaint {
            return Some(Duration::ZERO);
        }
        let wake = self.wake.map(|at| at.saturating_duration_since(now));
        let continuous = self.continuous.then_some(self.interval);
        match (wake, continuous) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earliest_wake_wins() {
        let now = Instant::now();
        let mut rc = RepaintController::new();
        rc.wake_at(now + Duration::from_millis(900));
        rc.wake_at(now + Duration::from_millis(300));
        rc.wake_at(now + Duration::from_millis(600));
        assert_eq!(rc.wake, Some(now + Duration::from_millis(300)));
        assert_eq!(rc.next_request(now), Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_overdue_wake_is_immediate() {
        let now = Instant::now();
        let mut rc = RepaintController::new();
        rc.wake_at(now);
        assert_eq!(rc.next_request(now + Duration::from_millis(5)), Some(Duration::ZERO));
    }

    #[test]
    fn test_continuous_caps_the_wait() {
        let now = Instant::now();
        let mut rc = RepaintController::new();
        rc.set_continuous(true);
        rc.wake_at(now + Duration::from_secs(10));
        assert_eq!(rc.next_request(now), Some(DEFAULT_REPAINT_INTERVAL));
    }

    #[test]
    fn test_idle_requests_nothing() {
        let rc = RepaintController::new();
        assert_eq!(rc.next_request(Instant::now()), None);
    }

    #[test]
    fn test_marked_repaint_is_immediate() {
        let mut rc = RepaintController::new();
        rc.set_continuous(true);
        rc.mark_needs_repaint();
        assert_eq!(rc.next_request(Instant::now()), Some(Duration::ZERO));
    }

    #[test]
    fn test_begin_frame_clears_requests() {
        let now = Instant::now();
        let mut rc = RepaintController::new();
        rc.mark_needs_repaint();
        rc.wake_at(now);
        rc.begin_frame();
        assert_eq!(rc.wake, None);
        assert_eq!(rc.next_request(now), None);
    }
}
