//! Single-shot timer facilities.
//!
//! The scheduler arms at most one timer per session and identifies firings by
//! handle. Hosts poll their facility for expired handles and pass them back
//! to the scheduler; a handle that was disarmed never comes out of a poll.

use std::time::{Duration, Instant};

/// Identifies one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Arms and disarms single-shot delayed callbacks.
pub trait TimerFacility {
    fn arm(&mut self, delay: Duration) -> TimerHandle;
    /// Must be a no-op for handles that already fired or were disarmed.
    fn disarm(&mut self, handle: TimerHandle);
}

/// Pending deadlines keyed by handle, shared by both facilities.
#[derive(Debug)]
struct Pending<T> {
    next_id: u64,
    entries: Vec<(TimerHandle, T)>,
}

impl<T> Default for Pending<T> {
    fn default() -> Self {
        Self { next_id: 0, entries: Vec::new() }
    }
}

impl<T: Copy + Ord> Pending<T> {
    fn insert(&mut self, due: T) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.entries.push((handle, due));
        handle
    }

    fn remove(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(h, _)| *h != handle);
        self.entries.len() != before
    }

    /// Remove and return everything due at or before `now`, earliest first.
    fn take_due(&mut self, now: T) -> Vec<TimerHandle> {
        let mut due: Vec<(TimerHandle, T)> = Vec::new();
        self.entries.retain(|&(h, at)| {
            if at <= now {
                due.push((h, at));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(h, at)| (at, h));
        due.into_iter().map(|(h, _)| h).collect()
    }

    fn earliest(&self) -> Option<T> {
        self.entries.iter().map(|&(_, at)| at).min()
    }
}

/// Real-time facility polled from a frame loop.
#[derive(Debug, Default)]
pub struct DeadlineTimer {
    pending: Pending<Instant>,
}

impl DeadlineTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles whose deadline has passed. Each is returned once.
    pub fn expired(&mut self, now: Instant) -> Vec<TimerHandle> {
        self.pending.take_due(now)
    }

    /// The earliest armed deadline, for scheduling a wake-up.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.earliest()
    }

    pub fn armed_count(&self) -> usize {
        self.pending.entries.len()
    }
}

impl TimerFacility for DeadlineTimer {
    fn arm(&mut self, delay: Duration) -> TimerHandle {
        let handle = self.pending.insert(Instant::now() + delay);
        log::debug!("armed {handle:?} in {} ms", delay.as_millis());
        handle
    }

    fn disarm(&mut self, handle: TimerHandle) {
        if self.pending.remove(handle) {
            log::debug!("disarmed {handle:?}");
        }
    }
}

/// Facility driven by a virtual clock, advanced by hand.
#[derive(Debug, Default)]
pub struct ManualTimer {
    now: Duration,
    pending: Pending<Duration>,
    armed: Vec<(TimerHandle, Duration)>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the virtual clock forward and return the handles that came due.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerHandle> {
        self.now += by;
        self.pending.take_due(self.now)
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Armed and not yet fired or disarmed, with their due time.
    pub fn pending(&self) -> Vec<(TimerHandle, Duration)> {
        self.pending.entries.clone()
    }

    /// Every arm call made so far, with the requested delay.
    pub fn arm_log(&self) -> &[(TimerHandle, Duration)] {
        &self.armed
    }
}

impl TimerFacility for ManualTimer {
    fn arm(&mut self, delay: Duration) -> TimerHandle {
        let handle = self.pending.insert(self.now + delay);
        self.armed.push((handle, delay));
        handle
    }

    fn disarm(&mut self, handle: TimerHandle) {
        self.pending.remove(handle);
    }
}
