//! Tick scheduler: a per-session state machine over a single-shot timer.
//!
//! A session moves between three states:
//!
//! - `Idle`: active, no timer armed (SceneLinked, or between a fire and
//!   its re-arm).
//! - `Armed`: exactly one timer pending; its handle is owned here.
//! - `Stopped`: cancelled; fires and signals are ignored.
//!
//! Starting enters the loop without flipping parity and arms the first
//! delay straight away. Each later fire flips parity, computes the next
//! delay from the config as it is *now*, and re-arms. A timer is only
//! armed after the previous one fired or was disarmed.

use crate::config::TickConfig;
use crate::delay::{next_delay, Delay, SystemClock, WallClock};
use crate::error::{Result, TickError};
use crate::mode::TickMode;
use crate::timer::{TimerFacility, TimerHandle};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Armed { handle: TimerHandle, delay: Delay },
    Stopped,
}

/// Runtime state of one scheduling session.
#[derive(Debug, Clone)]
pub struct TickSession {
    id: u64,
    config: TickConfig,
    state: SessionState,
    parity: bool,
    ticks: u64,
}

impl TickSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Flips on every fired tick.
    pub fn parity(&self) -> bool {
        self.parity
    }

    /// Ticks fired so far, not counting the starting entry.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_active(&self) -> bool {
        self.state != SessionState::Stopped
    }

    pub fn pending(&self) -> Option<TimerHandle> {
        match self.state {
            SessionState::Armed { handle, .. } => Some(handle),
            _ => None,
        }
    }
}

/// Drives tick sessions over a timer facility.
pub struct TickScheduler<T: TimerFacility> {
    timer: T,
    rng: StdRng,
    clock: Box<dyn WallClock>,
    sequence_linked: bool,
    next_session: u64,
    on_tick: Option<Box<dyn FnMut(u64, bool)>>,
}

impl<T: TimerFacility> TickScheduler<T> {
    pub fn new(timer: T) -> Self {
        Self {
            timer,
            rng: StdRng::from_entropy(),
            clock: Box::new(SystemClock),
            sequence_linked: false,
            next_session: 0,
            on_tick: None,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_clock(mut self, clock: impl WallClock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Called with the session id and new parity on every tick, timed or
    /// sequence-driven. Starting entries do not call it.
    pub fn on_tick(mut self, listener: impl FnMut(u64, bool) + 'static) -> Self {
        self.on_tick = Some(Box::new(listener));
        self
    }

    /// Wire the upstream sequence-change signal that drives SceneLinked
    /// sessions. Without it, starting a SceneLinked session fails.
    pub fn link_sequence_signal(&mut self) {
        self.sequence_linked = true;
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Begin a session. The first delay is armed at once; no tick is
    /// reported for the starting entry.
    pub fn start(&mut self, config: TickConfig) -> Result<TickSession> {
        self.check_mode(&config)?;
        self.next_session += 1;
        let mut session = TickSession {
            id: self.next_session,
            config,
            state: SessionState::Idle,
            parity: false,
            ticks: 0,
        };
        log::info!("tick session {} started in {:?} mode", session.id, session.config.mode);
        self.enter(&mut session, true);
        Ok(session)
    }

    /// Cancel whatever is pending and re-enter the loop in starting mode,
    /// keeping the session's parity.
    pub fn restart(&mut self, session: &mut TickSession, config: TickConfig) -> Result<()> {
        self.check_mode(&config)?;
        self.cancel_pending(session);
        session.config = config;
        session.state = SessionState::Idle;
        log::info!("tick session {} restarted in {:?} mode", session.id, session.config.mode);
        self.enter(session, true);
        Ok(())
    }

    /// Cancel the pending timer, if any. Safe to repeat.
    pub fn stop(&mut self, session: &mut TickSession) {
        if session.state == SessionState::Stopped {
            return;
        }
        self.cancel_pending(session);
        session.state = SessionState::Stopped;
        log::info!("tick session {} stopped after {} ticks", session.id, session.ticks);
    }

    /// Replace the parameters used for the next delay computation. A timer
    /// already armed keeps its original fire time.
    pub fn reconfigure(&mut self, session: &mut TickSession, config: TickConfig) {
        session.config = config;
    }

    /// Deliver a fired timer. Returns the new parity when the handle
    /// belongs to this session's pending timer, `None` for stale handles.
    pub fn fire(&mut self, session: &mut TickSession, handle: TimerHandle) -> Option<bool> {
        match session.state {
            SessionState::Armed { handle: pending, .. } if pending == handle => {
                session.state = SessionState::Idle;
                self.enter(session, false);
                Some(session.parity)
            }
            _ => None,
        }
    }

    /// Upstream sequence changed. Flips parity for an active SceneLinked
    /// session and touches no timer.
    pub fn sequence_changed(&mut self, session: &mut TickSession) -> Option<bool> {
        if !session.is_active() || session.config.mode != TickMode::SceneLinked {
            return None;
        }
        session.parity = !session.parity;
        session.ticks += 1;
        log::debug!("tick session {} followed sequence change", session.id);
        self.notify(session);
        Some(session.parity)
    }

    fn check_mode(&self, config: &TickConfig) -> Result<()> {
        if config.mode == TickMode::SceneLinked && !self.sequence_linked {
            return Err(TickError::InvalidMode { mode: config.mode });
        }
        Ok(())
    }

    fn notify(&mut self, session: &TickSession) {
        if let Some(listener) = self.on_tick.as_mut() {
            listener(session.id, session.parity);
        }
    }

    fn cancel_pending(&mut self, session: &mut TickSession) {
        if let Some(handle) = session.pending() {
            self.timer.disarm(handle);
            session.state = SessionState::Idle;
        }
    }

    /// One pass of the loop: flip (unless starting), then arm the next delay.
    fn enter(&mut self, session: &mut TickSession, starting: bool) {
        debug_assert!(session.pending().is_none());
        if !starting {
            session.parity = !session.parity;
            session.ticks += 1;
            self.notify(session);
        }
        let now_ms = self.clock.now_ms();
        match next_delay(&session.config, &mut self.rng, now_ms) {
            Some(delay) => {
                let handle = self.timer.arm(delay.as_duration());
                session.state = SessionState::Armed { handle, delay };
            }
            None => session.state = SessionState::Idle,
        }
    }
}
