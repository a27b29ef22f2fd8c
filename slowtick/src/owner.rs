//! Lifecycle glue between a panel and its tick session.
//!
//! The panel mounts once, reports its current settings every frame through
//! [`TickOwner::update`], delivers fired timer handles, and unmounts on
//! close. The owner decides from the previous and current settings when to
//! start, restart, reconfigure, or stop the session.

use crate::config::TickSettings;
use crate::error::Result;
use crate::mode::TickMode;
use crate::scheduler::{SessionState, TickScheduler, TickSession};
use crate::timer::{TimerFacility, TimerHandle};

/// Tracks the upstream scene sequence by a fingerprint (a generation
/// counter or a hash of the current paths); `None` when the sequence is
/// empty.
#[derive(Debug, Default, Clone)]
pub struct SequenceWatch {
    last: Option<u64>,
}

impl SequenceWatch {
    /// Returns true when a non-empty previous sequence was replaced.
    pub fn observe(&mut self, current: Option<u64>) -> bool {
        let changed = self.last.is_some() && current != self.last;
        self.last = current;
        changed
    }
}

pub struct TickOwner<T: TimerFacility> {
    scheduler: TickScheduler<T>,
    session: Option<TickSession>,
    previous: Option<TickSettings>,
    sequence: SequenceWatch,
    playback_intended: bool,
}

impl<T: TimerFacility> TickOwner<T> {
    pub fn new(mut scheduler: TickScheduler<T>) -> Self {
        scheduler.link_sequence_signal();
        Self {
            scheduler,
            session: None,
            previous: None,
            sequence: SequenceWatch::default(),
            playback_intended: false,
        }
    }

    pub fn session(&self) -> Option<&TickSession> {
        self.session.as_ref()
    }

    pub fn scheduler(&self) -> &TickScheduler<T> {
        &self.scheduler
    }

    pub fn timer_mut(&mut self) -> &mut T {
        self.scheduler.timer_mut()
    }

    pub fn parity(&self) -> bool {
        self.session.as_ref().map(|s| s.parity()).unwrap_or(false)
    }

    pub fn is_ticking(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_active())
    }

    /// First appearance. Starts ticking when playback is intended and
    /// ticking is on.
    pub fn mount(&mut self, settings: &TickSettings, start_playing: bool) -> Result<()> {
        self.playback_intended = start_playing;
        self.previous = Some(settings.clone());
        if start_playing && settings.enabled {
            self.begin(settings)?;
        }
        Ok(())
    }

    /// Playback started or paused. Starting begins ticking when it is on
    /// and nothing is scheduled yet; pausing leaves a running session alone.
    pub fn set_playback_intended(&mut self, intended: bool, settings: &TickSettings) -> Result<()> {
        self.playback_intended = intended;
        if intended && settings.enabled && self.needs_start(settings) {
            self.begin(settings)?;
        }
        Ok(())
    }

    /// No live session, or a timed one left idle by a mode switch made
    /// while paused.
    fn needs_start(&self, settings: &TickSettings) -> bool {
        match self.session.as_ref() {
            None => true,
            Some(session) => {
                !session.is_active()
                    || (settings.config.mode.is_timed() && session.state() == SessionState::Idle)
            }
        }
    }

    /// Apply the current settings and sequence fingerprint. Returns the new
    /// parity when a sequence change produced a tick.
    pub fn update(&mut self, settings: &TickSettings, sequence: Option<u64>) -> Result<Option<bool>> {
        let previous = self.previous.replace(settings.clone()).unwrap_or_default();

        let turned_on = settings.enabled && !previous.enabled;
        let left_linked = settings.enabled
            && previous.config.mode == TickMode::SceneLinked
            && settings.config.mode != TickMode::SceneLinked;

        if !settings.enabled {
            if previous.enabled {
                self.end();
            }
        } else if turned_on || left_linked {
            if self.playback_intended {
                self.begin(settings)?;
            }
        } else if let Some(session) = self.session.as_mut() {
            if session.config() != &settings.config {
                self.scheduler.reconfigure(session, settings.config.clone());
            }
        }

        let sequence_changed = self.sequence.observe(sequence);
        if sequence_changed && settings.enabled && settings.config.mode == TickMode::SceneLinked {
            if let Some(session) = self.session.as_mut() {
                return Ok(self.scheduler.sequence_changed(session));
            }
        }
        Ok(None)
    }

    /// Deliver a fired timer handle. Returns the new parity if it ticked.
    pub fn on_timer(&mut self, handle: TimerHandle) -> Option<bool> {
        let session = self.session.as_mut()?;
        self.scheduler.fire(session, handle)
    }

    /// Owner teardown: unconditional stop.
    pub fn unmount(&mut self) {
        self.end();
        self.previous = None;
    }

    fn begin(&mut self, settings: &TickSettings) -> Result<()> {
        match self.session.as_mut() {
            Some(session) => self.scheduler.restart(session, settings.config.clone()),
            None => {
                self.session = Some(self.scheduler.start(settings.config.clone())?);
                Ok(())
            }
        }
    }

    fn end(&mut self) {
        if let Some(session) = self.session.as_mut() {
            self.scheduler.stop(session);
        }
    }
}

impl<T: TimerFacility> Drop for TickOwner<T> {
    fn drop(&mut self) {
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TickConfig;
    use crate::delay::FixedClock;
    use crate::timer::ManualTimer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn owner() -> TickOwner<ManualTimer> {
        TickOwner::new(
            TickScheduler::new(ManualTimer::new())
                .with_rng(StdRng::seed_from_u64(11))
                .with_clock(FixedClock(0)),
        )
    }

    fn settings(enabled: bool, mode: TickMode) -> TickSettings {
        TickSettings {
            enabled,
            config: TickConfig { mode, constant_delay_ms: 100, ..Default::default() },
        }
    }

    fn tick(owner: &mut TickOwner<ManualTimer>, ms: u64) -> Vec<bool> {
        let due = owner.timer_mut().advance(Duration::from_millis(ms));
        due.into_iter().filter_map(|h| owner.on_timer(h)).collect()
    }

    fn pending(owner: &TickOwner<ManualTimer>) -> usize {
        owner.scheduler().timer().pending().len()
    }

    #[test]
    fn test_mount_starts_when_playing() {
        let mut o = owner();
        o.mount(&settings(true, TickMode::Constant), true).unwrap();
        assert!(o.is_ticking());
        assert_eq!(pending(&o), 1);
        assert_eq!(tick(&mut o, 100), vec![true]);
    }

    #[test]
    fn test_mount_idle_when_not_playing_or_off() {
        let mut o = owner();
        o.mount(&settings(true, TickMode::Constant), false).unwrap();
        assert!(o.session().is_none());

        let mut o = owner();
        o.mount(&settings(false, TickMode::Constant), true).unwrap();
        assert!(o.session().is_none());
    }

    #[test]
    fn test_toggle_on_starts_toggle_off_stops() {
        let mut o = owner();
        o.mount(&settings(false, TickMode::Constant), true).unwrap();
        o.update(&settings(true, TickMode::Constant), None).unwrap();
        assert!(o.is_ticking());
        assert_eq!(pending(&o), 1);

        o.update(&settings(false, TickMode::Constant), None).unwrap();
        assert!(!o.is_ticking());
        assert_eq!(pending(&o), 0);
        assert!(tick(&mut o, 1000).is_empty());

        // back on: the same session restarts with its parity intact
        o.update(&settings(true, TickMode::Constant), None).unwrap();
        assert_eq!(o.session().unwrap().id(), 1);
        assert_eq!(pending(&o), 1);
    }

    #[test]
    fn test_leaving_scene_linked_restarts() {
        let mut o = owner();
        o.mount(&settings(true, TickMode::SceneLinked), true).unwrap();
        assert_eq!(o.session().unwrap().state(), SessionState::Idle);
        assert_eq!(pending(&o), 0);

        o.update(&settings(true, TickMode::Constant), None).unwrap();
        assert_eq!(pending(&o), 1);
        assert_eq!(tick(&mut o, 100), vec![true]);
    }

    #[test]
    fn test_scene_linked_follows_sequence() {
        let mut o = owner();
        let linked = settings(true, TickMode::SceneLinked);
        o.mount(&linked, true).unwrap();
        assert_eq!(o.update(&linked, Some(1)).unwrap(), None);
        assert_eq!(o.update(&linked, Some(1)).unwrap(), None);
        assert_eq!(o.update(&linked, Some(2)).unwrap(), Some(true));
        assert_eq!(o.update(&linked, Some(3)).unwrap(), Some(false));
        assert_eq!(pending(&o), 0);
    }

    #[test]
    fn test_empty_sequence_does_not_tick() {
        let mut o = owner();
        let linked = settings(true, TickMode::SceneLinked);
        o.mount(&linked, true).unwrap();
        assert_eq!(o.update(&linked, None).unwrap(), None);
        assert_eq!(o.update(&linked, Some(4)).unwrap(), None);
    }

    #[test]
    fn test_timed_mode_ignores_sequence() {
        let mut o = owner();
        let timed = settings(true, TickMode::Constant);
        o.mount(&timed, true).unwrap();
        o.update(&timed, Some(1)).unwrap();
        assert_eq!(o.update(&timed, Some(2)).unwrap(), None);
        assert!(!o.parity());
    }

    #[test]
    fn test_parameter_edit_reconfigures_forward() {
        let mut o = owner();
        o.mount(&settings(true, TickMode::Constant), true).unwrap();
        let mut slower = settings(true, TickMode::Constant);
        slower.config.constant_delay_ms = 400;
        o.update(&slower, None).unwrap();

        assert_eq!(pending(&o), 1);
        assert_eq!(tick(&mut o, 100), vec![true]);
        assert!(tick(&mut o, 399).is_empty());
        assert_eq!(tick(&mut o, 1), vec![false]);
    }

    #[test]
    fn test_play_after_mount_begins_ticking() {
        let mut o = owner();
        let timed = settings(true, TickMode::Constant);
        o.mount(&timed, false).unwrap();
        assert!(!o.is_ticking());

        o.set_playback_intended(true, &timed).unwrap();
        assert!(o.is_ticking());
        assert_eq!(pending(&o), 1);

        // pausing keeps the session; playing again does not double-arm
        o.set_playback_intended(false, &timed).unwrap();
        o.set_playback_intended(true, &timed).unwrap();
        assert_eq!(pending(&o), 1);
    }

    #[test]
    fn test_leaving_scene_linked_while_paused_starts_on_play() {
        let mut o = owner();
        o.mount(&settings(true, TickMode::SceneLinked), true).unwrap();
        o.set_playback_intended(false, &settings(true, TickMode::SceneLinked)).unwrap();

        let timed = settings(true, TickMode::Constant);
        o.update(&timed, None).unwrap();
        assert_eq!(pending(&o), 0);

        o.set_playback_intended(true, &timed).unwrap();
        o.update(&timed, None).unwrap();
        assert_eq!(o.session().unwrap().config().mode, TickMode::Constant);
        assert_eq!(pending(&o), 1);
        assert_eq!(tick(&mut o, 100), vec![true]);
    }

    #[test]
    fn test_unmount_stops() {
        let mut o = owner();
        o.mount(&settings(true, TickMode::Constant), true).unwrap();
        o.unmount();
        o.unmount();
        assert!(!o.is_ticking());
        assert_eq!(pending(&o), 0);
    }
}
