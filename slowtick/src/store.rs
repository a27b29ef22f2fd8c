//! Scenes, their audio tracks, and typed track edits.
//!
//! Every edit goes through [`SceneStore::update_audio`]: locate the track,
//! apply one typed field update, then notify observers with the scene.

use crate::config::{TickConfig, TickSettings};
use crate::error::StoreError;
use crate::mode::TickMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioTrack {
    pub id: u64,
    pub url: String,
    /// 0..=100
    pub volume: u8,
    /// Playback rate in tenths (10 is normal speed).
    pub speed: u8,
    pub tick: bool,
    pub tick_mode: TickMode,
    pub tick_delay: u64,
    pub tick_min_delay: u64,
    pub tick_max_delay: u64,
    pub tick_sin_rate: i32,
    pub tick_bpm_multi: i32,
    pub bpm: Option<f64>,
    pub stop_at_end: bool,
    pub next_scene_at_end: bool,
}

impl Default for AudioTrack {
    fn default() -> Self {
        let tick = TickConfig::default();
        Self {
            id: 0,
            url: String::new(),
            volume: 100,
            speed: 10,
            tick: false,
            tick_mode: tick.mode,
            tick_delay: tick.constant_delay_ms,
            tick_min_delay: tick.min_delay_ms,
            tick_max_delay: tick.max_delay_ms,
            tick_sin_rate: tick.sine_rate_percent,
            tick_bpm_multi: tick.beat_multiplier,
            bpm: None,
            stop_at_end: false,
            next_scene_at_end: false,
        }
    }
}

impl AudioTrack {
    /// Local file path for the track's URL, accepting `file://` URLs.
    pub fn path(&self) -> Option<PathBuf> {
        let url = self.url.trim();
        if url.is_empty() {
            return None;
        }
        Some(PathBuf::from(url.strip_prefix("file://").unwrap_or(url)))
    }

    pub fn tick_settings(&self) -> TickSettings {
        TickSettings { enabled: self.tick, config: TickConfig::from(self) }
    }
}

impl From<&AudioTrack> for TickConfig {
    fn from(track: &AudioTrack) -> Self {
        Self {
            mode: track.tick_mode,
            min_delay_ms: track.tick_min_delay,
            max_delay_ms: track.tick_max_delay,
            constant_delay_ms: track.tick_delay,
            sine_rate_percent: track.tick_sin_rate,
            beats_per_minute: track.bpm,
            beat_multiplier: track.tick_bpm_multi,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub id: u64,
    pub name: String,
    pub audio_enabled: bool,
    pub audios: Vec<AudioTrack>,
}

impl Default for Scene {
    fn default() -> Self {
        Self { id: 1, name: "scene".into(), audio_enabled: true, audios: Vec::new() }
    }
}

/// One edit to one track field.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioUpdate {
    Url(String),
    Volume(u8),
    Speed(u8),
    Tick(bool),
    TickMode(TickMode),
    TickDelay(u64),
    TickMinDelay(u64),
    TickMaxDelay(u64),
    TickSinRate(i32),
    TickBpmMulti(i32),
    Bpm(Option<f64>),
    StopAtEnd(bool),
    NextSceneAtEnd(bool),
}

impl AudioUpdate {
    fn apply(self, track: &mut AudioTrack) {
        match self {
            AudioUpdate::Url(url) => track.url = url,
            AudioUpdate::Volume(v) => track.volume = v.min(100),
            AudioUpdate::Speed(s) => track.speed = s,
            AudioUpdate::Tick(on) => {
                track.tick = on;
                if on {
                    track.stop_at_end = false;
                    track.next_scene_at_end = false;
                }
            }
            AudioUpdate::StopAtEnd(on) => {
                track.stop_at_end = on;
                if on {
                    track.tick = false;
                    track.next_scene_at_end = false;
                }
            }
            AudioUpdate::NextSceneAtEnd(on) => {
                track.next_scene_at_end = on;
                if on {
                    track.tick = false;
                    track.stop_at_end = false;
                }
            }
            AudioUpdate::TickMode(mode) => track.tick_mode = mode,
            AudioUpdate::TickDelay(ms) => track.tick_delay = ms,
            AudioUpdate::TickMinDelay(ms) => track.tick_min_delay = ms,
            AudioUpdate::TickMaxDelay(ms) => track.tick_max_delay = ms,
            AudioUpdate::TickSinRate(rate) => track.tick_sin_rate = rate,
            AudioUpdate::TickBpmMulti(multi) => track.tick_bpm_multi = multi,
            AudioUpdate::Bpm(bpm) => track.bpm = bpm,
        }
    }
}

/// Numeric fields bound-checked when their text input loses focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    Bpm,
    TickDelay,
    TickMinDelay,
    TickMaxDelay,
    TickSinRate,
}

impl NumericField {
    pub fn value(&self, track: &AudioTrack) -> Option<f64> {
        match self {
            NumericField::Bpm => track.bpm,
            NumericField::TickDelay => Some(track.tick_delay as f64),
            NumericField::TickMinDelay => Some(track.tick_min_delay as f64),
            NumericField::TickMaxDelay => Some(track.tick_max_delay as f64),
            NumericField::TickSinRate => Some(track.tick_sin_rate as f64),
        }
    }

    /// The typed update that sets this field to `value`.
    pub fn update(&self, value: f64) -> AudioUpdate {
        match self {
            NumericField::Bpm => AudioUpdate::Bpm(Some(value)),
            NumericField::TickDelay => AudioUpdate::TickDelay(value.max(0.0) as u64),
            NumericField::TickMinDelay => AudioUpdate::TickMinDelay(value.max(0.0) as u64),
            NumericField::TickMaxDelay => AudioUpdate::TickMaxDelay(value.max(0.0) as u64),
            NumericField::TickSinRate => AudioUpdate::TickSinRate(value as i32),
        }
    }
}

type Observer = Box<dyn FnMut(&Scene)>;

#[derive(Default)]
pub struct SceneStore {
    scenes: Vec<Scene>,
    next_track_id: u64,
    observers: Vec<Observer>,
}

impl SceneStore {
    pub fn new(scenes: Vec<Scene>) -> Self {
        let next_track_id = scenes
            .iter()
            .flat_map(|s| s.audios.iter().map(|a| a.id))
            .max()
            .unwrap_or(0);
        Self { scenes, next_track_id, observers: Vec::new() }
    }

    /// Register a callback run after every successful edit.
    pub fn observe(&mut self, observer: impl FnMut(&Scene) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn scene(&self, scene_id: u64) -> Result<&Scene> {
        self.scenes
            .iter()
            .find(|s| s.id == scene_id)
            .ok_or(StoreError::SceneNotFound(scene_id))
    }

    pub fn track(&self, scene_id: u64, track_id: u64) -> Result<&AudioTrack> {
        self.scene(scene_id)?
            .audios
            .iter()
            .find(|a| a.id == track_id)
            .ok_or(StoreError::TrackNotFound(track_id))
    }

    /// Append a new default track and return its id.
    pub fn add_audio(&mut self, scene_id: u64) -> Result<u64> {
        self.next_track_id += 1;
        let id = self.next_track_id;
        self.mutate(scene_id, |scene| {
            scene.audios.push(AudioTrack { id, ..Default::default() });
            Ok(())
        })?;
        Ok(id)
    }

    pub fn update_audio(&mut self, scene_id: u64, track_id: u64, update: AudioUpdate) -> Result<()> {
        log::debug!("scene {scene_id} track {track_id}: {update:?}");
        self.mutate(scene_id, |scene| {
            let track = find_track(scene, track_id)?;
            update.apply(track);
            Ok(())
        })
    }

    pub fn set_url(&mut self, scene_id: u64, track_id: u64, url: impl Into<String>) -> Result<()> {
        self.update_audio(scene_id, track_id, AudioUpdate::Url(url.into()))
    }

    pub fn remove_audio(&mut self, scene_id: u64, track_id: u64) -> Result<()> {
        self.mutate(scene_id, |scene| {
            let index = scene
                .audios
                .iter()
                .position(|a| a.id == track_id)
                .ok_or(StoreError::TrackNotFound(track_id))?;
            scene.audios.remove(index);
            Ok(())
        })
    }

    /// Pull a numeric field back inside `[min, max]` after editing ends.
    /// Leaves the track untouched, and observers quiet, when already in range.
    pub fn clamp_field(
        &mut self,
        scene_id: u64,
        track_id: u64,
        field: NumericField,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<()> {
        let Some(value) = field.value(self.track(scene_id, track_id)?) else {
            return Ok(());
        };
        let bounded = match (min, max) {
            (Some(min), _) if value < min => min,
            (_, Some(max)) if value > max => max,
            _ => return Ok(()),
        };
        self.update_audio(scene_id, track_id, field.update(bounded))
    }

    fn mutate(&mut self, scene_id: u64, f: impl FnOnce(&mut Scene) -> Result<()>) -> Result<()> {
        let scene = self
            .scenes
            .iter_mut()
            .find(|s| s.id == scene_id)
            .ok_or(StoreError::SceneNotFound(scene_id))?;
        f(scene)?;
        for observer in self.observers.iter_mut() {
            observer(&*scene);
        }
        Ok(())
    }
}

fn find_track(scene: &mut Scene, track_id: u64) -> Result<&mut AudioTrack> {
    scene
        .audios
        .iter_mut()
        .find(|a| a.id == track_id)
        .ok_or(StoreError::TrackNotFound(track_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn store() -> (SceneStore, u64) {
        let mut store = SceneStore::new(vec![Scene::default()]);
        let track = store.add_audio(1).unwrap();
        (store, track)
    }

    #[test]
    fn test_update_notifies_after_apply() {
        let (mut store, track) = store();
        let seen = Rc::new(Cell::new(0u8));
        let seen_in = seen.clone();
        store.observe(move |scene| seen_in.set(scene.audios[0].volume));

        store.update_audio(1, track, AudioUpdate::Volume(42)).unwrap();
        assert_eq!(seen.get(), 42);
        assert_eq!(store.track(1, track).unwrap().volume, 42);
    }

    #[test]
    fn test_missing_targets() {
        let (mut store, track) = store();
        assert_eq!(store.update_audio(9, track, AudioUpdate::Tick(true)), Err(StoreError::SceneNotFound(9)));
        assert_eq!(store.update_audio(1, 77, AudioUpdate::Tick(true)), Err(StoreError::TrackNotFound(77)));
        assert_eq!(store.remove_audio(1, 77), Err(StoreError::TrackNotFound(77)));
    }

    #[test]
    fn test_end_behaviours_are_exclusive() {
        let (mut store, track) = store();
        store.update_audio(1, track, AudioUpdate::StopAtEnd(true)).unwrap();
        store.update_audio(1, track, AudioUpdate::Tick(true)).unwrap();
        let t = store.track(1, track).unwrap();
        assert!(t.tick && !t.stop_at_end && !t.next_scene_at_end);

        store.update_audio(1, track, AudioUpdate::NextSceneAtEnd(true)).unwrap();
        let t = store.track(1, track).unwrap();
        assert!(!t.tick && !t.stop_at_end && t.next_scene_at_end);

        store.update_audio(1, track, AudioUpdate::StopAtEnd(true)).unwrap();
        let t = store.track(1, track).unwrap();
        assert!(!t.tick && t.stop_at_end && !t.next_scene_at_end);

        // switching one off leaves the others alone
        store.update_audio(1, track, AudioUpdate::StopAtEnd(false)).unwrap();
        let t = store.track(1, track).unwrap();
        assert!(!t.tick && !t.stop_at_end && !t.next_scene_at_end);
    }

    #[test]
    fn test_clamp_on_blur() {
        let (mut store, track) = store();
        store.update_audio(1, track, AudioUpdate::TickSinRate(140)).unwrap();
        store.clamp_field(1, track, NumericField::TickSinRate, Some(1.0), Some(100.0)).unwrap();
        assert_eq!(store.track(1, track).unwrap().tick_sin_rate, 100);

        store.update_audio(1, track, AudioUpdate::Bpm(Some(-3.0))).unwrap();
        store.clamp_field(1, track, NumericField::Bpm, Some(0.0), None).unwrap();
        assert_eq!(store.track(1, track).unwrap().bpm, Some(0.0));

        store.update_audio(1, track, AudioUpdate::Bpm(None)).unwrap();
        store.clamp_field(1, track, NumericField::Bpm, Some(0.0), None).unwrap();
        assert_eq!(store.track(1, track).unwrap().bpm, None);
    }

    #[test]
    fn test_clamp_in_range_is_silent() {
        let (mut store, track) = store();
        let calls = Rc::new(Cell::new(0));
        let calls_in = calls.clone();
        store.observe(move |_| calls_in.set(calls_in.get() + 1));
        store.clamp_field(1, track, NumericField::TickDelay, Some(0.0), Some(60_000.0)).unwrap();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_track_ids_continue_after_load() {
        let scene = Scene {
            audios: vec![AudioTrack { id: 7, ..Default::default() }],
            ..Default::default()
        };
        let mut store = SceneStore::new(vec![scene]);
        assert_eq!(store.add_audio(1).unwrap(), 8);
        store.remove_audio(1, 7).unwrap();
        assert_eq!(store.scene(1).unwrap().audios.len(), 1);
    }

    #[test]
    fn test_tick_settings_from_track() {
        let track = AudioTrack {
            tick: true,
            tick_mode: TickMode::BeatSynced,
            tick_bpm_multi: -1,
            bpm: Some(120.0),
            ..Default::default()
        };
        let settings = track.tick_settings();
        assert!(settings.enabled);
        assert_eq!(settings.config.beats_per_minute, Some(120.0));
        assert_eq!(settings.config.beat_multiplier, -1);
        assert_eq!(settings.config.mode, TickMode::BeatSynced);
    }

    #[test]
    fn test_file_url_path() {
        let track = AudioTrack { url: "file:///music/loop.ogg".into(), ..Default::default() };
        assert_eq!(track.path(), Some(PathBuf::from("/music/loop.ogg")));
        assert_eq!(AudioTrack::default().path(), None);
    }
}
