//! slowTick app: one control panel per audio track of the current scene.
//!
//! Each panel owns a [`TickOwner`] over a [`DeadlineTimer`]. Every frame
//! the panel reports the track's tick settings and the scene-sequence
//! generation, drains expired timers, and restarts its audio from the top
//! whenever parity flips.

use egui::{CentralPanel, Context, Key, ScrollArea, TextEdit, TopBottomPanel, Ui};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use serde::{Deserialize, Serialize};
use slowcore::repaint::RepaintController;
use slowcore::storage::{self, StorageError};
use slowcore::theme::{consume_special_keys, menu_bar, SlowColors, SlowTheme};
use slowcore::widgets::{number_field, slider_input, status_bar, SlowButton};
use slowtick::bpm::{read_bpm_tag, round_bpm, BpmStatus};
use slowtick::format::{multiplier_label, speed_label, timestamp};
use slowtick::store::NumericField;
use slowtick::tempo::{EnergyTempoDetector, TempoDetector};
use slowtick::{AudioTrack, AudioUpdate, BpmError, DeadlineTimer, Scene, SceneStore, TickMode, TickOwner, TickScheduler};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};
use thiserror::Error;

const APP_NAME: &str = "slowtick";
const SEEK_STEP: Duration = Duration::from_secs(10);
/// How often to look for a finished tempo detection.
const DETECT_POLL: Duration = Duration::from_millis(100);
/// Sine sweep rate bounds, shared by the slider and the typed field.
const SINE_RATE_MIN: i32 = 1;
const SINE_RATE_MAX: i32 = 100;

/// App preferences, kept between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    pub last_scene: Option<PathBuf>,
    /// Narrow layout: paired fields stack instead of sitting side by side.
    pub sidebar: bool,
}

impl PanelSettings {
    fn path() -> PathBuf {
        storage::config_dir(APP_NAME).join("settings.json")
    }

    fn load() -> Self {
        storage::load_or_default(&Self::path())
    }

    fn save(&self) {
        if let Err(e) = storage::save_json(&Self::path(), self) {
            log::warn!("could not save settings: {e}");
        }
    }
}

#[derive(Error, Debug)]
enum PlaybackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
    #[error("audio error: {0}")]
    Output(#[from] rodio::PlayError),
    #[error("no audio output device")]
    NoOutput,
}

struct Playback {
    sink: Sink,
    duration: Option<Duration>,
}

impl Playback {
    fn open(path: &Path, output: Option<&OutputStreamHandle>) -> Result<Self, PlaybackError> {
        let output = output.ok_or(PlaybackError::NoOutput)?;
        let source = Decoder::new(BufReader::new(File::open(path)?))?;
        let duration = source.total_duration();
        let sink = Sink::try_new(output)?;
        sink.append(source);
        Ok(Self { sink, duration })
    }
}

/// Edits a panel asks the store to make.
enum StoreAction {
    Update(AudioUpdate),
    Clamp(NumericField, Option<f64>, Option<f64>),
    Remove,
}

struct TrackPanel {
    owner: TickOwner<DeadlineTimer>,
    mounted: bool,
    playback: Option<Playback>,
    /// URL the current playback was opened from (or failed to open).
    loaded_url: String,
    playing: bool,
    url_text: String,
    /// Text buffers for numeric fields being edited.
    fields: HashMap<NumericField, String>,
    tag_status: BpmStatus,
    detect_status: BpmStatus,
    detect_rx: Option<Receiver<Result<f64, BpmError>>>,
    error: Option<String>,
}

impl TrackPanel {
    fn new(track: &AudioTrack) -> Self {
        Self {
            owner: TickOwner::new(TickScheduler::new(DeadlineTimer::new())),
            mounted: false,
            playback: None,
            loaded_url: String::new(),
            playing: false,
            url_text: track.url.clone(),
            fields: HashMap::new(),
            tag_status: BpmStatus::default(),
            detect_status: BpmStatus::default(),
            detect_rx: None,
            error: None,
        }
    }

    fn mount(&mut self, track: &AudioTrack, start_playing: bool, output: Option<&OutputStreamHandle>) {
        self.playing = start_playing && track.path().is_some();
        self.load(track, output);
        if let Err(e) = self.owner.mount(&track.tick_settings(), self.playing) {
            log::warn!("track {}: {e}", track.id);
        }
        self.mounted = true;
    }

    fn unmount(&mut self) {
        self.owner.unmount();
        if let Some(playback) = self.playback.take() {
            playback.sink.stop();
        }
        self.mounted = false;
    }

    /// Open the track's file from the start, paused unless playing.
    fn load(&mut self, track: &AudioTrack, output: Option<&OutputStreamHandle>) {
        self.playback = None;
        self.loaded_url = track.url.clone();
        self.url_text = track.url.clone();
        let Some(path) = track.path() else {
            self.error = None;
            return;
        };
        match Playback::open(&path, output) {
            Ok(playback) => {
                if !self.playing {
                    playback.sink.pause();
                }
                self.playback = Some(playback);
                self.sync_output(track);
                self.error = None;
            }
            Err(e) => {
                log::warn!("could not open {}: {e}", path.display());
                self.error = Some(e.to_string());
            }
        }
    }

    /// Jump back to the start, reopening when the source cannot seek.
    fn rewind(&mut self, track: &AudioTrack, output: Option<&OutputStreamHandle>) {
        let seeked = match &self.playback {
            Some(p) if !p.sink.empty() => p.sink.try_seek(Duration::ZERO).is_ok(),
            _ => false,
        };
        if !seeked {
            self.load(track, output);
        }
    }

    fn set_playing(&mut self, playing: bool, track: &AudioTrack, output: Option<&OutputStreamHandle>) {
        self.playing = playing;
        let ended = self.playback.as_ref().map_or(true, |p| p.sink.empty());
        if playing && ended {
            self.load(track, output);
        } else if let Some(p) = &self.playback {
            if playing {
                p.sink.play();
            } else {
                p.sink.pause();
            }
        }
        if let Err(e) = self.owner.set_playback_intended(playing, &track.tick_settings()) {
            log::warn!("track {}: {e}", track.id);
        }
    }

    fn seek_by(&mut self, forward: bool) {
        let Some(p) = &self.playback else { return };
        let pos = p.sink.get_pos();
        let target = if forward { pos + SEEK_STEP } else { pos.saturating_sub(SEEK_STEP) };
        let target = p.duration.map_or(target, |d| target.min(d));
        if let Err(e) = p.sink.try_seek(target) {
            log::warn!("seek failed: {e:?}");
        }
    }

    fn sync_output(&self, track: &AudioTrack) {
        if let Some(p) = &self.playback {
            p.sink.set_volume(track.volume as f32 / 100.0);
            p.sink.set_speed(track.speed as f32 / 10.0);
        }
    }

    fn position(&self) -> Duration {
        self.playback.as_ref().map(|p| p.sink.get_pos()).unwrap_or_default()
    }

    fn duration(&self) -> Option<Duration> {
        self.playback.as_ref().and_then(|p| p.duration)
    }

    fn finished(&self) -> bool {
        self.playing && self.playback.as_ref().is_some_and(|p| p.sink.empty())
    }

    /// Feed the owner this frame's settings, sequence and expired timers.
    /// True when parity flipped at least once.
    fn drive_ticks(&mut self, track: &AudioTrack, sequence: Option<u64>, now: Instant) -> bool {
        let mut flipped = match self.owner.update(&track.tick_settings(), sequence) {
            Ok(parity) => parity.is_some(),
            Err(e) => {
                log::warn!("track {}: {e}", track.id);
                false
            }
        };
        for handle in self.owner.timer_mut().expired(now) {
            flipped |= self.owner.on_timer(handle).is_some();
        }
        flipped
    }

    fn read_tag(&mut self, track: &AudioTrack, now: Instant) -> Option<f64> {
        let path = track.path()?;
        if !self.tag_status.begin() {
            return None;
        }
        let result = read_bpm_tag(&path);
        self.tag_status.finish(&result, now);
        result.ok()
    }

    fn start_detect(&mut self, track: &AudioTrack) {
        let Some(path) = track.path() else { return };
        if !self.detect_status.begin() {
            return;
        }
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(EnergyTempoDetector::default().detect_file(&path));
        });
        self.detect_rx = Some(rx);
    }

    fn poll_detect(&mut self, now: Instant) -> Option<f64> {
        let rx = self.detect_rx.as_ref()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(BpmError::NoTempo),
        };
        self.detect_rx = None;
        self.detect_status.finish(&result, now);
        result.ok()
    }
}

fn field_text(field: NumericField, track: &AudioTrack) -> String {
    match (field, field.value(track)) {
        (NumericField::Bpm, Some(bpm)) => format!("{bpm:.2}"),
        (_, Some(value)) => format!("{}", value as i64),
        (_, None) => String::new(),
    }
}

fn default_scenes() -> Vec<Scene> {
    vec![Scene {
        audios: vec![AudioTrack { id: 1, ..Default::default() }],
        ..Default::default()
    }]
}

fn load_scenes(path: &Path) -> Vec<Scene> {
    match storage::load_json::<Vec<Scene>>(path) {
        Ok(scenes) if !scenes.is_empty() => scenes,
        Ok(_) | Err(StorageError::NotFound(_)) => default_scenes(),
        Err(e) => {
            log::warn!("could not read {}: {e}", path.display());
            default_scenes()
        }
    }
}

pub struct SlowTickApp {
    store: SceneStore,
    dirty: Rc<Cell<bool>>,
    scene_id: u64,
    scene_path: PathBuf,
    settings: PanelSettings,
    panels: BTreeMap<u64, TrackPanel>,
    /// Advances each time the scene sequence moves on.
    generation: u64,
    _stream: Option<OutputStream>,
    output: Option<OutputStreamHandle>,
    repaint: RepaintController,
    show_about: bool,
    status: Option<String>,
}

impl SlowTickApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, scene_path: Option<PathBuf>) -> Self {
        let mut settings = PanelSettings::load();
        let scene_path = scene_path
            .or_else(|| settings.last_scene.clone())
            .unwrap_or_else(|| storage::documents_dir().join("scene.json"));
        settings.last_scene = Some(scene_path.clone());
        settings.save();

        let (stream, output) = match OutputStream::try_default() {
            Ok((stream, handle)) => (Some(stream), Some(handle)),
            Err(e) => {
                log::warn!("no audio output: {e}");
                (None, None)
            }
        };

        let dirty = Rc::new(Cell::new(false));
        let scenes = load_scenes(&scene_path);
        let scene_id = scenes.first().map(|s| s.id).unwrap_or(1);
        log::info!("opened {} ({} scenes)", scene_path.display(), scenes.len());

        Self {
            store: Self::open_store(scenes, &dirty),
            dirty,
            scene_id,
            scene_path,
            settings,
            panels: BTreeMap::new(),
            generation: 1,
            _stream: stream,
            output,
            repaint: RepaintController::new(),
            show_about: false,
            status: None,
        }
    }

    fn open_store(scenes: Vec<Scene>, dirty: &Rc<Cell<bool>>) -> SceneStore {
        let mut store = SceneStore::new(scenes);
        let flag = dirty.clone();
        store.observe(move |_| flag.set(true));
        store
    }

    fn current_tracks(&self) -> (Vec<AudioTrack>, bool) {
        self.store
            .scene(self.scene_id)
            .map(|s| (s.audios.clone(), s.audio_enabled))
            .unwrap_or_default()
    }

    fn apply(&mut self, track_id: u64, action: StoreAction) {
        let result = match action {
            StoreAction::Update(update) => self.store.update_audio(self.scene_id, track_id, update),
            StoreAction::Clamp(field, min, max) => self.store.clamp_field(self.scene_id, track_id, field, min, max),
            StoreAction::Remove => self.store.remove_audio(self.scene_id, track_id),
        };
        if let Err(e) = result {
            log::warn!("{e}");
            self.status = Some(e.to_string());
        }
    }

    fn unmount_all(&mut self) {
        for panel in self.panels.values_mut() {
            panel.unmount();
        }
        self.panels.clear();
    }

    fn switch_scene(&mut self, scene_id: u64) {
        if scene_id != self.scene_id {
            self.unmount_all();
            self.scene_id = scene_id;
        }
    }

    /// Move the scene sequence on, switching to the following scene when
    /// there is more than one.
    fn next_scene(&mut self) {
        self.generation += 1;
        log::info!("scene sequence at {}", self.generation);
        let scenes = self.store.scenes();
        if scenes.len() > 1 {
            let index = scenes.iter().position(|s| s.id == self.scene_id).unwrap_or(0);
            let next = scenes[(index + 1) % scenes.len()].id;
            self.switch_scene(next);
        }
    }

    fn save_scene(&mut self) {
        match storage::save_json(&self.scene_path, &self.store.scenes()) {
            Ok(()) => {
                self.dirty.set(false);
                self.status = Some("saved".into());
                log::info!("saved {}", self.scene_path.display());
            }
            Err(e) => {
                log::error!("could not save {}: {e}", self.scene_path.display());
                self.status = Some(format!("save failed: {e}"));
            }
        }
    }

    fn reload_scene(&mut self) {
        self.unmount_all();
        let scenes = load_scenes(&self.scene_path);
        self.scene_id = scenes.first().map(|s| s.id).unwrap_or(1);
        self.store = Self::open_store(scenes, &self.dirty);
        self.dirty.set(false);
        self.status = Some("reloaded".into());
    }

    fn add_audio(&mut self) {
        if let Err(e) = self.store.add_audio(self.scene_id) {
            log::warn!("{e}");
        }
    }

    /// Per-frame work that does not depend on drawing: mount new panels,
    /// follow the tick schedule, handle track ends, collect detections.
    fn drive_tracks(&mut self, now: Instant) {
        let (tracks, audio_enabled) = self.current_tracks();
        let sequence = (!tracks.is_empty()).then_some(self.generation);

        self.panels.retain(|id, panel| {
            let keep = tracks.iter().any(|t| t.id == *id);
            if !keep {
                panel.unmount();
            }
            keep
        });

        let output = self.output.as_ref();
        let mut updates = Vec::new();
        let mut advance = false;
        for track in &tracks {
            let panel = self.panels.entry(track.id).or_insert_with(|| TrackPanel::new(track));
            if !panel.mounted {
                panel.mount(track, audio_enabled, output);
            } else if panel.loaded_url != track.url {
                panel.load(track, output);
            }
            panel.sync_output(track);

            if panel.drive_ticks(track, sequence, now) && panel.playing {
                log::debug!("track {} resync", track.id);
                panel.rewind(track, output);
            }

            if panel.finished() {
                if track.stop_at_end {
                    panel.set_playing(false, track, output);
                } else if track.next_scene_at_end {
                    panel.set_playing(false, track, output);
                    advance = true;
                } else {
                    panel.rewind(track, output);
                }
            }

            if let Some(bpm) = panel.poll_detect(now) {
                panel.fields.remove(&NumericField::Bpm);
                updates.push((track.id, AudioUpdate::Bpm(Some(bpm))));
            }
            panel.tag_status.settle(now);
            panel.detect_status.settle(now);
        }

        for (id, update) in updates {
            self.apply(id, StoreAction::Update(update));
        }
        if advance {
            self.next_scene();
        }
    }

    fn schedule_wake(&mut self, now: Instant) {
        let mut any_playing = false;
        for panel in self.panels.values() {
            if let Some(at) = panel.owner.scheduler().timer().next_deadline() {
                self.repaint.wake_at(at);
            }
            for at in [panel.tag_status.deadline(), panel.detect_status.deadline()].into_iter().flatten() {
                self.repaint.wake_at(at);
            }
            if panel.detect_status.is_loading() {
                self.repaint.wake_at(now + DETECT_POLL);
            }
            any_playing |= panel.playing;
        }
        // keeps the position readout moving and catches track ends
        self.repaint.set_continuous(any_playing);
    }

    fn handle_keys(&mut self, ctx: &Context) {
        let (save, next) = ctx.input(|i| {
            (
                i.modifiers.command && i.key_pressed(Key::S),
                i.modifiers.command && i.key_pressed(Key::N),
            )
        });
        if save {
            self.save_scene();
        }
        if next {
            self.next_scene();
        }
    }

    fn status_text(&self) -> String {
        let name = self.store.scene(self.scene_id).map(|s| s.name.as_str()).unwrap_or("no scene");
        let ticking = self.panels.values().filter(|p| p.owner.is_ticking()).count();
        let mut text = format!("{name}  |  {} tracks  |  {ticking} ticking", self.panels.len());
        if self.dirty.get() {
            text.push_str("  |  modified");
        }
        if let Some(msg) = &self.status {
            text.push_str("  |  ");
            text.push_str(msg);
        }
        text
    }

    fn draw_menu(&mut self, ctx: &Context) {
        TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            menu_bar(ui, |ui| {
                ui.menu_button("file", |ui| {
                    if ui.button("save        ⌘S").clicked() {
                        self.save_scene();
                        ui.close_menu();
                    }
                    if ui.button("reload").clicked() {
                        self.reload_scene();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        ui.close_menu();
                    }
                });
                ui.menu_button("scene", |ui| {
                    if ui.button("add audio").clicked() {
                        self.add_audio();
                        ui.close_menu();
                    }
                    if ui.button("next scene  ⌘N").clicked() {
                        self.next_scene();
                        ui.close_menu();
                    }
                    ui.separator();
                    let scenes: Vec<(u64, String)> =
                        self.store.scenes().iter().map(|s| (s.id, s.name.clone())).collect();
                    for (id, name) in scenes {
                        if ui.selectable_label(id == self.scene_id, name).clicked() {
                            self.switch_scene(id);
                            ui.close_menu();
                        }
                    }
                });
                ui.menu_button("view", |ui| {
                    if ui.checkbox(&mut self.settings.sidebar, "sidebar layout").changed() {
                        self.settings.save();
                    }
                });
                ui.menu_button("help", |ui| {
                    if ui.button("about").clicked() {
                        self.show_about = true;
                        ui.close_menu();
                    }
                });
            });
        });
    }

    fn draw_about(&mut self, ctx: &Context) {
        if !self.show_about {
            return;
        }
        egui::Window::new("about slowTick")
            .collapsible(false)
            .resizable(false)
            .default_width(280.0)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(8.0);
                    ui.heading("slowTick");
                    ui.label(format!("version {}", env!("CARGO_PKG_VERSION")));
                    ui.add_space(8.0);
                    ui.label("scene audio for slowOS");
                    ui.add_space(4.0);
                    ui.label("tick modes:");
                    for mode in TickMode::ALL {
                        ui.label(format!("  {}", mode.label()));
                    }
                    ui.add_space(8.0);
                    ui.label("egui/eframe (MIT), rodio (MIT), lofty (MIT)");
                    ui.add_space(12.0);
                    if ui.button("ok").clicked() {
                        self.show_about = false;
                    }
                    ui.add_space(4.0);
                });
            });
    }

    fn draw_tracks(&mut self, ctx: &Context) {
        let (tracks, audio_enabled) = self.current_tracks();
        let sidebar = self.settings.sidebar;
        let output = self.output.as_ref();
        let panels = &mut self.panels;
        let mut actions = Vec::new();

        CentralPanel::default()
            .frame(egui::Frame::none().fill(SlowColors::WHITE).inner_margin(egui::Margin::same(8.0)))
            .show(ctx, |ui| {
                if !audio_enabled {
                    ui.label("audio is off for this scene");
                    return;
                }
                if tracks.is_empty() {
                    ui.label("no audio. scene > add audio");
                    return;
                }
                ScrollArea::vertical().show(ui, |ui| {
                    for track in &tracks {
                        if let Some(panel) = panels.get_mut(&track.id) {
                            for action in track_ui(ui, track, panel, sidebar, output) {
                                actions.push((track.id, action));
                            }
                            ui.add_space(8.0);
                        }
                    }
                });
            });

        // edits land after the panels were drawn
        if !actions.is_empty() {
            self.repaint.mark_needs_repaint();
        }
        for (id, action) in actions {
            self.apply(id, action);
        }
    }
}

fn sine_rate_bounds() -> (Option<f64>, Option<f64>) {
    (Some(SINE_RATE_MIN as f64), Some(SINE_RATE_MAX as f64))
}

fn number_edit(
    ui: &mut Ui,
    panel: &mut TrackPanel,
    track: &AudioTrack,
    field: NumericField,
    bounds: (Option<f64>, Option<f64>),
    actions: &mut Vec<StoreAction>,
) {
    let text = panel.fields.entry(field).or_insert_with(|| field_text(field, track));
    let edit = number_field(ui, text, 64.0);
    let cleared = text.trim().is_empty();
    match edit.value {
        Some(v) if field == NumericField::Bpm => actions.push(StoreAction::Update(field.update(round_bpm(v)))),
        Some(v) => actions.push(StoreAction::Update(field.update(v))),
        None if cleared && field == NumericField::Bpm && track.bpm.is_some() => {
            actions.push(StoreAction::Update(AudioUpdate::Bpm(None)));
        }
        None => {}
    }
    if edit.committed {
        actions.push(StoreAction::Clamp(field, bounds.0, bounds.1));
        panel.fields.remove(&field);
    }
}

/// Lay paired controls out side by side, or stacked in the sidebar layout.
fn pair(ui: &mut Ui, sidebar: bool, add: impl FnOnce(&mut Ui)) {
    if sidebar {
        ui.vertical(add);
    } else {
        ui.horizontal(add);
    }
}

fn track_ui(
    ui: &mut Ui,
    track: &AudioTrack,
    panel: &mut TrackPanel,
    sidebar: bool,
    output: Option<&OutputStreamHandle>,
) -> Vec<StoreAction> {
    let mut actions = Vec::new();
    let now = Instant::now();
    let update = |actions: &mut Vec<StoreAction>, u: AudioUpdate| actions.push(StoreAction::Update(u));

    SlowTheme::panel_frame().show(ui, |ui| {
        ui.set_width(ui.available_width());

        ui.horizontal(|ui| {
            ui.label("file");
            let width = (ui.available_width() - 110.0).max(80.0);
            let r = ui.add(TextEdit::singleline(&mut panel.url_text).desired_width(width));
            let entered = r.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
            if (ui.button("open").clicked() || entered) && panel.url_text.trim() != track.url {
                update(&mut actions, AudioUpdate::Url(panel.url_text.trim().to_string()));
            }
            if ui.button("remove").clicked() {
                actions.push(StoreAction::Remove);
            }
        });
        if let Some(err) = &panel.error {
            ui.label(format!("! {err}"));
        }

        ui.horizontal(|ui| {
            if ui.button("« 10s").clicked() {
                panel.seek_by(false);
            }
            let label = if panel.playing { "pause" } else { "play" };
            if ui.add(SlowButton::new(label).selected(panel.playing)).clicked() {
                panel.set_playing(!panel.playing, track, output);
            }
            if ui.button("10s »").clicked() {
                panel.seek_by(true);
            }
            let duration = panel
                .duration()
                .map(|d| timestamp(d.as_millis() as u64))
                .unwrap_or_else(|| "-:--".into());
            ui.label(format!("{} / {duration}", timestamp(panel.position().as_millis() as u64)));
        });

        let mut volume = track.volume;
        if slider_input(ui, "volume", &mut volume, 0..=100, |v| format!("{v}%")).changed() {
            update(&mut actions, AudioUpdate::Volume(volume));
        }
        let mut speed = track.speed;
        if slider_input(ui, "speed", &mut speed, 5..=40, speed_label).changed() {
            update(&mut actions, AudioUpdate::Speed(speed));
        }

        ui.horizontal(|ui| {
            if !track.tick && !track.next_scene_at_end {
                let mut on = track.stop_at_end;
                if ui.checkbox(&mut on, "stop at end").changed() {
                    update(&mut actions, AudioUpdate::StopAtEnd(on));
                }
            }
            if !track.tick && !track.stop_at_end {
                let mut on = track.next_scene_at_end;
                if ui.checkbox(&mut on, "next scene at end").changed() {
                    update(&mut actions, AudioUpdate::NextSceneAtEnd(on));
                }
            }
            if !track.stop_at_end && !track.next_scene_at_end {
                let mut on = track.tick;
                if ui.checkbox(&mut on, "tick").changed() {
                    update(&mut actions, AudioUpdate::Tick(on));
                }
            }
        });

        ui.horizontal(|ui| {
            ui.label("bpm");
            number_edit(ui, panel, track, NumericField::Bpm, (Some(0.0), None), &mut actions);
            let has_file = track.path().is_some();
            if ui.add_enabled(has_file && !panel.detect_status.is_loading(), egui::Button::new("detect")).clicked() {
                panel.start_detect(track);
            }
            ui.label(panel.detect_status.glyph());
            if ui.add_enabled(has_file && !panel.tag_status.is_loading(), egui::Button::new("read tag")).clicked() {
                if let Some(bpm) = panel.read_tag(track, now) {
                    panel.fields.remove(&NumericField::Bpm);
                    update(&mut actions, AudioUpdate::Bpm(Some(bpm)));
                }
            }
            ui.label(panel.tag_status.glyph());
        });

        if !track.tick {
            return;
        }
        ui.separator();

        ui.horizontal(|ui| {
            ui.label("timing");
            let mut mode = track.tick_mode;
            egui::ComboBox::from_id_source(("tick_mode", track.id))
                .selected_text(mode.label())
                .show_ui(ui, |ui| {
                    for m in TickMode::ALL {
                        ui.selectable_value(&mut mode, m, m.label());
                    }
                });
            if mode != track.tick_mode {
                update(&mut actions, AudioUpdate::TickMode(mode));
            }
        });

        match track.tick_mode {
            TickMode::SineWave => {
                ui.horizontal(|ui| {
                    let mut rate = track.tick_sin_rate;
                    if slider_input(ui, "wave rate", &mut rate, SINE_RATE_MIN..=SINE_RATE_MAX, |v| format!("{v}%")).changed() {
                        panel.fields.remove(&NumericField::TickSinRate);
                        update(&mut actions, AudioUpdate::TickSinRate(rate));
                    }
                    number_edit(ui, panel, track, NumericField::TickSinRate, sine_rate_bounds(), &mut actions);
                });
            }
            TickMode::BeatSynced => {
                let mut multi = track.tick_bpm_multi;
                if slider_input(ui, "bpm multiplier", &mut multi, -8..=10, multiplier_label).changed() {
                    update(&mut actions, AudioUpdate::TickBpmMulti(multi));
                }
                if track.bpm.is_none() {
                    ui.label("no bpm set: ticks fall back to once a second");
                }
            }
            TickMode::Constant => {
                ui.horizontal(|ui| {
                    ui.label("every");
                    number_edit(ui, panel, track, NumericField::TickDelay, (Some(0.0), None), &mut actions);
                    ui.label("ms");
                });
            }
            TickMode::SceneLinked => {
                ui.label("ticks when the scene changes");
            }
            TickMode::Random => {}
        }

        if track.tick_mode.uses_delay_range() {
            pair(ui, sidebar, |ui| {
                ui.horizontal(|ui| {
                    ui.label("between");
                    number_edit(ui, panel, track, NumericField::TickMinDelay, (Some(0.0), None), &mut actions);
                    ui.label("ms");
                });
                ui.horizontal(|ui| {
                    ui.label("and");
                    number_edit(ui, panel, track, NumericField::TickMaxDelay, (Some(0.0), None), &mut actions);
                    ui.label("ms");
                });
            });
        }
    });

    actions
}

impl eframe::App for SlowTickApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.repaint.begin_frame();
        consume_special_keys(ctx);
        self.handle_keys(ctx);

        let now = Instant::now();
        self.drive_tracks(now);

        self.draw_menu(ctx);
        TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            status_bar(ui, &self.status_text());
        });
        self.draw_tracks(ctx);
        self.draw_about(ctx);

        self.schedule_wake(now);
        self.repaint.end_frame(ctx);
    }
}
