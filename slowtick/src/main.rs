//! slowTick: scene audio with tick scheduling for slowOS
//!
//! Usage: `slowtick [scene.json]`. Without an argument the last opened
//! scene file is used.

mod app;

use app::SlowTickApp;
use eframe::NativeOptions;
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let scene_path = std::env::args_os().nth(1).map(PathBuf::from);

    let mut viewport = egui::ViewportBuilder::default()
        .with_inner_size([520.0, 640.0])
        .with_min_inner_size([360.0, 320.0])
        .with_title("slowTick");

    if let Some(pos) = slowcore::cascade_position() {
        viewport = viewport.with_position(pos);
    }

    let options = NativeOptions {
        viewport,
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "slowTick",
        options,
        Box::new(move |cc| {
            slowcore::SlowTheme::default().apply(&cc.egui_ctx);
            Box::new(SlowTickApp::new(cc, scene_path))
        }),
    ) {
        eprintln!("[slowtick] {e}");
        std::process::exit(1);
    }
}
