//! slowcore: shared library for slow computer applications

pub mod repaint;
pub mod storage;
pub mod theme;
pub mod widgets;

pub use repaint::RepaintController;
pub use theme::SlowTheme;

/// Window position for the nth instance, from `SLOWOS_CASCADE`, so several
/// windows opened together do not stack exactly.
pub fn cascade_position() -> Option<egui::Pos2> {
    cascade_offset(std::env::var("SLOWOS_CASCADE").ok()?.parse().ok()?)
}

fn cascade_offset(n: u32) -> Option<egui::Pos2> {
    let offset = (n as f32) * 30.0;
    Some(egui::Pos2::new(100.0 + offset, 100.0 + offset))
}
