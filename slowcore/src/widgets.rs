//! Custom widgets: pure black and white

use crate::theme::SlowColors;
use egui::{Response, Ui, Widget};
use std::ops::RangeInclusive;

/// A button: white bg, 1px outline, inverted when pressed or selected.
pub struct SlowButton<'a> {
    text: &'a str,
    selected: bool,
}

impl<'a> SlowButton<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, selected: false }
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

impl<'a> Widget for SlowButton<'a> {
    fn ui(self, ui: &mut Ui) -> Response {
        let font = egui::FontId::proportional(14.0);
        let galley = ui.painter().layout_no_wrap(self.text.to_owned(), font.clone(), SlowColors::BLACK);
        let desired_size = egui::vec2(galley.size().x + 24.0, ui.spacing().interact_size.y);
        let (rect, response) = ui.allocate_exact_size(desired_size, egui::Sense::click());

        if ui.is_rect_visible(rect) {
            let painter = ui.painter();
            let inverted = response.is_pointer_button_down_on() || self.selected;
            let (fill, text) = if inverted {
                (SlowColors::BLACK, SlowColors::WHITE)
            } else {
                (SlowColors::WHITE, SlowColors::BLACK)
            };
            painter.rect_filled(rect, 0.0, fill);
            let stroke = if response.hovered() && !inverted { 2.0 } else { 1.0 };
            painter.rect_stroke(rect, 0.0, egui::Stroke::new(stroke, SlowColors::BLACK));
            painter.text(rect.center(), egui::Align2::CENTER_CENTER, self.text, font, text);
        }

        response
    }
}

/// Status bar: white bg, 1px black top border
pub fn status_bar(ui: &mut Ui, text: &str) {
    egui::Frame::none()
        .fill(SlowColors::WHITE)
        .stroke(egui::Stroke::new(1.0, SlowColors::BLACK))
        .inner_margin(egui::Margin::symmetric(8.0, 2.0))
        .show(ui, |ui| {
            ui.label(text);
        });
}

/// Label, slider, and the current value rendered by `show`.
pub fn slider_input<T: egui::emath::Numeric>(
    ui: &mut Ui,
    label: &str,
    value: &mut T,
    range: RangeInclusive<T>,
    show: impl Fn(T) -> String,
) -> Response {
    ui.horizontal(|ui| {
        ui.label(label);
        let response = ui.add(egui::Slider::new(value, range).show_value(false));
        ui.label(show(*value));
        response
    })
    .inner
}

/// Outcome of one frame of a [`number_field`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumberEdit {
    /// Parsed value when the text changed this frame and reads as a number.
    pub value: Option<f64>,
    /// Editing ended (focus lost or Enter). Range checks belong here.
    pub committed: bool,
}

/// Single-line numeric text field. The caller owns the text buffer so a
/// half-typed value survives between frames.
pub fn number_field(ui: &mut Ui, text: &mut String, width: f32) -> NumberEdit {
    let response = ui.add(egui::TextEdit::singleline(text).desired_width(width));
    NumberEdit {
        value: if response.changed() { parse_number(text) } else { None },
        committed: response.lost_focus(),
    }
}

/// Lenient number parse: surrounding spaces and a trailing unit-less `.`
/// are accepted; empty text is not a number.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}
