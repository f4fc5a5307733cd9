//! HUD contents: crosshair, compass scales, readouts and the pause menu.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use image::RgbaImage;

use crate::controls::Pointer;
use crate::font::{draw_text, draw_text_centered};
use crate::pause::{PauseAction, PauseScreen};
use crate::raster::{Canvas, Color, WHITE_SMOKE};
use image::Rgba;

pub const CROSSHAIR_SIZE: i32 = 15;
pub const CIRCLE_SIZE: i32 = 40;
/// Pixel spacing between compass ticks.
pub const BAR_DISTANCE: f32 = 20.0;
const PEN: i32 = 3;
const TEXT_SCALE: i32 = 2;
const CURSOR: Color = Rgba([255, 255, 255, 255]);
const CURSOR_HOVER: Color = Rgba([255, 215, 0, 255]);

/// Everything the HUD needs from one viewer tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HudState {
    pub width: u32,
    pub height: u32,
    pub time: f64,
    /// Crosshair, compass and readouts are drawn.
    pub visible: bool,
    pub paused: bool,
    pub stereo: bool,
    pub position: Vec3,
    /// Radians, `[0, 2π)`.
    pub horizontal_angle: f32,
    /// `(-1, 1)` from straight down to straight up.
    pub vertical_angle: f32,
    pub pointer: Pointer,
}

impl Default for HudState {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            time: 0.0,
            visible: true,
            paused: false,
            stereo: false,
            position: Vec3::ZERO,
            horizontal_angle: 0.0,
            vertical_angle: 0.0,
            pointer: Pointer::default(),
        }
    }
}

impl HudState {
    /// Whether there is anything to draw.
    pub fn wants_frame(&self) -> bool {
        (self.visible || self.paused) && self.width > 0 && self.height > 0
    }
}

/// Tick length for compass tick `i`: long every fourth, medium on even, short otherwise.
pub fn tick_length(i: i32) -> i32 {
    if (i % 4).abs() == 1 {
        20
    } else if (i % 2).abs() == 0 {
        10
    } else {
        5
    }
}

/// Vertical positions of the pitch scale ticks, with their lengths.
pub fn pitch_ticks(height: f32, vertical_angle: f32) -> Vec<(f32, i32)> {
    let h2 = height / 2.0;
    let base = h2 + vertical_angle * h2;
    let count = (h2 / BAR_DISTANCE) as i32 + 1;
    (-count..=count + 1)
        .map(|i| (base + i as f32 * BAR_DISTANCE, tick_length(i)))
        .filter(|(y, _)| *y >= BAR_DISTANCE && *y < height)
        .collect()
}

/// Horizontal positions of the heading scale ticks, with their lengths.
pub fn heading_ticks(width: f32, horizontal_angle: f32) -> Vec<(f32, i32)> {
    let w2 = width / 2.0;
    let bar = w2 + (horizontal_angle % TAU) * w2 / PI;
    let offset = w2 + ((bar - w2) % (BAR_DISTANCE * 4.0));
    let count = (w2 / BAR_DISTANCE) as i32 + 1;
    (-count..=count + 1)
        .map(|i| (offset + i as f32 * BAR_DISTANCE, tick_length(i)))
        .filter(|(x, _)| *x > BAR_DISTANCE)
        .collect()
}

fn draw_crosshair(canvas: &mut Canvas, w2: i32, h2: i32) {
    let (c, r) = (CROSSHAIR_SIZE, CIRCLE_SIZE);
    canvas.line(w2 - c, h2, w2 + c, h2, PEN, WHITE_SMOKE);
    canvas.line(w2, h2 - c, w2, h2 + c, PEN, WHITE_SMOKE);
    canvas.circle(w2, h2, r, PEN, WHITE_SMOKE);
    canvas.line(w2 - c - r, h2, w2 - r, h2, PEN, WHITE_SMOKE);
    canvas.line(w2 + c + r, h2, w2 + r, h2, PEN, WHITE_SMOKE);
    canvas.line(w2, h2 - c - r, w2, h2 - r, PEN, WHITE_SMOKE);
    canvas.line(w2, h2 + c + r, w2, h2 + r, PEN, WHITE_SMOKE);
}

fn draw_cursor(canvas: &mut Canvas, pointer: Pointer, hover: bool) {
    let color = if hover { CURSOR_HOVER } else { CURSOR };
    let (x, y) = (pointer.x as i32, pointer.y as i32);
    canvas.line(x, y, x, y + 16, 2, color);
    canvas.line(x, y, x + 11, y + 11, 2, color);
    canvas.line(x, y + 16, x + 11, y + 11, 2, color);
}

/// Rasterize one HUD frame. Pause menu clicks are returned alongside the image.
pub fn draw_hud(state: &HudState, pause: Option<&mut PauseScreen>) -> (RgbaImage, Vec<PauseAction>) {
    let mut canvas = Canvas::new(state.width, state.height);
    let mut actions = Vec::new();
    let (w, h) = (state.width as f32, state.height as f32);
    let (w2, h2) = ((w / 2.0) as i32, (h / 2.0) as i32);

    if state.visible {
        draw_crosshair(&mut canvas, w2, h2);

        let p = state.position;
        let readout = format!("[{:.2}, {:.2}, {:.2}]", p.x, p.y, p.z);
        draw_text(&mut canvas, 20, 20, TEXT_SCALE, &readout, WHITE_SMOKE);
        let heading = format!("{:.2}°", state.horizontal_angle.to_degrees());
        draw_text_centered(&mut canvas, w2, 30, TEXT_SCALE, &heading, WHITE_SMOKE);
        let pitch = format!("{:6.2}°", state.vertical_angle * 90.0);
        draw_text(&mut canvas, 20, h2, TEXT_SCALE, &pitch, WHITE_SMOKE);

        let right = state.width as i32;
        for (y, len) in pitch_ticks(h, state.vertical_angle) {
            let y = y as i32;
            canvas.line(0, y, len, y, PEN, WHITE_SMOKE);
            canvas.line(right - len, y, right, y, PEN, WHITE_SMOKE);
        }
        let bottom = state.height as i32;
        for (x, len) in heading_ticks(w, state.horizontal_angle) {
            let x = x as i32;
            canvas.line(x, 0, x, len, PEN, WHITE_SMOKE);
            canvas.line(x, bottom - len, x, bottom, PEN, WHITE_SMOKE);
        }
    }

    if state.paused
        && let Some(pause) = pause
    {
        pause.set_stereo(state.stereo);
        if let Err(e) = pause.layout(state.width, state.height) {
            tracing::warn!("pause menu layout: {e}");
        }
        let (hover, clicked) = pause.handle_pointer(state.pointer);
        actions = clicked;
        pause.draw(&mut canvas, state.pointer);
        draw_cursor(&mut canvas, state.pointer, hover);
    }

    (canvas.into_image(), actions)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
