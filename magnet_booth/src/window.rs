//! Software-rendered booth window using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │                              │
//! │   display surface            │
//! │   (video, magnets, logo,     │
//! │    fingertip dots)           │
//! │                              │
//! ├──────────────────────────────┤
//! │ ● REC 3s   status text       │  HUD strip, never part of a photo
//! │ [progress ▓▓▓▓░░░]  preview  │
//! │ key legend                   │
//! └──────────────────────────────┘
//! ```
//!
//! The pointer stands in for a hand: its position is the index fingertip and
//! the left button closes the pinch.

use std::sync::mpsc::Sender;
use std::time::Duration;

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Scale, Window, WindowOptions};

use magnet_space::{CanvasTransform, Point};

use crate::app::{Hud, InputEvent, PreviewState};
use crate::error::BoothError;
use crate::landmarks::SimHand;
use crate::surface::{Surface, WHITE};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const HUD_H:       usize = 84;
const HUD_BG:          u32   = 0xFF16_213E;
const REC_COLOR:       u32   = 0xFFE6_3946;
const BAR_BG:          u32   = 0xFF0F_3460;
const BAR_FG:          u32   = 0xFFFF_D700;
const LEGEND_COLOR:    u32   = 0xFF88_8888;
/// Thumb-to-index gap with the button held, below the pinch threshold.
const PINCHED_GAP:     f32   = 20.0;
/// Gap with the button up, well above it.
const SPREAD_GAP:      f32   = 160.0;

// ════════════════════════════════════════════════════════════════════════════
// BoothWindow
// ════════════════════════════════════════════════════════════════════════════

pub struct BoothWindow {
    window:   Window,
    frame:    Surface,
    canvas_h: usize,
    sim_tx:   Sender<SimHand>,
    last_sim: Option<SimHand>,
}

impl BoothWindow {
    pub fn new(canvas_w: usize, canvas_h: usize, sim_tx: Sender<SimHand>) -> Result<Self, BoothError> {
        let mut window = Window::new(
            "Magnet Booth",
            canvas_w,
            canvas_h + HUD_H,
            WindowOptions {
                resize: false,
                scale: Scale::FitScreen,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| BoothError::Window(e.to_string()))?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(BoothWindow {
            window,
            frame: Surface::new(canvas_w, canvas_h + HUD_H),
            canvas_h,
            sim_tx,
            last_sim: None,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Translate keys into [`InputEvent`]s and forward the pointer hand to
    /// the simulated landmark source.
    pub fn poll_input(&mut self, transform: Option<&CanvasTransform>) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);

        if one_shot(Key::Space)  { events.push(InputEvent::ShutterDown); }
        if self.window.is_key_released(Key::Space) {
            events.push(InputEvent::ShutterUp);
        }
        if one_shot(Key::C)      { events.push(InputEvent::SwitchCamera); }
        if one_shot(Key::H)      { events.push(InputEvent::ToggleTracking); }
        if one_shot(Key::Escape) { events.push(InputEvent::ClosePreview); }
        if one_shot(Key::Q)      { events.push(InputEvent::Quit); }

        let pos = self
            .window
            .get_mouse_pos(MouseMode::Discard)
            .filter(|&(_, y)| (y as usize) < self.canvas_h)
            .map(|(x, y)| Point::new(x, y));
        let pinching = self.window.get_mouse_down(MouseButton::Left);
        let hand = match (pos, transform) {
            (Some(p), Some(t)) => pointer_hand(p, pinching, t),
            _ => SimHand::Lost,
        };
        if self.last_sim != Some(hand) {
            // Nobody listening is fine: hardware mode ignores the pointer.
            let _ = self.sim_tx.send(hand);
            self.last_sim = Some(hand);
        }

        events
    }

    /// Show the display surface with the HUD strip underneath.
    pub fn present(&mut self, display: &Surface, hud: &Hud) {
        self.frame.blit(display, 0, 0);
        draw_hud(&mut self.frame, self.canvas_h, hud);
        let (w, h) = (self.frame.width(), self.frame.height());
        self.window.update_with_buffer(self.frame.pixels(), w, h).ok();
    }
}

/// Simulated fingertips for a pointer at `p`: the index tip under the
/// pointer and the thumb to its left.
pub fn pointer_hand(p: Point, pinching: bool, transform: &CanvasTransform) -> SimHand {
    let gap = if pinching { PINCHED_GAP } else { SPREAD_GAP };
    let thumb = Point::new(p.x - gap, p.y);
    match (transform.to_landmark(thumb), transform.to_landmark(p)) {
        (Some(thumb), Some(index)) => SimHand::Pose { thumb, index },
        _ => SimHand::Lost,
    }
}

// ── HUD ──────────────────────────────────────────────────────────────────────

/// Text rows of the HUD, top to bottom.
pub fn hud_lines(hud: &Hud) -> [String; 3] {
    let rec = match hud.recording_secs {
        Some(s) => format!("REC {s}s  "),
        None => String::new(),
    };
    let top = format!("{rec}{}", hud.status);
    let preview = match &hud.preview {
        PreviewState::Hidden => String::new(),
        PreviewState::Processing { name } => format!("processing {name}"),
        PreviewState::Ready { url } => format!("ready: {url}"),
        PreviewState::Failed(msg) => format!("error: {msg}"),
    };
    let legend = format!(
        "space=shutter  c=camera ({})  h=hands ({})  esc=close  q=quit",
        hud.facing.name(),
        if hud.tracking { "on" } else { "off" },
    );
    [top, preview, legend]
}

fn draw_hud(frame: &mut Surface, top: usize, hud: &Hud) {
    let w = frame.width();
    frame.fill_rect(0, top, w, HUD_H, HUD_BG);
    let [status, preview, legend] = hud_lines(hud);

    let mut x = 10;
    if hud.recording_secs.is_some() {
        frame.fill_circle(Point::new(18.0, top as f32 + 16.0), 7.0, REC_COLOR);
        x = 32;
    }
    frame.draw_label(&status, x, top + 8, 3, WHITE);

    let mut px = 10;
    if let Some(p) = hud.progress {
        let bar_w = 160;
        frame.fill_rect(10, top + 38, bar_w, 12, BAR_BG);
        frame.fill_rect(10, top + 38, (bar_w as f32 * p.clamp(0.0, 1.0)) as usize, 12, BAR_FG);
        frame.draw_label(&format!("{:.0}%", p * 100.0), bar_w + 18, top + 40, 2, WHITE);
        px = bar_w + 60;
    }
    frame.draw_label(&preview, px, top + 40, 2, WHITE);
    frame.draw_label(&legend, 10, top + HUD_H - 16, 2, LEGEND_COLOR);
}
