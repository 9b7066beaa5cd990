//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────┐
//! │  STAGE                       │   MELODY dial (left)  │
//! │  camera frame, ankle marks,  │                       │
//! │  calibration cross           │   HARMONY dial (right)│
//! ├──────────────────────────────┴──────────────────────┤
//! │  status bar / key legend                             │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Left mouse button drags the left ankle, right button the right ankle.

use std::sync::mpsc::Sender;

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use leg_tracking::control::EXPRESSION_FULL_SCALE;
use leg_tracking::geometry::DISTANCE_SCALE;
use leg_tracking::slice::{quantize, slice_start_deg};
use leg_tracking::{CalibrationOffset, LegPair, Limb, LimbControlState};

use crate::input::{SimInput, SimKey};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:       usize = 960;
pub const WIN_H:       usize = 560;
const STAGE_X:         usize = 20;
const STAGE_Y:         usize = 30;
const STAGE_W:         usize = 520;
const STAGE_H:         usize = 440;
const DIAL_CX:         usize = 750;
const MELODY_DIAL_CY:  usize = 145;
const HARMONY_DIAL_CY: usize = 365;
const DIAL_R:          usize = 85;
const STATUS_Y:        usize = WIN_H - 56;
const BG_COLOR:        u32   = 0xFF1A1A2E;
const STAGE_BG:        u32   = 0xFF16213E;
const TEXT_BG:         u32   = 0xFF0F3460;
const CROSS_COLOR:     u32   = 0xFFFFD700;  // gold
const MELODY_COLOR:    u32   = 0xFF4FC3F7;
const HARMONY_COLOR:   u32   = 0xFFFFB74D;
const SPOKE_COLOR:     u32   = 0xFF2E3A5C;

/// Map a window pixel to a normalized frame position, if it is on stage.
pub fn stage_to_frame(mx: f32, my: f32) -> Option<(f32, f32)> {
    let x = (mx - STAGE_X as f32) / STAGE_W as f32;
    let y = (my - STAGE_Y as f32) / STAGE_H as f32;
    if (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y) {
        Some((x, y))
    } else {
        None
    }
}

fn frame_to_stage(x: f32, y: f32) -> (usize, usize) {
    let px = STAGE_X as f32 + x.clamp(0.0, 1.0) * STAGE_W as f32;
    let py = STAGE_Y as f32 + y.clamp(0.0, 1.0) * STAGE_H as f32;
    (px as usize, py as usize)
}

// ════════════════════════════════════════════════════════════════════════════
// Scene — one frame's worth of state to draw
// ════════════════════════════════════════════════════════════════════════════

pub struct Scene<'a> {
    pub legs:           LegPair,
    pub slice_count:    usize,
    pub offset:         CalibrationOffset,
    pub calibrating:    bool,
    /// Label per slice for each dial; `"-"` where the palette has no entry.
    pub melody_labels:  Vec<String>,
    pub harmony_labels: Vec<String>,
    pub status:         &'a str,
    pub key_label:      String,
    pub preset:         &'static str,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:   Window,
    buf:      Vec<u32>,
    sim_tx:   Sender<SimInput>,
    /// Mouse buttons held last poll, left then right.
    held:     [bool; 2],
}

const BUTTONS: [(MouseButton, Limb); 2] =
    [(MouseButton::Left, Limb::Left), (MouseButton::Right, Limb::Right)];

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>) -> Result<Self, minifb::Error> {
        let mut window = Window::new(
            "LegSynth - play with your legs",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx,
            held: [false; 2],
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll keyboard and mouse and translate to SimInput events.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            let _ = self.sim_tx.send(SimInput::KeyDown(SimKey::Quit));
            return false;
        }
        for (key, sim) in [
            (Key::C, SimKey::Calibrate),
            (Key::R, SimKey::Root),
            (Key::S, SimKey::Scale),
            (Key::P, SimKey::Preset),
            (Key::H, SimKey::Hide),
        ] {
            if one_shot(key) {
                let _ = self.sim_tx.send(SimInput::KeyDown(sim));
            }
        }

        // ── ankles follow the mouse while a button is held ────────────────
        let pos = self
            .window
            .get_mouse_pos(MouseMode::Clamp)
            .and_then(|(mx, my)| stage_to_frame(mx, my));
        for (i, (button, limb)) in BUTTONS.iter().enumerate() {
            let down = self.window.get_mouse_down(*button);
            match (down, pos) {
                (true, Some((x, y))) => {
                    let _ = self.sim_tx.send(SimInput::Drag { limb: *limb, x, y });
                }
                (false, _) if self.held[i] => {
                    let _ = self.sim_tx.send(SimInput::Release(*limb));
                }
                _ => {}
            }
            self.held[i] = down;
        }

        true
    }

    /// Render one frame.
    pub fn render(&mut self, scene: &Scene<'_>) {
        self.buf.fill(BG_COLOR);

        self.draw_stage(scene);

        self.draw_label("MELODY", DIAL_CX - DIAL_R - 60, MELODY_DIAL_CY - DIAL_R, MELODY_COLOR);
        self.draw_dial(DIAL_CX, MELODY_DIAL_CY, &scene.legs.left, scene.slice_count,
                       &scene.melody_labels, MELODY_COLOR);
        self.draw_label("HARMONY", DIAL_CX - DIAL_R - 60, HARMONY_DIAL_CY - DIAL_R, HARMONY_COLOR);
        self.draw_dial(DIAL_CX, HARMONY_DIAL_CY, &scene.legs.right, scene.slice_count,
                       &scene.harmony_labels, HARMONY_COLOR);

        // ── Status bar ────────────────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, TEXT_BG);
        self.draw_label(scene.status, 10, STATUS_Y + 10, 0xFFEEEEEE);
        let info = format!("key: {}   preset: {}", scene.key_label, scene.preset);
        self.draw_label(&info, 10, STATUS_Y + 24, 0xFFAADDFF);

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "C=calibrate  R=root  S=scale  P=preset  H=hide  Q=quit   mouse L/R=drag left/right ankle",
            10, WIN_H - 14, 0xFF888888,
        );

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Stage ─────────────────────────────────────────────────────────────

    fn draw_stage(&mut self, scene: &Scene<'_>) {
        self.fill_rect(STAGE_X, STAGE_Y, STAGE_W, STAGE_H, STAGE_BG);
        self.draw_border(STAGE_X, STAGE_Y, STAGE_W, STAGE_H, SPOKE_COLOR);

        if scene.offset.is_set {
            let (px, py) = frame_to_stage(scene.offset.center_x, scene.offset.center_y);
            let color = if scene.calibrating { blend(CROSS_COLOR, STAGE_BG, 0.5) } else { CROSS_COLOR };
            for d in 0..=8 {
                self.set_pixel(px + d, py, color);
                self.set_pixel(px.saturating_sub(d), py, color);
                self.set_pixel(px, py + d, color);
                self.set_pixel(px, py.saturating_sub(d), color);
            }
        }

        for (limb, color) in [(Limb::Left, MELODY_COLOR), (Limb::Right, HARMONY_COLOR)] {
            let state = scene.legs.get(limb);
            if state.slice < 0 {
                continue;
            }
            let (x, y) = state.absolute_position();
            let (px, py) = frame_to_stage(x, y);
            let c = if state.is_active { color } else { blend(color, STAGE_BG, 0.6) };
            self.draw_diamond(px, py, 6, c);
            self.draw_label(if limb == Limb::Left { "L" } else { "R" }, px + 9, py.saturating_sub(2), c);
        }

        if scene.calibrating {
            self.draw_label("stand still...", STAGE_X + 8, STAGE_Y + 8, CROSS_COLOR);
        }
    }

    // ── Dial ──────────────────────────────────────────────────────────────

    fn draw_dial(
        &mut self,
        cx:     usize,
        cy:     usize,
        limb:   &LimbControlState,
        n:      usize,
        labels: &[String],
        color:  u32,
    ) {
        let r = DIAL_R as isize;
        let active = limb.active_slice();

        // Wedges
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r { continue; }
                let deg = (dy as f32).atan2(dx as f32).to_degrees().rem_euclid(360.0);
                let k = quantize(deg, n);
                let c = if active == Some(k) {
                    color
                } else if k % 2 == 0 {
                    blend(BG_COLOR, color, 0.12)
                } else {
                    blend(BG_COLOR, color, 0.06)
                };
                self.set_pixel((cx as isize + dx) as usize, (cy as isize + dy) as usize, c);
            }
        }

        // Spokes and labels
        for k in 0..n {
            let a = slice_start_deg(k, n).to_radians();
            for t in 0..DIAL_R {
                let px = cx as f32 + a.cos() * t as f32;
                let py = cy as f32 + a.sin() * t as f32;
                self.set_pixel(px as usize, py as usize, SPOKE_COLOR);
            }
            let mid = (slice_start_deg(k, n) + 180.0 / n as f32).to_radians();
            let lx = cx as f32 + mid.cos() * (DIAL_R as f32 + 16.0) - 6.0;
            let ly = cy as f32 + mid.sin() * (DIAL_R as f32 + 16.0) - 2.0;
            let label = labels.get(k).map(String::as_str).unwrap_or("-");
            let c = if active == Some(k) { color } else { 0xFF888888 };
            self.draw_label(label, lx.max(0.0) as usize, ly.max(0.0) as usize, c);
        }

        // Limb position, full scale at the rim
        if limb.slice >= 0 {
            let full = EXPRESSION_FULL_SCALE / DISTANCE_SCALE;
            let (mut mx, mut my) = (limb.x / full, limb.y / full);
            let len = (mx * mx + my * my).sqrt();
            if len > 1.0 {
                mx /= len;
                my /= len;
            }
            let px = cx as f32 + mx * DIAL_R as f32;
            let py = cy as f32 + my * DIAL_R as f32;
            let c = if limb.is_active { 0xFFFFFFFF } else { 0xFF666666 };
            self.draw_diamond(px as usize, py as usize, 4, c);
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for col in x..(x+w).min(WIN_W) {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..(y+h).min(WIN_H) {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    fn draw_diamond(&mut self, cx: usize, cy: usize, r: usize, color: u32) {
        for dy in 0..=r as isize {
            let w = r as isize - dy;
            for dx in -w..=w {
                for sy in [cy as isize + dy, cy as isize - dy] {
                    let sx = cx as isize + dx;
                    if sx >= 0 && sy >= 0 {
                        self.set_pixel(sx as usize, sy as usize, color);
                    }
                }
            }
        }
    }

    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        for (i, ch) in text.chars().enumerate() {
            let left = x + i * 4;
            if left + 4 > WIN_W { break; }
            let bits = glyph_bits(ch);
            for row in 0..5 {
                let line = (bits >> (12 - 3 * row)) & 0b111;
                for col in 0..3 {
                    if line & (0b100 >> col) != 0 {
                        self.set_pixel(left + col, y + row, color);
                    }
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// 3×5 bitmap font, five rows of three bits packed top row first
// ────────────────────────────────────────────────────────────────────────────

fn glyph_bits(c: char) -> u16 {
    match c.to_ascii_uppercase() {
        '0' => 0x7B6F,
        '1' => 0x2C97,
        '2' => 0x73E7,
        '3' => 0x73CF,
        '4' => 0x5BC9,
        '5' => 0x79CF,
        '6' => 0x79EF,
        '7' => 0x7249,
        '8' => 0x7BEF,
        '9' => 0x7BCF,
        'A' => 0x7BED,
        'B' => 0x6BAE,
        'C' => 0x7927,
        'D' => 0x6B6E,
        'E' => 0x79E7,
        'F' => 0x79E4,
        'G' => 0x796F,
        'H' => 0x5BED,
        'I' => 0x7497,
        'J' => 0x126F,
        'K' => 0x5BAD,
        'L' => 0x4927,
        'M' => 0x5F6D,
        'N' => 0x7B6D,
        'O' => 0x7B6F,
        'P' => 0x7BE4,
        'Q' => 0x7B79,
        'R' => 0x6BAD,
        'S' => 0x79CF,
        'T' => 0x7492,
        'U' => 0x5B6F,
        'V' => 0x5B52,
        'W' => 0x5B7D,
        'X' => 0x5AAD,
        'Y' => 0x5BD2,
        'Z' => 0x72A7,
        '#' => 0x5F7D,
        '!' => 0x2482,
        '(' => 0x1491,
        ')' => 0x4494,
        '/' => 0x12A4,
        '-' => 0x01C0,
        '.' => 0x0002,
        ',' => 0x0014,
        ':' => 0x0410,
        '=' => 0x0E38,
        '+' => 0x05D0,
        ' ' => 0x0000,
        _   => 0x0080, // centre dot
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0-t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar,br) << 16) | (lerp(ag,bg) << 8) | lerp(ab,bb)
}
