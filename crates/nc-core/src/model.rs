//! Domain model for canvases and the sticky notes placed on them.
//!
//! A canvas owns its viewport transform (`scale` + `offset`); notes reference
//! the canvas they live on. Both are plain values: stores hand out clones,
//! and history commands keep clones as their captured "before" state.

use crate::id::{CanvasId, NoteId};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest zoom factor a canvas accepts.
pub const MIN_SCALE: f64 = 0.1;
/// Largest zoom factor a canvas accepts.
pub const MAX_SCALE: f64 = 8.0;

/// Whether `scale` is a usable zoom factor.
pub fn is_valid_scale(scale: f64) -> bool {
    scale.is_finite() && (MIN_SCALE..=MAX_SCALE).contains(&scale)
}

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    /// Classic sticky-note yellow.
    pub const STICKY_YELLOW: Color = Color::rgba(1.0, 0.921_568_6, 0.231_372_55, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`. The `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let channel = |hi: u8, lo: u8| -> Option<f32> {
            Some((hex_val(hi)? << 4 | hex_val(lo)?) as f32 / 255.0)
        };

        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])?;
                let g = hex_val(bytes[1])?;
                let b = hex_val(bytes[2])?;
                Some(Self::rgba(
                    (r * 17) as f32 / 255.0,
                    (g * 17) as f32 / 255.0,
                    (b * 17) as f32 / 255.0,
                    1.0,
                ))
            }
            6 => Some(Self::rgba(
                channel(bytes[0], bytes[1])?,
                channel(bytes[2], bytes[3])?,
                channel(bytes[4], bytes[5])?,
                1.0,
            )),
            8 => Some(Self::rgba(
                channel(bytes[0], bytes[1])?,
                channel(bytes[2], bytes[3])?,
                channel(bytes[4], bytes[5])?,
                channel(bytes[6], bytes[7])?,
            )),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let to_byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (to_byte(self.r), to_byte(self.g), to_byte(self.b), to_byte(self.a));
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::STICKY_YELLOW
    }
}

// ─── Canvas ──────────────────────────────────────────────────────────────

/// A named board with its own viewport transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub id: CanvasId,
    pub name: String,
    /// Zoom factor, 1.0 = 100%.
    pub scale: f64,
    /// Pan offset in screen pixels.
    pub offset: Vec2,
}

impl Canvas {
    pub fn new(id: CanvasId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            scale: 1.0,
            offset: Vec2::ZERO,
        }
    }
}

// ─── Note ────────────────────────────────────────────────────────────────

/// A sticky note placed on a canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub canvas: CanvasId,
    /// Position in canvas coordinates (before the viewport transform).
    pub position: Point,
    pub color: Color,
    #[serde(default)]
    pub text: String,
}

impl Note {
    pub fn new(id: NoteId, canvas: CanvasId, position: Point, color: Color) -> Self {
        Self {
            id,
            canvas,
            position,
            color,
            text: String::new(),
        }
    }
}
