//! Parameter types for compositing.
//!
//! These structs describe *what* to draw. The numbers in the `Default` impls
//! are the production look; tests construct their own where they need to.
//!
//! ## Types
//!
//! - [`CaptionStyle`] — font size, wrap width, line spacing, box margin and colours.
//! - [`QrStyle`] — corner margin, quiet zone and the radial fade.
//! - [`Composition`] — which steps to run and their arguments.

use crate::catalog::{Percent, Position, Resolution};

/// Look of the caption box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionStyle {
    /// Glyph size in pixels.
    pub font_size: f32,
    /// Lines wrap once wider than this share of the canvas width.
    pub max_width_ratio: f32,
    pub line_spacing: f32,
    /// Distance between the box and the top or bottom canvas edge.
    pub margin: f32,
    pub stroke_width: f32,
    pub stroke: [u8; 4],
    pub fill: [u8; 4],
    pub text: [u8; 4],
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: 20.0,
            max_width_ratio: 0.6,
            line_spacing: 1.2,
            margin: 50.0,
            stroke_width: 5.0,
            stroke: [255, 255, 255, 255],
            fill: [0, 0, 0, 164],
            text: [255, 255, 255, 255],
        }
    }
}

/// Look and placement of the QR code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QrStyle {
    /// Distance from both edges of the chosen corner.
    pub margin: u32,
    /// Light modules around the symbol.
    pub quiet_zone: u32,
    /// Opacity inside the fade boundary.
    pub alpha: f32,
    /// Fade starts at this share of the half-size.
    pub fade_start: f32,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            margin: 50,
            quiet_zone: 4,
            alpha: 196.0,
            fade_start: 0.95,
        }
    }
}

/// Steps to apply to one wallpaper, in the order they run:
/// dim → watermark → caption → QR code.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub dim: Percent,
    /// Embedded watermark name or file path.
    pub watermark: Option<String>,
    pub rotate_counter_clockwise: bool,
    /// Caption anchor and font name.
    pub caption: Option<(Position, String)>,
    /// QR corner and the resolution tier that sizes it.
    pub qr_code: Option<(Position, Resolution)>,
}

impl Composition {
    pub fn is_empty(&self) -> bool {
        self.dim.value() == 0.0
            && self.watermark.is_none()
            && self.caption.is_none()
            && self.qr_code.is_none()
    }
}
