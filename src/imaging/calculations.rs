//! Pure geometry for the compositor.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::catalog::Position;

/// Channel value after dimming.
///
/// # Arguments
/// * `value` - Original channel value
/// * `keep` - Fraction of brightness kept, `1 - percent/100`
pub fn dim_channel(value: u8, keep: f32) -> u8 {
    (value as f32 * keep).round().clamp(0.0, 255.0) as u8
}

/// Destination of source pixel `(x, y)` when rotating a `width`×`height`
/// image by 90°.
///
/// The rotated image is `height`×`width`.
///
/// # Returns
/// * `(x, y)` in the rotated image
pub fn rotate_quarter(
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    counter_clockwise: bool,
) -> (u32, u32) {
    if counter_clockwise {
        (y, width - 1 - x)
    } else {
        (height - 1 - y, x)
    }
}

/// Height of `lines` lines of text, measured from the first line's top to the
/// last line's bottom.
pub fn multiline_height(font_height: f32, lines: usize, spacing: f32) -> f32 {
    let n = lines.max(1) as f32;
    font_height * (n * spacing - (spacing - 1.0))
}

/// Rounded box behind the caption, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
}

/// Place the caption box.
///
/// The text block is given extra room below the last line (`1.5` line
/// heights for the first line), the corner radius is a fifth of that height
/// capped at `margin`, and the box is centered horizontally.
///
/// # Arguments
/// * `canvas` - Canvas dimensions (width, height)
/// * `text_width` - Width of the widest line
/// * `font_height` - Line height of the font at the caption size
/// * `lines` - Number of lines after wrapping
/// * `spacing` - Line spacing factor
/// * `margin` - Vertical distance to the canvas edge
/// * `position` - Only [`Position::TopCenter`] and [`Position::BottomCenter`] are placed
///
/// # Returns
/// * `None` for any other position
pub fn caption_box(
    canvas: (u32, u32),
    text_width: f32,
    font_height: f32,
    lines: usize,
    spacing: f32,
    margin: f32,
    position: Position,
) -> Option<CaptionBox> {
    let n = lines.max(1) as f32;
    let line_height = multiline_height(font_height, lines, spacing) / n;
    let text_height = line_height * 1.5 + line_height * (n - 1.0);
    let radius = (text_height / 5.0).min(margin);

    let (canvas_w, canvas_h) = (canvas.0 as f32, canvas.1 as f32);
    let x = canvas_w / 2.0 - text_width / 2.0 - radius;
    let y = match position {
        Position::TopCenter => margin + radius,
        Position::BottomCenter => canvas_h - text_height * 1.5 - margin - radius,
        _ => return None,
    };

    Some(CaptionBox {
        x,
        y,
        width: text_width + 2.0 * radius,
        height: text_height + 2.0 * radius,
        radius,
    })
}

/// Baseline of line `index` inside a caption box.
pub fn line_baseline(caption: &CaptionBox, font_height: f32, spacing: f32, index: usize) -> f32 {
    caption.y + caption.radius + font_height + index as f32 * font_height * spacing
}

/// Top-left corner of a `size`×`size` overlay placed `margin` pixels from
/// the requested corner.
///
/// # Returns
/// * `None` for non-corner positions
pub fn corner_offset(
    canvas: (u32, u32),
    size: u32,
    margin: u32,
    position: Position,
) -> Option<(i64, i64)> {
    let (w, h) = (canvas.0 as i64, canvas.1 as i64);
    let (size, margin) = (size as i64, margin as i64);
    match position {
        Position::TopLeft => Some((margin, margin)),
        Position::TopRight => Some((w - size - margin, margin)),
        Position::BottomLeft => Some((margin, h - size - margin)),
        Position::BottomRight => Some((w - size - margin, h - size - margin)),
        _ => None,
    }
}

/// Opacity of QR pixel `(x, y)` in a `size`×`size` code.
///
/// Constant `alpha` inside the fade boundary at `fade_start · size/2` from the
/// center (Chebyshev distance). Beyond it the opacity decays exponentially,
/// reaching a tenth of `alpha` at the very edge.
pub fn qr_fade_alpha(x: u32, y: u32, size: u32, alpha: f32, fade_start: f32) -> u8 {
    let center = size as f32 / 2.0;
    let smooth = (fade_start - 1.0) * center / 0.1f32.ln();
    let d = (x as f32 - center).abs().max((y as f32 - center).abs());
    let a = if d > fade_start * center {
        alpha * ((fade_start * center - d) / smooth).exp()
    } else {
        alpha
    };
    a.clamp(0.0, 255.0) as u8
}

/// Greedy word wrap.
///
/// Explicit `\n` always starts a new line. Within a paragraph words are
/// joined by single spaces until the next word would push the line past
/// `max_width`; a single word wider than `max_width` gets a line of its own.
///
/// # Arguments
/// * `text` - Text to wrap
/// * `max_width` - Widest allowed line
/// * `measure` - Width of a string in the same units as `max_width`
pub fn wrap_words(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measure(&candidate) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}
