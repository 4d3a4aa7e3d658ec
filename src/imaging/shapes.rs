//! Anti-aliased rounded rectangles and source-over blending.
//!
//! Shapes are rasterized from a signed distance field: each pixel center's
//! distance to the outline gives its coverage, so edges get one pixel of
//! smoothing without supersampling.

use super::calculations::CaptionBox;
use image::RgbaImage;

/// Blend `color` over the pixel at `(x, y)` with extra `coverage` in `[0, 1]`.
/// Coordinates outside the canvas are ignored.
pub fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: [u8; 4], coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let alpha = color[3] as f32 / 255.0 * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let blended = color[c] as f32 * alpha + dst[c] as f32 * (1.0 - alpha);
        dst[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
    let out_alpha = alpha + dst[3] as f32 / 255.0 * (1.0 - alpha);
    dst[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Signed distance from `(px, py)` to the rounded rectangle's outline;
/// negative inside.
fn rounded_rect_distance(rect: &CaptionBox, px: f32, py: f32) -> f32 {
    let half_w = rect.width / 2.0;
    let half_h = rect.height / 2.0;
    let radius = rect.radius.min(half_w).min(half_h).max(0.0);
    let qx = (px - (rect.x + half_w)).abs() - half_w + radius;
    let qy = (py - (rect.y + half_h)).abs() - half_h + radius;
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    outside + qx.max(qy).min(0.0) - radius
}

/// Visit every pixel within `pad` of the rectangle that lies on the canvas.
fn for_each_pixel_near(
    canvas: &mut RgbaImage,
    rect: &CaptionBox,
    pad: f32,
    mut visit: impl FnMut(&mut RgbaImage, i64, i64, f32),
) {
    let x0 = ((rect.x - pad).floor() as i64).max(0);
    let y0 = ((rect.y - pad).floor() as i64).max(0);
    let x1 = ((rect.x + rect.width + pad).ceil() as i64).min(canvas.width() as i64);
    let y1 = ((rect.y + rect.height + pad).ceil() as i64).min(canvas.height() as i64);
    for y in y0..y1 {
        for x in x0..x1 {
            let d = rounded_rect_distance(rect, x as f32 + 0.5, y as f32 + 0.5);
            visit(canvas, x, y, d);
        }
    }
}

/// Fill the rounded rectangle.
pub fn fill_rounded_rect(canvas: &mut RgbaImage, rect: &CaptionBox, color: [u8; 4]) {
    for_each_pixel_near(canvas, rect, 1.0, |canvas, x, y, d| {
        let coverage = (0.5 - d).clamp(0.0, 1.0);
        if coverage > 0.0 {
            blend_pixel(canvas, x, y, color, coverage);
        }
    });
}

/// Stroke the outline, centered on the path.
pub fn stroke_rounded_rect(canvas: &mut RgbaImage, rect: &CaptionBox, width: f32, color: [u8; 4]) {
    let half = width / 2.0;
    for_each_pixel_near(canvas, rect, half + 1.0, |canvas, x, y, d| {
        let coverage = (half + 0.5 - d.abs()).clamp(0.0, 1.0);
        if coverage > 0.0 {
            blend_pixel(canvas, x, y, color, coverage);
        }
    });
}
