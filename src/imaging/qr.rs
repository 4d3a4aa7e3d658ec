//! QR code rasterization.
//!
//! Encodes with medium error correction and lays the symbol out on a white
//! square: a 4-module quiet zone on every side, whole pixels per module, and
//! the leftover pixels split evenly as padding. A requested size smaller than
//! one pixel per module grows to fit.

use super::ImagingError;
use super::calculations::qr_fade_alpha;
use super::params::QrStyle;
use image::{Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};

/// Render `data` as an opaque black-on-white QR code at least `size` pixels wide.
pub fn render_qr(data: &str, size: u32, quiet_zone: u32) -> Result<RgbaImage, ImagingError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)?;
    let modules = code.width() as u32;
    let colors = code.to_colors();

    let real_size = modules + 2 * quiet_zone;
    let size = size.max(real_size);
    let per_module = size / real_size;
    let offset = (size - per_module * real_size) / 2;

    let mut image = RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 255]));
    for (index, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let mx = index as u32 % modules;
        let my = index as u32 / modules;
        let left = offset + (mx + quiet_zone) * per_module;
        let top = offset + (my + quiet_zone) * per_module;
        for y in top..top + per_module {
            for x in left..left + per_module {
                image.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
    }
    Ok(image)
}

/// Apply the radial edge fade to a rendered code. Alpha is straight, not
/// premultiplied.
pub fn fade_edges(code: &mut RgbaImage, style: &QrStyle) {
    let size = code.width();
    for (x, y, pixel) in code.enumerate_pixels_mut() {
        pixel[3] = qr_fade_alpha(x, y, size, style.alpha, style.fade_start);
    }
}
