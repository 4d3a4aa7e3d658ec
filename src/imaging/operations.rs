//! High-level compositing operations.
//!
//! Every operation draws onto a copy of the raster and swaps the copy in only
//! once the whole step has succeeded. A failing step therefore leaves the
//! caller's pixels exactly as they were.

use super::ImagingError;
use super::calculations::{
    caption_box, corner_offset, dim_channel, line_baseline, rotate_quarter, wrap_words,
};
use super::decode::decode;
use super::params::{CaptionStyle, Composition, QrStyle};
use super::qr::{fade_edges, render_qr};
use super::shapes::{blend_pixel, fill_rounded_rect, stroke_rounded_rect};
use super::text::{CJK_FALLBACK_FONTS, Typeface, covering_typeface};
use crate::assets;
use crate::catalog::{Percent, Position, Resolution, position_list};
use crate::types::Wallpaper;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use rayon::prelude::*;
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Darken every pixel's colour channels by `percent`. Alpha is kept.
pub fn dim(raster: &mut RgbaImage, percent: Percent) {
    if percent.value() == 0.0 {
        return;
    }
    let keep = percent.remaining_fraction();
    let mut canvas = raster.clone();
    let samples: &mut [u8] = &mut canvas;
    samples.par_chunks_exact_mut(4).for_each(|pixel| {
        for channel in &mut pixel[..3] {
            *channel = dim_channel(*channel, keep);
        }
    });
    *raster = canvas;
}

/// Load a watermark by embedded name, falling back to a filesystem path.
fn load_watermark(name: &str) -> Result<RgbaImage> {
    let bytes = match assets::watermark(name) {
        Some(embedded) => embedded.to_vec(),
        None => std::fs::read(name)?,
    };
    Ok(decode(name, &bytes)?.to_rgba8())
}

/// Load a font by embedded name, falling back to a filesystem path.
fn load_font(name: &str) -> Result<Cow<'static, [u8]>> {
    if let Some(embedded) = assets::font(name) {
        return Ok(Cow::Borrowed(embedded));
    }
    if !Path::new(name).is_file() {
        return Err(ImagingError::UnknownFont(name.to_string()));
    }
    Ok(Cow::Owned(std::fs::read(name)?))
}

/// Turn a portrait image on its side; landscape images pass through.
fn to_landscape(image: RgbaImage, counter_clockwise: bool) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width >= height {
        return image;
    }
    let mut rotated = RgbaImage::new(height, width);
    for (x, y, pixel) in image.enumerate_pixels() {
        let (rx, ry) = rotate_quarter(width, height, x, y, counter_clockwise);
        rotated.put_pixel(rx, ry, *pixel);
    }
    rotated
}

/// Stretch a watermark over the whole raster.
///
/// Portrait watermarks are rotated 90° first (clockwise unless
/// `counter_clockwise`), then scaled with Catmull-Rom to the raster size and
/// alpha-composited at the origin.
pub fn draw_watermark(raster: &mut RgbaImage, name: &str, counter_clockwise: bool) -> Result<()> {
    let watermark = to_landscape(load_watermark(name)?, counter_clockwise);
    let (width, height) = raster.dimensions();
    let resized = imageops::resize(&watermark, width, height, FilterType::CatmullRom);

    let mut canvas = raster.clone();
    imageops::overlay(&mut canvas, &resized, 0, 0);
    *raster = canvas;
    Ok(())
}

/// Draw `text` in a rounded, semi-transparent box centered at the top or
/// bottom of the raster.
///
/// `font_name` is an embedded font or a font file. When it lacks glyphs the
/// text needs (kanji and kana in DejaVu), the first installed CJK font that
/// covers the text is used instead.
pub fn draw_caption(
    raster: &mut RgbaImage,
    text: &str,
    position: Position,
    font_name: &str,
    style: &CaptionStyle,
) -> Result<()> {
    let font = load_font(font_name)?;
    let primary = Typeface::parse(&font, style.font_size)?;
    let face = covering_typeface(primary, text, CJK_FALLBACK_FONTS);
    let font_height = face.line_height();

    let max_width = style.max_width_ratio * raster.width() as f32;
    let lines = wrap_words(text, max_width, |s| face.measure(s));
    let text_width = lines.iter().map(|l| face.measure(l)).fold(0.0, f32::max);

    let Some(caption) = caption_box(
        raster.dimensions(),
        text_width,
        font_height,
        lines.len(),
        style.line_spacing,
        style.margin,
        position,
    ) else {
        return Err(ImagingError::UnsupportedPosition {
            position,
            expected: position_list(&Position::CAPTION_ANCHORS),
        });
    };
    debug!(lines = lines.len(), ?caption, "drawing caption");

    let mut canvas = raster.clone();
    stroke_rounded_rect(&mut canvas, &caption, style.stroke_width, style.stroke);
    fill_rounded_rect(&mut canvas, &caption, style.fill);

    let center_x = caption.x + caption.width / 2.0;
    for (index, line) in lines.iter().enumerate() {
        let baseline = line_baseline(&caption, font_height, style.line_spacing, index);
        face.draw_centered(&mut canvas, line, center_x, baseline, style.text);
    }

    *raster = canvas;
    Ok(())
}

/// Draw a faded QR code encoding `data` in one corner of the raster.
///
/// The code size follows the resolution tier; tiers without a size and
/// non-corner positions are errors.
pub fn draw_qr_code(
    raster: &mut RgbaImage,
    data: &str,
    resolution: Resolution,
    position: Position,
    style: &QrStyle,
) -> Result<()> {
    let size = resolution
        .qr_code_size()
        .ok_or_else(|| ImagingError::UnsupportedResolution {
            resolution,
            expected: Resolution::ALL
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })?;
    if !Position::CORNERS.contains(&position) {
        return Err(ImagingError::UnsupportedPosition {
            position,
            expected: position_list(&Position::CORNERS),
        });
    }

    let mut code = render_qr(data, size, style.quiet_zone)?;
    fade_edges(&mut code, style);

    let placement = corner_offset(raster.dimensions(), code.width(), style.margin, position);
    let Some((left, top)) = placement else {
        return Err(ImagingError::UnsupportedPosition {
            position,
            expected: position_list(&Position::CORNERS),
        });
    };

    let mut canvas = raster.clone();
    for (x, y, pixel) in code.enumerate_pixels() {
        blend_pixel(&mut canvas, left + x as i64, top + y as i64, pixel.0, 1.0);
    }
    *raster = canvas;
    Ok(())
}

/// Apply a composition to a wallpaper in order: dim, watermark, caption,
/// QR code.
///
/// Stops at the first failing step. Steps that already ran stay applied.
pub fn compose(wallpaper: &mut Wallpaper, composition: &Composition) -> Result<()> {
    dim(&mut wallpaper.raster, composition.dim);

    if let Some(name) = &composition.watermark {
        draw_watermark(&mut wallpaper.raster, name, composition.rotate_counter_clockwise)?;
    }

    if let Some((position, font)) = &composition.caption {
        draw_caption(
            &mut wallpaper.raster,
            &wallpaper.description,
            *position,
            font,
            &CaptionStyle::default(),
        )?;
    }

    if let Some((position, resolution)) = &composition.qr_code {
        draw_qr_code(
            &mut wallpaper.raster,
            &wallpaper.search_url,
            *resolution,
            *position,
            &QrStyle::default(),
        )?;
    }

    Ok(())
}
