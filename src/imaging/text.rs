//! Glyph measurement and rasterization with `fontdue`.

use super::ImagingError;
use super::shapes::blend_pixel;
use fontdue::{Font, FontSettings};
use image::RgbaImage;
use std::path::Path;
use tracing::{debug, warn};

/// Installed fonts with CJK coverage, tried in order when the caption font
/// has no glyphs for part of the text.
pub const CJK_FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/opentype/unifont/unifont.otf",
    "/usr/share/fonts/truetype/unifont/unifont.ttf",
    "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
    "/usr/share/fonts/wenquanyi/wqy-microhei/wqy-microhei.ttc",
    "/System/Library/Fonts/Hiragino Sans GB.ttc",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\msgothic.ttc",
    "C:\\Windows\\Fonts\\msyh.ttc",
];

/// A parsed font at a fixed pixel size.
pub struct Typeface {
    font: Font,
    px: f32,
}

impl Typeface {
    pub fn parse(bytes: &[u8], px: f32) -> Result<Self, ImagingError> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| ImagingError::Font(e.to_string()))?;
        Ok(Self { font, px })
    }

    /// Distance between consecutive baselines at spacing 1.0.
    pub fn line_height(&self) -> f32 {
        self.font
            .horizontal_line_metrics(self.px)
            .map(|m| m.new_line_size)
            .unwrap_or(self.px)
    }

    /// Characters of `text` without a glyph in this font, in order of first
    /// appearance. Whitespace and control characters are not reported.
    pub fn missing_glyphs(&self, text: &str) -> Vec<char> {
        let mut missing = Vec::new();
        for c in text.chars() {
            if c.is_whitespace() || c.is_control() || missing.contains(&c) {
                continue;
            }
            if self.font.lookup_glyph_index(c) == 0 {
                missing.push(c);
            }
        }
        missing
    }

    /// Advance width of `text` on one line, kerning included.
    pub fn measure(&self, text: &str) -> f32 {
        let mut width = 0.0;
        let mut previous = None;
        for c in text.chars() {
            if let Some(prev) = previous {
                width += self.font.horizontal_kern(prev, c, self.px).unwrap_or(0.0);
            }
            width += self.font.metrics(c, self.px).advance_width;
            previous = Some(c);
        }
        width
    }

    /// Draw one line of text centered on `center_x` with its baseline at
    /// `baseline`.
    pub fn draw_centered(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        center_x: f32,
        baseline: f32,
        color: [u8; 4],
    ) {
        let mut pen = center_x - self.measure(text) / 2.0;
        let mut previous = None;
        for c in text.chars() {
            if let Some(prev) = previous {
                pen += self.font.horizontal_kern(prev, c, self.px).unwrap_or(0.0);
            }
            let (metrics, coverage) = self.font.rasterize(c, self.px);
            let left = (pen + metrics.xmin as f32).round() as i64;
            let top = (baseline - metrics.height as f32 - metrics.ymin as f32).round() as i64;
            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let alpha = coverage[row * metrics.width + col];
                    if alpha > 0 {
                        blend_pixel(
                            canvas,
                            left + col as i64,
                            top + row as i64,
                            color,
                            alpha as f32 / 255.0,
                        );
                    }
                }
            }
            pen += metrics.advance_width;
            previous = Some(c);
        }
    }
}

/// `primary` when it has every glyph `text` needs, otherwise the first of
/// `candidates` that does, parsed at the same size.
///
/// Unreadable candidates are skipped. When nothing covers the text the
/// primary face is kept and the missing characters are logged.
pub fn covering_typeface<P: AsRef<Path>>(
    primary: Typeface,
    text: &str,
    candidates: &[P],
) -> Typeface {
    let missing = primary.missing_glyphs(text);
    if missing.is_empty() {
        return primary;
    }
    for candidate in candidates {
        let path = candidate.as_ref();
        let Ok(bytes) = std::fs::read(path) else {
            continue;
        };
        match Typeface::parse(&bytes, primary.px) {
            Ok(face) if face.missing_glyphs(text).is_empty() => {
                debug!(font = %path.display(), "caption uses fallback font");
                return face;
            }
            Ok(_) => debug!(font = %path.display(), "fallback font does not cover caption"),
            Err(e) => {
                debug!(font = %path.display(), error = %e, "skipping unreadable fallback font")
            }
        }
    }
    warn!(
        missing = %missing.iter().collect::<String>(),
        "caption font lacks glyphs for these characters; set `font` to a file that covers them"
    );
    primary
}
