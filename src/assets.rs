//! Fonts and watermarks compiled into the binary.
//!
//! Both registries are plain name → bytes tables. Lookups hand out the
//! resident `&'static [u8]`, so every caller gets a fresh view without
//! copying or re-reading anything.

/// Font used for captions unless configured otherwise.
pub const DEFAULT_FONT: &str = "DejaVuSans.ttf";

/// Watermark drawn unless configured otherwise.
pub const DEFAULT_WATERMARK: &str = "frame.png";

const FONTS: &[(&str, &[u8])] = &[(
    DEFAULT_FONT,
    include_bytes!("../assets/fonts/DejaVuSans.ttf"),
)];

const WATERMARKS: &[(&str, &[u8])] = &[(
    DEFAULT_WATERMARK,
    include_bytes!("../assets/watermarks/frame.png"),
)];

fn lookup(table: &[(&'static str, &'static [u8])], name: &str) -> Option<&'static [u8]> {
    table
        .iter()
        .find(|(entry, _)| *entry == name)
        .map(|(_, bytes)| *bytes)
}

/// Embedded font by file name.
pub fn font(name: &str) -> Option<&'static [u8]> {
    lookup(FONTS, name)
}

/// Embedded watermark by file name.
pub fn watermark(name: &str) -> Option<&'static [u8]> {
    lookup(WATERMARKS, name)
}

pub fn font_names() -> Vec<&'static str> {
    FONTS.iter().map(|(name, _)| *name).collect()
}

pub fn watermark_names() -> Vec<&'static str> {
    WATERMARKS.iter().map(|(name, _)| *name).collect()
}
