//! Decoder selection by file extension.
//!
//! The format is chosen from the name alone (`.jpg`, `.jpeg`, `.png`,
//! `.webp`); bytes are never sniffed. A name with any other extension is
//! rejected before decoding starts.

use super::ImagingError;
use image::{DynamicImage, ImageFormat};
use std::path::Path;

/// Lowercased extension of `name` including the dot, or `""`.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// The format implied by `name`'s extension.
pub fn format_for(name: &str) -> Result<ImageFormat, ImagingError> {
    match extension_of(name).as_str() {
        ".jpg" | ".jpeg" => Ok(ImageFormat::Jpeg),
        ".png" => Ok(ImageFormat::Png),
        ".webp" => Ok(ImageFormat::WebP),
        other => Err(ImagingError::UnsupportedFileType(other.to_string())),
    }
}

/// Decode `bytes` with the decoder named by `name`'s extension.
pub fn decode(name: &str, bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    let format = format_for(name)?;
    Ok(image::load_from_memory_with_format(bytes, format)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{synthetic_jpeg, synthetic_png};

    #[test]
    fn extension_is_lowercased_with_dot() {
        assert_eq!(extension_of("OHR.Foo_1920x1080.JPG"), ".jpg");
        assert_eq!(extension_of("frame.png"), ".png");
        assert_eq!(extension_of("noext"), "");
    }

    #[test]
    fn formats_by_extension() {
        assert_eq!(format_for("a.jpg").unwrap(), ImageFormat::Jpeg);
        assert_eq!(format_for("a.jpeg").unwrap(), ImageFormat::Jpeg);
        assert_eq!(format_for("a.png").unwrap(), ImageFormat::Png);
        assert_eq!(format_for("a.webp").unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn other_extensions_are_unsupported() {
        for name in ["a.gif", "a.bmp", "a"] {
            assert!(matches!(
                format_for(name),
                Err(ImagingError::UnsupportedFileType(_))
            ));
        }
    }

    #[test]
    fn decodes_jpeg_and_png() {
        let jpeg = decode("x.jpg", &synthetic_jpeg(32, 18)).unwrap();
        assert_eq!((jpeg.width(), jpeg.height()), (32, 18));
        let png = decode("x.png", &synthetic_png(8, 4)).unwrap();
        assert_eq!((png.width(), png.height()), (8, 4));
    }

    #[test]
    fn content_is_not_sniffed() {
        let err = decode("x.jpg", &synthetic_png(8, 4)).unwrap_err();
        assert!(matches!(err, ImagingError::Image(_)));
    }
}
