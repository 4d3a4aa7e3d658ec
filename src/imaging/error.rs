use crate::catalog::{Position, Resolution};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("unknown font: {0}")]
    UnknownFont(String),
    #[error("error parsing font: {0}")]
    Font(String),
    #[error("unsupported position: {position}, expected any of: {expected}")]
    UnsupportedPosition {
        position: Position,
        expected: String,
    },
    #[error("unsupported resolution: {resolution}, expected any of: {expected}")]
    UnsupportedResolution {
        resolution: Resolution,
        expected: String,
    },
    #[error("QR encoding error: {0}")]
    Qr(#[from] qrcode::types::QrError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
