//! Image decoding and compositing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory_with_format`, format by extension |
//! | **Dim** | per-channel scale over `rayon` pixel chunks |
//! | **Watermark** | index-remap rotation + Catmull-Rom `imageops::resize` + `overlay` |
//! | **Caption** | `fontdue` glyphs + SDF rounded box, CJK fallback from installed fonts |
//! | **QR code** | `qrcode` modules, radial alpha fade |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for layout math (unit testable)
//! - **Parameters**: Styles and the [`Composition`] describing what to draw
//! - **Primitives**: text, shapes, QR rasterization
//! - **Operations**: The compositing steps, each swapping the raster only on success

mod calculations;
pub mod decode;
mod error;
pub mod operations;
mod params;
mod qr;
mod shapes;
mod text;

pub use decode::decode;
pub use error::ImagingError;
pub use operations::{compose, dim, draw_caption, draw_qr_code, draw_watermark};
pub use params::{CaptionStyle, Composition, QrStyle};
