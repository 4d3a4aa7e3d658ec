//! Shared test utilities.
//!
//! Provides a throwaway HTTP server for mocking upstream hosts, a retry policy
//! that does not sleep, fixture loading, and synthetic images.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let router = Router::new().route("/th", get(|| async { synthetic_jpeg(64, 36) }));
//! let base = spawn_server(router).await;
//! let client = FetchClient::new(fast_policy()).unwrap();
//! let body = client.get(&format!("{base}/th"), &CancellationToken::new()).await.unwrap();
//! ```

use std::path::Path;
use std::time::Duration;

use axum::Router;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgba, RgbaImage};

use crate::audio::Audio;
use crate::cloud::{CloudError, SpeechSynthesizer};
use crate::fetch::RetryPolicy;
use crate::types::Wallpaper;
use futures_util::future::BoxFuture;

// =========================================================================
// Mock upstream
// =========================================================================

/// Serve `router` on an ephemeral localhost port and return its base URL
/// (`http://127.0.0.1:PORT`, no trailing slash).
///
/// The server lives until the test runtime shuts down.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Production retry semantics with near-zero waits.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 10,
        wait_min: Duration::from_millis(1),
        wait_max: Duration::from_millis(2),
        timeout: Duration::from_secs(5),
    }
}

// =========================================================================
// Fixtures
// =========================================================================

/// Read `fixtures/<name>` as bytes.
pub fn fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("fixture {} missing: {e}", path.display()))
}

/// Absolute path of `fixtures/<name>`.
pub fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

// =========================================================================
// Synthetic images
// =========================================================================

/// A horizontal gradient; no two adjacent columns share a colour.
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    })
}

/// A single-colour opaque image.
pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

/// JPEG-encoded gradient of the given size.
pub fn synthetic_jpeg(width: u32, height: u32) -> Vec<u8> {
    let rgb = image::DynamicImage::ImageRgba8(gradient(width, height)).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .encode_image(&rgb)
        .unwrap();
    out
}

/// PNG-encoded gradient of the given size.
pub fn synthetic_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    gradient(width, height)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// A fully populated wallpaper without a local file.
pub fn sample_wallpaper() -> Wallpaper {
    Wallpaper {
        raster: gradient(64, 36),
        description: "Galápagos giant tortoise, Santa Cruz Island (© Example/Getty Images)".into(),
        search_url: "https://www.bing.com/search?q=Gal%C3%A1pagos".into(),
        download_url: "https://www.bing.com/th?id=OHR.DarwinDay_EN-US1234_1920x1080.jpg".into(),
        audio: None,
        local_path: None,
    }
}

// =========================================================================
// Fake capabilities
// =========================================================================

/// Speech that "says" `language:text` as an MP3 payload.
pub struct FakeSpeech;

impl SpeechSynthesizer for FakeSpeech {
    fn synthesize<'a>(
        &'a self,
        text: &'a str,
        language: &'a str,
    ) -> BoxFuture<'a, Result<Audio, CloudError>> {
        let spoken = format!("{language}:{text}").into_bytes();
        Box::pin(async move { Ok(Audio::new("MP3", 24000, spoken)) })
    }
}
