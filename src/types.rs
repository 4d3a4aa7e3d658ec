//! Shared types passed between pipeline stages.
//!
//! [`Wallpaper`] is built by the feed resolver, rewritten by the compositor,
//! stamped with a local path by persistence, and finally held by the daemon.
//! [`WallpaperInfo`] is its serializable summary for the control API and the
//! CLI report.

use crate::audio::Audio;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One wallpaper as it moves through the pipeline.
#[derive(Clone, PartialEq)]
pub struct Wallpaper {
    /// Decoded pixels at the requested resolution.
    pub raster: RgbaImage,
    /// Caption text. A translation, when present, is the second line.
    pub description: String,
    /// Search page about the photo (the QR code payload).
    pub search_url: String,
    /// Absolute URL the raster was downloaded from.
    pub download_url: String,
    pub audio: Option<Audio>,
    /// Set once the PNG has been written.
    pub local_path: Option<PathBuf>,
}

impl std::fmt::Debug for Wallpaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallpaper")
            .field("dimensions", &self.raster.dimensions())
            .field("description", &self.description)
            .field("search_url", &self.search_url)
            .field("download_url", &self.download_url)
            .field("audio", &self.audio)
            .field("local_path", &self.local_path)
            .finish()
    }
}

impl Wallpaper {
    pub fn info(&self) -> WallpaperInfo {
        WallpaperInfo {
            width: self.raster.width(),
            height: self.raster.height(),
            description: self.description.clone(),
            search_url: self.search_url.clone(),
            download_url: self.download_url.clone(),
            local_path: self.local_path.clone(),
            audio_codec: self.audio.as_ref().map(|a| a.codec.clone()),
        }
    }
}

/// Metadata of a [`Wallpaper`], without pixels or audio bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallpaperInfo {
    pub width: u32,
    pub height: u32,
    pub description: String,
    pub search_url: String,
    pub download_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
}
