//! Applying a saved image as the desktop wallpaper.
//!
//! The pipeline only depends on [`WallpaperSetter`]. [`DesktopWallpaper`]
//! is the real implementation on top of the `wallpaper` crate, which picks
//! the platform mechanism (GNOME, KDE, macOS, Windows, ...) at runtime.

use crate::catalog::WallpaperMode;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum WallpaperError {
    #[error("wallpaper path is not valid UTF-8: {0}")]
    NonUtf8Path(String),
    #[error("failed to set wallpaper mode {mode}: {reason}")]
    Mode { mode: WallpaperMode, reason: String },
    #[error("failed to set wallpaper: {0}")]
    Set(String),
}

/// Something that can make an image file the desktop background.
pub trait WallpaperSetter: Send + Sync {
    fn set(&self, path: &Path, mode: WallpaperMode) -> Result<(), WallpaperError>;
}

/// Sets the wallpaper of the running desktop session.
#[derive(Debug, Clone, Default)]
pub struct DesktopWallpaper;

fn platform_mode(mode: WallpaperMode) -> wallpaper::Mode {
    match mode {
        WallpaperMode::Center => wallpaper::Mode::Center,
        WallpaperMode::Crop => wallpaper::Mode::Crop,
        WallpaperMode::Fit => wallpaper::Mode::Fit,
        WallpaperMode::Span => wallpaper::Mode::Span,
        WallpaperMode::Stretch => wallpaper::Mode::Stretch,
        WallpaperMode::Tile => wallpaper::Mode::Tile,
    }
}

impl WallpaperSetter for DesktopWallpaper {
    fn set(&self, path: &Path, mode: WallpaperMode) -> Result<(), WallpaperError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| WallpaperError::NonUtf8Path(path.display().to_string()))?;

        wallpaper::set_mode(platform_mode(mode)).map_err(|e| WallpaperError::Mode {
            mode,
            reason: e.to_string(),
        })?;
        wallpaper::set_from_path(path_str).map_err(|e| WallpaperError::Set(e.to_string()))?;

        info!(path = path_str, %mode, "wallpaper set");
        Ok(())
    }
}
