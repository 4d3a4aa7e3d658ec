//! Writing a finished wallpaper to the download directory.
//!
//! The output name is derived before anything touches the filesystem, so a
//! download URL without an `id` fails with no directory created and no file
//! written. The audio clip (when present) is written before the PNG.

use crate::audio::AudioError;
use crate::naming::{NamingError, output_names};
use crate::types::Wallpaper;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("{0}")]
    Naming(#[from] NamingError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot write audio: {0}")]
    Audio(#[from] AudioError),
    #[error("cannot encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

/// Save `wallpaper` as PNG (plus its audio) under `directory` and record the
/// PNG path in `local_path`.
pub fn persist(wallpaper: &mut Wallpaper, directory: &Path) -> Result<PathBuf, PersistError> {
    let names = output_names(&wallpaper.download_url)?;
    std::fs::create_dir_all(directory)?;

    if let Some(audio) = &wallpaper.audio {
        let audio_path = directory.join(names.audio(&audio.codec));
        audio.dump(&audio_path)?;
        info!(path = %audio_path.display(), "saved description audio");
    }

    let image_path = directory.join(&names.image);
    wallpaper.raster.save_with_format(&image_path, ImageFormat::Png)?;
    info!(path = %image_path.display(), "saved wallpaper");

    wallpaper.local_path = Some(image_path.clone());
    Ok(image_path)
}
