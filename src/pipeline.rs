//! One wallpaper run: resolve → compose → persist → set → play.
//!
//! Resolution failures are fatal and yield no wallpaper. Anything after that
//! stops the run but the caller still gets the wallpaper as far as it was
//! processed, together with the failure, in a [`PipelineRun`].
//!
//! Compositing, encoding and the desktop call are blocking work and run on
//! the blocking thread pool.

use crate::audio::{Audio, AudioError, AudioPlayer, CommandPlayer};
use crate::cloud::{GoogleCloud, SpeechSynthesizer, Translator};
use crate::config::AppConfig;
use crate::feed::{FeedError, FeedResolver};
use crate::fetch::{FetchClient, FetchError, RetryPolicy};
use crate::imaging::{self, ImagingError};
use crate::persist::{PersistError, persist};
use crate::types::Wallpaper;
use crate::wallpaper::{DesktopWallpaper, WallpaperError, WallpaperSetter};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("imaging error: {0}")]
    Imaging(#[from] ImagingError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("wallpaper error: {0}")]
    Wallpaper(#[from] WallpaperError),
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("cancelled")]
    Cancelled,
}

/// The collaborators a run talks to.
pub struct Services {
    pub fetch: FetchClient,
    pub translator: Option<Arc<dyn Translator>>,
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
    pub setter: Arc<dyn WallpaperSetter>,
    pub player: Arc<dyn AudioPlayer>,
    /// Credentials file the cloud services were built from.
    pub credentials: Option<PathBuf>,
}

impl Services {
    /// Real HTTP, Google Cloud (when credentials are configured), desktop and
    /// command-line player.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let mut services = Self {
            fetch: FetchClient::new(RetryPolicy::default())?,
            translator: None,
            speech: None,
            setter: Arc::new(DesktopWallpaper),
            player: Arc::new(CommandPlayer),
            credentials: None,
        };
        services.load_cloud(config);
        Ok(services)
    }

    /// Rebuild the cloud clients if the configured credentials changed.
    ///
    /// Unreadable credentials disable translation and speech with a warning.
    pub fn load_cloud(&mut self, config: &AppConfig) {
        let wanted = config.credentials_path();
        if wanted == self.credentials && (self.translator.is_some() || wanted.is_none()) {
            return;
        }
        self.translator = None;
        self.speech = None;
        self.credentials = wanted.clone();

        let Some(path) = wanted else {
            return;
        };
        match GoogleCloud::from_credentials_file(&path) {
            Ok(cloud) => {
                info!(project = cloud.project_id(), "loaded Google Cloud credentials");
                let cloud = Arc::new(cloud);
                self.translator = Some(cloud.clone());
                self.speech = Some(cloud);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot load Google Cloud credentials")
            }
        }
    }
}

/// Outcome of a run that got as far as a decoded wallpaper.
#[derive(Debug)]
pub struct PipelineRun {
    pub wallpaper: Wallpaper,
    /// The step that stopped the run, if any.
    pub failure: Option<PipelineError>,
}

impl PipelineRun {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Fetch, decorate, save and apply today's (or the configured day's) image.
///
/// `autoplay` gates audio playback on top of `config.auto_play_audio`; the
/// daemon turns it off for refreshes triggered by a config change.
pub async fn run_pipeline(
    config: &AppConfig,
    services: &Services,
    autoplay: bool,
    cancel: &CancellationToken,
) -> Result<PipelineRun, PipelineError> {
    let settings = config.crawler_settings();
    let wallpaper = FeedResolver::new(&services.fetch, &settings)
        .with_translator(services.translator.as_deref())
        .with_speech(services.speech.as_deref())
        .resolve(config.day, config.region, config.resolution, cancel)
        .await?;
    info!(
        width = wallpaper.raster.width(),
        height = wallpaper.raster.height(),
        url = %wallpaper.download_url,
        "wallpaper resolved"
    );

    let (wallpaper, rendered) = render(wallpaper, config).await?;
    let mut run = PipelineRun {
        wallpaper,
        failure: None,
    };

    let path = match rendered {
        Ok(path) => path,
        Err(e) => {
            error!(error = %e, "failed to finish wallpaper");
            run.failure = Some(e);
            return Ok(run);
        }
    };

    if cancel.is_cancelled() {
        run.failure = Some(PipelineError::Cancelled);
        return Ok(run);
    }

    if config.download_only {
        info!(path = %path.display(), "download only, leaving desktop unchanged");
    } else {
        let setter = services.setter.clone();
        let mode = config.mode;
        if let Err(e) = tokio::task::spawn_blocking(move || setter.set(&path, mode)).await? {
            error!(error = %e, "failed to set wallpaper");
            run.failure = Some(e.into());
            return Ok(run);
        }
    }

    if autoplay && config.auto_play_audio {
        if let Some(audio) = &run.wallpaper.audio {
            if let Err(e) = play(services.player.clone(), audio.clone()).await {
                warn!(error = %e, "failed to play description audio");
            }
        }
    }

    Ok(run)
}

/// Compose and persist on the blocking pool, handing the wallpaper back
/// whatever the outcome.
async fn render(
    wallpaper: Wallpaper,
    config: &AppConfig,
) -> Result<(Wallpaper, Result<PathBuf, PipelineError>), PipelineError> {
    let composition = config.composition();
    let directory = config.download_directory.clone();

    let handed_back = tokio::task::spawn_blocking(move || {
        let mut wallpaper = wallpaper;
        let outcome = imaging::compose(&mut wallpaper, &composition)
            .map_err(PipelineError::from)
            .and_then(|()| persist(&mut wallpaper, &directory).map_err(PipelineError::from));
        (wallpaper, outcome)
    })
    .await?;
    Ok(handed_back)
}

/// Play a clip on the blocking pool.
pub async fn play(player: Arc<dyn AudioPlayer>, audio: Audio) -> Result<(), PipelineError> {
    tokio::task::spawn_blocking(move || player.play(&audio)).await??;
    Ok(())
}
