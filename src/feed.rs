//! Image-of-the-day feed resolution.
//!
//! [`FeedResolver::resolve`] turns a day, region and resolution into a
//! decoded [`Wallpaper`]:
//!
//! 1. Ask the archive endpoint for one image:
//!    `{feed}/HPImageArchive.aspx?format=js&idx={day}&n=1&mkt={region}`.
//! 2. Rewrite the size token in the returned path (`_1920x1080`, `_UHD`) to
//!    the requested resolution and resolve it against the feed host.
//! 3. Download and decode by the extension of the `id` parameter; the
//!    decoded size must match the request exactly.
//! 4. Enrich the caption: translation to English, furigana for Japanese,
//!    and spoken audio. Enrichment failures are logged and skipped.
//!
//! Every network setting lives in [`CrawlerSettings`], passed in explicitly.

use crate::audio::Audio;
use crate::catalog::{Day, Region, Resolution};
use crate::cloud::{SpeechSynthesizer, Translator};
use crate::fetch::{FetchClient, FetchError};
use crate::furigana;
use crate::imaging::{self, ImagingError};
use crate::types::Wallpaper;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_FEED_URL: &str = "https://www.bing.com";
pub const DEFAULT_FURIGANA_API_URL: &str = "https://labs.goo.ne.jp";
pub const DEFAULT_LOOKUP_URL: &str = "https://jisho.org";

static RESOLUTION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(?:\d+x\d+|UHD)").expect("resolution token pattern is valid"));

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("invalid feed response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no image found in response: {0}")]
    NoImage(String),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("cannot rebase {url} onto {base}")]
    Rebase { url: String, base: String },
    #[error("decode failed: {0}")]
    Decode(#[from] ImagingError),
    #[error("expected resolution: {expected}, got: {width}x{height}")]
    BoundsMismatch {
        expected: Resolution,
        width: u32,
        height: u32,
    },
}

/// Upstream hosts and enrichment switches for one resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlerSettings {
    pub feed_url: String,
    pub furigana_api_url: String,
    /// Empty means "no key": the lookup site is used instead of the API.
    pub furigana_api_key: String,
    pub lookup_url: String,
    pub credentials: Option<PathBuf>,
    pub use_translation: bool,
    pub use_speech: bool,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.into(),
            furigana_api_url: DEFAULT_FURIGANA_API_URL.into(),
            furigana_api_key: String::new(),
            lookup_url: DEFAULT_LOOKUP_URL.into(),
            credentials: None,
            use_translation: false,
            use_speech: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    images: Vec<FeedImage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeedImage {
    url: String,
    title: String,
    copyright: String,
    copyrightlink: String,
}

/// The archive request for one image.
pub fn archive_url(base: &str, day: Day, region: Region) -> Result<Url, FeedError> {
    let endpoint = format!("{}/HPImageArchive.aspx", base.trim_end_matches('/'));
    Ok(Url::parse_with_params(
        &endpoint,
        &[
            ("format", "js".to_string()),
            ("idx", day.value().to_string()),
            ("n", "1".to_string()),
            ("mkt", region.to_string()),
        ],
    )?)
}

/// Replace every size token (`_1920x1080`, `_UHD`) with `resolution`'s.
pub fn rewrite_resolution_token(path: &str, resolution: Resolution) -> String {
    let replacement = format!("_{}", resolution.bing_format());
    RESOLUTION_TOKEN
        .replace_all(path, regex::NoExpand(&replacement))
        .into_owned()
}

/// Resolve `path` against the feed host. Absolute URLs are rebased onto the
/// feed's scheme, host and port.
pub fn resolve_download_url(base: &str, path: &str) -> Result<Url, FeedError> {
    let base_url = Url::parse(base)?;
    let mut resolved = base_url.join(path)?;
    let rebase_error = || FeedError::Rebase {
        url: path.to_string(),
        base: base.to_string(),
    };
    resolved.set_scheme(base_url.scheme()).map_err(|_| rebase_error())?;
    resolved.set_host(base_url.host_str())?;
    resolved.set_port(base_url.port()).map_err(|_| rebase_error())?;
    Ok(resolved)
}

/// The name whose extension picks the decoder: the `id` parameter, or the
/// URL path when there is none.
fn decoder_hint(url: &Url) -> String {
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| url.path().to_string())
}

pub fn compose_description(title: &str, copyright: &str) -> String {
    format!("{title}, {copyright}")
}

/// Resolves the image of the day into a [`Wallpaper`].
pub struct FeedResolver<'a> {
    client: &'a FetchClient,
    settings: &'a CrawlerSettings,
    translator: Option<&'a dyn Translator>,
    speech: Option<&'a dyn SpeechSynthesizer>,
}

impl<'a> FeedResolver<'a> {
    pub fn new(client: &'a FetchClient, settings: &'a CrawlerSettings) -> Self {
        Self {
            client,
            settings,
            translator: None,
            speech: None,
        }
    }

    pub fn with_translator(mut self, translator: Option<&'a dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_speech(mut self, speech: Option<&'a dyn SpeechSynthesizer>) -> Self {
        self.speech = speech;
        self
    }

    pub async fn resolve(
        &self,
        day: Day,
        region: Region,
        resolution: Resolution,
        cancel: &CancellationToken,
    ) -> Result<Wallpaper, FeedError> {
        let archive = archive_url(&self.settings.feed_url, day, region)?;
        info!(%day, %region, %resolution, "requesting image of the day");
        let raw = self.client.get(archive.as_str(), cancel).await?;

        let feed: FeedResponse = serde_json::from_slice(&raw)?;
        let image = feed
            .images
            .into_iter()
            .next()
            .filter(|image| !image.url.is_empty())
            .ok_or_else(|| FeedError::NoImage(String::from_utf8_lossy(&raw).into_owned()))?;

        let path = rewrite_resolution_token(&image.url, resolution);
        let download_url = resolve_download_url(&self.settings.feed_url, &path)?;
        let hint = decoder_hint(&download_url);
        imaging::decode::format_for(&hint)?;

        debug!(url = %download_url, "downloading image");
        let content = self.client.get(download_url.as_str(), cancel).await?;
        let decoded = imaging::decode(&hint, &content)?;
        if decoded.width() != resolution.width || decoded.height() != resolution.height {
            return Err(FeedError::BoundsMismatch {
                expected: resolution,
                width: decoded.width(),
                height: decoded.height(),
            });
        }

        let original = compose_description(&image.title, &image.copyright);
        let mut lines = vec![original.clone()];

        if let Some(translated) = self.translate(&original, region, cancel).await {
            lines.push(translated);
        }
        if region.uses_furigana() {
            if let Some(annotated) = self.annotate(&original, cancel).await {
                lines[0] = annotated;
            }
        }
        let audio = self.synthesize(&original, region, cancel).await;

        Ok(Wallpaper {
            raster: decoded.to_rgba8(),
            description: lines.join("\n"),
            search_url: image.copyrightlink,
            download_url: download_url.to_string(),
            audio,
            local_path: None,
        })
    }

    async fn translate(
        &self,
        text: &str,
        region: Region,
        cancel: &CancellationToken,
    ) -> Option<String> {
        if region.is_english()
            || !self.settings.use_translation
            || self.settings.credentials.is_none()
        {
            return None;
        }
        let translator = self.translator?;
        let source = region.to_string();
        let target = Region::TRANSLATION_TARGET.to_string();
        info!(%source, %target, "translating description");

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return None,
            outcome = translator.translate(text, &source, &target) => outcome,
        };
        match outcome {
            Ok(translated) => Some(translated),
            Err(e) => {
                warn!(error = %e, "failed to translate description");
                None
            }
        }
    }

    async fn annotate(&self, text: &str, cancel: &CancellationToken) -> Option<String> {
        let chain = furigana::annotator_chain(self.settings);
        match furigana::annotate(&chain, self.client, text, cancel).await {
            Ok(annotated) => Some(annotated),
            Err(e) => {
                warn!(error = %e, "failed to annotate description");
                None
            }
        }
    }

    async fn synthesize(
        &self,
        text: &str,
        region: Region,
        cancel: &CancellationToken,
    ) -> Option<Audio> {
        if !self.settings.use_speech {
            return None;
        }
        let speech = self.speech?;
        let language = region.speech_language();
        info!(%language, "generating description audio");

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return None,
            outcome = speech.synthesize(text, &language) => outcome,
        };
        match outcome {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!(error = %e, "failed to generate audio stream");
                None
            }
        }
    }
}
