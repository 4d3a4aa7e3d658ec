//! Application configuration.
//!
//! Values come from three layers, later layers winning:
//!
//! 1. Stock defaults ([`AppConfig::default`]).
//! 2. An optional `config.toml` (by default in the platform config directory,
//!    e.g. `~/.config/bing-wall/config.toml`).
//! 3. A [`ConfigPatch`]: command-line flags for one-shot runs, or the JSON
//!    body of `PATCH /config` in daemon mode.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! day = 0                       # 0 = today ... 7 = a week ago
//! region = "de-DE"
//! resolution = "1920x1080"      # or "SD", "HD", "UHD"
//! mode = "fit"                  # center, crop, fit, span, stretch, tile
//! draw_description = true
//! caption_position = "TopCenter"
//! font = "DejaVuSans.ttf"        # embedded name or path to a .ttf/.otf/.ttc
//! draw_qr_code = true
//! qr_position = "TopRight"
//! watermark = "frame.png"       # embedded name, file path, or "" for none
//! rotate_counter_clockwise = false
//! dim_image = 0.0               # percent, 0-100
//! download_only = false
//! download_directory = "~/Pictures/BingWallpapers"
//! google_app_credentials = ""
//! furigana_api_app_id = ""
//! use_google_text2speech_service = false
//! use_google_translate_service = false
//! auto_play_audio = false
//! api_port = 44244
//!
//! [upstream]
//! feed_url = "https://www.bing.com"
//! furigana_api_url = "https://labs.goo.ne.jp"
//! lookup_url = "https://jisho.org"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::assets;
use crate::catalog::{Day, Percent, Position, Region, Resolution, WallpaperMode, position_list};
use crate::feed::{CrawlerSettings, DEFAULT_FEED_URL, DEFAULT_FURIGANA_API_URL, DEFAULT_LOOKUP_URL};
use crate::imaging::Composition;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const APP_NAME: &str = "bing-wall";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything a pipeline run needs to know.
///
/// All fields have defaults; config files only need the values they change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub day: Day,
    pub region: Region,
    pub resolution: Resolution,
    pub mode: WallpaperMode,
    /// Draw title and copyright as a caption.
    pub draw_description: bool,
    pub caption_position: Position,
    /// Caption font: embedded name or path to a font file.
    pub font: String,
    /// Draw a QR code linking to the image's search page.
    pub draw_qr_code: bool,
    pub qr_position: Position,
    /// Embedded watermark name or file path; empty for none.
    pub watermark: String,
    pub rotate_counter_clockwise: bool,
    pub dim_image: Percent,
    /// Save the image but leave the desktop alone.
    pub download_only: bool,
    pub download_directory: PathBuf,
    /// Google service-account JSON; empty disables translation and speech.
    pub google_app_credentials: String,
    /// goo labs app id; empty falls back to the dictionary lookup.
    pub furigana_api_app_id: String,
    pub use_google_text2speech_service: bool,
    pub use_google_translate_service: bool,
    pub auto_play_audio: bool,
    pub api_port: u16,
    pub upstream: UpstreamConfig,
}

/// Base URLs of the services the crawler talks to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    pub feed_url: String,
    pub furigana_api_url: String,
    pub lookup_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            furigana_api_url: DEFAULT_FURIGANA_API_URL.to_string(),
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
        }
    }
}

/// `~/Pictures/BingWallpapers`, relative to the working directory when there
/// is no home directory.
pub fn default_download_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join("Pictures")
        .join("BingWallpapers")
}

/// Where `config.toml` is looked up when no path is given.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE_NAME))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            day: Day::TODAY,
            region: Region::GERMANY,
            resolution: Resolution::HD,
            mode: WallpaperMode::Fit,
            draw_description: true,
            caption_position: Position::TopCenter,
            font: assets::DEFAULT_FONT.to_string(),
            draw_qr_code: true,
            qr_position: Position::TopRight,
            watermark: assets::DEFAULT_WATERMARK.to_string(),
            rotate_counter_clockwise: false,
            dim_image: Percent::ZERO,
            download_only: false,
            download_directory: default_download_directory(),
            google_app_credentials: String::new(),
            furigana_api_app_id: String::new(),
            use_google_text2speech_service: false,
            use_google_translate_service: false,
            auto_play_audio: false,
            api_port: 44244,
            upstream: UpstreamConfig::default(),
        }
    }
}

impl AppConfig {
    /// Check the values serde cannot: asset names, anchor choices, URLs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if assets::font(&self.font).is_none() && !Path::new(&self.font).is_file() {
            return Err(ConfigError::Validation(format!(
                "font {:?} is neither embedded ({}) nor an existing file",
                self.font,
                assets::font_names().join(", ")
            )));
        }
        if !self.watermark.is_empty()
            && assets::watermark(&self.watermark).is_none()
            && !Path::new(&self.watermark).is_file()
        {
            return Err(ConfigError::Validation(format!(
                "watermark {:?} is neither embedded ({}) nor an existing file",
                self.watermark,
                assets::watermark_names().join(", ")
            )));
        }
        if !Position::CAPTION_ANCHORS.contains(&self.caption_position) {
            return Err(ConfigError::Validation(format!(
                "caption_position must be one of: {}",
                position_list(&Position::CAPTION_ANCHORS)
            )));
        }
        if !Position::CORNERS.contains(&self.qr_position) {
            return Err(ConfigError::Validation(format!(
                "qr_position must be one of: {}",
                position_list(&Position::CORNERS)
            )));
        }
        if self.api_port == 0 {
            return Err(ConfigError::Validation("api_port must be non-zero".into()));
        }
        for (key, value) in [
            ("upstream.feed_url", &self.upstream.feed_url),
            ("upstream.furigana_api_url", &self.upstream.furigana_api_url),
            ("upstream.lookup_url", &self.upstream.lookup_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| ConfigError::Validation(format!("{key} is not a valid URL: {e}")))?;
        }
        Ok(())
    }

    /// Crawler settings for one resolution run.
    pub fn crawler_settings(&self) -> CrawlerSettings {
        CrawlerSettings {
            feed_url: self.upstream.feed_url.clone(),
            furigana_api_url: self.upstream.furigana_api_url.clone(),
            furigana_api_key: self.furigana_api_app_id.clone(),
            lookup_url: self.upstream.lookup_url.clone(),
            credentials: self.credentials_path(),
            use_translation: self.use_google_translate_service,
            use_speech: self.use_google_text2speech_service,
        }
    }

    pub fn credentials_path(&self) -> Option<PathBuf> {
        (!self.google_app_credentials.is_empty())
            .then(|| PathBuf::from(&self.google_app_credentials))
    }

    /// The compositing steps this config asks for.
    pub fn composition(&self) -> Composition {
        Composition {
            dim: self.dim_image,
            watermark: (!self.watermark.is_empty()).then(|| self.watermark.clone()),
            rotate_counter_clockwise: self.rotate_counter_clockwise,
            caption: self
                .draw_description
                .then(|| (self.caption_position, self.font.clone())),
            qr_code: self.draw_qr_code.then_some((self.qr_position, self.resolution)),
        }
    }
}

// =============================================================================
// Partial updates
// =============================================================================

/// A sparse update: only the fields that are `Some` are applied.
///
/// Built from command-line flags or deserialized from a `PATCH /config`
/// body. Unknown fields are rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, clap::Args)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigPatch {
    /// Day offset into the archive (0 = today, 7 = a week ago)
    #[arg(long)]
    pub day: Option<Day>,
    /// Feed region, e.g. de-DE or ja-JP
    #[arg(long)]
    pub region: Option<Region>,
    /// Image resolution: 800x600, 1920x1080, 3840x2160 or SD/HD/UHD
    #[arg(long)]
    pub resolution: Option<Resolution>,
    /// Wallpaper mode: center, crop, fit, span, stretch, tile
    #[arg(long)]
    pub mode: Option<WallpaperMode>,
    /// Draw the description caption
    #[arg(long = "description", num_args = 0..=1, default_missing_value = "true")]
    pub draw_description: Option<bool>,
    /// Caption anchor: TopCenter or BottomCenter
    #[arg(long)]
    pub caption_position: Option<Position>,
    /// Caption font: embedded name or font file path
    #[arg(long)]
    pub font: Option<String>,
    /// Draw a QR code linking to the image's search page
    #[arg(long = "qrcode", num_args = 0..=1, default_missing_value = "true")]
    pub draw_qr_code: Option<bool>,
    /// QR code corner: TopLeft, TopRight, BottomLeft, BottomRight
    #[arg(long)]
    pub qr_position: Option<Position>,
    /// Watermark: embedded name, file path, or "" for none
    #[arg(long)]
    pub watermark: Option<String>,
    /// Rotate portrait watermarks counter-clockwise
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub rotate_counter_clockwise: Option<bool>,
    /// Dim the image by this percentage (0-100)
    #[arg(long)]
    pub dim_image: Option<Percent>,
    /// Only download the image, do not set it as wallpaper
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub download_only: Option<bool>,
    /// Directory the images are saved to
    #[arg(long)]
    pub download_directory: Option<PathBuf>,
    /// Google service-account credentials file
    #[arg(long)]
    pub google_app_credentials: Option<String>,
    /// goo labs furigana API app id
    #[arg(long)]
    pub furigana_api_app_id: Option<String>,
    /// Speak the description with Google Text-to-Speech
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub use_google_text2speech_service: Option<bool>,
    /// Translate non-English descriptions with Google Translate
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub use_google_translate_service: Option<bool>,
    /// Play the description audio once the wallpaper is set
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub auto_play_audio: Option<bool>,
    /// Port of the daemon's HTTP API
    #[arg(long)]
    pub api_port: Option<u16>,
}

/// Overwrite `slot` when the patch carries a different value.
fn assign<T: PartialEq + Clone>(slot: &mut T, value: &Option<T>) -> usize {
    match value {
        Some(value) if slot != value => {
            *slot = value.clone();
            1
        }
        _ => 0,
    }
}

impl ConfigPatch {
    /// Apply the provided fields and return how many actually changed.
    pub fn apply(&self, config: &mut AppConfig) -> usize {
        assign(&mut config.day, &self.day)
            + assign(&mut config.region, &self.region)
            + assign(&mut config.resolution, &self.resolution)
            + assign(&mut config.mode, &self.mode)
            + assign(&mut config.draw_description, &self.draw_description)
            + assign(&mut config.caption_position, &self.caption_position)
            + assign(&mut config.font, &self.font)
            + assign(&mut config.draw_qr_code, &self.draw_qr_code)
            + assign(&mut config.qr_position, &self.qr_position)
            + assign(&mut config.watermark, &self.watermark)
            + assign(&mut config.rotate_counter_clockwise, &self.rotate_counter_clockwise)
            + assign(&mut config.dim_image, &self.dim_image)
            + assign(&mut config.download_only, &self.download_only)
            + assign(&mut config.download_directory, &self.download_directory)
            + assign(&mut config.google_app_credentials, &self.google_app_credentials)
            + assign(&mut config.furigana_api_app_id, &self.furigana_api_app_id)
            + assign(
                &mut config.use_google_text2speech_service,
                &self.use_google_text2speech_service,
            )
            + assign(
                &mut config.use_google_translate_service,
                &self.use_google_translate_service,
            )
            + assign(&mut config.auto_play_audio, &self.auto_play_audio)
            + assign(&mut config.api_port, &self.api_port)
    }

    /// Apply to a copy of `config` and validate the result, leaving `config`
    /// untouched on error.
    pub fn applied_to(&self, config: &AppConfig) -> Result<(AppConfig, usize), ConfigError> {
        let mut updated = config.clone();
        let changed = self.apply(&mut updated);
        updated.validate()?;
        Ok((updated, changed))
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user files are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path` (or the default location) over the stock
/// defaults. A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => load_raw_config(&path)?,
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command. The download directory is left
/// commented out since its default depends on the home directory.
pub fn stock_config_toml() -> &'static str {
    r##"# bing-wall configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags override this file. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Which image
# ---------------------------------------------------------------------------
# Days back from today: 0 = today, 7 = a week ago.
day = 0

# Feed region. One of: pt-BR, en-CA, fr-CA, zh-CN, fr-FR, de-DE, en-IN,
# it-IT, ja-JP, en-NZ, en-ROW, es-ES, en-GB, en-US.
region = "de-DE"

# One of 800x600, 1920x1080, 3840x2160 (or SD, HD, UHD).
resolution = "1920x1080"

# ---------------------------------------------------------------------------
# Compositing
# ---------------------------------------------------------------------------
# Darken the image by this percentage (0-100).
dim_image = 0.0

# Embedded watermark name, path to an image file, or "" for none.
watermark = "frame.png"

# Portrait watermarks are turned on their side, clockwise unless set.
rotate_counter_clockwise = false

# Caption with title and copyright (plus translation for non-English regions).
draw_description = true
caption_position = "TopCenter"   # TopCenter or BottomCenter
# Embedded font name or path to a font file. DejaVu has no CJK glyphs; for
# ja-JP and zh-CN an installed CJK font is used when one is found.
font = "DejaVuSans.ttf"

# QR code linking to the image's search page.
draw_qr_code = true
qr_position = "TopRight"         # TopLeft, TopRight, BottomLeft, BottomRight

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
# How the desktop fits the image: center, crop, fit, span, stretch, tile.
mode = "fit"

# Save the image without changing the desktop.
download_only = false

# Where images are saved. Defaults to ~/Pictures/BingWallpapers.
# download_directory = "/home/me/Pictures/BingWallpapers"

# ---------------------------------------------------------------------------
# Enrichment
# ---------------------------------------------------------------------------
# Google service-account credentials file, needed for translation and speech.
google_app_credentials = ""
use_google_translate_service = false
use_google_text2speech_service = false

# Play the spoken description once the wallpaper is set.
auto_play_audio = false

# goo labs app id for furigana; without it a dictionary lookup is scraped.
furigana_api_app_id = ""

# ---------------------------------------------------------------------------
# Daemon
# ---------------------------------------------------------------------------
# Port of the HTTP API on 127.0.0.1.
api_port = 44244

# ---------------------------------------------------------------------------
# Upstream services
# ---------------------------------------------------------------------------
[upstream]
feed_url = "https://www.bing.com"
furigana_api_url = "https://labs.goo.ne.jp"
lookup_url = "https://jisho.org"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.day, Day::TODAY);
        assert_eq!(config.region, Region::GERMANY);
        assert_eq!(config.resolution, Resolution::HD);
        assert_eq!(config.mode, WallpaperMode::Fit);
        assert!(config.draw_description);
        assert!(config.draw_qr_code);
        assert_eq!(config.watermark, "frame.png");
        assert_eq!(config.api_port, 44244);
        assert!(config.download_directory.ends_with("Pictures/BingWallpapers"));
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
region = "ja-JP"
resolution = "UHD"
dim_image = 25

[upstream]
feed_url = "http://127.0.0.1:9000"
"##;
        let config: AppConfig = toml::from_str(toml).unwrap();
        // Overridden values
        assert_eq!(config.region, Region::JAPAN);
        assert_eq!(config.resolution, Resolution::UHD);
        assert_eq!(config.dim_image.value(), 25.0);
        assert_eq!(config.upstream.feed_url, "http://127.0.0.1:9000");
        // Defaults preserved
        assert_eq!(config.upstream.lookup_url, DEFAULT_LOOKUP_URL);
        assert_eq!(config.qr_position, Position::TopRight);
    }

    #[test]
    fn catalog_values_are_checked_while_parsing() {
        assert!(toml::from_str::<AppConfig>("day = 8").is_err());
        assert!(toml::from_str::<AppConfig>("region = \"xx-XX\"").is_err());
        assert!(toml::from_str::<AppConfig>("resolution = \"640x480\"").is_err());
        assert!(toml::from_str::<AppConfig>("dim_image = 101.0").is_err());
        assert!(toml::from_str::<AppConfig>("mode = \"zoom\"").is_err());
    }

    // =========================================================================
    // Derived settings
    // =========================================================================

    #[test]
    fn crawler_settings_follow_config() {
        let config = AppConfig {
            google_app_credentials: "/tmp/creds.json".into(),
            furigana_api_app_id: "app".into(),
            use_google_translate_service: true,
            ..AppConfig::default()
        };
        let settings = config.crawler_settings();
        assert_eq!(settings.credentials, Some(PathBuf::from("/tmp/creds.json")));
        assert_eq!(settings.furigana_api_key, "app");
        assert!(settings.use_translation);
        assert!(!settings.use_speech);
        assert_eq!(settings.feed_url, DEFAULT_FEED_URL);
    }

    #[test]
    fn empty_credentials_mean_none() {
        assert_eq!(AppConfig::default().crawler_settings().credentials, None);
    }

    #[test]
    fn composition_follows_toggles() {
        let config = AppConfig::default();
        let composition = config.composition();
        assert_eq!(composition.watermark.as_deref(), Some("frame.png"));
        assert_eq!(
            composition.caption,
            Some((Position::TopCenter, "DejaVuSans.ttf".to_string()))
        );
        assert_eq!(composition.qr_code, Some((Position::TopRight, Resolution::HD)));

        let bare = AppConfig {
            watermark: String::new(),
            draw_description: false,
            draw_qr_code: false,
            ..AppConfig::default()
        };
        assert!(bare.composition().is_empty());
    }

    // =========================================================================
    // Patches
    // =========================================================================

    #[test]
    fn patch_counts_only_changed_fields() {
        let mut config = AppConfig::default();
        let patch = ConfigPatch {
            region: Some(Region::GERMANY),
            day: Some(Day::try_from(2i64).unwrap()),
            download_only: Some(true),
            ..ConfigPatch::default()
        };
        assert_eq!(patch.apply(&mut config), 2);
        assert_eq!(config.day.value(), 2);
        assert!(config.download_only);
        // Re-applying is a no-op
        assert_eq!(patch.apply(&mut config), 0);
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut config = AppConfig::default();
        assert_eq!(ConfigPatch::default().apply(&mut config), 0);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn patch_from_json() {
        let body = r#"{"region": "ja-JP", "dim_image": 40, "draw_qr_code": false}"#;
        let patch: ConfigPatch = serde_json::from_str(body).unwrap();
        assert_eq!(patch.region, Some(Region::JAPAN));
        assert_eq!(patch.dim_image.map(Percent::value), Some(40.0));
        assert_eq!(patch.draw_qr_code, Some(false));
        assert_eq!(patch.day, None);
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        assert!(serde_json::from_str::<ConfigPatch>(r#"{"colour": "red"}"#).is_err());
        assert!(serde_json::from_str::<ConfigPatch>(r#"{"upstream": {}}"#).is_err());
    }

    #[test]
    fn invalid_patch_leaves_config_untouched() {
        let config = AppConfig::default();
        let patch = ConfigPatch {
            qr_position: Some(Position::Center),
            ..ConfigPatch::default()
        };
        assert!(matches!(patch.applied_to(&config), Err(ConfigError::Validation(_))));
        assert_eq!(config.qr_position, Position::TopRight);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn validate_unknown_font() {
        let config = AppConfig {
            font: "Comic.ttf".into(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DejaVuSans.ttf"));
    }

    #[test]
    fn validate_font_file_path() {
        let tmp = TempDir::new().unwrap();
        let custom = tmp.path().join("NotoSansCJK-Regular.ttc");
        fs::write(&custom, b"ttc").unwrap();

        let mut config = AppConfig {
            font: custom.to_string_lossy().into_owned(),
            ..AppConfig::default()
        };
        config.validate().unwrap();

        config.font = tmp.path().join("missing.ttf").to_string_lossy().into_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_watermark_file_or_empty() {
        let tmp = TempDir::new().unwrap();
        let custom = tmp.path().join("mark.png");
        fs::write(&custom, b"png").unwrap();

        let mut config = AppConfig {
            watermark: custom.to_string_lossy().into_owned(),
            ..AppConfig::default()
        };
        config.validate().unwrap();

        config.watermark = String::new();
        config.validate().unwrap();

        config.watermark = tmp.path().join("missing.png").to_string_lossy().into_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_anchors() {
        let caption = AppConfig {
            caption_position: Position::TopLeft,
            ..AppConfig::default()
        };
        assert!(caption.validate().is_err());

        let qr = AppConfig {
            qr_position: Position::BottomCenter,
            ..AppConfig::default()
        };
        assert!(qr.validate().is_err());
    }

    #[test]
    fn validate_port_and_urls() {
        let port = AppConfig {
            api_port: 0,
            ..AppConfig::default()
        };
        assert!(port.validate().is_err());

        let mut url = AppConfig::default();
        url.upstream.lookup_url = "not a url".into();
        let err = url.validate().unwrap_err();
        assert!(err.to_string().contains("upstream.lookup_url"));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("day = 0\nregion = \"de-DE\"").unwrap();
        let overlay: toml::Value = toml::from_str("day = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["day"].as_integer(), Some(3));
        assert_eq!(merged["region"].as_str(), Some("de-DE"));
    }

    #[test]
    fn merge_toml_nested_table() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value =
            toml::from_str("[upstream]\nfeed_url = \"http://localhost\"").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["upstream"]["feed_url"].as_str(), Some("http://localhost"));
        assert_eq!(merged["upstream"]["lookup_url"].as_str(), Some(DEFAULT_LOOKUP_URL));
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_config_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(Some(&tmp.path().join("config.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "region = \"en-US\"\nmode = \"span\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.region, Region::UNITED_STATES);
        assert_eq!(config.mode, WallpaperMode::Span);
        assert_eq!(config.resolution, Resolution::HD);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "region = [").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "regoin = \"en-US\"").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "caption_position = \"Center\"").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert!(load_raw_config(&tmp.path().join("nope.toml")).unwrap().is_none());
    }

    #[test]
    fn resolve_config_with_no_overlay() {
        let config = resolve_config(stock_defaults_value().unwrap(), None).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let _: toml::Value = toml::from_str(stock_config_toml()).unwrap();
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: AppConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn stock_defaults_value_is_table() {
        let value = stock_defaults_value().unwrap();
        assert!(value.is_table());
        assert!(value.get("upstream").is_some_and(toml::Value::is_table));
    }
}
