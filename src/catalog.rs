//! Fixed catalogs of the values a wallpaper request is built from.
//!
//! Every type here is a small `Copy` value with a canonical string form that
//! round-trips through [`FromStr`] and serde, so the same spelling works on the
//! command line, in `config.toml`, and in the daemon's JSON API.
//!
//! | Type | String form | Catalog |
//! |------|-------------|---------|
//! | [`Resolution`] | `1920x1080` or alias `HD` | SD, HD, UHD |
//! | [`Region`] | `ja-JP` | Bing markets, plus `en-ROW` for everything else |
//! | [`Day`] | `0`..`7` | today back to seven days ago |
//! | [`Percent`] | `0.0`..`100.0` | dimming strength |
//! | [`Position`] | `TopCenter` | nine anchors; each drawing step accepts a subset |
//! | [`WallpaperMode`] | `fit` | how the desktop scales the image |
//!
//! Validation happens here, at parse/deserialize time. Once a value exists it is
//! known to be in its catalog (except [`Resolution`], whose fields are public so
//! callers can describe a size the QR lookup does not know about).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("unsupported resolution: {0}, expected any of: {1}")]
    Resolution(String, String),
    #[error("unsupported region: {0}, expected any of: {1}")]
    Region(String, String),
    #[error("invalid day: {0}, allowed values are 0 to 7")]
    Day(i64),
    #[error("percent value must be between 0.0 and 100.0, got {0}")]
    Percent(f32),
    #[error("unsupported position: {0}")]
    Position(String),
    #[error(
        "unsupported wallpaper mode: {0}, expected any of: center, crop, fit, span, stretch, tile"
    )]
    Mode(String),
}

// =============================================================================
// Resolution
// =============================================================================

/// A wallpaper size from the fixed catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
    pub alias: &'static str,
}

impl Resolution {
    pub const SD: Resolution = Resolution {
        width: 1366,
        height: 768,
        alias: "SD",
    };
    pub const HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
        alias: "HD",
    };
    pub const UHD: Resolution = Resolution {
        width: 3840,
        height: 2160,
        alias: "UHD",
    };

    pub const ALL: [Resolution; 3] = [Self::SD, Self::HD, Self::UHD];

    /// The token Bing embeds in image file names.
    ///
    /// Standard sizes are spelled `WxH`; the top tier is only served under its
    /// alias (`_UHD`), never as `_3840x2160`.
    pub fn bing_format(&self) -> String {
        if *self == Self::UHD {
            self.alias.to_string()
        } else {
            self.to_string()
        }
    }

    /// QR code edge length in pixels for this tier, `None` outside the catalog.
    pub fn qr_code_size(&self) -> Option<u32> {
        match *self {
            Self::SD => Some(128),
            Self::HD => Some(164),
            Self::UHD => Some(192),
            _ => None,
        }
    }

    fn catalog_listing() -> String {
        Self::ALL
            .iter()
            .map(|r| format!("{r} ({})", r.alias))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = CatalogError;

    /// Accepts either the `WxH` form or the alias (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.to_string() == s || r.alias.eq_ignore_ascii_case(s))
            .ok_or_else(|| CatalogError::Resolution(s.to_string(), Self::catalog_listing()))
    }
}

// Deserialized through `TryFrom<String>` by hand: the derive treats the
// `&'static str` field as borrowed and would require `'de: 'static`.
impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Resolution::try_from(value).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<String> for Resolution {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

// =============================================================================
// Region
// =============================================================================

/// A Bing market, `language-country`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Region {
    pub language: &'static str,
    pub country: &'static str,
}

const fn region(language: &'static str, country: &'static str) -> Region {
    Region { language, country }
}

impl Region {
    pub const BRAZIL: Region = region("pt", "BR");
    pub const CANADA_ENGLISH: Region = region("en", "CA");
    pub const CANADA_FRENCH: Region = region("fr", "CA");
    pub const CHINA: Region = region("zh", "CN");
    pub const FRANCE: Region = region("fr", "FR");
    pub const GERMANY: Region = region("de", "DE");
    pub const INDIA: Region = region("en", "IN");
    pub const ITALY: Region = region("it", "IT");
    pub const JAPAN: Region = region("ja", "JP");
    pub const NEW_ZEALAND: Region = region("en", "NZ");
    /// Bing's "rest of world" market.
    pub const OTHER: Region = region("en", "ROW");
    pub const SPAIN: Region = region("es", "ES");
    pub const UNITED_KINGDOM: Region = region("en", "GB");
    pub const UNITED_STATES: Region = region("en", "US");

    pub const ALL: [Region; 14] = [
        Self::BRAZIL,
        Self::CANADA_ENGLISH,
        Self::CANADA_FRENCH,
        Self::CHINA,
        Self::FRANCE,
        Self::GERMANY,
        Self::INDIA,
        Self::ITALY,
        Self::JAPAN,
        Self::NEW_ZEALAND,
        Self::OTHER,
        Self::SPAIN,
        Self::UNITED_KINGDOM,
        Self::UNITED_STATES,
    ];

    /// Language captions are translated into for non-English markets.
    pub const TRANSLATION_TARGET: Region = Self::UNITED_STATES;

    pub fn is_english(&self) -> bool {
        self.language == "en"
    }

    /// Markets whose captions get furigana annotation.
    pub fn uses_furigana(&self) -> bool {
        *self == Self::JAPAN
    }

    /// Language code to request speech in.
    ///
    /// Some markets have no voice of their own and borrow the closest one.
    pub fn speech_language(&self) -> String {
        let substitute = match *self {
            Self::BRAZIL => Some(region("pt", "PT")),
            Self::CANADA_ENGLISH => Some(Self::UNITED_STATES),
            Self::CANADA_FRENCH => Some(Self::FRANCE),
            Self::INDIA => Some(Self::UNITED_KINGDOM),
            Self::NEW_ZEALAND => Some(Self::UNITED_KINGDOM),
            Self::OTHER => Some(Self::UNITED_STATES),
            _ => None,
        };
        substitute.unwrap_or(*self).to_string()
    }

    pub fn display_name(&self) -> &'static str {
        match *self {
            Self::BRAZIL => "Brazil Portuguese",
            Self::CANADA_ENGLISH => "Canada English",
            Self::CANADA_FRENCH => "Canada French",
            Self::CHINA => "China",
            Self::FRANCE => "France",
            Self::GERMANY => "Germany",
            Self::INDIA => "India",
            Self::ITALY => "Italy",
            Self::JAPAN => "Japan",
            Self::NEW_ZEALAND => "New Zealand",
            Self::OTHER => "Other",
            Self::SPAIN => "Spain",
            Self::UNITED_KINGDOM => "United Kingdom",
            Self::UNITED_STATES => "United States",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.language, self.country)
    }
}

impl FromStr for Region {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.to_string() == s)
            .ok_or_else(|| {
                let listing = Self::ALL
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                CatalogError::Region(s.to_string(), listing)
            })
    }
}

// Deserialized through `TryFrom<String>` by hand: the derive treats the
// `&'static str` field as borrowed and would require `'de: 'static`.
impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Region::try_from(value).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<String> for Region {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Region> for String {
    fn from(value: Region) -> Self {
        value.to_string()
    }
}

// =============================================================================
// Day
// =============================================================================

/// Offset into the feed archive: 0 is today, 7 is seven days ago.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Day(u8);

impl Day {
    pub const TODAY: Day = Day(0);
    pub const MAX: u8 = 7;

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "Today",
            1 => "Yesterday",
            2 => "The day before yesterday",
            3 => "Three days ago",
            4 => "Four days ago",
            5 => "Five days ago",
            6 => "Six days ago",
            _ => "Seven days ago",
        }
    }
}

impl TryFrom<i64> for Day {
    type Error = CatalogError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (0..=i64::from(Self::MAX)).contains(&value) {
            Ok(Day(value as u8))
        } else {
            Err(CatalogError::Day(value))
        }
    }
}

impl From<Day> for i64 {
    fn from(value: Day) -> Self {
        i64::from(value.0)
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Day {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Unparseable input is reported with the out-of-range sentinel.
        let value = s.parse::<i64>().map_err(|_| CatalogError::Day(-1))?;
        Day::try_from(value)
    }
}

// =============================================================================
// Percent
// =============================================================================

/// A percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Percent(f32);

impl Percent {
    pub const ZERO: Percent = Percent(0.0);

    pub fn new(value: f32) -> Result<Self, CatalogError> {
        if (0.0..=100.0).contains(&value) {
            Ok(Percent(value))
        } else {
            Err(CatalogError::Percent(value))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Fraction of the original brightness kept after dimming by this amount.
    pub fn remaining_fraction(self) -> f32 {
        1.0 - self.0 / 100.0
    }
}

impl TryFrom<f32> for Percent {
    type Error = CatalogError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Percent::new(value)
    }
}

impl From<Percent> for f32 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Percent {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<f32>().map_err(|_| CatalogError::Percent(f32::NAN))?;
        Percent::new(value)
    }
}

// =============================================================================
// Position
// =============================================================================

/// Anchor for an overlay drawn onto the wallpaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    TopCenter,
    BottomCenter,
    CenterLeft,
    CenterRight,
    Center,
}

impl Position {
    pub const ALL: [Position; 9] = [
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
        Position::TopCenter,
        Position::BottomCenter,
        Position::CenterLeft,
        Position::CenterRight,
        Position::Center,
    ];

    pub const CORNERS: [Position; 4] = [
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
    ];

    pub const CAPTION_ANCHORS: [Position; 2] = [Position::TopCenter, Position::BottomCenter];

    pub fn name(self) -> &'static str {
        match self {
            Position::TopLeft => "TopLeft",
            Position::TopRight => "TopRight",
            Position::BottomLeft => "BottomLeft",
            Position::BottomRight => "BottomRight",
            Position::TopCenter => "TopCenter",
            Position::BottomCenter => "BottomCenter",
            Position::CenterLeft => "CenterLeft",
            Position::CenterRight => "CenterRight",
            Position::Center => "Center",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Position {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CatalogError::Position(s.to_string()))
    }
}

/// Render a list of positions as `A, B, C` for error messages.
pub fn position_list(positions: &[Position]) -> String {
    positions
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// WallpaperMode
// =============================================================================

/// How the desktop fits the image to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperMode {
    Center,
    Crop,
    #[default]
    Fit,
    Span,
    Stretch,
    Tile,
}

impl WallpaperMode {
    pub const ALL: [WallpaperMode; 6] = [
        WallpaperMode::Center,
        WallpaperMode::Crop,
        WallpaperMode::Fit,
        WallpaperMode::Span,
        WallpaperMode::Stretch,
        WallpaperMode::Tile,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WallpaperMode::Center => "center",
            WallpaperMode::Crop => "crop",
            WallpaperMode::Fit => "fit",
            WallpaperMode::Span => "span",
            WallpaperMode::Stretch => "stretch",
            WallpaperMode::Tile => "tile",
        }
    }
}

impl fmt::Display for WallpaperMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WallpaperMode {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CatalogError::Mode(s.to_string()))
    }
}
