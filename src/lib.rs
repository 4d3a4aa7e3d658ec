//! # bing-wall
//!
//! Fetches the Bing image of the day for a region, decorates it (dim,
//! watermark, caption, QR code), saves it, and makes it the desktop
//! wallpaper. It runs once from the command line or stays up as a daemon
//! with a small HTTP API.
//!
//! # Architecture: One Linear Pipeline
//!
//! ```text
//! 1. Resolve   feed JSON → image URL → decoded raster + description (+ audio)
//! 2. Compose   dim → watermark → caption → QR code
//! 3. Persist   <id>.png (+ <id>.mp3) in the download directory
//! 4. Apply     desktop wallpaper, then optional audio playback
//! ```
//!
//! Only step 1 is allowed to fail without a result. Past it, the caller always
//! gets the wallpaper back as far as it was processed, plus the error that
//! stopped the run.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`catalog`] | Fixed vocabularies: resolutions, regions, days, percent, positions, modes |
//! | [`fetch`] | HTTP client with randomized-backoff retries and User-Agent rotation |
//! | [`feed`] | Feed resolution: archive query, URL rewriting, download, enrichment |
//! | [`furigana`] | Reading annotations for Japanese captions, three annotators in a chain |
//! | [`cloud`] | Translation and speech traits, Google Cloud implementation |
//! | [`audio`] | Audio clips and the player trait |
//! | [`imaging`] | Decoding and compositing on RGBA rasters |
//! | [`naming`] | Output file names derived from the download URL |
//! | [`persist`] | Writing the PNG and audio clip |
//! | [`wallpaper`] | Desktop wallpaper setter trait and implementation |
//! | [`pipeline`] | One end-to-end run over a set of [`pipeline::Services`] |
//! | [`daemon`] | Axum API around a refresh controller |
//! | [`config`] | Layered `config.toml` loading, validation, partial updates |
//! | [`assets`] | Embedded fonts and watermarks |
//! | [`types`] | The [`types::Wallpaper`] value passed between stages |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Capabilities Behind Traits
//!
//! Everything that touches the outside world besides plain HTTP (translation,
//! speech, the desktop, audio output) sits behind a small trait. The pipeline
//! takes a [`pipeline::Services`] bundle of trait objects, so tests swap in
//! recording fakes and the real implementations stay out of the core logic.
//!
//! ## Settings Are Values
//!
//! Upstream hosts, the furigana key and the enrichment switches travel as a
//! [`feed::CrawlerSettings`] value built from the config for each run. Nothing
//! is global, so two runs with different settings never interfere and tests
//! point a run at a local mock server just by passing its URL.
//!
//! ## Failed Steps Leave the Raster Alone
//!
//! Every compositing step draws onto a copy and swaps it in only on success.
//! An unsupported anchor or a broken font therefore leaves the image exactly
//! as it was.
//!
//! ## Enrichment Never Fails a Run
//!
//! Translation, furigana and speech are best effort. Their errors are logged
//! with `warn!` and the run continues with the plain description.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resizing and compositing use the `image` crate, glyphs come from
//! `fontdue`, QR modules from `qrcode`. No ImageMagick, no system libraries.

pub mod assets;
pub mod audio;
pub mod catalog;
pub mod cloud;
pub mod config;
pub mod daemon;
pub mod feed;
pub mod fetch;
pub mod furigana;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod persist;
pub mod pipeline;
pub mod types;
pub mod wallpaper;

#[cfg(test)]
pub(crate) mod test_helpers;
