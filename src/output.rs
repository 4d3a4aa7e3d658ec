//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Run
//!
//! ```text
//! Today · ja-JP · 1366x768
//!     今日[きょう]はダーウィンの日[ひ], ガラパゴスゾウガメ, ...
//!     Search: https://www.bing.com/search?q=...
//!     Saved: /home/me/Pictures/BingWallpapers/OHR.DarwinDay_JA-JP3856451231_1366x768.png
//!     Audio: MP3 @ 24000 Hz
//!     Desktop: fit
//! ```
//!
//! A run that stopped early ends with a `Failed:` line instead of `Desktop:`.
//!
//! ## Assets
//!
//! ```text
//! Fonts
//!     DejaVuSans.ttf
//! Watermarks
//!     frame.png
//! ```
//!
//! Each listing has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::assets;
use crate::config::AppConfig;
use crate::pipeline::PipelineRun;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

pub fn format_run_summary(run: &PipelineRun, config: &AppConfig) -> Vec<String> {
    let wallpaper = &run.wallpaper;
    let mut lines = vec![format!(
        "{} · {} · {}x{}",
        config.day.label(),
        config.region,
        wallpaper.raster.width(),
        wallpaper.raster.height()
    )];

    for line in wallpaper.description.lines() {
        lines.push(format!("{}{}", indent(1), line));
    }
    if !wallpaper.search_url.is_empty() {
        lines.push(format!("{}Search: {}", indent(1), wallpaper.search_url));
    }
    if let Some(path) = &wallpaper.local_path {
        lines.push(format!("{}Saved: {}", indent(1), path.display()));
    }
    if let Some(audio) = &wallpaper.audio {
        lines.push(format!("{}Audio: {} @ {} Hz", indent(1), audio.codec, audio.sample_rate));
    }

    match &run.failure {
        Some(failure) => lines.push(format!("{}Failed: {}", indent(1), failure)),
        None if config.download_only => {
            lines.push(format!("{}Desktop: unchanged (download only)", indent(1)))
        }
        None => lines.push(format!("{}Desktop: {}", indent(1), config.mode)),
    }
    lines
}

pub fn print_run_summary(run: &PipelineRun, config: &AppConfig) {
    for line in format_run_summary(run, config) {
        println!("{}", line);
    }
}

pub fn format_assets() -> Vec<String> {
    let mut lines = vec!["Fonts".to_string()];
    lines.extend(assets::font_names().into_iter().map(|name| format!("{}{}", indent(1), name)));
    lines.push("Watermarks".to_string());
    lines.extend(
        assets::watermark_names()
            .into_iter()
            .map(|name| format!("{}{}", indent(1), name)),
    );
    lines
}

pub fn print_assets() {
    for line in format_assets() {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Audio;
    use crate::catalog::WallpaperMode;
    use crate::pipeline::PipelineError;
    use crate::test_helpers::sample_wallpaper;
    use std::path::PathBuf;

    fn run() -> PipelineRun {
        let mut wallpaper = sample_wallpaper();
        wallpaper.description = "Riesenschildkröte\nGiant tortoise".into();
        wallpaper.local_path = Some(PathBuf::from("/tmp/walls/OHR.DarwinDay.png"));
        PipelineRun {
            wallpaper,
            failure: None,
        }
    }

    #[test]
    fn run_summary_lists_everything() {
        let config = AppConfig {
            mode: WallpaperMode::Span,
            ..AppConfig::default()
        };
        let lines = format_run_summary(&run(), &config);
        assert_eq!(
            lines,
            vec![
                "Today · de-DE · 64x36",
                "    Riesenschildkröte",
                "    Giant tortoise",
                "    Search: https://www.bing.com/search?q=Gal%C3%A1pagos",
                "    Saved: /tmp/walls/OHR.DarwinDay.png",
                "    Desktop: span",
            ]
        );
    }

    #[test]
    fn run_summary_shows_audio() {
        let mut run = run();
        run.wallpaper.audio = Some(Audio::new("MP3", 24000, vec![0]));
        let lines = format_run_summary(&run, &AppConfig::default());
        assert!(lines.contains(&"    Audio: MP3 @ 24000 Hz".to_string()));
    }

    #[test]
    fn run_summary_download_only() {
        let config = AppConfig {
            download_only: true,
            ..AppConfig::default()
        };
        let lines = format_run_summary(&run(), &config);
        assert_eq!(lines.last().unwrap(), "    Desktop: unchanged (download only)");
    }

    #[test]
    fn run_summary_reports_failure() {
        let mut run = run();
        run.wallpaper.local_path = None;
        run.failure = Some(PipelineError::Cancelled);
        let lines = format_run_summary(&run, &AppConfig::default());
        assert!(!lines.iter().any(|l| l.contains("Saved:")));
        assert_eq!(lines.last().unwrap(), "    Failed: cancelled");
    }

    #[test]
    fn assets_listing() {
        assert_eq!(
            format_assets(),
            vec!["Fonts", "    DejaVuSans.ttf", "Watermarks", "    frame.png"]
        );
    }
}
