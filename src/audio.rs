//! Synthesized caption audio and its playback.
//!
//! [`Audio`] keeps the encoded clip resident, so it can be dumped to disk and
//! played any number of times. Playback goes through the [`AudioPlayer`]
//! trait; [`CommandPlayer`] hands a temporary copy of the clip to the first
//! command-line player found on `PATH`.

use bytes::Bytes;
use std::io::Cursor;
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no audio player available on {0}")]
    Unsupported(String),
    #[error("{player} exited with {status}")]
    PlayerFailed { player: String, status: String },
}

/// An encoded audio clip.
#[derive(Clone, PartialEq)]
pub struct Audio {
    /// Encoding name as reported by the synthesizer, e.g. `MP3`.
    pub codec: String,
    pub sample_rate: u32,
    pub data: Bytes,
}

impl std::fmt::Debug for Audio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Audio")
            .field("codec", &self.codec)
            .field("sample_rate", &self.sample_rate)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Audio {
    pub fn new(codec: impl Into<String>, sample_rate: u32, data: impl Into<Bytes>) -> Self {
        Self {
            codec: codec.into(),
            sample_rate,
            data: data.into(),
        }
    }

    /// A fresh reader positioned at the start of the clip.
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.data.clone())
    }

    /// File extension for the clip: the codec name lowercased.
    pub fn extension(&self) -> String {
        self.codec.to_lowercase()
    }

    /// Write the clip to `path`, replacing any existing file.
    pub fn dump(&self, path: &Path) -> Result<(), AudioError> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}

/// Something that can play an [`Audio`] clip to completion.
pub trait AudioPlayer: Send + Sync {
    fn play(&self, audio: &Audio) -> Result<(), AudioError>;
}

/// Candidate players in order of preference, with their quiet-mode flags.
const PLAYERS: &[(&str, &[&str])] = &[
    ("mpg123", &["-q"]),
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
    ("afplay", &[]),
    ("paplay", &[]),
];

/// Plays clips through an external command-line player.
#[derive(Debug, Clone, Default)]
pub struct CommandPlayer;

impl CommandPlayer {
    /// First player from the candidate list that can be spawned.
    fn find_player() -> Option<(&'static str, &'static [&'static str])> {
        PLAYERS.iter().copied().find(|(name, _)| is_on_path(name))
    }
}

fn is_on_path(program: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| {
        let candidate = dir.join(program);
        candidate.is_file() || candidate.with_extension("exe").is_file()
    })
}

impl AudioPlayer for CommandPlayer {
    fn play(&self, audio: &Audio) -> Result<(), AudioError> {
        let Some((player, args)) = Self::find_player() else {
            return Err(AudioError::Unsupported(format!(
                "{}-{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            )));
        };

        let dir = tempfile::tempdir()?;
        let clip = dir.path().join(format!("caption.{}", audio.extension()));
        audio.dump(&clip)?;

        debug!(player, clip = %clip.display(), "playing caption audio");
        let status = Command::new(player)
            .args(args)
            .arg(&clip)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(AudioError::PlayerFailed {
                player: player.to_string(),
                status: status.to_string(),
            })
        }
    }
}
