//! Output file naming derived from the download URL.
//!
//! The image host identifies each photo by the `id` query parameter of its
//! download URL, e.g.
//! `/th?id=OHR.DarwinDay_EN-US1234_1920x1080.jpg&pid=hp`. Saved files keep
//! that name with the extension swapped:
//!
//! - `OHR.DarwinDay_EN-US1234_1920x1080.jpg` → `OHR.DarwinDay_EN-US1234_1920x1080.png`
//! - the companion audio clip → `OHR.DarwinDay_EN-US1234_1920x1080.mp3`
//!
//! Only the last path component of `id` is used, so a crafted id such as
//! `../x.jpg` still lands inside the download directory.

use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum NamingError {
    #[error("invalid download URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("missing file name in URL: {0}")]
    MissingId(String),
}

/// Names of the files written for one wallpaper.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputNames {
    /// `id` with its extension removed.
    pub stem: String,
    /// `{stem}.png`
    pub image: String,
}

impl OutputNames {
    /// Audio file name for the given codec, lowercased: `{stem}.mp3`.
    pub fn audio(&self, codec: &str) -> String {
        format!("{}.{}", self.stem, codec.to_lowercase())
    }
}

/// Derive the output names from a download URL's `id` parameter.
pub fn output_names(download_url: &str) -> Result<OutputNames, NamingError> {
    let parsed = Url::parse(download_url).map_err(|source| NamingError::InvalidUrl {
        url: download_url.to_string(),
        source,
    })?;
    let id = parsed
        .query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| file_component(&value).to_string())
        .filter(|name| !name.is_empty() && name != "." && name != "..")
        .ok_or_else(|| NamingError::MissingId(download_url.to_string()))?;

    let stem = strip_extension(&id).to_string();
    Ok(OutputNames {
        image: format!("{stem}.png"),
        stem,
    })
}

/// Text after the last `/` or `\\`.
fn file_component(id: &str) -> &str {
    id.rsplit(['/', '\\']).next().unwrap_or_default()
}

/// Remove the last `.ext` of a name; dots inside the name are kept.
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}
