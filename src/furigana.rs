//! Furigana annotation for Japanese captions.
//!
//! Runs of ideographs (kanji) get their reading appended in brackets:
//!
//! ```text
//! 今日はダーウィンの日  →  今日[きょう]はダーウィンの日[ひ]
//! ```
//!
//! Three annotators exist. They are tried in order and the first success wins:
//!
//! | Annotator | When | Source of readings |
//! |-----------|------|--------------------|
//! | [`Annotator::GooLabs`] | an API key is configured | `POST {api}/api/hiragana` |
//! | [`Annotator::Jisho`] | no API key | scraped `{lookup}/search/{text}` page |
//! | [`Annotator::Kakasi`] | always last | local dictionary conversion |
//!
//! ## Positional alignment
//!
//! The phonetic API answers with one bracketed reading per bracketed input
//! token. Readings are matched to tokens by position, not by content. If the
//! API segments differently the readings shift; if it returns fewer spans
//! than tokens the annotator fails with [`FuriganaError::Misaligned`] and the
//! chain moves on.
//!
//! All replacements of one annotation pass are applied in a single
//! leftmost-first sweep, so a short token (`日`) never rewrites text that a
//! longer token (`今日`) already claimed.

use crate::feed::CrawlerSettings;
use crate::fetch::{FetchClient, FetchError};
use aho_corasick::{AhoCorasick, MatchKind};
use scraper::{Html, Selector};
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum FuriganaError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("invalid phonetic API response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("phonetic API returned {spans} spans for {tokens} tokens")]
    Misaligned { tokens: usize, spans: usize },
    #[error("lookup page contained no furigana annotations")]
    NoAnnotations,
    #[error("invalid selector: {0}")]
    Selector(String),
    #[error("replacement table error: {0}")]
    Replacer(#[from] aho_corasick::BuildError),
    #[error("annotation cancelled")]
    Cancelled,
    #[error("all annotators failed: {0}")]
    Exhausted(String),
}

// =============================================================================
// Character classes
// =============================================================================

/// Unicode `Ideographic` property: CJK ideographs and their extensions.
pub fn is_ideographic(c: char) -> bool {
    matches!(c,
        '\u{3006}' | '\u{3007}'
        | '\u{3021}'..='\u{3029}'
        | '\u{3038}'..='\u{303A}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FA6D}'
        | '\u{FA70}'..='\u{FAD9}'
        | '\u{17000}'..='\u{187F7}'
        | '\u{18800}'..='\u{18CD5}'
        | '\u{1B170}'..='\u{1B2FB}'
        | '\u{20000}'..='\u{2A6DF}'
        | '\u{2A700}'..='\u{2EBE0}'
        | '\u{2F800}'..='\u{2FA1D}'
        | '\u{30000}'..='\u{323AF}'
    )
}

fn is_hiragana(c: char) -> bool {
    matches!(c, '\u{3041}'..='\u{3096}' | '\u{309D}'..='\u{309F}')
}

fn is_katakana(c: char) -> bool {
    matches!(c,
        '\u{30A1}'..='\u{30FA}'
        | '\u{30FD}'..='\u{30FF}'
        | '\u{31F0}'..='\u{31FF}'
        | '\u{32D0}'..='\u{32FE}'
        | '\u{3300}'..='\u{3357}'
        | '\u{FF66}'..='\u{FF6F}'
        | '\u{FF71}'..='\u{FF9D}'
    )
}

fn is_punctuation(c: char) -> bool {
    (c.is_ascii_punctuation() && !matches!(c, '$' | '+' | '<' | '=' | '>' | '^' | '`' | '|' | '~'))
        || matches!(c,
            '\u{2010}'..='\u{2027}'
            | '\u{2030}'..='\u{205E}'
            | '\u{3001}'..='\u{3003}'
            | '\u{3008}'..='\u{3011}'
            | '\u{3014}'..='\u{301F}'
            | '\u{303D}' | '\u{30A0}' | '\u{30FB}'
            | '\u{FF01}'..='\u{FF03}'
            | '\u{FF05}'..='\u{FF0A}'
            | '\u{FF0C}'..='\u{FF0F}'
            | '\u{FF1A}' | '\u{FF1B}' | '\u{FF1F}' | '\u{FF20}'
            | '\u{FF3B}'..='\u{FF3D}'
            | '\u{FF3F}' | '\u{FF5B}' | '\u{FF5D}'
            | '\u{FF5F}'..='\u{FF65}'
        )
}

/// Characters worth sending to the dictionary lookup.
fn is_japanese_symbol(c: char) -> bool {
    is_hiragana(c) || is_katakana(c) || is_ideographic(c) || is_punctuation(c)
}

// =============================================================================
// Tokens and replacement
// =============================================================================

/// Contiguous ideograph runs in order of appearance, duplicates kept.
pub fn ideograph_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if is_ideographic(c) {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Tokens as the phonetic API expects them: `[今日][日]`.
pub fn bracket_tokens(tokens: &[String]) -> String {
    tokens.iter().map(|t| format!("[{t}]")).collect()
}

/// Split after each `sep`, producing at most `n` pieces; the last piece holds
/// the unsplit remainder (possibly empty).
fn split_after_n(s: &str, sep: char, n: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    if n == 0 {
        return parts;
    }
    let mut rest = s;
    while parts.len() + 1 < n {
        match rest.find(sep) {
            Some(i) => {
                let end = i + sep.len_utf8();
                parts.push(&rest[..end]);
                rest = &rest[end..];
            }
            None => break,
        }
    }
    parts.push(rest);
    parts
}

/// Apply all `(from, to)` pairs in one leftmost-first pass.
///
/// At a given position the earliest pair in the list wins, and replaced text is
/// never revisited.
pub fn replace_all(text: &str, pairs: &[(String, String)]) -> Result<String, FuriganaError> {
    if pairs.is_empty() {
        return Ok(text.to_string());
    }
    let matcher = AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostFirst)
        .build(pairs.iter().map(|(from, _)| from.as_str()))?;
    let replacements: Vec<&str> = pairs.iter().map(|(_, to)| to.as_str()).collect();
    Ok(matcher.replace_all(text, &replacements))
}

// =============================================================================
// Annotators
// =============================================================================

#[derive(Deserialize)]
struct HiraganaResponse {
    #[serde(default)]
    converted: String,
}

/// One strategy in the fallback chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotator {
    GooLabs { api_url: String, app_id: String },
    Jisho { lookup_url: String },
    Kakasi,
}

/// The chain for the given settings: the remote API when a key is set,
/// otherwise the dictionary site, then the local converter.
pub fn annotator_chain(settings: &CrawlerSettings) -> Vec<Annotator> {
    let remote = if settings.furigana_api_key.is_empty() {
        Annotator::Jisho {
            lookup_url: settings.lookup_url.clone(),
        }
    } else {
        Annotator::GooLabs {
            api_url: settings.furigana_api_url.clone(),
            app_id: settings.furigana_api_key.clone(),
        }
    };
    vec![remote, Annotator::Kakasi]
}

impl Annotator {
    pub fn name(&self) -> &'static str {
        match self {
            Annotator::GooLabs { .. } => "goo-labs",
            Annotator::Jisho { .. } => "jisho",
            Annotator::Kakasi => "kakasi",
        }
    }

    pub async fn annotate(
        &self,
        client: &FetchClient,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, FuriganaError> {
        match self {
            Annotator::GooLabs { api_url, app_id } => {
                annotate_by_api(client, api_url, app_id, text, cancel).await
            }
            Annotator::Jisho { lookup_url } => {
                annotate_by_lookup(client, lookup_url, text, cancel).await
            }
            Annotator::Kakasi => annotate_locally(text),
        }
    }
}

async fn annotate_by_api(
    client: &FetchClient,
    api_url: &str,
    app_id: &str,
    text: &str,
    cancel: &CancellationToken,
) -> Result<String, FuriganaError> {
    let tokens = ideograph_tokens(text);
    if tokens.is_empty() {
        return Ok(text.to_string());
    }

    let sentence = bracket_tokens(&tokens);
    let url = format!("{}/api/hiragana", api_url.trim_end_matches('/'));
    let raw = client
        .post_form(
            &url,
            &[
                ("app_id", app_id),
                ("sentence", &sentence),
                ("output_type", "hiragana"),
            ],
            cancel,
        )
        .await?;

    let response: HiraganaResponse = serde_json::from_slice(&raw)?;
    let converted = response.converted.replace(' ', "");
    let spans = split_after_n(&converted, ']', tokens.len());
    if spans.len() < tokens.len() {
        return Err(FuriganaError::Misaligned {
            tokens: tokens.len(),
            spans: spans.len(),
        });
    }

    let pairs: Vec<(String, String)> = tokens
        .iter()
        .zip(spans)
        .map(|(token, span)| (token.clone(), format!("{token}{span}")))
        .collect();
    replace_all(text, &pairs)
}

async fn annotate_by_lookup(
    client: &FetchClient,
    lookup_url: &str,
    text: &str,
    cancel: &CancellationToken,
) -> Result<String, FuriganaError> {
    let symbols: String = text.chars().filter(|c| is_japanese_symbol(*c)).collect();
    debug!(%symbols, "requesting furigana lookup");

    let url = format!(
        "{}/search/{}",
        lookup_url.trim_end_matches('/'),
        urlencoding::encode(&symbols)
    );
    let page = client.get(&url, cancel).await?;
    let pairs = scrape_furigana(&String::from_utf8_lossy(&page))?;
    debug!(count = pairs.len(), "furigana annotations found");

    if pairs.is_empty() {
        return Err(FuriganaError::NoAnnotations);
    }
    replace_all(text, &pairs)
}

/// Pull `data-text` → `data-text[reading]` pairs out of a lookup page.
fn scrape_furigana(html: &str) -> Result<Vec<(String, String)>, FuriganaError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("#zen_bar .japanese_word__furigana")
        .map_err(|e| FuriganaError::Selector(format!("{e:?}")))?;

    let pairs = document
        .select(&selector)
        .filter_map(|span| {
            let original = span.value().attr("data-text")?.trim();
            if original.is_empty() {
                return None;
            }
            let reading: String = span.text().collect::<String>().trim().to_string();
            Some((original.to_string(), format!("{original}[{reading}]")))
        })
        .collect();
    Ok(pairs)
}

fn annotate_locally(text: &str) -> Result<String, FuriganaError> {
    let mut tokens = ideograph_tokens(text);
    tokens.dedup();
    let pairs: Vec<(String, String)> = tokens
        .into_iter()
        .filter_map(|token| {
            let reading = kakasi::convert(&token).hiragana;
            (!reading.is_empty() && reading != token)
                .then(|| (token.clone(), format!("{token}[{reading}]")))
        })
        .collect();
    replace_all(text, &pairs)
}

/// Run the chain; the first annotator to succeed wins.
pub async fn annotate(
    chain: &[Annotator],
    client: &FetchClient,
    text: &str,
    cancel: &CancellationToken,
) -> Result<String, FuriganaError> {
    let mut failures = Vec::new();
    for annotator in chain {
        if cancel.is_cancelled() {
            return Err(FuriganaError::Cancelled);
        }
        match annotator.annotate(client, text, cancel).await {
            Ok(annotated) => {
                debug!(annotator = annotator.name(), "caption annotated");
                return Ok(annotated);
            }
            Err(e) => {
                warn!(
                    annotator = annotator.name(),
                    error = %e,
                    "furigana annotator failed, trying next"
                );
                failures.push(format!("{}: {e}", annotator.name()));
            }
        }
    }
    Err(FuriganaError::Exhausted(failures.join("; ")))
}
