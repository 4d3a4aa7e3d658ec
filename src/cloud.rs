//! Translation and speech synthesis capabilities.
//!
//! The feed resolver only sees the [`Translator`] and [`SpeechSynthesizer`]
//! traits. [`GoogleCloud`] implements both against the Google Cloud REST
//! APIs, authenticated with a service-account credentials file:
//!
//! 1. Sign an RS256 JWT for the `cloud-platform` scope with the account's key.
//! 2. Exchange it at the account's token URI for a bearer token (cached until
//!    shortly before it expires).
//! 3. Call Translation v3 `translateText`, or Text-to-Speech v1 `voices` +
//!    `text:synthesize`.
//!
//! Speech picks the first female voice for the language (else the first
//! voice) and asks for MP3 at the voice's natural sample rate.

use crate::audio::Audio;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::future::BoxFuture;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

const SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const REQUESTOR_LABEL: &str = "bing-wall";
/// Tokens are refreshed this long before they expire.
const TOKEN_SLACK: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot sign token request: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} answered {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("no translations found")]
    NoTranslations,
    #[error("no voices found for {0}")]
    NoVoices(String),
    #[error("invalid audio payload: {0}")]
    Audio(#[from] base64::DecodeError),
}

/// Translate text between language tags such as `de-DE` and `en-US`.
pub trait Translator: Send + Sync {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        source: &'a str,
        target: &'a str,
    ) -> BoxFuture<'a, Result<String, CloudError>>;
}

/// Turn text into spoken audio in the given language.
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize<'a>(
        &'a self,
        text: &'a str,
        language: &'a str,
    ) -> BoxFuture<'a, Result<Audio, CloudError>>;
}

// =============================================================================
// Google Cloud
// =============================================================================

/// Base URLs of the REST services; overridable for tests.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudEndpoints {
    pub translate: String,
    pub text_to_speech: String,
    /// Replaces the credentials file's `token_uri` when set.
    pub token: Option<String>,
}

impl Default for CloudEndpoints {
    fn default() -> Self {
        Self {
            translate: "https://translation.googleapis.com".into(),
            text_to_speech: "https://texttospeech.googleapis.com".into(),
            token: None,
        }
    }
}

#[derive(Deserialize)]
struct ServiceAccount {
    client_email: String,
    private_key: String,
    project_id: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

#[derive(Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<Voice>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Voice {
    name: String,
    #[serde(default)]
    ssml_gender: String,
    #[serde(default)]
    natural_sample_rate_hertz: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Google Cloud Translation and Text-to-Speech client.
pub struct GoogleCloud {
    http: reqwest::Client,
    account: ServiceAccount,
    key: EncodingKey,
    endpoints: CloudEndpoints,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleCloud {
    /// Load a service-account credentials file.
    pub fn from_credentials_file(path: &Path) -> Result<Self, CloudError> {
        let contents = std::fs::read(path)?;
        Self::from_credentials_json(&contents)
    }

    pub fn from_credentials_json(contents: &[u8]) -> Result<Self, CloudError> {
        let account: ServiceAccount = serde_json::from_slice(contents)?;
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            account,
            key,
            endpoints: CloudEndpoints::default(),
            token: Mutex::new(None),
        })
    }

    pub fn with_endpoints(mut self, endpoints: CloudEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.account.project_id
    }

    fn token_uri(&self) -> &str {
        self.endpoints.token.as_deref().unwrap_or(&self.account.token_uri)
    }

    /// A bearer token, reusing the cached one while it is fresh.
    async fn access_token(&self) -> Result<String, CloudError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(token.value.clone());
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let claims = Claims {
            iss: &self.account.client_email,
            scope: SCOPE,
            aud: self.token_uri(),
            iat: now,
            exp: now + 3600,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)?;

        debug!(token_uri = self.token_uri(), "exchanging service account assertion");
        let response = self
            .http
            .post(self.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let token: TokenResponse = read_json(self.token_uri(), response).await?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_SLACK);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn translate_text(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, CloudError> {
        let token = self.access_token().await?;
        let parent = format!("projects/{}/locations/global", self.account.project_id);
        info!(location = %parent, source, target, "translating caption");

        let url = format!(
            "{}/v3/{parent}:translateText",
            self.endpoints.translate.trim_end_matches('/')
        );
        let body = json!({
            "contents": [text],
            "mimeType": "text/plain",
            "sourceLanguageCode": source,
            "targetLanguageCode": target,
            "labels": { "requestor": REQUESTOR_LABEL },
        });
        let response = self.http.post(&url).bearer_auth(&token).json(&body).send().await?;
        let parsed: TranslateResponse = read_json(&url, response).await?;

        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or(CloudError::NoTranslations)
    }

    async fn synthesize_speech(&self, text: &str, language: &str) -> Result<Audio, CloudError> {
        let token = self.access_token().await?;
        let base = self.endpoints.text_to_speech.trim_end_matches('/');

        let voices_url = format!("{base}/v1/voices");
        let response = self
            .http
            .get(&voices_url)
            .query(&[("languageCode", language)])
            .bearer_auth(&token)
            .send()
            .await?;
        let voices: VoicesResponse = read_json(&voices_url, response).await?;
        let voice = pick_voice(&voices.voices)
            .ok_or_else(|| CloudError::NoVoices(language.to_string()))?;
        info!(voice = %voice.name, language, "synthesizing caption audio");

        let synthesize_url = format!("{base}/v1/text:synthesize");
        let body = json!({
            "input": { "text": text },
            "voice": {
                "languageCode": language,
                "name": voice.name,
                "ssmlGender": voice.ssml_gender,
            },
            "audioConfig": {
                "audioEncoding": "MP3",
                "sampleRateHertz": voice.natural_sample_rate_hertz,
            },
        });
        let response = self
            .http
            .post(&synthesize_url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        let parsed: SynthesizeResponse = read_json(&synthesize_url, response).await?;
        let data = BASE64.decode(parsed.audio_content)?;

        Ok(Audio::new("MP3", voice.natural_sample_rate_hertz, data))
    }
}

/// The first female voice, else the first voice.
fn pick_voice(voices: &[Voice]) -> Option<&Voice> {
    voices
        .iter()
        .find(|v| v.ssml_gender == "FEMALE")
        .or_else(|| voices.first())
}

async fn read_json<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, CloudError> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(CloudError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }
    Ok(serde_json::from_slice(&body)?)
}

impl Translator for GoogleCloud {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        source: &'a str,
        target: &'a str,
    ) -> BoxFuture<'a, Result<String, CloudError>> {
        Box::pin(self.translate_text(text, source, target))
    }
}

impl SpeechSynthesizer for GoogleCloud {
    fn synthesize<'a>(
        &'a self,
        text: &'a str,
        language: &'a str,
    ) -> BoxFuture<'a, Result<Audio, CloudError>> {
        Box::pin(self.synthesize_speech(text, language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{fixture, fixture_path, spawn_server};
    use axum::extract::{Form, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Calls {
        token: AtomicUsize,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "Bearer test-token")
    }

    fn mock_google(calls: Arc<Calls>) -> Router {
        Router::new()
            .route(
                "/token",
                post(
                    |State(calls): State<Arc<Calls>>,
                     Form(form): Form<HashMap<String, String>>| async move {
                        calls.token.fetch_add(1, Ordering::SeqCst);
                        let grant_ok =
                            form.get("grant_type").map(String::as_str) == Some(JWT_BEARER_GRANT);
                        let jwt_ok = form
                            .get("assertion")
                            .is_some_and(|a| a.split('.').count() == 3);
                        if grant_ok && jwt_ok {
                            let token = json!({"access_token": "test-token", "expires_in": 3600});
                            (StatusCode::OK, Json(token))
                        } else {
                            (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"})))
                        }
                    },
                ),
            )
            .route(
                "/v3/projects/{project}/locations/global:translateText",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    if !authorized(&headers) {
                        return (StatusCode::UNAUTHORIZED, Json(json!({})));
                    }
                    let text = body["contents"][0].as_str().unwrap_or_default();
                    let target = body["targetLanguageCode"].as_str().unwrap_or_default();
                    let translated = format!("{target}:{text}");
                    (
                        StatusCode::OK,
                        Json(json!({"translations": [{"translatedText": translated}]})),
                    )
                }),
            )
            .route(
                "/v1/voices",
                get(|headers: HeaderMap, Query(query): Query<HashMap<String, String>>| async move {
                    if !authorized(&headers) {
                        return (StatusCode::UNAUTHORIZED, Json(json!({})));
                    }
                    match query.get("languageCode").map(String::as_str) {
                        Some("de-DE") => (
                            StatusCode::OK,
                            Json(json!({"voices": [
                                {
                                    "name": "de-DE-Male",
                                    "ssmlGender": "MALE",
                                    "naturalSampleRateHertz": 22050
                                },
                                {
                                    "name": "de-DE-Female",
                                    "ssmlGender": "FEMALE",
                                    "naturalSampleRateHertz": 24000
                                }
                            ]})),
                        ),
                        _ => (StatusCode::OK, Json(json!({}))),
                    }
                }),
            )
            .route(
                "/v1/text:synthesize",
                post(|Json(body): Json<Value>| async move {
                    let voice = body["voice"]["name"].as_str().unwrap_or_default().to_string();
                    let rate = body["audioConfig"]["sampleRateHertz"].as_u64().unwrap_or_default();
                    Json(json!({"audioContent": BASE64.encode(format!("{voice}@{rate}"))}))
                }),
            )
            .with_state(calls)
    }

    async fn client() -> (GoogleCloud, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let base = spawn_server(mock_google(calls.clone())).await;
        let cloud = GoogleCloud::from_credentials_json(&fixture("service_account.json"))
            .unwrap()
            .with_endpoints(CloudEndpoints {
                translate: base.clone(),
                text_to_speech: base.clone(),
                token: Some(format!("{base}/token")),
            });
        (cloud, calls)
    }

    #[test]
    fn loads_credentials_file() {
        let cloud =
            GoogleCloud::from_credentials_file(&fixture_path("service_account.json")).unwrap();
        assert_eq!(cloud.project_id(), "bing-wall-test");
    }

    #[test]
    fn rejects_malformed_credentials() {
        assert!(matches!(
            GoogleCloud::from_credentials_json(b"{\"client_email\": 1}"),
            Err(CloudError::Json(_))
        ));
        let bad_key = br#"{"client_email":"a@b","private_key":"nope","project_id":"p"}"#;
        assert!(matches!(
            GoogleCloud::from_credentials_json(bad_key),
            Err(CloudError::Jwt(_))
        ));
    }

    #[test]
    fn voice_preference() {
        let voices = vec![
            Voice {
                name: "a".into(),
                ssml_gender: "MALE".into(),
                natural_sample_rate_hertz: 1,
            },
            Voice {
                name: "b".into(),
                ssml_gender: "FEMALE".into(),
                natural_sample_rate_hertz: 2,
            },
        ];
        assert_eq!(pick_voice(&voices).unwrap().name, "b");
        assert_eq!(pick_voice(&voices[..1]).unwrap().name, "a");
        assert!(pick_voice(&[]).is_none());
    }

    #[tokio::test]
    async fn translates_with_cached_token() {
        let (cloud, calls) = client().await;
        let first = cloud.translate("Hallo", "de-DE", "en-US").await.unwrap();
        let second = cloud.translate("Welt", "de-DE", "en-US").await.unwrap();
        assert_eq!(first, "en-US:Hallo");
        assert_eq!(second, "en-US:Welt");
        assert_eq!(calls.token.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn synthesizes_with_female_voice_at_natural_rate() {
        let (cloud, _) = client().await;
        let audio = cloud.synthesize("Hallo", "de-DE").await.unwrap();
        assert_eq!(audio.codec, "MP3");
        assert_eq!(audio.sample_rate, 24000);
        assert_eq!(&audio.data[..], b"de-DE-Female@24000");
    }

    #[tokio::test]
    async fn missing_voices_is_an_error() {
        let (cloud, _) = client().await;
        let err = cloud.synthesize("Hello", "xx-XX").await.unwrap_err();
        assert!(matches!(err, CloudError::NoVoices(_)));
    }

    #[tokio::test]
    async fn token_endpoint_failure_is_reported() {
        let router = Router::new().route(
            "/token",
            post(|| async { (StatusCode::FORBIDDEN, "denied") }),
        );
        let base = spawn_server(router).await;
        let cloud = GoogleCloud::from_credentials_json(&fixture("service_account.json"))
            .unwrap()
            .with_endpoints(CloudEndpoints {
                translate: base.clone(),
                text_to_speech: base.clone(),
                token: Some(format!("{base}/token")),
            });
        let err = cloud.translate("Hallo", "de-DE", "en-US").await.unwrap_err();
        assert!(matches!(err, CloudError::Status { status: 403, .. }));
    }
}
