//! Long-running mode: a local HTTP API around a [`Controller`].
//!
//! | Route | Effect |
//! |---|---|
//! | `GET /config` | current configuration |
//! | `PATCH /config[?refresh=true]` | apply a [`ConfigPatch`], optionally refresh |
//! | `GET /wallpaper` | metadata of the wallpaper on the desktop |
//! | `POST /refresh` | run the pipeline again |
//! | `POST /speak` | play the current description audio |
//!
//! Unknown paths answer 404 and wrong methods 405, both with a JSON
//! `{"error": ...}` body. The listener is bound to `127.0.0.1` only.
//!
//! Refreshes and config updates queue on one lock, so a patch never lands in
//! the middle of a run. A failed refresh keeps the previous wallpaper.
//! Changing `api_port` through the API takes effect on the next start.

use crate::audio::AudioPlayer;
use crate::config::{AppConfig, ConfigError, ConfigPatch};
use crate::pipeline::{self, PipelineError, Services, run_pipeline};
use crate::types::Wallpaper;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Owns the configuration, the services and the current wallpaper.
pub struct Controller {
    config: RwLock<AppConfig>,
    /// Held for the whole of a refresh or a config update.
    services: Mutex<Services>,
    current: RwLock<Option<Arc<Wallpaper>>>,
    /// Outside the services lock so playback never waits on a refresh.
    player: Arc<dyn AudioPlayer>,
    cancel: CancellationToken,
}

impl Controller {
    pub fn new(config: AppConfig, services: Services, cancel: CancellationToken) -> Self {
        Self {
            config: RwLock::new(config),
            player: services.player.clone(),
            services: Mutex::new(services),
            current: RwLock::new(None),
            cancel,
        }
    }

    /// A copy of the configuration, without waiting for a running refresh.
    pub async fn config(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    pub async fn current(&self) -> Option<Arc<Wallpaper>> {
        self.current.read().await.clone()
    }

    /// Apply `patch` and return the number of fields that changed.
    ///
    /// An invalid result is rejected as a whole.
    pub async fn patch(&self, patch: &ConfigPatch) -> Result<usize, ConfigError> {
        let _update = self.services.lock().await;
        let snapshot = self.config().await;
        let (updated, changed) = patch.applied_to(&snapshot)?;
        if changed > 0 {
            info!(changed, "configuration updated");
            *self.config.write().await = updated;
        }
        Ok(changed)
    }

    /// Run the pipeline with the current configuration and publish the
    /// result when it fully succeeds.
    pub async fn refresh(&self, autoplay: bool) -> Result<Arc<Wallpaper>, PipelineError> {
        let mut services = self.services.lock().await;
        let config = self.config().await;
        services.load_cloud(&config);

        let run = run_pipeline(&config, &services, autoplay, &self.cancel).await?;
        if let Some(failure) = run.failure {
            return Err(failure);
        }
        let wallpaper = Arc::new(run.wallpaper);
        *self.current.write().await = Some(wallpaper.clone());
        Ok(wallpaper)
    }

    /// Refresh in the background, logging the outcome.
    pub fn spawn_refresh(self: &Arc<Self>, autoplay: bool) {
        let controller = self.clone();
        tokio::spawn(async move {
            match controller.refresh(autoplay).await {
                Ok(wallpaper) => info!(url = %wallpaper.download_url, "wallpaper refreshed"),
                Err(e) => error!(error = %e, "refresh failed, keeping previous wallpaper"),
            }
        });
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

/// Lenient boolean in the spirit of query strings: `1`, `t`, `true`, any case.
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

async fn get_config(State(controller): State<Arc<Controller>>) -> Json<AppConfig> {
    Json(controller.config().await)
}

async fn patch_config(
    State(controller): State<Arc<Controller>>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let patch: ConfigPatch = match serde_json::from_slice(&body) {
        Ok(patch) => patch,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let changed = match controller.patch(&patch).await {
        Ok(changed) => changed,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let refresh = query.get("refresh").and_then(|v| parse_bool(v)).unwrap_or(false);
    if refresh && changed > 0 {
        controller.spawn_refresh(false);
    }
    (StatusCode::ACCEPTED, Json(json!({ "changed": changed }))).into_response()
}

async fn get_wallpaper(State(controller): State<Arc<Controller>>) -> Response {
    match controller.current().await {
        Some(wallpaper) => Json(wallpaper.info()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no wallpaper has been set yet"),
    }
}

async fn post_refresh(State(controller): State<Arc<Controller>>) -> StatusCode {
    controller.spawn_refresh(true);
    StatusCode::ACCEPTED
}

async fn post_speak(State(controller): State<Arc<Controller>>) -> Response {
    let Some(audio) = controller.current().await.and_then(|w| w.audio.clone()) else {
        return error_response(StatusCode::NOT_FOUND, "current wallpaper has no audio");
    };
    let player = controller.player.clone();
    tokio::spawn(async move {
        if let Err(e) = pipeline::play(player, audio).await {
            warn!(error = %e, "failed to play description audio");
        }
    });
    StatusCode::ACCEPTED.into_response()
}

async fn not_found(uri: Uri) -> Response {
    warn!(path = uri.path(), "not found");
    error_response(StatusCode::NOT_FOUND, format!("Not found: {}", uri.path()))
}

async fn method_not_allowed(method: Method) -> Response {
    warn!(%method, "method not allowed");
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Method not allowed: {method}"),
    )
}

pub fn router(controller: Arc<Controller>) -> Router {
    Router::new()
        .route("/config", get(get_config).patch(patch_config))
        .route("/wallpaper", get(get_wallpaper))
        .route("/refresh", post(post_refresh))
        .route("/speak", post(post_speak))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(controller)
}

/// Serve the API on `listener` until `shutdown` fires.
pub async fn serve(
    controller: Arc<Controller>,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> Result<(), DaemonError> {
    axum::serve(listener, router(controller))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

/// Set the wallpaper once, then keep serving the API until `shutdown`.
///
/// Cancelling `shutdown` also aborts a refresh that is still fetching.
pub async fn run_daemon(
    config: AppConfig,
    services: Services,
    shutdown: CancellationToken,
) -> Result<(), DaemonError> {
    let address = SocketAddr::from((Ipv4Addr::LOCALHOST, config.api_port));
    let listener = TcpListener::bind(address).await?;
    info!(address = %listener.local_addr()?, "API server listening");

    let controller = Arc::new(Controller::new(config, services, shutdown.clone()));
    controller.spawn_refresh(true);

    serve(controller, listener, shutdown).await?;
    info!("API server stopped");
    Ok(())
}
