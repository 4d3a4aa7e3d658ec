//! Retrying HTTP client shared by every upstream call.
//!
//! The image-of-the-day host and the lookup sites it depends on are flaky in a
//! specific way: instead of failing loudly they answer `200 OK` with an empty
//! body or a "request blocked" page. The client therefore decides whether to
//! retry by looking at the body, not just the status line.
//!
//! ## Retry policy
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | transport error / timeout | retry |
//! | empty body | retry |
//! | body contains [`BLOCK_MARKER`] | retry |
//! | status 429, or 5xx other than 501 | retry |
//! | any other status ≥ 400 | terminal [`FetchError::Status`] with request/response dump |
//! | anything else | success, body returned |
//!
//! Waits between attempts are drawn uniformly from `[wait_min, wait_max)`.
//! They are not exponential. Every attempt carries a different `User-Agent`
//! from a shuffled pool. Redirects are returned as-is and no cookies are kept.
//!
//! Every attempt and every wait races the caller's [`CancellationToken`].

use bytes::Bytes;
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, USER_AGENT};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Marker text of the upstream's soft-block page.
pub const BLOCK_MARKER: &str = "The request is blocked.";

/// Longest body excerpt kept in a [`FetchError::Status`] dump.
const DUMP_BODY_LIMIT: usize = 2048;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:131.0) Gecko/20100101 Firefox/131.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36 Edg/129.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/18.0 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.6; rv:130.0) Gecko/20100101 Firefox/130.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0",
    "Mozilla/5.0 (X11; Fedora; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6 like Mac OS X) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/17.6 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPad; CPU OS 17_5 like Mac OS X) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/129.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; SM-S911B) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/128.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36 OPR/114.0.0.0",
];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
    #[error("unexpected status code: {status}\n({request})\n({response})")]
    Status {
        status: u16,
        request: String,
        response: String,
    },
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },
    #[error("request to {0} was cancelled")]
    Cancelled(String),
}

/// Retry and timeout knobs.
///
/// The defaults are the production values; tests shrink the waits.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub wait_min: Duration,
    pub wait_max: Duration,
    /// Per-attempt timeout covering connect, headers, and body.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            wait_min: Duration::from_millis(500),
            wait_max: Duration::from_millis(1500),
            timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Draw one backoff uniformly from `[wait_min, wait_max)`.
    pub fn backoff(&self) -> Duration {
        let span = self.wait_max.saturating_sub(self.wait_min);
        if span.is_zero() {
            return self.wait_min;
        }
        let jitter = rand::rng().random_range(0..span.as_nanos() as u64);
        self.wait_min + Duration::from_nanos(jitter)
    }
}

/// Verdict of the retry predicate on one completed attempt.
#[derive(Debug, PartialEq)]
enum Verdict {
    Accept,
    Retry(String),
    Reject,
}

/// Decide what to do with a response from its status and body.
fn judge(status: StatusCode, body: &[u8]) -> Verdict {
    if body.is_empty() {
        return Verdict::Retry(format!("empty body (status {status})"));
    }
    if contains(body, BLOCK_MARKER.as_bytes()) {
        return Verdict::Retry("request blocked by upstream".to_string());
    }
    if status == StatusCode::TOO_MANY_REQUESTS
        || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
    {
        return Verdict::Retry(format!("status {status}"));
    }
    if status.as_u16() >= 400 {
        return Verdict::Reject;
    }
    Verdict::Accept
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// A request to replay on every attempt.
#[derive(Debug, Clone)]
enum Request<'a> {
    Get,
    PostForm(&'a [(&'a str, &'a str)]),
}

impl Request<'_> {
    fn method(&self) -> &'static str {
        match self {
            Request::Get => "GET",
            Request::PostForm(_) => "POST",
        }
    }
}

/// HTTP client with the retry behaviour described in the [module docs](self).
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(policy: RetryPolicy) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(policy.timeout)
            .build()?;
        Ok(Self { http, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` and return the body.
    pub async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Bytes, FetchError> {
        self.execute(url, Request::Get, cancel).await
    }

    /// POST `values` as `application/x-www-form-urlencoded` and return the body.
    pub async fn post_form(
        &self,
        url: &str,
        values: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<Bytes, FetchError> {
        self.execute(url, Request::PostForm(values), cancel).await
    }

    async fn execute(
        &self,
        url: &str,
        request: Request<'_>,
        cancel: &CancellationToken,
    ) -> Result<Bytes, FetchError> {
        let agents = shuffled_user_agents();
        let attempts = self.policy.max_retries + 1;
        let mut last = String::new();

        for attempt in 0..attempts {
            if attempt > 0 {
                let wait = self.policy.backoff();
                debug!(url, attempt, ?wait, reason = %last, "retrying request");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled(url.to_string())),
                    _ = tokio::time::sleep(wait) => {}
                }
            }

            let agent = agents[attempt as usize % agents.len()];
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled(url.to_string())),
                outcome = self.attempt(url, &request, agent) => outcome,
            };

            let (status, headers, body) = match outcome {
                Ok(parts) => parts,
                Err(e) => {
                    warn!(url, attempt, error = %e, "request failed");
                    last = e.to_string();
                    continue;
                }
            };

            match judge(status, &body) {
                Verdict::Accept => return Ok(body),
                Verdict::Retry(reason) => {
                    warn!(url, attempt, %reason, "retryable response");
                    last = reason;
                }
                Verdict::Reject => {
                    return Err(FetchError::Status {
                        status: status.as_u16(),
                        request: dump_request(&request, url, agent),
                        response: dump_response(status, &headers, &body),
                    });
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts,
            last,
        })
    }

    async fn attempt(
        &self,
        url: &str,
        request: &Request<'_>,
        agent: &str,
    ) -> Result<(StatusCode, HeaderMap, Bytes), reqwest::Error> {
        let builder = match request {
            Request::Get => self.http.get(url),
            Request::PostForm(values) => self.http.post(url).form(values),
        };
        let response = builder.header(USER_AGENT, agent).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok((status, headers, body))
    }
}

/// The user-agent pool in a fresh random order.
///
/// Walking the shuffled pool gives every attempt of one fetch a distinct agent
/// as long as the pool is larger than the attempt count.
fn shuffled_user_agents() -> Vec<&'static str> {
    let mut agents = USER_AGENTS.to_vec();
    agents.shuffle(&mut rand::rng());
    agents
}

fn dump_request(request: &Request<'_>, url: &str, agent: &str) -> String {
    let mut dump = format!("{} {url}\nUser-Agent: {agent}", request.method());
    if let Request::PostForm(values) = request {
        let form: Vec<String> = values
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect();
        dump.push_str("\n\n");
        dump.push_str(&form.join("&"));
    }
    dump
}

fn dump_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> String {
    let mut dump = format!("HTTP {status}");
    for (name, value) in headers {
        dump.push_str(&format!("\n{name}: {}", value.to_str().unwrap_or("<binary>")));
    }
    let excerpt = &body[..body.len().min(DUMP_BODY_LIMIT)];
    dump.push_str("\n\n");
    dump.push_str(&String::from_utf8_lossy(excerpt));
    dump
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{fast_policy, spawn_server};
    use axum::Router;
    use axum::http::HeaderMap as AxumHeaders;
    use axum::routing::{get, post};
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    // =========================================================================
    // Retry predicate
    // =========================================================================

    #[test]
    fn judge_accepts_plain_ok() {
        assert_eq!(judge(StatusCode::OK, b"hello"), Verdict::Accept);
    }

    #[test]
    fn judge_retries_empty_body() {
        assert!(matches!(judge(StatusCode::OK, b""), Verdict::Retry(_)));
    }

    #[test]
    fn judge_retries_block_page() {
        let body = b"<html><body>The request is blocked.</body></html>";
        assert!(matches!(judge(StatusCode::OK, body), Verdict::Retry(_)));
    }

    #[test]
    fn judge_retries_throttling_and_server_errors() {
        assert!(matches!(judge(StatusCode::TOO_MANY_REQUESTS, b"x"), Verdict::Retry(_)));
        assert!(matches!(judge(StatusCode::BAD_GATEWAY, b"x"), Verdict::Retry(_)));
        assert!(matches!(judge(StatusCode::SERVICE_UNAVAILABLE, b"x"), Verdict::Retry(_)));
    }

    #[test]
    fn judge_rejects_not_implemented_and_client_errors() {
        assert_eq!(judge(StatusCode::NOT_IMPLEMENTED, b"x"), Verdict::Reject);
        assert_eq!(judge(StatusCode::NOT_FOUND, b"x"), Verdict::Reject);
        assert_eq!(judge(StatusCode::FORBIDDEN, b"x"), Verdict::Reject);
    }

    #[test]
    fn judge_passes_redirects_through() {
        assert_eq!(judge(StatusCode::FOUND, b"moved"), Verdict::Accept);
    }

    #[test]
    fn backoff_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..200 {
            let wait = policy.backoff();
            assert!(wait >= policy.wait_min && wait < policy.wait_max, "{wait:?}");
        }
    }

    #[test]
    fn backoff_with_equal_bounds_is_constant() {
        let policy = RetryPolicy {
            wait_min: Duration::from_millis(3),
            wait_max: Duration::from_millis(3),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(), Duration::from_millis(3));
    }

    #[test]
    fn user_agent_pool_outnumbers_attempts() {
        let unique: HashSet<&str> = USER_AGENTS.iter().copied().collect();
        assert_eq!(unique.len(), USER_AGENTS.len());
        assert!(USER_AGENTS.len() > RetryPolicy::default().max_retries as usize);
    }

    // =========================================================================
    // Against a live local server
    // =========================================================================

    /// Serves an empty body for the first `empty_first` requests, then `body`.
    fn flaky_router(empty_first: usize, body: &'static str) -> (Router, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let router = Router::new().route(
            "/flaky",
            get(move |headers: AxumHeaders| {
                let log = log.clone();
                async move {
                    let agent = headers
                        .get("user-agent")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let mut log = log.lock().unwrap();
                    log.push(agent);
                    if log.len() <= empty_first { "" } else { body }
                }
            }),
        );
        (router, seen)
    }

    #[tokio::test]
    async fn empty_bodies_are_retried_with_distinct_agents() {
        let (router, seen) = flaky_router(3, "payload");
        let base = spawn_server(router).await;
        let client = FetchClient::new(fast_policy()).unwrap();

        let body = client
            .get(&format!("{base}/flaky"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(&body[..], b"payload");
        let agents = seen.lock().unwrap().clone();
        assert_eq!(agents.len(), 4);
        let unique: HashSet<&String> = agents.iter().collect();
        assert_eq!(unique.len(), 4, "agents repeated: {agents:?}");
        assert!(agents.iter().all(|a| !a.is_empty()));
    }

    #[tokio::test]
    async fn retries_are_capped() {
        let (router, seen) = flaky_router(usize::MAX, "never");
        let base = spawn_server(router).await;
        let client = FetchClient::new(fast_policy()).unwrap();

        let err = client
            .get(&format!("{base}/flaky"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::RetriesExhausted { attempts: 11, .. }));
        assert_eq!(seen.lock().unwrap().len(), 11);
    }

    #[tokio::test]
    async fn client_error_is_terminal_with_dump() {
        let router = Router::new().route(
            "/missing",
            get(|| async { (axum::http::StatusCode::NOT_FOUND, "no such thing") }),
        );
        let base = spawn_server(router).await;
        let client = FetchClient::new(fast_policy()).unwrap();

        let err = client
            .get(&format!("{base}/missing"), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            FetchError::Status {
                status,
                request,
                response,
            } => {
                assert_eq!(status, 404);
                assert!(request.starts_with("GET "));
                assert!(request.contains("/missing"));
                assert!(response.contains("no such thing"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_form_sends_fields() {
        let router = Router::new().route(
            "/form",
            post(|body: String| async move { format!("echo:{body}") }),
        );
        let base = spawn_server(router).await;
        let client = FetchClient::new(fast_policy()).unwrap();

        let body = client
            .post_form(
                &format!("{base}/form"),
                &[("app_id", "key"), ("sentence", "[今日]")],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("echo:app_id=key&sentence="));
    }

    #[tokio::test]
    async fn redirects_are_not_followed() {
        let router = Router::new().route(
            "/moved",
            get(|| async {
                (
                    axum::http::StatusCode::FOUND,
                    [("location", "/elsewhere")],
                    "see elsewhere",
                )
            }),
        );
        let base = spawn_server(router).await;
        let client = FetchClient::new(fast_policy()).unwrap();

        let body = client
            .get(&format!("{base}/moved"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(&body[..], b"see elsewhere");
    }

    #[tokio::test]
    async fn cancellation_stops_the_retry_loop() {
        let (router, _seen) = flaky_router(usize::MAX, "never");
        let base = spawn_server(router).await;
        let policy = RetryPolicy {
            wait_min: Duration::from_secs(30),
            wait_max: Duration::from_secs(31),
            ..fast_policy()
        };
        let client = FetchClient::new(policy).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = client.get(&format!("{base}/flaky"), &cancel).await.unwrap_err();
        assert!(matches!(err, FetchError::Cancelled(_)));
    }
}
