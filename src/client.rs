//! Dispatch protocol for the Aurora task center
//!
//! `send_sync` drives the whole submission state machine: submit, recover
//! transparently from an expired session, and convert a partial response
//! into a poll loop against the touch endpoint. `send_async` runs the same
//! path on a background task and delivers a single tagged outcome.

use crate::error::{ClientError, Result};
use crate::session::{Credentials, SessionManager};
use crate::types::{AuroraConfig, CenterRequest, CenterResponse};
use reqwest::{header, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Client for the Aurora task-center API
///
/// Cloning is cheap and all clones share one connection pool and one
/// session. Dropping the last clone releases the pool's idle connections.
///
/// # Example
///
/// ```rust,no_run
/// use aurora_client::{AuroraClient, AuroraConfig, CenterRequest, Signature, TaskKind};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AuroraClient::new(AuroraConfig {
///     login_url: "http://localhost/auth".into(),
///     tasks_url: "http://localhost/tasks/send".into(),
///     touch_url: "http://localhost/tasks/touch".into(),
///     name: "admin".into(),
///     password: "password".into(),
///     ..Default::default()
/// });
///
/// let request = CenterRequest::new(
///     TaskKind::Task,
///     vec![Signature::new("add").with_arg("int64", 1).with_arg("int64", 1)],
/// );
/// let response = client.send_sync(&request).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuroraClient {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) http: reqwest::Client,
    pub(crate) session: SessionManager,
    tasks_url: String,
    pub(crate) touch_url: String,
    pub(crate) poll_interval: Duration,
    pub(crate) poll_deadline: Option<Duration>,
}

impl AuroraClient {
    /// Create a new client from the given configuration.
    pub fn new(config: AuroraConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        let session = SessionManager::new(
            http.clone(),
            config.login_url,
            Credentials {
                name: config.name,
                password: config.password,
            },
        );

        Self {
            inner: Arc::new(Inner {
                http,
                session,
                tasks_url: config.tasks_url,
                touch_url: config.touch_url,
                poll_interval: Duration::from_millis(config.poll_interval_ms),
                poll_deadline: config.poll_deadline,
            }),
        }
    }

    pub(crate) fn inner(&self) -> &Inner {
        &self.inner
    }

    /// Log in eagerly instead of waiting for the first 403.
    pub async fn login(&self) -> Result<()> {
        self.inner.session.login().await
    }

    /// Submit a composite request and wait for its final response.
    ///
    /// A 206 is followed transparently through the touch endpoint; the
    /// caller only ever sees the fully populated response. A 403 triggers
    /// one re-login and one retransmission of the original request; a
    /// second 403 is terminal.
    pub async fn send_sync(&self, request: &CenterRequest) -> Result<CenterResponse> {
        request.validate()?;

        let mut reauthenticated = false;
        loop {
            let (status, body, generation) =
                self.post_composite(&self.inner.tasks_url, request).await?;

            match status {
                StatusCode::OK => return parse_response(&body),
                StatusCode::PARTIAL_CONTENT => {
                    let partial = parse_response(&body)?;
                    debug!(
                        batch_id = %partial.batch_id,
                        task_type = ?partial.task_type,
                        "batch accepted, polling for results"
                    );
                    let continuation = partial.continuation()?;
                    return self
                        .poll_until_ready(&continuation, self.inner.poll_interval)
                        .await;
                }
                StatusCode::FORBIDDEN if !reauthenticated => {
                    warn!("session expired, re-authenticating");
                    reauthenticated = true;
                    self.inner.session.refresh(generation).await?;
                }
                StatusCode::FORBIDDEN => return Err(ClientError::SessionExpired),
                _ => {
                    return Err(ClientError::Service {
                        status: status.as_u16(),
                        body,
                    })
                }
            }
        }
    }

    /// Submit on a background task and receive exactly one tagged outcome.
    ///
    /// The receiver yields `Ok` with the final response or the error the
    /// synchronous path would have returned. Dropping the receiver does not
    /// cancel the in-flight call.
    pub fn send_async(&self, request: CenterRequest) -> oneshot::Receiver<Result<CenterResponse>> {
        let (tx, rx) = oneshot::channel();
        let client = self.clone();
        tokio::spawn(async move {
            let outcome = client.send_sync(&request).await;
            if tx.send(outcome).is_err() {
                debug!("async caller went away before delivery");
            }
        });
        rx
    }

    /// POST a composite request with the current session cookies attached.
    ///
    /// Returns the status, the raw body, and the session generation the
    /// request was sent with.
    pub(crate) async fn post_composite(
        &self,
        url: &str,
        request: &CenterRequest,
    ) -> Result<(StatusCode, String, u64)> {
        let (cookie, generation) = self.inner.session.snapshot().await;

        let mut builder = self
            .inner
            .http
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CACHE_CONTROL, "no-cache")
            .json(request);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body, generation))
    }
}

/// Parse a response body, keeping the raw text on failure.
pub(crate) fn parse_response(body: &str) -> Result<CenterResponse> {
    serde_json::from_str(body).map_err(|e| ClientError::protocol(e, body))
}
