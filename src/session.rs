//! Session management for the Aurora client
//!
//! The service authenticates with a cookie set captured from the login
//! response and replayed on every subsequent request. There is no
//! client-side expiry tracking; expiry is discovered reactively when a
//! downstream call comes back 403 and triggers a refresh here.

use crate::error::{ClientError, Result};
use crate::types::AuthRequest;
use reqwest::header;
use tokio::sync::Mutex;
use tracing::debug;

/// Name/secret pair supplied once at configuration time.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account name
    pub name: String,
    /// Account password
    pub password: String,
}

#[derive(Default)]
struct SessionState {
    /// Cookie pairs from the last successful login
    cookies: Vec<(String, String)>,
    /// Bumped on every successful login; lets callers detect that a
    /// refresh already happened while they were in flight
    generation: u64,
}

/// Owns the session cookies and performs login against the auth endpoint.
///
/// All state lives behind a mutex so concurrent calls observe a consistent
/// session, and concurrent refreshes coalesce into a single login.
pub(crate) struct SessionManager {
    http: reqwest::Client,
    login_url: String,
    credentials: Credentials,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub(crate) fn new(http: reqwest::Client, login_url: String, credentials: Credentials) -> Self {
        Self {
            http,
            login_url,
            credentials,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Current `Cookie` header value (if a session exists) and the
    /// generation it belongs to.
    pub(crate) async fn snapshot(&self) -> (Option<String>, u64) {
        let state = self.state.lock().await;
        let header = if state.cookies.is_empty() {
            None
        } else {
            Some(
                state
                    .cookies
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, value))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };
        (header, state.generation)
    }

    /// Ensure the session is newer than `seen`.
    ///
    /// A caller that got a 403 passes the generation it sent the request
    /// with. If another caller already refreshed in the meantime the new
    /// session is reused; otherwise exactly one login is issued. Waiters
    /// queue on the state lock for the in-flight login's outcome.
    pub(crate) async fn refresh(&self, seen: u64) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.generation > seen {
            debug!(
                generation = state.generation,
                "session already refreshed by a concurrent call"
            );
            return Ok(());
        }
        self.login_locked(&mut state).await
    }

    /// Force a login regardless of the current session.
    pub(crate) async fn login(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.login_locked(&mut state).await
    }

    async fn login_locked(&self, state: &mut SessionState) -> Result<()> {
        let body = AuthRequest {
            name: self.credentials.name.clone(),
            password: self.credentials.password.clone(),
        };

        let response = self
            .http
            .post(&self.login_url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Auth {
                status: status.as_u16(),
                body,
            });
        }

        // Replace the cookie set wholesale; a login invalidates whatever
        // session came before it.
        state.cookies = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        state.generation += 1;

        debug!(
            cookies = state.cookies.len(),
            generation = state.generation,
            "session established"
        );
        Ok(())
    }
}
