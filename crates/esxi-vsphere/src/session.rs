//! API session lifecycle (`POST` / `DELETE /api/session`).
//!
//! The manager is the only owner of the session token. The token sits
//! behind an `RwLock` that is never held across a network call; a
//! separate mutex serializes logins so concurrent callers that all saw
//! the same expired token trigger exactly one re-authentication.

use crate::error::{VsphereError, VsphereResult};

use reqwest::Client;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Header carrying the session token on every authenticated request.
pub const SESSION_HEADER: &str = "vmware-api-session-id";

pub struct SessionManager {
    http: Client,
    base_url: String,
    username: String,
    password: String,
    token: RwLock<Option<String>>,
    auth_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            token: RwLock::new(None),
            auth_lock: Mutex::new(()),
        }
    }

    fn session_url(&self) -> String {
        format!("{}/api/session", self.base_url)
    }

    /// Token currently held, if any.
    pub async fn current_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Drop the held token; the next call logs in again.
    pub async fn invalidate(&self) {
        self.token.write().await.take();
    }

    // ── Login ───────────────────────────────────────────────────────

    /// Exchange the credentials for a fresh token, replacing any held one.
    pub async fn authenticate(&self) -> VsphereResult<String> {
        let _guard = self.auth_lock.lock().await;
        self.login_locked().await
    }

    /// Return the held token, logging in first if there is none.
    pub async fn ensure_token(&self) -> VsphereResult<String> {
        if let Some(token) = self.current_token().await {
            return Ok(token);
        }

        let _guard = self.auth_lock.lock().await;
        // another caller may have logged in while we waited
        if let Some(token) = self.current_token().await {
            return Ok(token);
        }
        self.login_locked().await
    }

    /// Replace `stale` with a working token.
    ///
    /// If another caller already swapped the token while we waited for the
    /// lock, that token is returned without logging in again.
    pub async fn refresh(&self, stale: &str) -> VsphereResult<String> {
        let _guard = self.auth_lock.lock().await;
        if let Some(token) = self.current_token().await {
            if token != stale {
                debug!("Reusing session refreshed by a concurrent request");
                return Ok(token);
            }
        }

        warn!("vSphere session rejected with 401, re-authenticating");
        self.invalidate().await;
        self.login_locked().await
    }

    /// Must be called with `auth_lock` held.
    async fn login_locked(&self) -> VsphereResult<String> {
        let resp = self
            .http
            .post(self.session_url())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| VsphereError::auth(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            self.invalidate().await;
            return Err(VsphereError::auth(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| VsphereError::auth(format!("Unreadable session response: {e}")))?;
        let token = match body {
            Value::String(s) => s,
            Value::Object(mut map) => match map.remove("value") {
                Some(Value::String(s)) => s,
                _ => return Err(VsphereError::auth("Session response carried no token")),
            },
            _ => return Err(VsphereError::auth("Session response carried no token")),
        };

        *self.token.write().await = Some(token.clone());
        info!(user = %self.username, "vSphere session established");
        Ok(token)
    }

    // ── Logout ──────────────────────────────────────────────────────

    /// Best-effort `DELETE /api/session`. The token is cleared whatever
    /// the outcome; failures are only logged.
    pub async fn logout(&self) {
        let _guard = self.auth_lock.lock().await;
        let Some(token) = self.token.write().await.take() else {
            return;
        };

        let result = self
            .http
            .delete(self.session_url())
            .header(SESSION_HEADER, token)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => info!("vSphere session closed"),
            Ok(resp) => warn!(status = resp.status().as_u16(), "vSphere logout rejected"),
            Err(e) => warn!(error = %e, "vSphere logout failed"),
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
