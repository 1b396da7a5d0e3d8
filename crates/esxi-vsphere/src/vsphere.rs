//! vSphere REST API HTTP gateway.
//!
//! Communicates with ESXi / vCenter via `{base}/api/...`, injecting the
//! session token from [`SessionManager`] and recovering once from an
//! expired session.

use crate::error::{VsphereError, VsphereResult};
use crate::session::{SessionManager, SESSION_HEADER};
use crate::types::VsphereConfig;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Everything except RFC 3986 unreserved characters.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build an `/api/...` path, percent-encoding each segment.
///
/// Identifiers are opaque: `/`, `?`, `#` and `%` inside one stay inside its
/// segment. A segment of `.` or `..` is refused because URL normalisation
/// would fold it into its parent even when encoded.
pub fn api_path<S: AsRef<str>>(segments: &[S]) -> VsphereResult<String> {
    let mut path = String::from("/api");
    for segment in segments {
        let segment = segment.as_ref();
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(VsphereError::not_found(format!(
                "Invalid resource id: {segment:?}"
            )));
        }
        path.push('/');
        path.extend(utf8_percent_encode(segment, SEGMENT_ENCODE_SET));
    }
    Ok(path)
}

/// vSphere REST API client.
#[derive(Debug)]
pub struct VsphereClient {
    http: Client,
    base_url: String,
    session: SessionManager,
}

impl VsphereClient {
    /// Build a new client from config (does NOT create a session yet).
    pub fn new(config: &VsphereConfig) -> VsphereResult<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.timeout())
            .build()
            .map_err(|e| VsphereError::connection(format!("Failed to build HTTP client: {e}")))?;

        let base_url = config.base_url()?;
        let session = SessionManager::new(
            http.clone(),
            base_url.clone(),
            config.username.clone(),
            config.password.clone(),
        );

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    /// Base URL for API calls.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    // ── Request core ────────────────────────────────────────────────

    /// Send an authenticated request and decode the JSON reply.
    ///
    /// A 401 invalidates the session, logs in once more and replays the
    /// request with the new token. The replay's outcome is final.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> VsphereResult<Value> {
        let token = self.session.ensure_token().await?;

        match self.send(method.clone(), path, body, &token).await {
            Err(e) if e.is_unauthorized() => {
                let fresh = self.session.refresh(&token).await?;
                self.send(method, path, body, &fresh).await
            }
            other => other,
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: &str,
    ) -> VsphereResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, path, "vSphere request");

        let mut req = self
            .http
            .request(method, &url)
            .header(SESSION_HEADER, token);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = Self::check_status(req.send().await?).await?;
        Self::parse_response(resp).await
    }

    // ── Typed helpers ───────────────────────────────────────────────

    /// GET a JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> VsphereResult<T> {
        let value = self.request(Method::GET, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// POST with JSON body, return parsed response.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> VsphereResult<T> {
        let body = serde_json::to_value(body)?;
        let value = self.request(Method::POST, path, Some(&body)).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// POST with no body, discarding the response.
    pub async fn post_empty(&self, path: &str) -> VsphereResult<()> {
        self.request(Method::POST, path, None).await?;
        Ok(())
    }

    /// DELETE, ignoring response body.
    pub async fn delete(&self, path: &str) -> VsphereResult<()> {
        self.request(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// Close the remote session; never fails.
    pub async fn logout(&self) {
        self.session.logout().await;
    }

    // ── Internal helpers ────────────────────────────────────────────

    async fn check_status(resp: Response) -> VsphereResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let code = status.as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(VsphereError::api(code, format!("API error {code}: {}", body.trim())))
    }

    async fn parse_response(resp: Response) -> VsphereResult<Value> {
        let text = resp
            .text()
            .await
            .map_err(|e| VsphereError::parse(format!("Failed to read response body: {e}")))?;

        // power actions and deletes answer with an empty body
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            let snippet: String = text.chars().take(500).collect();
            VsphereError::parse(format!("JSON parse error: {e}; body: {snippet}"))
        })
    }
}
