//! Error types for the ESXi management crate.

use thiserror::Error;

/// Errors raised by the session manager, the HTTP gateway and the
/// resource operations built on top of them.
#[derive(Debug, Clone, Error)]
pub enum VsphereError {
    /// Bad credentials or a failing session endpoint.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Non-2xx HTTP response (`status` set) or a transport failure
    /// such as a timeout or refused connection (`status` empty).
    #[error("{message}")]
    Gateway { status: Option<u16>, message: String },

    /// A lookup by display name found nothing.
    #[error("{0}")]
    NotFound(String),

    /// The host inventory came back empty.
    #[error("No hosts found")]
    NoHostsFound,

    /// The response body could not be decoded.
    #[error("{0}")]
    Parse(String),
}

impl VsphereError {
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::Gateway {
            status: Some(status),
            message: msg.into(),
        }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Gateway {
            status: None,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// HTTP status carried by a gateway error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Gateway { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Stable variant name, used in tool error envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "AuthenticationError",
            Self::Gateway { .. } => "GatewayError",
            Self::NotFound(_) => "NotFound",
            Self::NoHostsFound => "NoHostsFound",
            Self::Parse(_) => "ParseError",
        }
    }
}

impl From<VsphereError> for String {
    fn from(e: VsphereError) -> String {
        e.to_string()
    }
}

impl From<reqwest::Error> for VsphereError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::connection(format!("HTTP timeout: {e}"))
        } else if e.is_connect() {
            Self::connection(format!("Connection failed: {e}"))
        } else {
            Self::Gateway {
                status: e.status().map(|s| s.as_u16()),
                message: format!("HTTP error: {e}"),
            }
        }
    }
}

impl From<serde_json::Error> for VsphereError {
    fn from(e: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {e}"))
    }
}

/// Convenience alias.
pub type VsphereResult<T> = Result<T, VsphereError>;
