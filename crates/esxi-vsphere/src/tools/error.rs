//! Tool dispatch error types.

use crate::error::VsphereError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A required argument is absent or `null`.
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// Arguments are present but have the wrong shape or type.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Client(#[from] VsphereError),

    /// A tool call panicked.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Stable name reported as `kind` in error envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "UnknownTool",
            Self::MissingArgument(_) => "MissingArgument",
            Self::InvalidArguments(_) => "InvalidArguments",
            Self::Client(e) => e.kind(),
            Self::Internal(_) => "InternalError",
        }
    }
}
