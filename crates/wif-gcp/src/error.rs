use thiserror::Error;

/// Errors surfaced by a [`GcpClient`](crate::GcpClient).
///
/// The provider message is kept verbatim; the variant carries the kind.
#[derive(Debug, Error)]
pub enum GcpError {
    /// Resource absent. Often expected (idempotent create/delete).
    #[error("not found: {0}")]
    NotFound(String),

    /// Treated as success by idempotent creates.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Concurrent modification of a versioned resource (etag mismatch).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Network failure or provider outage.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GcpError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Prepend resource identity to the provider message.
    pub fn with_resource(self, label: &str, name: &str) -> Self {
        let prefix = |msg: String| format!("{label} ({name}): {msg}");
        match self {
            Self::NotFound(msg) => Self::NotFound(prefix(msg)),
            Self::AlreadyExists(msg) => Self::AlreadyExists(prefix(msg)),
            Self::PermissionDenied(msg) => Self::PermissionDenied(prefix(msg)),
            Self::Conflict(msg) => Self::Conflict(prefix(msg)),
            Self::Unsupported(msg) => Self::Unsupported(prefix(msg)),
            Self::InvalidArgument(msg) => Self::InvalidArgument(prefix(msg)),
            Self::Transport(msg) => Self::Transport(prefix(msg)),
            other => other,
        }
    }

    /// Classify an HTTP error response from a Google API.
    ///
    /// `status` is the canonical `error.status` string from the body
    /// (e.g. `ALREADY_EXISTS`, `ABORTED`), when present.
    pub fn from_response(http_status: u16, status: Option<&str>, message: String) -> Self {
        match (http_status, status) {
            (404, _) | (_, Some("NOT_FOUND")) => Self::NotFound(message),
            (_, Some("ALREADY_EXISTS")) => Self::AlreadyExists(message),
            (409, _) | (_, Some("ABORTED")) => Self::Conflict(message),
            (401 | 403, _) => Self::PermissionDenied(message),
            (501, _) | (_, Some("UNIMPLEMENTED")) => Self::Unsupported(message),
            (400 | 412, _) => Self::InvalidArgument(message),
            (s, _) if s >= 500 => Self::Transport(message),
            (s, _) => Self::InvalidArgument(format!("HTTP {s}: {message}")),
        }
    }
}

impl From<reqwest::Error> for GcpError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
