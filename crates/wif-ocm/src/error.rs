use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcmError {
    #[error("wif-config '{0}' not found")]
    NotFound(String),

    /// Non-success response carrying the API's error body.
    #[error("management API returned {status} ({code}): {reason}")]
    Api {
        status: u16,
        code: String,
        reason: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] wif_core::CoreError),
}

impl OcmError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for OcmError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
