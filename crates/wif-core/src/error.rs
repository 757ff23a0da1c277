use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported access method '{0}' (expected 'impersonate' or 'wif')")]
    InvalidAccessMethod(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("service account '{0}' uses access method 'wif' but has no credential request")]
    MissingCredentialRequest(String),
}
