use thiserror::Error;
use wif_core::CoreError;
use wif_gcp::GcpError;
use wif_ocm::OcmError;

#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("GCP error: {0}")]
    Gcp(#[from] GcpError),

    #[error("management API error: {0}")]
    Ocm(#[from] OcmError),

    #[error("invalid wif-config: {0}")]
    Config(#[from] CoreError),

    #[error("service account '{0}' is not declared in the wif-config")]
    UnknownServiceAccount(String),

    /// The project has no binding whose role basename matches. The role
    /// must already exist in the project before members can be added.
    #[error("project has no binding for role '{role_id}'")]
    RoleBindingMissing { role_id: String },

    #[error("operation {name} failed: {message}")]
    OperationFailed { name: String, message: String },

    #[error("operation {name} did not complete after {attempts} polls")]
    OperationTimeout { name: String, attempts: u32 },
}

impl ProvisionerError {
    /// Prepend resource identity to the error message.
    pub fn with_resource(self, label: &str, name: &str) -> Self {
        match self {
            Self::Gcp(err) => Self::Gcp(err.with_resource(label, name)),
            Self::OperationFailed {
                name: op,
                message,
            } => Self::OperationFailed {
                name: op,
                message: format!("{label} ({name}): {message}"),
            },
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Gcp(err) if err.is_not_found())
    }
}

/// Walk the full error chain and join all causes into one string.
///
/// Skips a cause whose text the message already ends with, since the
/// `#[from]` wrappers repeat their source in `Display`.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !msg.ends_with(&text) {
            msg.push_str(": ");
            msg.push_str(&text);
        }
        source = cause.source();
    }
    msg
}
