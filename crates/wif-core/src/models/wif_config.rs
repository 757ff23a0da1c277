use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::ServiceAccountSpec;
use crate::names;

/// Audience accepted by the OIDC provider when none is configured.
pub const DEFAULT_AUDIENCE: &str = "openshift";

/// Root desired-state descriptor for one WIF setup, as served by the
/// management API.
///
/// Never mutated in place by reconciliation: corrections act on the
/// subordinate cloud resources, not on the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifConfig {
    pub id: String,
    pub display_name: String,
    pub gcp: WifGcp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifGcp {
    /// Immutable once the pool exists.
    pub project_id: String,
    /// Numeric project id as a string. Empty means "resolve from GCP".
    #[serde(default)]
    pub project_number: String,
    /// Account that is granted token-creator on `impersonate` accounts.
    pub impersonator_email: String,
    pub workload_identity_pool: WorkloadIdentityPoolSpec,
    #[serde(default)]
    pub service_accounts: Vec<ServiceAccountSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadIdentityPoolSpec {
    /// Immutable once the pool exists.
    pub pool_id: String,
    pub identity_provider: IdentityProviderSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProviderSpec {
    pub identity_provider_id: String,
    pub issuer_url: String,
    /// JWKS document (JSON string) trusted for token exchange.
    pub jwks: String,
    #[serde(default = "default_audiences")]
    pub allowed_audiences: Vec<String>,
}

fn default_audiences() -> Vec<String> {
    vec![DEFAULT_AUDIENCE.to_string()]
}

/// Input sent to the management API to register a new WIF config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifConfigInput {
    pub display_name: String,
    pub gcp: WifConfigInputGcp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifConfigInputGcp {
    pub project_id: String,
}

impl WifConfigInput {
    pub fn new(display_name: &str, project_id: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            gcp: WifConfigInputGcp {
                project_id: project_id.to_string(),
            },
        }
    }
}

impl WifConfig {
    pub fn project_id(&self) -> &str {
        &self.gcp.project_id
    }

    pub fn pool_id(&self) -> &str {
        &self.gcp.workload_identity_pool.pool_id
    }

    pub fn provider(&self) -> &IdentityProviderSpec {
        &self.gcp.workload_identity_pool.identity_provider
    }

    pub fn pool_resource(&self) -> String {
        names::pool_resource(self.project_id(), self.pool_id())
    }

    pub fn provider_resource(&self) -> String {
        names::provider_resource(
            self.project_id(),
            self.pool_id(),
            &self.provider().identity_provider_id,
        )
    }

    pub fn impersonator_member(&self) -> String {
        names::impersonator_member(&self.gcp.impersonator_email)
    }

    pub fn service_account(&self, service_account_id: &str) -> Option<&ServiceAccountSpec> {
        self.gcp
            .service_accounts
            .iter()
            .find(|sa| sa.service_account_id == service_account_id)
    }

    /// Reject descriptors that cannot be reconciled.
    pub fn validate(&self) -> Result<(), CoreError> {
        let required = [
            ("id", self.id.as_str()),
            ("gcp.project_id", self.project_id()),
            ("gcp.workload_identity_pool.pool_id", self.pool_id()),
            (
                "gcp.workload_identity_pool.identity_provider.identity_provider_id",
                self.provider().identity_provider_id.as_str(),
            ),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(CoreError::MissingField(field.to_string()));
            }
        }

        let has_impersonated = self
            .gcp
            .service_accounts
            .iter()
            .any(|sa| sa.access_method == crate::AccessMethod::Impersonate);
        if has_impersonated && self.gcp.impersonator_email.is_empty() {
            return Err(CoreError::MissingField("gcp.impersonator_email".into()));
        }

        for sa in &self.gcp.service_accounts {
            sa.validate()?;
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let config: WifConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
