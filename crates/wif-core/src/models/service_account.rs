use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::names;

/// How a cluster component obtains credentials for a service account.
///
/// Unknown values are rejected at parse time. A misspelled access method
/// is a configuration error, never a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMethod {
    /// The impersonator account mints short-lived tokens for this account.
    Impersonate,
    /// Kubernetes service accounts exchange OIDC tokens through the pool.
    Wif,
}

impl AccessMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Impersonate => "impersonate",
            Self::Wif => "wif",
        }
    }
}

impl fmt::Display for AccessMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "impersonate" => Ok(Self::Impersonate),
            "wif" => Ok(Self::Wif),
            other => Err(CoreError::InvalidAccessMethod(other.to_string())),
        }
    }
}

/// A role the service account must hold on the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Role id without path prefix, e.g. `compute.admin`.
    pub role_id: String,
    /// Predefined (`roles/...`) vs custom (`projects/.../roles/...`).
    pub predefined: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

impl RoleSpec {
    pub fn predefined(role_id: &str) -> Self {
        Self {
            role_id: role_id.to_string(),
            predefined: true,
            permissions: vec![],
        }
    }

    /// Fully qualified role name for a predefined role.
    pub fn resource_name(&self) -> String {
        names::predefined_role(&self.role_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,
    pub namespace: String,
}

/// Which in-cluster identities may federate into a `wif` service account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequest {
    pub secret_ref: SecretRef,
    pub service_account_names: Vec<String>,
}

/// One managed identity within a WIF config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountSpec {
    /// Short account id, e.g. `osd-deployer`.
    pub service_account_id: String,
    /// Organizational role tag, e.g. `deployer`, `operator-image-registry`.
    pub osd_role: String,
    pub access_method: AccessMethod,
    #[serde(default)]
    pub roles: Vec<RoleSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_request: Option<CredentialRequest>,
}

impl ServiceAccountSpec {
    pub fn email(&self, project_id: &str) -> String {
        names::service_account_email(&self.service_account_id, project_id)
    }

    pub fn resource_name(&self, project_id: &str) -> String {
        names::service_account_resource(&self.service_account_id, project_id)
    }

    /// The `serviceAccount:` member string used in IAM policy bindings.
    pub fn member(&self, project_id: &str) -> String {
        names::service_account_member(&self.service_account_id, project_id)
    }

    pub fn predefined_roles(&self) -> impl Iterator<Item = &RoleSpec> {
        self.roles.iter().filter(|r| r.predefined)
    }

    pub fn custom_roles(&self) -> impl Iterator<Item = &RoleSpec> {
        self.roles.iter().filter(|r| !r.predefined)
    }

    /// Every federated principal that must hold workload-identity-user on
    /// this account. Empty for `impersonate` accounts.
    pub fn federated_principals(&self, project_number: &str, pool_id: &str) -> Vec<String> {
        let Some(request) = &self.credential_request else {
            return vec![];
        };
        if self.access_method != AccessMethod::Wif {
            return vec![];
        }
        request
            .service_account_names
            .iter()
            .map(|name| {
                names::federated_principal(
                    project_number,
                    pool_id,
                    &request.secret_ref.namespace,
                    name,
                )
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.service_account_id.is_empty() {
            return Err(CoreError::MissingField("service_account_id".into()));
        }
        if self.access_method == AccessMethod::Wif && self.credential_request.is_none() {
            return Err(CoreError::MissingCredentialRequest(
                self.service_account_id.clone(),
            ));
        }
        Ok(())
    }
}
