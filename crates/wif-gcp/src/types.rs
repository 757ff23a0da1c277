use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// IAM service account as returned by `projects.serviceAccounts.get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceAccount {
    /// `projects/{project}/serviceAccounts/{email}`
    pub name: String,
    pub project_id: String,
    pub unique_id: String,
    pub email: String,
    pub display_name: String,
    pub description: String,
    pub disabled: bool,
}

/// Body of `projects.serviceAccounts.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceAccount {
    pub account_id: String,
    pub service_account: ServiceAccountDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceAccountDetails {
    pub display_name: String,
    pub description: String,
}

impl CreateServiceAccount {
    pub fn new(account_id: &str, display_name: &str, description: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            service_account: ServiceAccountDetails {
                display_name: display_name.to_string(),
                description: description.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolState {
    #[default]
    StateUnspecified,
    Active,
    /// Soft-deleted; can be undeleted for 30 days.
    Deleted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadIdentityPool {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub state: PoolState,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Oidc {
    pub issuer_uri: String,
    pub allowed_audiences: Vec<String>,
    pub jwks_json: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadIdentityProvider {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub state: PoolState,
    pub disabled: bool,
    pub attribute_mapping: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oidc: Option<Oidc>,
}

/// A long-running operation returned by pool and provider mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operation {
    pub name: String,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationStatus {
    pub code: i32,
    pub message: String,
}

impl Operation {
    /// An operation that completed synchronously.
    pub fn completed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            done: true,
            error: None,
        }
    }
}
