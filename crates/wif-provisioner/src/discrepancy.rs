use std::fmt;

use serde::{Deserialize, Serialize};
use wif_core::names::{TOKEN_CREATOR_ROLE, WORKLOAD_IDENTITY_USER_ROLE};

/// Kind of drift. Declaration order is repair order: existence and
/// enablement before access bindings before project roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    ServiceAccountMissing,
    ServiceAccountDisabled,
    BindingMissingImpersonation,
    BindingMissingWorkloadIdentity,
    RoleMissing,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceAccountMissing => "service-account-missing",
            Self::ServiceAccountDisabled => "service-account-disabled",
            Self::BindingMissingImpersonation => "binding-missing-impersonation",
            Self::BindingMissingWorkloadIdentity => "binding-missing-workload-identity",
            Self::RoleMissing => "role-missing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected unit of drift, carrying what its fix needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub category: Category,
    pub service_account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    /// Principal missing from the account's IAM policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

impl Discrepancy {
    fn new(category: Category, service_account_id: &str) -> Self {
        Self {
            category,
            service_account_id: service_account_id.to_string(),
            role_id: None,
            member: None,
        }
    }

    pub fn missing(service_account_id: &str) -> Self {
        Self::new(Category::ServiceAccountMissing, service_account_id)
    }

    pub fn disabled(service_account_id: &str) -> Self {
        Self::new(Category::ServiceAccountDisabled, service_account_id)
    }

    pub fn impersonation(service_account_id: &str, impersonator_member: &str) -> Self {
        Self {
            member: Some(impersonator_member.to_string()),
            ..Self::new(Category::BindingMissingImpersonation, service_account_id)
        }
    }

    pub fn workload_identity(service_account_id: &str, principal: &str) -> Self {
        Self {
            member: Some(principal.to_string()),
            ..Self::new(Category::BindingMissingWorkloadIdentity, service_account_id)
        }
    }

    pub fn role(service_account_id: &str, role_id: &str) -> Self {
        Self {
            role_id: Some(role_id.to_string()),
            ..Self::new(Category::RoleMissing, service_account_id)
        }
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let id = &self.service_account_id;
        let member = self.member.as_deref().unwrap_or_default();
        match self.category {
            Category::ServiceAccountMissing => write!(f, "service account '{id}' is missing"),
            Category::ServiceAccountDisabled => write!(f, "service account '{id}' is disabled"),
            Category::BindingMissingImpersonation => write!(
                f,
                "service account '{id}' is missing binding {TOKEN_CREATOR_ROLE} for {member}"
            ),
            Category::BindingMissingWorkloadIdentity => write!(
                f,
                "service account '{id}' is missing binding {WORKLOAD_IDENTITY_USER_ROLE} for {member}"
            ),
            Category::RoleMissing => write!(
                f,
                "service account '{id}' is missing role '{}'",
                self.role_id.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// A declared custom role. Never checked or applied, always reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedRole {
    pub service_account_id: String,
    pub role_id: String,
}

impl fmt::Display for UnsupportedRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "custom role '{}' on service account '{}' is not supported and was not applied",
            self.role_id, self.service_account_id
        )
    }
}
