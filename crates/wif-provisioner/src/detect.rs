//! Read-only comparison of live GCP state against a WIF config.

use serde::Serialize;
use wif_core::names::{TOKEN_CREATOR_ROLE, WORKLOAD_IDENTITY_USER_ROLE};
use wif_core::{AccessMethod, ServiceAccountSpec, WifConfig};
use wif_gcp::{GcpClient, Policy};

use crate::discrepancy::{Discrepancy, UnsupportedRole};
use crate::error::{ProvisionerError, format_err_chain};

/// A service account whose checks could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionFailure {
    pub service_account_id: String,
    pub error: String,
}

/// Result of one detection pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Detection {
    /// Project number the federated principals were derived from.
    pub project_number: String,
    pub discrepancies: Vec<Discrepancy>,
    pub failures: Vec<DetectionFailure>,
    pub unsupported: Vec<UnsupportedRole>,
}

impl Detection {
    /// No drift and every account was fully checked. Unsupported custom
    /// roles do not count against convergence.
    pub fn is_converged(&self) -> bool {
        self.discrepancies.is_empty() && self.failures.is_empty()
    }
}

/// The descriptor's project number, or the one GCP reports when empty.
pub async fn resolve_project_number(
    client: &dyn GcpClient,
    config: &WifConfig,
) -> Result<String, ProvisionerError> {
    if !config.gcp.project_number.is_empty() {
        return Ok(config.gcp.project_number.clone());
    }
    let number = client
        .project_number(config.project_id())
        .await
        .map_err(|e| ProvisionerError::from(e).with_resource("project", config.project_id()))?;
    tracing::debug!(project = config.project_id(), number = %number, "resolved project number");
    Ok(number)
}

/// Check every service account of `config` and collect all drift.
///
/// Issues reads only. An error resolving the project or fetching its policy
/// aborts the pass. An error on one account is recorded as a failure for
/// that account and its partial findings are dropped, so an account is
/// never reported clean when it could not be checked.
pub async fn detect(
    client: &dyn GcpClient,
    config: &WifConfig,
) -> Result<Detection, ProvisionerError> {
    config.validate()?;
    let project_number = resolve_project_number(client, config).await?;
    let project_policy = client
        .get_project_iam_policy(config.project_id())
        .await
        .map_err(|e| ProvisionerError::from(e).with_resource("project", config.project_id()))?;

    let mut detection = Detection {
        project_number,
        ..Default::default()
    };

    for sa in &config.gcp.service_accounts {
        detection
            .unsupported
            .extend(sa.custom_roles().map(|role| UnsupportedRole {
                service_account_id: sa.service_account_id.clone(),
                role_id: role.role_id.clone(),
            }));

        match detect_service_account(
            client,
            config,
            sa,
            &detection.project_number,
            &project_policy,
        )
        .await
        {
            Ok(found) => {
                for discrepancy in &found {
                    tracing::debug!(
                        service_account = %sa.service_account_id,
                        category = %discrepancy.category,
                        "drift detected"
                    );
                }
                detection.discrepancies.extend(found);
            }
            Err(err) => {
                tracing::warn!(
                    service_account = %sa.service_account_id,
                    error = %err,
                    "could not check service account"
                );
                detection.failures.push(DetectionFailure {
                    service_account_id: sa.service_account_id.clone(),
                    error: format_err_chain(&err),
                });
            }
        }
    }

    tracing::info!(
        wif_config = %config.id,
        discrepancies = detection.discrepancies.len(),
        failures = detection.failures.len(),
        "detection pass complete"
    );
    Ok(detection)
}

async fn detect_service_account(
    client: &dyn GcpClient,
    config: &WifConfig,
    sa: &ServiceAccountSpec,
    project_number: &str,
    project_policy: &Policy,
) -> Result<Vec<Discrepancy>, ProvisionerError> {
    let id = sa.service_account_id.as_str();
    let resource = sa.resource_name(config.project_id());
    let mut found = Vec::new();

    let account = match client.get_service_account(&resource).await {
        Ok(account) => account,
        // Everything else about a missing account is a consequence of it.
        Err(err) if err.is_not_found() => return Ok(vec![Discrepancy::missing(id)]),
        Err(err) => return Err(ProvisionerError::from(err).with_resource("service account", id)),
    };
    if account.disabled {
        found.push(Discrepancy::disabled(id));
    }

    let policy = client
        .get_service_account_iam_policy(&resource)
        .await
        .map_err(|e| ProvisionerError::from(e).with_resource("service account policy", id))?;
    match sa.access_method {
        AccessMethod::Impersonate => {
            let member = config.impersonator_member();
            if !policy.has_member(TOKEN_CREATOR_ROLE, &member) {
                found.push(Discrepancy::impersonation(id, &member));
            }
        }
        AccessMethod::Wif => {
            for principal in sa.federated_principals(project_number, config.pool_id()) {
                if !policy.has_member(WORKLOAD_IDENTITY_USER_ROLE, &principal) {
                    found.push(Discrepancy::workload_identity(id, &principal));
                }
            }
        }
    }

    let member = sa.member(config.project_id());
    for role in sa.predefined_roles() {
        if !project_policy.has_member_by_basename(&role.role_id, &member) {
            found.push(Discrepancy::role(id, &role.role_id));
        }
    }

    Ok(found)
}
