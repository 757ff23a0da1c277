//! Targeted repair of detected drift.

use std::collections::HashSet;

use serde::Serialize;
use wif_core::names::{self, TOKEN_CREATOR_ROLE, WORKLOAD_IDENTITY_USER_ROLE};
use wif_core::{CoreError, WifConfig};
use wif_gcp::GcpClient;

use crate::detect::Detection;
use crate::discrepancy::{Category, Discrepancy, UnsupportedRole};
use crate::error::{ProvisionerError, format_err_chain};
use crate::plan::ExecutionReport;
use crate::policy_update::{PolicyTarget, update_policy};
use crate::provision::{ensure_access, ensure_roles, ensure_service_account};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFix {
    pub discrepancy: Discrepancy,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    /// Fixes that issued at least one write.
    pub applied: Vec<Discrepancy>,
    /// The pre-check found the drift already gone.
    pub already_satisfied: Vec<Discrepancy>,
    pub failed: Vec<FailedFix>,
    pub unapplied_roles: Vec<UnsupportedRole>,
}

impl ReconcileReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Apply one fix per discrepancy, in category order.
///
/// A failed fix does not stop the run; every failure is collected. When
/// restoring a missing account fails, that account's other fixes are
/// marked failed without being attempted. The result is not re-verified
/// here.
pub async fn reconcile(
    client: &dyn GcpClient,
    config: &WifConfig,
    detection: &Detection,
) -> ReconcileReport {
    let mut pending: Vec<&Discrepancy> = detection.discrepancies.iter().collect();
    pending.sort_by_key(|d| d.category);

    let mut report = ReconcileReport {
        unapplied_roles: detection.unsupported.clone(),
        ..Default::default()
    };
    let mut unrestorable: HashSet<&str> = HashSet::new();

    for discrepancy in pending {
        let id = discrepancy.service_account_id.as_str();
        if unrestorable.contains(id) {
            report.failed.push(FailedFix {
                discrepancy: discrepancy.clone(),
                error: format!("skipped: service account '{id}' could not be restored"),
            });
            continue;
        }

        match apply_fix(client, config, &detection.project_number, discrepancy).await {
            Ok(true) => {
                tracing::info!(
                    service_account = id,
                    category = %discrepancy.category,
                    "fix applied"
                );
                report.applied.push(discrepancy.clone());
            }
            Ok(false) => {
                tracing::debug!(
                    service_account = id,
                    category = %discrepancy.category,
                    "already satisfied"
                );
                report.already_satisfied.push(discrepancy.clone());
            }
            Err(err) => {
                tracing::warn!(
                    service_account = id,
                    category = %discrepancy.category,
                    error = %err,
                    "fix failed"
                );
                if discrepancy.category == Category::ServiceAccountMissing {
                    unrestorable.insert(id);
                }
                report.failed.push(FailedFix {
                    discrepancy: discrepancy.clone(),
                    error: format_err_chain(&err),
                });
            }
        }
    }

    report
}

/// Returns whether a write was issued.
async fn apply_fix(
    client: &dyn GcpClient,
    config: &WifConfig,
    project_number: &str,
    discrepancy: &Discrepancy,
) -> Result<bool, ProvisionerError> {
    let id = discrepancy.service_account_id.as_str();
    let project = config.project_id();
    let resource = names::service_account_resource(id, project);

    match discrepancy.category {
        Category::ServiceAccountMissing => {
            let sa = config
                .service_account(id)
                .ok_or_else(|| ProvisionerError::UnknownServiceAccount(id.to_string()))?;
            // A recreated account has an empty policy and its old project
            // memberships were tombstoned, so restore it as the create path would.
            let mut plan = ExecutionReport::default();
            ensure_service_account(client, config, sa, &mut plan).await?;
            ensure_roles(client, config, sa, &mut plan).await?;
            ensure_access(client, config, sa, project_number, &mut plan).await?;
            Ok(plan.has_changes())
        }
        Category::ServiceAccountDisabled => {
            let account = client
                .get_service_account(&resource)
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource("service account", id))?;
            if !account.disabled {
                return Ok(false);
            }
            client
                .enable_service_account(&resource)
                .await
                .map_err(|e| ProvisionerError::from(e).with_resource("service account", id))?;
            Ok(true)
        }
        Category::BindingMissingImpersonation => {
            let member = discrepancy
                .member
                .clone()
                .unwrap_or_else(|| config.impersonator_member());
            update_policy(client, PolicyTarget::ServiceAccount(&resource), |policy| {
                Ok(policy.add_member(TOKEN_CREATOR_ROLE, &member))
            })
            .await
        }
        Category::BindingMissingWorkloadIdentity => {
            let principal = discrepancy
                .member
                .as_deref()
                .ok_or_else(|| CoreError::MissingField("member".into()))?;
            update_policy(client, PolicyTarget::ServiceAccount(&resource), |policy| {
                Ok(policy.add_member(WORKLOAD_IDENTITY_USER_ROLE, principal))
            })
            .await
        }
        Category::RoleMissing => {
            let role_id = discrepancy
                .role_id
                .as_deref()
                .ok_or_else(|| CoreError::MissingField("role_id".into()))?;
            let member = names::service_account_member(id, project);
            update_policy(client, PolicyTarget::Project(project), |policy| {
                policy
                    .add_member_by_basename(role_id, &member)
                    .ok_or_else(|| ProvisionerError::RoleBindingMissing {
                        role_id: role_id.to_string(),
                    })
            })
            .await
        }
    }
}
