//! The create path: bring a freshly registered WIF config into existence.
//!
//! Every step checks before it writes, so re-running over a partially
//! provisioned project only fills in what is absent.

use std::collections::BTreeMap;

use wif_core::names::{RESOURCE_DESCRIPTION, TOKEN_CREATOR_ROLE, WORKLOAD_IDENTITY_USER_ROLE};
use wif_core::{AccessMethod, RoleSpec, ServiceAccountSpec, WifConfig};
use wif_gcp::{
    CreateServiceAccount, GcpClient, GcpError, Oidc, Policy, PoolState, WorkloadIdentityPool,
    WorkloadIdentityProvider,
};

use crate::detect::resolve_project_number;
use crate::discrepancy::UnsupportedRole;
use crate::error::ProvisionerError;
use crate::operation::{PollConfig, wait_for_operation};
use crate::plan::{ActionType, ExecutionReport};
use crate::policy_update::{PolicyTarget, update_policy};

#[derive(Debug, Clone, Copy, Default)]
pub struct ProvisionOptions {
    /// Read and plan, but issue no mutating GCP call.
    pub dry_run: bool,
    pub poll: PollConfig,
}

/// Pool, provider, service accounts, project roles, access bindings.
pub async fn provision(
    client: &dyn GcpClient,
    config: &WifConfig,
    options: &ProvisionOptions,
) -> Result<ExecutionReport, ProvisionerError> {
    config.validate()?;
    let mut report = ExecutionReport {
        dry_run: options.dry_run,
        ..Default::default()
    };

    ensure_pool(client, config, &options.poll, &mut report).await?;
    ensure_provider(client, config, &options.poll, &mut report).await?;
    let project_number = resolve_project_number(client, config).await?;

    for sa in &config.gcp.service_accounts {
        ensure_service_account(client, config, sa, &mut report).await?;
    }
    for sa in &config.gcp.service_accounts {
        ensure_roles(client, config, sa, &mut report).await?;
        ensure_access(client, config, sa, &project_number, &mut report).await?;
    }

    tracing::info!(
        wif_config = %config.id,
        dry_run = options.dry_run,
        changes = report.actions.iter().filter(|a| a.action != ActionType::NoOp).count(),
        "provisioning complete"
    );
    Ok(report)
}

/// Create the pool, or undelete it if it was soft-deleted.
pub async fn ensure_pool(
    client: &dyn GcpClient,
    config: &WifConfig,
    poll: &PollConfig,
    report: &mut ExecutionReport,
) -> Result<(), ProvisionerError> {
    let pool_id = config.pool_id();
    let resource = config.pool_resource();
    let with_pool = |e: GcpError| ProvisionerError::from(e).with_resource("workload identity pool", pool_id);

    match client.get_workload_identity_pool(&resource).await {
        Ok(pool) if pool.state == PoolState::Deleted => {
            if !report.dry_run {
                tracing::info!(pool = pool_id, "undeleting workload identity pool");
                let op = client
                    .undelete_workload_identity_pool(&resource)
                    .await
                    .map_err(with_pool)?;
                wait_for_operation(client, op, poll).await?;
            }
            report.record("workload identity pool", pool_id, ActionType::Undelete);
        }
        Ok(_) => {
            tracing::debug!(pool = pool_id, "workload identity pool already exists");
            report.record("workload identity pool", pool_id, ActionType::NoOp);
        }
        Err(err) if err.is_not_found() => {
            if !report.dry_run {
                tracing::info!(pool = pool_id, "creating workload identity pool");
                let pool = WorkloadIdentityPool {
                    display_name: pool_id.to_string(),
                    description: RESOURCE_DESCRIPTION.to_string(),
                    state: PoolState::Active,
                    ..Default::default()
                };
                let parent = wif_core::names::pool_parent(config.project_id());
                let op = client
                    .create_workload_identity_pool(&parent, pool_id, &pool)
                    .await
                    .map_err(with_pool)?;
                wait_for_operation(client, op, poll).await?;
            }
            report.record("workload identity pool", pool_id, ActionType::Create);
        }
        Err(err) => return Err(with_pool(err)),
    }
    Ok(())
}

pub async fn ensure_provider(
    client: &dyn GcpClient,
    config: &WifConfig,
    poll: &PollConfig,
    report: &mut ExecutionReport,
) -> Result<(), ProvisionerError> {
    let spec = config.provider();
    let provider_id = spec.identity_provider_id.as_str();
    let resource = config.provider_resource();
    let with_provider =
        |e: GcpError| ProvisionerError::from(e).with_resource("identity provider", provider_id);

    match client.get_workload_identity_provider(&resource).await {
        Ok(_) => {
            tracing::debug!(provider = provider_id, "identity provider already exists");
            report.record("identity provider", provider_id, ActionType::NoOp);
        }
        Err(err) if err.is_not_found() => {
            if !report.dry_run {
                tracing::info!(
                    provider = provider_id,
                    issuer = %spec.issuer_url,
                    "creating identity provider"
                );
                // The token's `sub` (system:serviceaccount:<ns>:<name>) becomes
                // google.subject, which federated principals match on.
                let attribute_mapping =
                    BTreeMap::from([("google.subject".to_string(), "assertion.sub".to_string())]);
                let provider = WorkloadIdentityProvider {
                    display_name: provider_id.to_string(),
                    description: RESOURCE_DESCRIPTION.to_string(),
                    state: PoolState::Active,
                    attribute_mapping,
                    oidc: Some(Oidc {
                        issuer_uri: spec.issuer_url.clone(),
                        allowed_audiences: spec.allowed_audiences.clone(),
                        jwks_json: spec.jwks.clone(),
                    }),
                    ..Default::default()
                };
                let op = client
                    .create_workload_identity_provider(
                        &config.pool_resource(),
                        provider_id,
                        &provider,
                    )
                    .await
                    .map_err(with_provider)?;
                wait_for_operation(client, op, poll).await?;
            }
            report.record("identity provider", provider_id, ActionType::Create);
        }
        Err(err) => return Err(with_provider(err)),
    }
    Ok(())
}

/// Create the account if absent. An `AlreadyExists` race counts as present.
pub async fn ensure_service_account(
    client: &dyn GcpClient,
    config: &WifConfig,
    sa: &ServiceAccountSpec,
    report: &mut ExecutionReport,
) -> Result<(), ProvisionerError> {
    let id = sa.service_account_id.as_str();
    let project = config.project_id();
    let with_sa = |e: GcpError| ProvisionerError::from(e).with_resource("service account", id);

    match client.get_service_account(&sa.resource_name(project)).await {
        Ok(_) => {
            report.record("service account", id, ActionType::NoOp);
            return Ok(());
        }
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(with_sa(err)),
    }

    if !report.dry_run {
        let request = CreateServiceAccount::new(
            id,
            &format!("{}-{id}", config.display_name),
            &format!("{RESOURCE_DESCRIPTION} for WIF config {}", config.display_name),
        );
        match client.create_service_account(project, &request).await {
            Ok(_) => tracing::info!(service_account = id, "created service account"),
            Err(err) if err.is_already_exists() => {
                tracing::debug!(service_account = id, "service account appeared concurrently");
                report.record("service account", id, ActionType::NoOp);
                return Ok(());
            }
            Err(err) => return Err(with_sa(err)),
        }
    }
    report.record("service account", id, ActionType::Create);
    Ok(())
}

/// Grant every predefined role on the project policy.
///
/// A role already held through a basename-matching binding counts as held.
/// Custom roles are skipped and reported as unapplied.
pub async fn ensure_roles(
    client: &dyn GcpClient,
    config: &WifConfig,
    sa: &ServiceAccountSpec,
    report: &mut ExecutionReport,
) -> Result<(), ProvisionerError> {
    let id = sa.service_account_id.as_str();
    for role in sa.custom_roles() {
        tracing::warn!(
            service_account = id,
            role = %role.role_id,
            "skipping custom role, custom roles are not supported"
        );
        report.unapplied_roles.push(UnsupportedRole {
            service_account_id: id.to_string(),
            role_id: role.role_id.clone(),
        });
    }

    let roles: Vec<&RoleSpec> = sa.predefined_roles().collect();
    if roles.is_empty() {
        return Ok(());
    }
    let member = sa.member(config.project_id());
    let project = config.project_id();

    let mut granted = Vec::new();
    if report.dry_run {
        let mut policy = client
            .get_project_iam_policy(project)
            .await
            .map_err(|e| ProvisionerError::from(e).with_resource("project", project))?;
        granted = grant_roles(&mut policy, &roles, &member);
    } else {
        update_policy(client, PolicyTarget::Project(project), |policy| {
            granted = grant_roles(policy, &roles, &member);
            Ok(!granted.is_empty())
        })
        .await?;
    }

    for role_id in granted {
        tracing::info!(service_account = id, role = %role_id, dry_run = report.dry_run, "bound role");
        report.record("role binding", &format!("{id}: roles/{role_id}"), ActionType::Update);
    }
    Ok(())
}

fn grant_roles(policy: &mut Policy, roles: &[&RoleSpec], member: &str) -> Vec<String> {
    let mut granted = Vec::new();
    for role in roles {
        if !policy.has_member_by_basename(&role.role_id, member) {
            policy.add_member(&role.resource_name(), member);
            granted.push(role.role_id.clone());
        }
    }
    granted
}

/// Grant the principals that may act as this account: token-creator for
/// the impersonator, or workload-identity-user for each federated principal.
pub async fn ensure_access(
    client: &dyn GcpClient,
    config: &WifConfig,
    sa: &ServiceAccountSpec,
    project_number: &str,
    report: &mut ExecutionReport,
) -> Result<(), ProvisionerError> {
    let id = sa.service_account_id.as_str();
    let grants: Vec<(&str, String)> = match sa.access_method {
        AccessMethod::Impersonate => vec![(TOKEN_CREATOR_ROLE, config.impersonator_member())],
        AccessMethod::Wif => sa
            .federated_principals(project_number, config.pool_id())
            .into_iter()
            .map(|principal| (WORKLOAD_IDENTITY_USER_ROLE, principal))
            .collect(),
    };
    let resource = sa.resource_name(config.project_id());

    let mut granted = Vec::new();
    if report.dry_run {
        match client.get_service_account_iam_policy(&resource).await {
            Ok(mut policy) => granted = grant_access(&mut policy, &grants),
            // Account not created yet: every grant is pending.
            Err(err) if err.is_not_found() => {
                granted = grants.iter().map(|(_, member)| member.clone()).collect();
            }
            Err(err) => {
                return Err(ProvisionerError::from(err).with_resource("service account policy", id));
            }
        }
    } else {
        update_policy(client, PolicyTarget::ServiceAccount(&resource), |policy| {
            granted = grant_access(policy, &grants);
            Ok(!granted.is_empty())
        })
        .await?;
    }

    for member in granted {
        tracing::info!(service_account = id, member = %member, dry_run = report.dry_run, "granted access");
        report.record("access binding", &format!("{id}: {member}"), ActionType::Update);
    }
    Ok(())
}

fn grant_access(policy: &mut Policy, grants: &[(&str, String)]) -> Vec<String> {
    grants
        .iter()
        .filter(|(role, member)| policy.add_member(role, member))
        .map(|(_, member)| member.clone())
        .collect()
}
