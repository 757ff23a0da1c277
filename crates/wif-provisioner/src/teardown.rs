//! The delete path: remove the GCP resources a WIF config created.

use wif_core::WifConfig;
use wif_gcp::{GcpClient, PoolState};

use crate::error::ProvisionerError;
use crate::operation::wait_for_operation;
use crate::plan::{ActionType, ExecutionReport};
use crate::provision::ProvisionOptions;

/// Delete every service account, then the pool. Already-absent resources
/// and an already soft-deleted pool are not errors.
pub async fn teardown(
    client: &dyn GcpClient,
    config: &WifConfig,
    options: &ProvisionOptions,
) -> Result<ExecutionReport, ProvisionerError> {
    let mut report = ExecutionReport {
        dry_run: options.dry_run,
        ..Default::default()
    };
    let project = config.project_id();

    for sa in &config.gcp.service_accounts {
        let id = sa.service_account_id.as_str();
        let resource = sa.resource_name(project);
        match client.get_service_account(&resource).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                report.record("service account", id, ActionType::NoOp);
                continue;
            }
            Err(err) => {
                return Err(ProvisionerError::from(err).with_resource("service account", id));
            }
        }
        if !options.dry_run {
            match client.delete_service_account(&resource).await {
                Ok(()) => tracing::info!(service_account = id, "deleted service account"),
                Err(err) if err.is_not_found() => {}
                Err(err) => {
                    return Err(ProvisionerError::from(err).with_resource("service account", id));
                }
            }
        }
        report.record("service account", id, ActionType::Delete);
    }

    let pool_id = config.pool_id();
    let resource = config.pool_resource();
    match client.get_workload_identity_pool(&resource).await {
        Ok(pool) if pool.state != PoolState::Deleted => {
            if !options.dry_run {
                let op = client
                    .delete_workload_identity_pool(&resource)
                    .await
                    .map_err(|e| {
                        ProvisionerError::from(e).with_resource("workload identity pool", pool_id)
                    })?;
                wait_for_operation(client, op, &options.poll).await?;
                tracing::info!(pool = pool_id, "deleted workload identity pool");
            }
            report.record("workload identity pool", pool_id, ActionType::Delete);
        }
        Ok(_) => report.record("workload identity pool", pool_id, ActionType::NoOp),
        Err(err) if err.is_not_found() => {
            report.record("workload identity pool", pool_id, ActionType::NoOp)
        }
        Err(err) => {
            return Err(ProvisionerError::from(err).with_resource("workload identity pool", pool_id));
        }
    }

    Ok(report)
}
