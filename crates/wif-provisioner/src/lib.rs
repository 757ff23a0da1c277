//! wif-provisioner
//!
//! Drift detection and repair for GCP Workload Identity Federation
//! resources, plus the create and delete paths.
//!
//! Public API:
//! - `create()`: register a WIF config, then provision pool, provider,
//!   service accounts, roles and access bindings
//! - `verify()`: fetch a config and run one detection pass
//! - `update()`: detect → reconcile → detect again
//! - `delete()`: tear down GCP resources, then the config itself
//!
//! Work is sequential: at most one read-modify-write is in flight against
//! any policy document.

pub mod detect;
pub mod discrepancy;
pub mod error;
pub mod operation;
pub mod plan;
pub mod policy_update;
pub mod provision;
pub mod reconcile;
pub mod teardown;

use serde::Serialize;
use wif_core::{WifConfig, WifConfigInput};
use wif_gcp::GcpClient;
use wif_ocm::WifConfigStore;

pub use crate::detect::{Detection, DetectionFailure, detect};
pub use crate::discrepancy::{Category, Discrepancy, UnsupportedRole};
pub use crate::error::{ProvisionerError, format_err_chain};
pub use crate::operation::PollConfig;
pub use crate::plan::{ActionType, ExecutionReport, PlanAction};
pub use crate::provision::{ProvisionOptions, provision};
pub use crate::reconcile::{FailedFix, ReconcileReport, reconcile};
pub use crate::teardown::teardown;

#[derive(Debug, Clone, Serialize)]
pub struct CreateOutcome {
    pub config: WifConfig,
    pub report: ExecutionReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub before: Detection,
    pub reconcile: ReconcileReport,
    pub after: Detection,
}

impl UpdateOutcome {
    /// Every fix succeeded and the follow-up pass found nothing.
    pub fn is_converged(&self) -> bool {
        self.reconcile.is_success() && self.after.is_converged()
    }
}

/// Register a new WIF config and provision its GCP resources.
pub async fn create(
    store: &dyn WifConfigStore,
    client: &dyn GcpClient,
    input: &WifConfigInput,
    options: &ProvisionOptions,
) -> Result<CreateOutcome, ProvisionerError> {
    tracing::info!(
        display_name = %input.display_name,
        project = %input.gcp.project_id,
        "creating wif-config"
    );
    let config = store.create_wif_config(input).await?;
    let report = provision(client, &config, options).await?;
    Ok(CreateOutcome { config, report })
}

pub async fn verify(
    store: &dyn WifConfigStore,
    client: &dyn GcpClient,
    id: &str,
) -> Result<Detection, ProvisionerError> {
    let config = store.get_wif_config(id).await?;
    detect(client, &config).await
}

/// Detect, reconcile, then detect again to confirm convergence.
pub async fn update(
    store: &dyn WifConfigStore,
    client: &dyn GcpClient,
    id: &str,
) -> Result<UpdateOutcome, ProvisionerError> {
    let config = store.get_wif_config(id).await?;
    let before = detect(client, &config).await?;
    let reconcile = reconcile(client, &config, &before).await;
    // A clean first pass is the only case where the result is already known.
    let after = if before.discrepancies.is_empty() && before.failures.is_empty() {
        before.clone()
    } else {
        detect(client, &config).await?
    };
    Ok(UpdateOutcome {
        before,
        reconcile,
        after,
    })
}

/// Delete the config's service accounts and pool, then the config.
pub async fn delete(
    store: &dyn WifConfigStore,
    client: &dyn GcpClient,
    id: &str,
    options: &ProvisionOptions,
) -> Result<ExecutionReport, ProvisionerError> {
    let config = store.get_wif_config(id).await?;
    let mut report = teardown(client, &config, options).await?;
    if !options.dry_run {
        store.delete_wif_config(id).await?;
        tracing::info!(wif_config = id, "wif-config deleted");
    }
    report.record("wif-config", id, plan::ActionType::Delete);
    Ok(report)
}
