use wif_core::BoxFuture;

use crate::error::GcpError;
use crate::policy::Policy;
use crate::types::{
    CreateServiceAccount, Operation, ServiceAccount, WorkloadIdentityPool,
    WorkloadIdentityProvider,
};

/// One method per GCP operation used by WIF provisioning.
///
/// Every method is a single round trip taking fully-qualified resource
/// names (see [`wif_core::names`]). Implementations keep no local state
/// about the cloud, perform no retries, and return the provider's error
/// verbatim tagged with a [`GcpError`] kind. Idempotency is the caller's
/// job: check existence before writing.
///
/// Methods return boxed futures for dyn compatibility.
pub trait GcpClient: Send + Sync {
    // ── workload identity pools ───────────────────────────────────────────

    /// `parent` is `projects/{project}/locations/global`.
    fn create_workload_identity_pool<'a>(
        &'a self,
        parent: &'a str,
        pool_id: &'a str,
        pool: &'a WorkloadIdentityPool,
    ) -> BoxFuture<'a, Result<Operation, GcpError>>;

    fn get_workload_identity_pool<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<WorkloadIdentityPool, GcpError>>;

    fn delete_workload_identity_pool<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<Operation, GcpError>>;

    fn undelete_workload_identity_pool<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<Operation, GcpError>>;

    // ── OIDC providers ────────────────────────────────────────────────────

    /// `pool` is the full pool resource name.
    fn create_workload_identity_provider<'a>(
        &'a self,
        pool: &'a str,
        provider_id: &'a str,
        provider: &'a WorkloadIdentityProvider,
    ) -> BoxFuture<'a, Result<Operation, GcpError>>;

    fn get_workload_identity_provider<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<WorkloadIdentityProvider, GcpError>>;

    /// Poll a long-running operation by name.
    fn get_operation<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Operation, GcpError>>;

    // ── service accounts ──────────────────────────────────────────────────

    fn create_service_account<'a>(
        &'a self,
        project_id: &'a str,
        request: &'a CreateServiceAccount,
    ) -> BoxFuture<'a, Result<ServiceAccount, GcpError>>;

    fn get_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<ServiceAccount, GcpError>>;

    fn delete_service_account<'a>(&'a self, resource: &'a str)
    -> BoxFuture<'a, Result<(), GcpError>>;

    /// `resource` must address the account by unique id, not email.
    fn undelete_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>>;

    fn enable_service_account<'a>(&'a self, resource: &'a str)
    -> BoxFuture<'a, Result<(), GcpError>>;

    fn disable_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>>;

    // ── IAM policies ──────────────────────────────────────────────────────

    fn get_service_account_iam_policy<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<Policy, GcpError>>;

    fn set_service_account_iam_policy<'a>(
        &'a self,
        resource: &'a str,
        policy: &'a Policy,
    ) -> BoxFuture<'a, Result<Policy, GcpError>>;

    fn get_project_iam_policy<'a>(
        &'a self,
        project_id: &'a str,
    ) -> BoxFuture<'a, Result<Policy, GcpError>>;

    fn set_project_iam_policy<'a>(
        &'a self,
        project_id: &'a str,
        policy: &'a Policy,
    ) -> BoxFuture<'a, Result<Policy, GcpError>>;

    // ── projects ──────────────────────────────────────────────────────────

    /// Resolve the numeric project id.
    fn project_number<'a>(&'a self, project_id: &'a str) -> BoxFuture<'a, Result<String, GcpError>>;
}
