mod support;

use std::sync::atomic::{AtomicUsize, Ordering};

use support::{provisioned, sa_resource};
use wif_core::BoxFuture;
use wif_gcp::{
    CreateServiceAccount, GcpClient, GcpError, MemoryGcp, Operation, Policy, ServiceAccount,
    WorkloadIdentityPool, WorkloadIdentityProvider,
};
use wif_provisioner::{Category, Discrepancy};

/// Re-enables `resource` just before its second read, as another operator
/// repairing the same drift between detection and repair would.
struct ConcurrentRepair<'g> {
    inner: &'g MemoryGcp,
    resource: String,
    reads: AtomicUsize,
}

impl GcpClient for ConcurrentRepair<'_> {
    fn create_workload_identity_pool<'a>(
        &'a self,
        parent: &'a str,
        pool_id: &'a str,
        pool: &'a WorkloadIdentityPool,
    ) -> BoxFuture<'a, Result<Operation, GcpError>> {
        self.inner.create_workload_identity_pool(parent, pool_id, pool)
    }

    fn get_workload_identity_pool<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<WorkloadIdentityPool, GcpError>> {
        self.inner.get_workload_identity_pool(resource)
    }

    fn delete_workload_identity_pool<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<Operation, GcpError>> {
        self.inner.delete_workload_identity_pool(resource)
    }

    fn undelete_workload_identity_pool<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<Operation, GcpError>> {
        self.inner.undelete_workload_identity_pool(resource)
    }

    fn create_workload_identity_provider<'a>(
        &'a self,
        pool: &'a str,
        provider_id: &'a str,
        provider: &'a WorkloadIdentityProvider,
    ) -> BoxFuture<'a, Result<Operation, GcpError>> {
        self.inner
            .create_workload_identity_provider(pool, provider_id, provider)
    }

    fn get_workload_identity_provider<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<WorkloadIdentityProvider, GcpError>> {
        self.inner.get_workload_identity_provider(resource)
    }

    fn get_operation<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Operation, GcpError>> {
        self.inner.get_operation(name)
    }

    fn create_service_account<'a>(
        &'a self,
        project_id: &'a str,
        request: &'a CreateServiceAccount,
    ) -> BoxFuture<'a, Result<ServiceAccount, GcpError>> {
        self.inner.create_service_account(project_id, request)
    }

    fn get_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<ServiceAccount, GcpError>> {
        Box::pin(async move {
            if resource == self.resource && self.reads.fetch_add(1, Ordering::SeqCst) == 1 {
                self.inner.enable_service_account(resource).await?;
            }
            self.inner.get_service_account(resource).await
        })
    }

    fn delete_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>> {
        self.inner.delete_service_account(resource)
    }

    fn undelete_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>> {
        self.inner.undelete_service_account(resource)
    }

    fn enable_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>> {
        self.inner.enable_service_account(resource)
    }

    fn disable_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>> {
        self.inner.disable_service_account(resource)
    }

    fn get_service_account_iam_policy<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<Policy, GcpError>> {
        self.inner.get_service_account_iam_policy(resource)
    }

    fn set_service_account_iam_policy<'a>(
        &'a self,
        resource: &'a str,
        policy: &'a Policy,
    ) -> BoxFuture<'a, Result<Policy, GcpError>> {
        self.inner.set_service_account_iam_policy(resource, policy)
    }

    fn get_project_iam_policy<'a>(
        &'a self,
        project_id: &'a str,
    ) -> BoxFuture<'a, Result<Policy, GcpError>> {
        self.inner.get_project_iam_policy(project_id)
    }

    fn set_project_iam_policy<'a>(
        &'a self,
        project_id: &'a str,
        policy: &'a Policy,
    ) -> BoxFuture<'a, Result<Policy, GcpError>> {
        self.inner.set_project_iam_policy(project_id, policy)
    }

    fn project_number<'a>(
        &'a self,
        project_id: &'a str,
    ) -> BoxFuture<'a, Result<String, GcpError>> {
        self.inner.project_number(project_id)
    }
}

#[tokio::test]
async fn drift_repaired_elsewhere_still_converges() {
    let env = provisioned().await;
    let resource = sa_resource("osd-deployer");
    env.gcp.disable_service_account(&resource).await.unwrap();

    let client = ConcurrentRepair {
        inner: &env.gcp,
        resource: resource.clone(),
        reads: AtomicUsize::new(0),
    };
    let outcome = wif_provisioner::update(&env.store, &client, &env.config.id)
        .await
        .unwrap();

    assert_eq!(
        outcome.before.discrepancies,
        vec![Discrepancy::disabled("osd-deployer")]
    );
    assert!(outcome.reconcile.applied.is_empty());
    assert_eq!(outcome.reconcile.already_satisfied.len(), 1);
    assert_eq!(
        outcome.reconcile.already_satisfied[0].category,
        Category::ServiceAccountDisabled
    );
    assert!(outcome.after.discrepancies.is_empty());
    assert!(outcome.is_converged());
}

#[tokio::test]
async fn clean_project_is_detected_once() {
    let env = provisioned().await;
    let outcome = wif_provisioner::update(&env.store, &env.gcp, &env.config.id)
        .await
        .unwrap();
    assert!(outcome.is_converged());
    assert!(outcome.reconcile.applied.is_empty());
    assert_eq!(env.gcp.mutation_count(), 0);
}
