use wif_core::names;
use wif_gcp::{
    CreateServiceAccount, GcpClient, GcpError, MemoryGcp, PoolState, WorkloadIdentityPool,
};

const PROJECT: &str = "p1";

fn gcp() -> MemoryGcp {
    MemoryGcp::new().with_project(PROJECT, "123456")
}

async fn create_sa(gcp: &MemoryGcp, id: &str) -> String {
    gcp.create_service_account(PROJECT, &CreateServiceAccount::new(id, id, "test"))
        .await
        .unwrap();
    names::service_account_resource(id, PROJECT)
}

#[tokio::test]
async fn create_service_account_twice_reports_already_exists() {
    let gcp = gcp();
    create_sa(&gcp, "osd-deployer").await;
    let err = gcp
        .create_service_account(
            PROJECT,
            &CreateServiceAccount::new("osd-deployer", "d", "test"),
        )
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(gcp.mutation_count(), 1);
}

#[tokio::test]
async fn unknown_project_is_not_found() {
    let gcp = gcp();
    let err = gcp.project_number("nope").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(gcp.project_number(PROJECT).await.unwrap(), "123456");
}

#[tokio::test]
async fn deleting_an_account_leaves_tombstone_members() {
    let gcp = gcp();
    let resource = create_sa(&gcp, "osd-deployer").await;
    let member = names::service_account_member("osd-deployer", PROJECT);
    gcp.edit_project_policy(PROJECT, |p| {
        p.add_member("roles/compute.admin", &member);
    });

    let unique_id = gcp.service_account(&resource).unwrap().unique_id;
    gcp.delete_service_account(&resource).await.unwrap();

    let policy = gcp.project_policy(PROJECT);
    assert!(!policy.has_member("roles/compute.admin", &member));
    let tombstone = format!("deleted:{member}?uid={unique_id}");
    assert!(policy.has_member("roles/compute.admin", &tombstone));
    assert!(gcp.get_service_account(&resource).await.unwrap_err().is_not_found());

    gcp.undelete_service_account(&names::service_account_unique_resource(&unique_id, PROJECT))
        .await
        .unwrap();
    assert!(gcp.project_policy(PROJECT).has_member("roles/compute.admin", &member));
}

#[tokio::test]
async fn stale_etag_is_rejected() {
    let gcp = gcp();
    let mut policy = gcp.get_project_iam_policy(PROJECT).await.unwrap();
    gcp.edit_project_policy(PROJECT, |p| {
        p.add_member("roles/viewer", "user:someone@example.com");
    });
    policy.add_member("roles/compute.admin", "serviceAccount:x");
    let err = gcp.set_project_iam_policy(PROJECT, &policy).await.unwrap_err();
    assert!(err.is_conflict());

    let mut fresh = gcp.get_project_iam_policy(PROJECT).await.unwrap();
    fresh.add_member("roles/compute.admin", "serviceAccount:x");
    let stored = gcp.set_project_iam_policy(PROJECT, &fresh).await.unwrap();
    assert_ne!(stored.etag, fresh.etag);
    assert!(stored.has_member("roles/viewer", "user:someone@example.com"));
}

#[tokio::test]
async fn injected_conflicts_fail_the_next_writes() {
    let gcp = gcp();
    gcp.inject_policy_conflicts(1);
    let policy = gcp.get_project_iam_policy(PROJECT).await.unwrap();
    assert!(gcp.set_project_iam_policy(PROJECT, &policy).await.unwrap_err().is_conflict());
    gcp.set_project_iam_policy(PROJECT, &policy).await.unwrap();
}

#[tokio::test]
async fn deleted_pool_is_soft_deleted_and_can_be_undeleted() {
    let gcp = gcp();
    let parent = names::pool_parent(PROJECT);
    let resource = names::pool_resource(PROJECT, "pool-1");
    gcp.create_workload_identity_pool(&parent, "pool-1", &WorkloadIdentityPool::default())
        .await
        .unwrap();
    gcp.delete_workload_identity_pool(&resource).await.unwrap();

    let pool = gcp.get_workload_identity_pool(&resource).await.unwrap();
    assert_eq!(pool.state, PoolState::Deleted);
    let err = gcp
        .create_workload_identity_pool(&parent, "pool-1", &WorkloadIdentityPool::default())
        .await
        .unwrap_err();
    assert!(err.is_already_exists());

    gcp.undelete_workload_identity_pool(&resource).await.unwrap();
    assert_eq!(gcp.pool(&resource).unwrap().state, PoolState::Active);
}

#[tokio::test]
async fn pending_operations_complete_after_polls() {
    let gcp = gcp();
    gcp.set_pending_polls(2);
    let op = gcp
        .create_workload_identity_pool(
            &names::pool_parent(PROJECT),
            "pool-1",
            &WorkloadIdentityPool::default(),
        )
        .await
        .unwrap();
    assert!(!op.done);
    assert!(!gcp.get_operation(&op.name).await.unwrap().done);
    assert!(gcp.get_operation(&op.name).await.unwrap().done);
}

#[tokio::test]
async fn denied_resources_fail_with_permission_denied() {
    let gcp = gcp();
    let resource = create_sa(&gcp, "osd-deployer").await;
    gcp.deny(&resource);
    let err = gcp.get_service_account_iam_policy(&resource).await.unwrap_err();
    assert!(matches!(err, GcpError::PermissionDenied(_)));
}
