mod support;

use support::{Env, PROJECT, principal, provisioned, sa_member, sa_resource};
use wif_core::names::{TOKEN_CREATOR_ROLE, WORKLOAD_IDENTITY_USER_ROLE};
use wif_core::RoleSpec;
use wif_gcp::GcpClient;
use wif_provisioner::{Category, Detection, Discrepancy, detect, reconcile};

/// detect → reconcile → detect must end converged with every fix applied.
async fn assert_repairs(env: &Env, expected: Category) {
    let before = detect(&env.gcp, &env.config).await.unwrap();
    assert_eq!(before.discrepancies.len(), 1, "{:?}", before.discrepancies);
    assert_eq!(before.discrepancies[0].category, expected);

    let report = reconcile(&env.gcp, &env.config, &before).await;
    assert!(report.is_success(), "{:?}", report.failed);
    assert_eq!(report.applied, before.discrepancies);

    let after = detect(&env.gcp, &env.config).await.unwrap();
    assert!(after.is_converged(), "{:?}", after.discrepancies);
}

#[tokio::test]
async fn repairs_disabled_account() {
    let env = provisioned().await;
    env.gcp
        .disable_service_account(&sa_resource("osd-deployer"))
        .await
        .unwrap();
    assert_repairs(&env, Category::ServiceAccountDisabled).await;
    assert!(!env.gcp.service_account(&sa_resource("osd-deployer")).unwrap().disabled);
}

#[tokio::test]
async fn repairs_deleted_account() {
    let env = provisioned().await;
    env.gcp
        .delete_service_account(&sa_resource("osd-image-registry"))
        .await
        .unwrap();
    assert_repairs(&env, Category::ServiceAccountMissing).await;

    let policy = env.gcp.service_account_policy(&sa_resource("osd-image-registry"));
    assert!(policy.has_member(
        WORKLOAD_IDENTITY_USER_ROLE,
        &principal(&env.config, "openshift-image-registry", "registry")
    ));
}

#[tokio::test]
async fn repairs_impersonation_binding() {
    let env = provisioned().await;
    let impersonator = env.config.impersonator_member();
    env.gcp
        .edit_service_account_policy(&sa_resource("osd-deployer"), |p| {
            p.remove_member(TOKEN_CREATOR_ROLE, &impersonator);
        });
    assert_repairs(&env, Category::BindingMissingImpersonation).await;
    assert!(env
        .gcp
        .service_account_policy(&sa_resource("osd-deployer"))
        .has_member(TOKEN_CREATOR_ROLE, &impersonator));
}

#[tokio::test]
async fn repairs_only_the_missing_federated_principal() {
    let env = provisioned().await;
    let registry = principal(&env.config, "openshift-image-registry", "registry");
    let operator = principal(
        &env.config,
        "openshift-image-registry",
        "cluster-image-registry-operator",
    );
    env.gcp
        .edit_service_account_policy(&sa_resource("osd-image-registry"), |p| {
            p.remove_member(WORKLOAD_IDENTITY_USER_ROLE, &registry);
        });
    assert_repairs(&env, Category::BindingMissingWorkloadIdentity).await;

    let policy = env.gcp.service_account_policy(&sa_resource("osd-image-registry"));
    let binding = policy.binding(WORKLOAD_IDENTITY_USER_ROLE).unwrap();
    assert_eq!(binding.members.len(), 2);
    assert!(binding.members.contains(&registry));
    assert!(binding.members.contains(&operator));
    let writes: Vec<_> = env
        .gcp
        .mutations()
        .into_iter()
        .filter(|m| m.method == "setServiceAccountIamPolicy")
        .collect();
    assert_eq!(writes.len(), 1);
}

#[tokio::test]
async fn repairs_project_role() {
    let env = provisioned().await;
    let member = sa_member("osd-deployer");
    env.gcp.edit_project_policy(PROJECT, |p| {
        p.remove_member("roles/storage.admin", &member);
    });
    assert_repairs(&env, Category::RoleMissing).await;
    assert!(env
        .gcp
        .project_policy(PROJECT)
        .has_member("roles/storage.admin", &member));
}

#[tokio::test]
async fn second_run_issues_no_writes() {
    let env = provisioned().await;
    env.gcp
        .disable_service_account(&sa_resource("osd-support"))
        .await
        .unwrap();
    let detection = detect(&env.gcp, &env.config).await.unwrap();
    reconcile(&env.gcp, &env.config, &detection).await;

    env.gcp.reset_mutations();
    let detection = detect(&env.gcp, &env.config).await.unwrap();
    let report = reconcile(&env.gcp, &env.config, &detection).await;
    assert!(report.applied.is_empty());
    assert_eq!(env.gcp.mutation_count(), 0);
}

#[tokio::test]
async fn stale_discrepancies_are_pre_checked() {
    let env = provisioned().await;
    let detection = Detection {
        project_number: support::PROJECT_NUMBER.into(),
        discrepancies: vec![
            Discrepancy::disabled("osd-deployer"),
            Discrepancy::impersonation("osd-deployer", &env.config.impersonator_member()),
            Discrepancy::role("osd-deployer", "compute.admin"),
        ],
        ..Default::default()
    };

    let report = reconcile(&env.gcp, &env.config, &detection).await;
    assert!(report.applied.is_empty());
    assert_eq!(report.already_satisfied.len(), 3);
    assert_eq!(env.gcp.mutation_count(), 0);
}

#[tokio::test]
async fn conflicting_write_is_retried_once() {
    let env = provisioned().await;
    let member = sa_member("osd-deployer");
    env.gcp.edit_project_policy(PROJECT, |p| {
        p.remove_member("roles/storage.admin", &member);
    });
    let detection = detect(&env.gcp, &env.config).await.unwrap();

    env.gcp.inject_policy_conflicts(1);
    let report = reconcile(&env.gcp, &env.config, &detection).await;
    assert!(report.is_success());
    assert_eq!(report.applied.len(), 1);
}

#[tokio::test]
async fn repeated_conflict_fails_the_fix() {
    let env = provisioned().await;
    let member = sa_member("osd-deployer");
    env.gcp.edit_project_policy(PROJECT, |p| {
        p.remove_member("roles/storage.admin", &member);
    });
    let detection = detect(&env.gcp, &env.config).await.unwrap();

    env.gcp.inject_policy_conflicts(2);
    let report = reconcile(&env.gcp, &env.config, &detection).await;
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].error.contains("conflict"));
}

#[tokio::test]
async fn absent_role_binding_fails_loudly_without_stopping_the_run() {
    let env = provisioned().await;
    // Only osd-image-registry holds tagUser; removing it drops the binding.
    let member = sa_member("osd-image-registry");
    env.gcp.edit_project_policy(PROJECT, |p| {
        p.remove_member("roles/resourcemanager.tagUser", &member);
    });
    env.gcp
        .disable_service_account(&sa_resource("osd-support"))
        .await
        .unwrap();
    let detection = detect(&env.gcp, &env.config).await.unwrap();

    let report = reconcile(&env.gcp, &env.config, &detection).await;
    assert_eq!(report.applied, vec![Discrepancy::disabled("osd-support")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(
        report.failed[0].discrepancy,
        Discrepancy::role("osd-image-registry", "resourcemanager.tagUser")
    );
    assert!(report.failed[0]
        .error
        .contains("no binding for role 'resourcemanager.tagUser'"));
}

#[tokio::test]
async fn fixes_run_in_category_order() {
    let env = provisioned().await;
    let member = sa_member("osd-deployer");
    env.gcp.edit_project_policy(PROJECT, |p| {
        p.remove_member("roles/storage.admin", &member);
    });
    env.gcp
        .disable_service_account(&sa_resource("osd-cncc"))
        .await
        .unwrap();
    let detection = detect(&env.gcp, &env.config).await.unwrap();
    assert_eq!(detection.discrepancies[0].category, Category::RoleMissing);

    let report = reconcile(&env.gcp, &env.config, &detection).await;
    let order: Vec<Category> = report.applied.iter().map(|d| d.category).collect();
    assert_eq!(
        order,
        vec![Category::ServiceAccountDisabled, Category::RoleMissing]
    );
}

#[tokio::test]
async fn failed_restore_skips_the_accounts_other_fixes() {
    let env = provisioned().await;
    env.gcp.deny(&sa_resource("osd-deployer"));
    let detection = Detection {
        project_number: support::PROJECT_NUMBER.into(),
        discrepancies: vec![
            Discrepancy::impersonation("osd-deployer", &env.config.impersonator_member()),
            Discrepancy::missing("osd-deployer"),
        ],
        ..Default::default()
    };

    let report = reconcile(&env.gcp, &env.config, &detection).await;
    assert_eq!(report.failed.len(), 2);
    assert_eq!(
        report.failed[0].discrepancy.category,
        Category::ServiceAccountMissing
    );
    assert!(report.failed[1].error.starts_with("skipped"));
    assert_eq!(env.gcp.mutation_count(), 0);
}

#[tokio::test]
async fn custom_roles_are_reported_unapplied() {
    let mut env = provisioned().await;
    env.config.gcp.service_accounts[0].roles.push(RoleSpec {
        role_id: "osd.customDeployer".into(),
        predefined: false,
        permissions: vec![],
    });
    let detection = detect(&env.gcp, &env.config).await.unwrap();
    let report = reconcile(&env.gcp, &env.config, &detection).await;
    assert!(report.is_success());
    assert_eq!(report.unapplied_roles.len(), 1);
    assert_eq!(report.unapplied_roles[0].service_account_id, "osd-deployer");
}

#[tokio::test]
async fn update_converges_every_drift_at_once() {
    let env = provisioned().await;
    let impersonator = env.config.impersonator_member();
    let member = sa_member("osd-machine-api");
    env.gcp
        .disable_service_account(&sa_resource("osd-deployer"))
        .await
        .unwrap();
    env.gcp
        .delete_service_account(&sa_resource("osd-cluster-ingress"))
        .await
        .unwrap();
    env.gcp
        .edit_service_account_policy(&sa_resource("osd-support"), |p| {
            p.remove_member(TOKEN_CREATOR_ROLE, &impersonator);
        });
    env.gcp
        .edit_service_account_policy(&sa_resource("osd-cncc"), |p| p.bindings.clear());
    env.gcp.edit_project_policy(PROJECT, |p| {
        p.remove_member("roles/compute.admin", &member);
    });

    let outcome = wif_provisioner::update(&env.store, &env.gcp, &env.config.id)
        .await
        .unwrap();
    assert_eq!(outcome.before.discrepancies.len(), 5);
    assert!(outcome.is_converged(), "{:?}", outcome.after.discrepancies);
}

#[tokio::test]
async fn role_fix_leaves_conditional_bindings_alone() {
    let env = provisioned().await;
    let member = sa_member("osd-cncc");
    let condition = serde_json::json!({
        "title": "business-hours",
        "expression": "request.time.getHours('UTC') < 18"
    });
    env.gcp.edit_project_policy(PROJECT, |p| {
        p.remove_member("roles/compute.admin", &member);
        p.bindings.push(wif_gcp::Binding {
            role: "roles/compute.admin".into(),
            members: vec![member.clone()],
            condition: Some(condition.clone()),
        });
    });

    assert_repairs(&env, Category::RoleMissing).await;

    let policy = env.gcp.project_policy(PROJECT);
    let conditional: Vec<_> = policy
        .bindings
        .iter()
        .filter(|b| b.is_conditional())
        .collect();
    assert_eq!(conditional.len(), 1);
    assert_eq!(conditional[0].condition.as_ref(), Some(&condition));
    assert_eq!(conditional[0].members, vec![member.clone()]);
    assert!(policy.has_member("roles/compute.admin", &member));
}
