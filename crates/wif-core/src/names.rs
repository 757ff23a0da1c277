//! GCP resource-name and IAM member conventions.
//!
//! Every fully-qualified identifier the workspace sends to GCP is built
//! here so that detection and repair always agree on the exact strings.

/// Role granted to the impersonator on `impersonate` accounts.
pub const TOKEN_CREATOR_ROLE: &str = "roles/iam.serviceAccountTokenCreator";

/// Role granted to federated principals on `wif` accounts.
pub const WORKLOAD_IDENTITY_USER_ROLE: &str = "roles/iam.workloadIdentityUser";

/// Description stamped on pools, providers and service accounts we create.
pub const RESOURCE_DESCRIPTION: &str = "Created by the OCM CLI";

pub fn service_account_email(service_account_id: &str, project_id: &str) -> String {
    format!("{service_account_id}@{project_id}.iam.gserviceaccount.com")
}

/// `projects/{project}/serviceAccounts/{email}`
pub fn service_account_resource(service_account_id: &str, project_id: &str) -> String {
    format!(
        "projects/{project_id}/serviceAccounts/{}",
        service_account_email(service_account_id, project_id)
    )
}

/// Undelete addresses the account by unique id, not by email.
pub fn service_account_unique_resource(unique_id: &str, project_id: &str) -> String {
    format!("projects/{project_id}/serviceAccounts/{unique_id}")
}

/// IAM policy member for a service account in `project_id`.
pub fn service_account_member(service_account_id: &str, project_id: &str) -> String {
    format!(
        "serviceAccount:{}",
        service_account_email(service_account_id, project_id)
    )
}

pub fn impersonator_member(impersonator_email: &str) -> String {
    format!("serviceAccount:{impersonator_email}")
}

/// Principal for one Kubernetes service account federated through the pool.
pub fn federated_principal(
    project_number: &str,
    pool_id: &str,
    namespace: &str,
    service_account_name: &str,
) -> String {
    format!(
        "principal://iam.googleapis.com/projects/{project_number}/locations/global/\
         workloadIdentityPools/{pool_id}/subject/system:serviceaccount:{namespace}:{service_account_name}"
    )
}

/// `projects/{project}/locations/global`
pub fn pool_parent(project_id: &str) -> String {
    format!("projects/{project_id}/locations/global")
}

pub fn pool_resource(project_id: &str, pool_id: &str) -> String {
    format!("{}/workloadIdentityPools/{pool_id}", pool_parent(project_id))
}

pub fn provider_resource(project_id: &str, pool_id: &str, provider_id: &str) -> String {
    format!("{}/providers/{provider_id}", pool_resource(project_id, pool_id))
}

pub fn predefined_role(role_id: &str) -> String {
    format!("roles/{role_id}")
}

/// Last path segment of a role name.
///
/// Predefined roles are `roles/{id}`; custom roles carry their defining
/// project or organization in front, e.g. `projects/p/roles/{id}`.
pub fn role_basename(role: &str) -> &str {
    role.rsplit('/').next().unwrap_or(role)
}
