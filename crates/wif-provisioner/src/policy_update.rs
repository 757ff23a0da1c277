//! Optimistic read-modify-write of IAM policy documents.

use wif_gcp::{GcpClient, GcpError, Policy};

use crate::error::ProvisionerError;

/// Which policy document to edit.
#[derive(Debug, Clone, Copy)]
pub enum PolicyTarget<'a> {
    /// Service-account resource name.
    ServiceAccount(&'a str),
    /// Project id.
    Project(&'a str),
}

impl PolicyTarget<'_> {
    fn label(&self) -> (&'static str, &str) {
        match self {
            Self::ServiceAccount(resource) => ("service account policy", resource),
            Self::Project(project) => ("project policy", project),
        }
    }

    async fn read(&self, client: &dyn GcpClient) -> Result<Policy, GcpError> {
        match self {
            Self::ServiceAccount(resource) => client.get_service_account_iam_policy(resource).await,
            Self::Project(project) => client.get_project_iam_policy(project).await,
        }
    }

    async fn write(&self, client: &dyn GcpClient, policy: &Policy) -> Result<Policy, GcpError> {
        match self {
            Self::ServiceAccount(resource) => {
                client.set_service_account_iam_policy(resource, policy).await
            }
            Self::Project(project) => client.set_project_iam_policy(project, policy).await,
        }
    }
}

/// Fetch the policy, apply `edit`, and write it back with the fetched etag.
///
/// `edit` returns whether it changed anything; when it did not, no write is
/// issued. A conflicting write is retried once from a fresh read, then
/// surfaced. Returns whether a write happened.
pub async fn update_policy<F>(
    client: &dyn GcpClient,
    target: PolicyTarget<'_>,
    mut edit: F,
) -> Result<bool, ProvisionerError>
where
    F: FnMut(&mut Policy) -> Result<bool, ProvisionerError>,
{
    let (label, name) = target.label();
    let mut retried = false;
    loop {
        let mut policy = target
            .read(client)
            .await
            .map_err(|e| ProvisionerError::from(e).with_resource(label, name))?;
        if !edit(&mut policy)? {
            return Ok(false);
        }
        match target.write(client, &policy).await {
            Ok(_) => return Ok(true),
            Err(err) if err.is_conflict() && !retried => {
                tracing::warn!(policy = name, "concurrent policy change, retrying once");
                retried = true;
            }
            Err(err) => return Err(ProvisionerError::from(err).with_resource(label, name)),
        }
    }
}
