//! REST implementation of [`GcpClient`] over `reqwest` with rustls.
//!
//! Talks to IAM v1 (pools, providers, service accounts, service-account
//! IAM policies) and Cloud Resource Manager v1 (project lookup, project IAM
//! policy). Authentication is a caller-supplied OAuth bearer token.

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use wif_core::BoxFuture;

use crate::client::GcpClient;
use crate::error::GcpError;
use crate::policy::{CONDITIONAL_POLICY_VERSION, Policy};
use crate::types::{
    CreateServiceAccount, Operation, ServiceAccount, WorkloadIdentityPool,
    WorkloadIdentityProvider,
};

pub const DEFAULT_IAM_ENDPOINT: &str = "https://iam.googleapis.com/v1";
pub const DEFAULT_RESOURCE_MANAGER_ENDPOINT: &str = "https://cloudresourcemanager.googleapis.com/v1";

/// Base URLs for the two APIs. Overridable to point at a local mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcpEndpoints {
    pub iam: String,
    pub resource_manager: String,
}

impl Default for GcpEndpoints {
    fn default() -> Self {
        Self {
            iam: DEFAULT_IAM_ENDPOINT.to_string(),
            resource_manager: DEFAULT_RESOURCE_MANAGER_ENDPOINT.to_string(),
        }
    }
}

/// Error envelope returned by Google APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Project {
    project_number: String,
}

pub struct RestGcpClient {
    http: reqwest::Client,
    endpoints: GcpEndpoints,
    access_token: String,
}

impl RestGcpClient {
    pub fn new(
        endpoints: GcpEndpoints,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GcpError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoints,
            access_token: access_token.into(),
        })
    }

    fn iam(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{path}", self.endpoints.iam.trim_end_matches('/'));
        self.http.request(method, url)
    }

    fn resource_manager(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!(
            "{}/{path}",
            self.endpoints.resource_manager.trim_end_matches('/')
        );
        self.http.request(method, url)
    }

    /// Send a request and decode the JSON response.
    ///
    /// `call` names the API method for diagnostics (e.g. `iam:GetServiceAccount`).
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        call: &str,
    ) -> Result<T, GcpError> {
        tracing::debug!(call, "GCP request");
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| GcpError::Transport(format!("{call} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GcpError::Transport(format!("{call} failed reading body: {e}")))?;

        if !status.is_success() {
            let (message, canonical) = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.error.message, envelope.error.status),
                Err(_) => (body, None),
            };
            return Err(GcpError::from_response(
                status.as_u16(),
                canonical.as_deref(),
                format!("{call} failed: {message}"),
            ));
        }

        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        Ok(serde_json::from_str(body)?)
    }
}

impl GcpClient for RestGcpClient {
    fn create_workload_identity_pool<'a>(
        &'a self,
        parent: &'a str,
        pool_id: &'a str,
        pool: &'a WorkloadIdentityPool,
    ) -> BoxFuture<'a, Result<Operation, GcpError>> {
        Box::pin(async move {
            let request = self
                .iam(Method::POST, &format!("{parent}/workloadIdentityPools"))
                .query(&[("workloadIdentityPoolId", pool_id)])
                .json(pool);
            self.send(request, "iam:CreateWorkloadIdentityPool").await
        })
    }

    fn get_workload_identity_pool<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<WorkloadIdentityPool, GcpError>> {
        Box::pin(async move {
            self.send(
                self.iam(Method::GET, resource),
                "iam:GetWorkloadIdentityPool",
            )
            .await
        })
    }

    fn delete_workload_identity_pool<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<Operation, GcpError>> {
        Box::pin(async move {
            self.send(
                self.iam(Method::DELETE, resource),
                "iam:DeleteWorkloadIdentityPool",
            )
            .await
        })
    }

    fn undelete_workload_identity_pool<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<Operation, GcpError>> {
        Box::pin(async move {
            let request = self
                .iam(Method::POST, &format!("{resource}:undelete"))
                .json(&json!({}));
            self.send(request, "iam:UndeleteWorkloadIdentityPool").await
        })
    }

    fn create_workload_identity_provider<'a>(
        &'a self,
        pool: &'a str,
        provider_id: &'a str,
        provider: &'a WorkloadIdentityProvider,
    ) -> BoxFuture<'a, Result<Operation, GcpError>> {
        Box::pin(async move {
            let request = self
                .iam(Method::POST, &format!("{pool}/providers"))
                .query(&[("workloadIdentityPoolProviderId", provider_id)])
                .json(provider);
            self.send(request, "iam:CreateWorkloadIdentityPoolProvider")
                .await
        })
    }

    fn get_workload_identity_provider<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<WorkloadIdentityProvider, GcpError>> {
        Box::pin(async move {
            self.send(
                self.iam(Method::GET, resource),
                "iam:GetWorkloadIdentityPoolProvider",
            )
            .await
        })
    }

    fn get_operation<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Operation, GcpError>> {
        Box::pin(async move { self.send(self.iam(Method::GET, name), "iam:GetOperation").await })
    }

    fn create_service_account<'a>(
        &'a self,
        project_id: &'a str,
        request: &'a CreateServiceAccount,
    ) -> BoxFuture<'a, Result<ServiceAccount, GcpError>> {
        Box::pin(async move {
            let http = self
                .iam(
                    Method::POST,
                    &format!("projects/{project_id}/serviceAccounts"),
                )
                .json(request);
            self.send(http, "iam:CreateServiceAccount").await
        })
    }

    fn get_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<ServiceAccount, GcpError>> {
        Box::pin(async move {
            self.send(self.iam(Method::GET, resource), "iam:GetServiceAccount")
                .await
        })
    }

    fn delete_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>> {
        Box::pin(async move {
            let _: serde_json::Value = self
                .send(self.iam(Method::DELETE, resource), "iam:DeleteServiceAccount")
                .await?;
            Ok(())
        })
    }

    fn undelete_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>> {
        Box::pin(async move {
            let request = self
                .iam(Method::POST, &format!("{resource}:undelete"))
                .json(&json!({}));
            let _: serde_json::Value = self.send(request, "iam:UndeleteServiceAccount").await?;
            Ok(())
        })
    }

    fn enable_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>> {
        Box::pin(async move {
            let request = self
                .iam(Method::POST, &format!("{resource}:enable"))
                .json(&json!({}));
            let _: serde_json::Value = self.send(request, "iam:EnableServiceAccount").await?;
            Ok(())
        })
    }

    fn disable_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>> {
        Box::pin(async move {
            let request = self
                .iam(Method::POST, &format!("{resource}:disable"))
                .json(&json!({}));
            let _: serde_json::Value = self.send(request, "iam:DisableServiceAccount").await?;
            Ok(())
        })
    }

    fn get_service_account_iam_policy<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<Policy, GcpError>> {
        Box::pin(async move {
            let request = self
                .iam(Method::POST, &format!("{resource}:getIamPolicy"))
                .query(&[("options.requestedPolicyVersion", CONDITIONAL_POLICY_VERSION)])
                .json(&json!({}));
            self.send(request, "iam:GetIamPolicy").await
        })
    }

    fn set_service_account_iam_policy<'a>(
        &'a self,
        resource: &'a str,
        policy: &'a Policy,
    ) -> BoxFuture<'a, Result<Policy, GcpError>> {
        Box::pin(async move {
            let request = self
                .iam(Method::POST, &format!("{resource}:setIamPolicy"))
                .json(&json!({ "policy": policy }));
            self.send(request, "iam:SetIamPolicy").await
        })
    }

    fn get_project_iam_policy<'a>(
        &'a self,
        project_id: &'a str,
    ) -> BoxFuture<'a, Result<Policy, GcpError>> {
        Box::pin(async move {
            let request = self
                .resource_manager(Method::POST, &format!("projects/{project_id}:getIamPolicy"))
                .json(&json!({
                    "options": { "requestedPolicyVersion": CONDITIONAL_POLICY_VERSION }
                }));
            self.send(request, "cloudresourcemanager:GetIamPolicy").await
        })
    }

    fn set_project_iam_policy<'a>(
        &'a self,
        project_id: &'a str,
        policy: &'a Policy,
    ) -> BoxFuture<'a, Result<Policy, GcpError>> {
        Box::pin(async move {
            let request = self
                .resource_manager(Method::POST, &format!("projects/{project_id}:setIamPolicy"))
                .json(&json!({ "policy": policy }));
            self.send(request, "cloudresourcemanager:SetIamPolicy").await
        })
    }

    fn project_number<'a>(
        &'a self,
        project_id: &'a str,
    ) -> BoxFuture<'a, Result<String, GcpError>> {
        Box::pin(async move {
            let project: Project = self
                .send(
                    self.resource_manager(Method::GET, &format!("projects/{project_id}")),
                    "cloudresourcemanager:GetProject",
                )
                .await?;
            Ok(project.project_number)
        })
    }
}
