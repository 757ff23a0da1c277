use std::time::Duration;

use eyre::{Result, WrapErr, eyre};
use wif_gcp::{GcpEndpoints, RestGcpClient};
use wif_ocm::OcmClient;
use wif_provisioner::{PollConfig, ProvisionOptions};

use crate::cli::{GlobalArgs, LogFormat};

/// Resolved runtime settings, passed explicitly into every command.
///
/// Deliberately not `Debug`: it holds bearer tokens.
#[derive(Clone)]
pub struct Settings {
    pub ocm_url: String,
    pub ocm_token: Option<String>,
    pub gcp_token: Option<String>,
    pub endpoints: GcpEndpoints,
    pub poll: PollConfig,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

impl From<&GlobalArgs> for Settings {
    fn from(args: &GlobalArgs) -> Self {
        Self {
            ocm_url: args.ocm_url.clone(),
            ocm_token: non_empty(args.ocm_token.as_deref()),
            gcp_token: non_empty(args.gcp_token.as_deref()),
            endpoints: GcpEndpoints {
                iam: args.iam_endpoint.clone(),
                resource_manager: args.resource_manager_endpoint.clone(),
            },
            poll: PollConfig {
                interval: Duration::from_secs(args.poll_interval_secs),
                max_attempts: args.poll_attempts,
            },
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            log_format: args.log_format,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Settings {
    pub fn provision_options(&self, dry_run: bool) -> ProvisionOptions {
        ProvisionOptions {
            dry_run,
            poll: self.poll,
        }
    }

    pub fn ocm_client(&self) -> Result<OcmClient> {
        let token = self
            .ocm_token
            .as_deref()
            .ok_or_else(|| eyre!("an OCM token is required: pass --ocm-token or set OCM_TOKEN"))?;
        OcmClient::new(&self.ocm_url, token, self.request_timeout)
            .wrap_err("failed to build OCM client")
    }

    pub fn gcp_client(&self) -> Result<RestGcpClient> {
        let token = self.gcp_token.as_deref().ok_or_else(|| {
            eyre!("a GCP access token is required: pass --gcp-token or set GOOGLE_OAUTH_ACCESS_TOKEN")
        })?;
        RestGcpClient::new(self.endpoints.clone(), token, self.request_timeout)
            .wrap_err("failed to build GCP client")
    }
}
