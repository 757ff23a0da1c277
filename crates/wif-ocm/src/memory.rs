use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use wif_core::catalog::openshift_service_accounts;
use wif_core::models::DEFAULT_AUDIENCE;
use wif_core::{
    BoxFuture, IdentityProviderSpec, WifConfig, WifConfigInput, WifGcp, WorkloadIdentityPoolSpec,
};

use crate::error::OcmError;
use crate::store::WifConfigStore;

pub const IMPERSONATOR_EMAIL: &str = "osd-impersonator@sda-ccs-3.iam.gserviceaccount.com";
pub const ISSUER_URL: &str = "https://fake-issuer.com";
pub const PROVIDER_ID: &str = "oidc";

#[derive(Default)]
struct State {
    configs: BTreeMap<String, WifConfig>,
    projects: BTreeMap<String, String>,
    seq: u64,
}

/// In-memory [`WifConfigStore`] that fills in server-assigned fields the
/// way the management API does.
#[derive(Default)]
pub struct MemoryWifConfigStore {
    state: Mutex<State>,
}

impl MemoryWifConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configs created for `project_id` carry this project number. For
    /// other projects it is left empty.
    pub fn with_project(self, project_id: &str, project_number: &str) -> Self {
        self.lock()
            .projects
            .insert(project_id.to_string(), project_number.to_string());
        self
    }

    pub fn insert(&self, config: WifConfig) {
        self.lock().configs.insert(config.id.clone(), config);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().configs.contains_key(id)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WifConfigStore for MemoryWifConfigStore {
    fn create_wif_config<'a>(
        &'a self,
        input: &'a WifConfigInput,
    ) -> BoxFuture<'a, Result<WifConfig, OcmError>> {
        Box::pin(async move {
            let mut st = self.lock();
            if st
                .configs
                .values()
                .any(|c| c.display_name == input.display_name)
            {
                return Err(OcmError::Api {
                    status: 409,
                    code: "CLUSTERS-MGMT-409".into(),
                    reason: format!(
                        "wif-config with display name '{}' already exists",
                        input.display_name
                    ),
                });
            }
            st.seq += 1;
            let project_number = st
                .projects
                .get(&input.gcp.project_id)
                .cloned()
                .unwrap_or_default();
            let config = WifConfig {
                id: format!("{:032x}", st.seq),
                display_name: input.display_name.clone(),
                gcp: WifGcp {
                    project_id: input.gcp.project_id.clone(),
                    project_number,
                    impersonator_email: IMPERSONATOR_EMAIL.to_string(),
                    workload_identity_pool: WorkloadIdentityPoolSpec {
                        pool_id: format!("pool{:028x}", st.seq),
                        identity_provider: IdentityProviderSpec {
                            identity_provider_id: PROVIDER_ID.to_string(),
                            issuer_url: ISSUER_URL.to_string(),
                            jwks: r#"{"keys":[]}"#.to_string(),
                            allowed_audiences: vec![DEFAULT_AUDIENCE.to_string()],
                        },
                    },
                    service_accounts: openshift_service_accounts(),
                },
            };
            st.configs.insert(config.id.clone(), config.clone());
            Ok(config)
        })
    }

    fn get_wif_config<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<WifConfig, OcmError>> {
        Box::pin(async move {
            self.lock()
                .configs
                .get(id)
                .cloned()
                .ok_or_else(|| OcmError::NotFound(id.to_string()))
        })
    }

    fn list_wif_configs(&self) -> BoxFuture<'_, Result<Vec<WifConfig>, OcmError>> {
        Box::pin(async move { Ok(self.lock().configs.values().cloned().collect()) })
    }

    fn delete_wif_config<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), OcmError>> {
        Box::pin(async move {
            self.lock()
                .configs
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| OcmError::NotFound(id.to_string()))
        })
    }
}
