#![allow(dead_code)]

use std::time::Duration;

use wif_core::{WifConfig, WifConfigInput, names};
use wif_gcp::MemoryGcp;
use wif_ocm::MemoryWifConfigStore;
use wif_provisioner::{PollConfig, ProvisionOptions};

pub const PROJECT: &str = "sda-ccs-1";
pub const PROJECT_NUMBER: &str = "1008983090557";

pub struct Env {
    pub gcp: MemoryGcp,
    pub store: MemoryWifConfigStore,
    pub config: WifConfig,
}

pub fn options() -> ProvisionOptions {
    ProvisionOptions {
        dry_run: false,
        poll: PollConfig {
            interval: Duration::ZERO,
            max_attempts: 5,
        },
    }
}

pub fn fresh() -> (MemoryGcp, MemoryWifConfigStore) {
    (
        MemoryGcp::new().with_project(PROJECT, PROJECT_NUMBER),
        MemoryWifConfigStore::new().with_project(PROJECT, PROJECT_NUMBER),
    )
}

/// A converged project with the mutation log cleared.
pub async fn provisioned() -> Env {
    let (gcp, store) = fresh();
    let outcome = wif_provisioner::create(
        &store,
        &gcp,
        &WifConfigInput::new("test01", PROJECT),
        &options(),
    )
    .await
    .unwrap();
    gcp.reset_mutations();
    Env {
        gcp,
        store,
        config: outcome.config,
    }
}

pub fn sa_resource(id: &str) -> String {
    names::service_account_resource(id, PROJECT)
}

pub fn sa_member(id: &str) -> String {
    names::service_account_member(id, PROJECT)
}

pub fn principal(config: &WifConfig, namespace: &str, name: &str) -> String {
    names::federated_principal(PROJECT_NUMBER, config.pool_id(), namespace, name)
}
