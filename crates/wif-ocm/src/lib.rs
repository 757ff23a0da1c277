//! wif-ocm
//!
//! Client for the management API that owns WIF config descriptors
//! (`/api/clusters_mgmt/v1/gcp/wif_configs`). The descriptor returned here
//! is the desired state that provisioning and reconciliation converge GCP to.

pub mod error;
pub mod memory;
pub mod rest;
pub mod store;

pub use crate::error::OcmError;
pub use crate::memory::MemoryWifConfigStore;
pub use crate::rest::OcmClient;
pub use crate::store::WifConfigStore;
