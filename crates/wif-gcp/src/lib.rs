//! wif-gcp
//!
//! Capability-set client over the GCP IAM and Resource Manager surface used
//! by WIF provisioning: workload identity pools and OIDC providers, service
//! accounts, and IAM policies on service accounts and projects.
//!
//! Two implementations:
//! - [`RestGcpClient`]: REST over `reqwest` with a bearer token
//! - [`MemoryGcp`]: in-memory fake that mimics the provider semantics drift
//!   detection depends on

pub mod client;
pub mod error;
pub mod memory;
pub mod policy;
pub mod rest;
pub mod types;

pub use crate::client::GcpClient;
pub use crate::error::GcpError;
pub use crate::memory::{MemoryGcp, Mutation};
pub use crate::policy::{Binding, CONDITIONAL_POLICY_VERSION, Policy};
pub use crate::rest::{GcpEndpoints, RestGcpClient};
pub use crate::types::{
    CreateServiceAccount, Oidc, Operation, OperationStatus, PoolState, ServiceAccount,
    WorkloadIdentityPool, WorkloadIdentityProvider,
};
