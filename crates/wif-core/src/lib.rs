//! wif-core
//!
//! Pure domain types for Workload Identity Federation configs, GCP resource
//! naming conventions, and the fixed OpenShift service-account catalog.
//! No network dependency; this is the shared vocabulary of the workspace.

use std::future::Future;
use std::pin::Pin;

pub mod catalog;
pub mod error;
pub mod models;
pub mod names;

pub use crate::error::CoreError;
pub use crate::models::{
    AccessMethod, CredentialRequest, IdentityProviderSpec, RoleSpec, SecretRef,
    ServiceAccountSpec, WifConfig, WifConfigInput, WifConfigInputGcp, WifGcp,
    WorkloadIdentityPoolSpec,
};

/// Boxed future used by the dyn-compatible client traits in the workspace.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
