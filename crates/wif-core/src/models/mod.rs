mod service_account;
mod wif_config;

pub use service_account::{AccessMethod, CredentialRequest, RoleSpec, SecretRef, ServiceAccountSpec};
pub use wif_config::{
    DEFAULT_AUDIENCE, IdentityProviderSpec, WifConfig, WifConfigInput, WifConfigInputGcp, WifGcp,
    WorkloadIdentityPoolSpec,
};
