use wif_core::{BoxFuture, WifConfig, WifConfigInput};

use crate::error::OcmError;

/// Where WIF config descriptors live.
///
/// The management API assigns ids, the pool id, the OIDC issuer and the
/// service-account catalog when a config is created.
pub trait WifConfigStore: Send + Sync {
    fn create_wif_config<'a>(
        &'a self,
        input: &'a WifConfigInput,
    ) -> BoxFuture<'a, Result<WifConfig, OcmError>>;

    /// `NotFound` when no config has this id.
    fn get_wif_config<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<WifConfig, OcmError>>;

    fn list_wif_configs(&self) -> BoxFuture<'_, Result<Vec<WifConfig>, OcmError>>;

    fn delete_wif_config<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), OcmError>>;
}
