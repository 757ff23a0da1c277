//! REST adapter for the management API.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use wif_core::{BoxFuture, WifConfig, WifConfigInput};

use crate::error::OcmError;
use crate::store::WifConfigStore;

pub const DEFAULT_OCM_URL: &str = "https://api.openshift.com";

const WIF_CONFIGS_PATH: &str = "/api/clusters_mgmt/v1/gcp/wif_configs";
const PAGE_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    code: String,
    reason: String,
}

#[derive(Debug, Deserialize)]
struct WifConfigList {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    items: Vec<WifConfig>,
}

pub struct OcmClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl OcmClient {
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OcmError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    /// Send and decode. `id` is used for the `NotFound` message.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        id: &str,
    ) -> Result<T, OcmError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(OcmError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            let error: ErrorBody = serde_json::from_str(&body).unwrap_or_else(|_| ErrorBody {
                code: String::new(),
                reason: body.clone(),
            });
            return Err(OcmError::Api {
                status: status.as_u16(),
                code: error.code,
                reason: error.reason,
            });
        }

        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        Ok(serde_json::from_str(body)?)
    }
}

impl WifConfigStore for OcmClient {
    fn create_wif_config<'a>(
        &'a self,
        input: &'a WifConfigInput,
    ) -> BoxFuture<'a, Result<WifConfig, OcmError>> {
        Box::pin(async move {
            tracing::debug!(display_name = %input.display_name, "creating wif-config");
            let config: WifConfig = self
                .send(
                    self.request(Method::POST, WIF_CONFIGS_PATH).json(input),
                    &input.display_name,
                )
                .await?;
            config.validate()?;
            Ok(config)
        })
    }

    fn get_wif_config<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<WifConfig, OcmError>> {
        Box::pin(async move {
            tracing::debug!(id, "fetching wif-config");
            let config: WifConfig = self
                .send(
                    self.request(Method::GET, &format!("{WIF_CONFIGS_PATH}/{id}")),
                    id,
                )
                .await?;
            config.validate()?;
            Ok(config)
        })
    }

    fn list_wif_configs(&self) -> BoxFuture<'_, Result<Vec<WifConfig>, OcmError>> {
        Box::pin(async move {
            let mut configs = Vec::new();
            let mut page = 1usize;
            loop {
                let request = self
                    .request(Method::GET, WIF_CONFIGS_PATH)
                    .query(&[("page", page), ("size", PAGE_SIZE)]);
                let list: WifConfigList = self.send(request, "").await?;
                let fetched = list.items.len();
                configs.extend(list.items);
                if fetched < PAGE_SIZE || configs.len() >= list.total {
                    break;
                }
                page += 1;
            }
            tracing::debug!(count = configs.len(), "listed wif-configs");
            Ok(configs)
        })
    }

    fn delete_wif_config<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), OcmError>> {
        Box::pin(async move {
            let _: serde_json::Value = self
                .send(
                    self.request(Method::DELETE, &format!("{WIF_CONFIGS_PATH}/{id}")),
                    id,
                )
                .await?;
            tracing::info!(id, "deleted wif-config");
            Ok(())
        })
    }
}
