//! HTTP implementation of the listing and detail endpoints.
//!
//! `GET <base>/<list_route>` returns the first page, `?token=<t>` the ones
//! after it; `GET <base>/<detail_route>/<id>` resolves one account.

mod wire;

use std::time::Duration;

use account_sieve_core::{
    ConfigError, DetailSource, FetchError, Page, PageSource, Record, RecordId,
};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::wire::{DetailResponse, ListResponse};

pub const DEFAULT_BASE_URL: &str = "https://appsheettest1.azurewebsites.net/sample/";

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub list_route: String,
    pub detail_route: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            list_route: "list".to_string(),
            detail_route: "detail".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// The base URL with a trailing slash, so routes resolve beneath it.
    ///
    /// # Errors
    /// Fails for an empty or unparseable base URL.
    pub fn base(&self) -> Result<Url, ConfigError> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        let normalized =
            if trimmed.ends_with('/') { trimmed.to_string() } else { format!("{trimmed}/") };
        let url = Url::parse(&normalized).map_err(|err| ConfigError::InvalidBaseUrl {
            url: trimmed.to_string(),
            reason: err.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl {
                url: trimmed.to_string(),
                reason: "URL cannot carry a path".to_string(),
            });
        }
        Ok(url)
    }

    /// # Errors
    /// Fails for an invalid base URL or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base()?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::Zero { field: "timeout_secs" });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// One HTTP client serving both endpoints; share it behind an `Arc` as the
/// page source and the detail source of the same pipeline.
#[derive(Debug, Clone)]
pub struct HttpAccountSource {
    client: Client,
    base: Url,
    list_route: String,
    detail_route: String,
}

impl HttpAccountSource {
    /// # Errors
    /// Fails when the configuration does not validate or the underlying
    /// client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            base: config.base()?,
            list_route: config.list_route.trim_matches('/').to_string(),
            detail_route: config.detail_route.trim_matches('/').to_string(),
        })
    }

    /// # Errors
    /// Fails when the configured route does not form a valid URL.
    pub fn list_url(&self, token: Option<&str>) -> Result<Url, FetchError> {
        let mut url = self.join(&self.list_route)?;
        if let Some(token) = token.filter(|token| !token.is_empty()) {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    /// # Errors
    /// Fails when the configured route does not form a valid URL.
    pub fn detail_url(&self, id: RecordId) -> Result<Url, FetchError> {
        self.join(&format!("{}/{id}", self.detail_route))
    }

    fn join(&self, path: &str) -> Result<Url, FetchError> {
        self.base
            .join(path)
            .map_err(|err| FetchError::Transport(format!("invalid request URL `{path}`: {err}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16(), url: url.to_string() });
        }

        let body = response.bytes().await.map_err(|err| FetchError::Transport(err.to_string()))?;
        serde_json::from_slice(&body).map_err(|err| FetchError::Decode(format!("{url}: {err}")))
    }
}

impl PageSource for HttpAccountSource {
    async fn fetch_page(&self, token: Option<&str>) -> Result<Page, FetchError> {
        let url = self.list_url(token)?;
        debug!(url = %url, "fetching list");
        let body: ListResponse = self.get_json(url).await?;
        Ok(body.into())
    }
}

impl DetailSource for HttpAccountSource {
    async fn fetch_detail(&self, id: RecordId) -> Result<Record, FetchError> {
        let url = self.detail_url(id)?;
        let body: DetailResponse = self.get_json(url).await?;
        Ok(body.into())
    }
}
