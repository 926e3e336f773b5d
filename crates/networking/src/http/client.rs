//! Upstream HTTP client for reward and campaign lookups

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE},
    Client, Url,
};
use serde::de::DeserializeOwned;
use slotwatch_core::{
    Campaign, CampaignId, CampaignResponse, Error, Result, Reward, RewardId, RewardResponse,
};
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://www.patreon.com";
// Use a real browser User-Agent to avoid being blocked
const USER_AGENT_VALUE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the public rewards API.
///
/// Stateless apart from the connection pool; cheap to clone.
#[derive(Clone)]
pub struct PatreonClient {
    http: Client,
    base_url: Url,
}

impl PatreonClient {
    /// Client pointed at the production API
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client pointed at another host (stub servers, proxies)
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::ConfigError(format!("invalid base url {}: {}", base_url, e)))?;

        let http = Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .default_headers(Self::default_headers())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Get default headers for requests (mimics browser)
    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers
    }

    /// Fetch a single reward
    #[instrument(skip(self))]
    pub async fn fetch_reward(&self, id: RewardId) -> Result<Reward> {
        let envelope: RewardResponse = self.fetch(&id.api_path()).await?;
        Ok(envelope.data)
    }

    /// Fetch a single campaign
    #[instrument(skip(self))]
    pub async fn fetch_campaign(&self, id: CampaignId) -> Result<Campaign> {
        let envelope: CampaignResponse = self.fetch(&id.api_path()).await?;
        Ok(envelope.data)
    }

    /// GET a JSON document. Non-2xx responses become `Error::Status` and
    /// their body is ignored.
    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| Error::InvalidData(format!("invalid path {}: {}", path, e)))?;

        debug!("GET {}", url);

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            debug!("GET {} answered {}", url, status);
            return Err(Error::Status {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
