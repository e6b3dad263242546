//! OneBusAway HTTP client.

use super::error::FetchError;
use super::Fetch;

/// Default base URL for the Puget Sound OneBusAway API.
const DEFAULT_BASE_URL: &str = "https://api.pugetsound.onebusaway.org/api/where";

/// Configuration for the OneBusAway client.
#[derive(Debug, Clone)]
pub struct ObaConfig {
    /// API key, sent as the `key` query parameter
    pub api_key: String,
    /// Base URL for the API (defaults to the Puget Sound deployment)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ObaConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Client for the OneBusAway `schedule-for-stop` endpoint.
///
/// Requests time out after the configured interval; expiry surfaces as
/// [`FetchError::Http`].
#[derive(Debug, Clone)]
pub struct ObaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ObaClient {
    /// Create a new OneBusAway client with the given configuration.
    pub fn new(config: ObaConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            api_key: config.api_key,
        })
    }

    /// Fetch the raw schedule XML for one stop.
    ///
    /// The stop is addressed as `{agency_id}_{stop_id}`, the feed's
    /// qualified stop ID format.
    pub async fn fetch_schedule(
        &self,
        agency_id: i64,
        stop_id: i64,
    ) -> Result<Vec<u8>, FetchError> {
        let url = format!(
            "{}/schedule-for-stop/{}_{}.xml",
            self.base_url, agency_id, stop_id
        );

        let response = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

impl Fetch for ObaClient {
    async fn fetch(&self, agency_id: i64, stop_id: i64) -> Result<Vec<u8>, FetchError> {
        self.fetch_schedule(agency_id, stop_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = ObaConfig::new("test-key")
            .with_base_url("http://localhost:8080")
            .with_timeout(60);

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn config_defaults() {
        let config = ObaConfig::new("test-key");

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn client_creation() {
        let config = ObaConfig::new("test-key");
        assert!(ObaClient::new(config).is_ok());
    }

    // Integration tests against the live API require a real key and are
    // intentionally absent; MockFetcher covers the pipeline.
}
