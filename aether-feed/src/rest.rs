//! REST depth snapshot client.

use crate::constants::endpoints;
use crate::error::Result;
use aether_core::DepthSnapshot;
use tracing::debug;
use url::Url;

/// Client for the public depth snapshot endpoint.
#[derive(Debug, Clone)]
pub struct SnapshotClient {
    http: reqwest::Client,
    base_url: String,
}

impl SnapshotClient {
    /// Creates a client against the production endpoint.
    pub fn new() -> Result<Self> {
        Self::with_base_url(endpoints::REST_BASE)
    }

    /// Creates a client against a custom base URL (tests, mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("aether-feed")
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Fetches the depth snapshot for an uppercase symbol.
    ///
    /// Returns the decoded snapshot together with the raw response body,
    /// so the ring can republish the exchange bytes untouched.
    pub async fn fetch_depth(&self, symbol: &str, limit: u32) -> Result<(DepthSnapshot, String)> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoints::DEPTH))?;
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("limit", &limit.to_string());

        debug!(%url, "fetching depth snapshot");
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let snapshot: DepthSnapshot =
            serde_json::from_str(&body).map_err(aether_core::Error::from)?;
        Ok((snapshot, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_depth_url_with_encoded_query() {
        let url = Url::parse(&format!("{}{}", endpoints::REST_BASE, endpoints::DEPTH)).unwrap();
        assert_eq!(url.as_str(), "https://api.binance.com/api/v3/depth");

        let mut url = url;
        url.query_pairs_mut()
            .append_pair("symbol", "BTCUSDT")
            .append_pair("limit", "5000");
        assert_eq!(
            url.as_str(),
            "https://api.binance.com/api/v3/depth?symbol=BTCUSDT&limit=5000"
        );
    }
}
