//! CryptoCompare API client
//!
//! Provides methods for fetching full price documents from the
//! CryptoCompare REST API.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use quotefeed_core::{FeedError, QuoteDocument, QuoteSource};
use reqwest::{header, Client};
use tracing::debug;

/// Base URL for the CryptoCompare API
const CRYPTOCOMPARE_API_BASE: &str = "https://min-api.cryptocompare.com/data";

/// CryptoCompare API client
#[derive(Clone)]
pub struct CryptoCompareClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CryptoCompareClient {
    /// Create a new CryptoCompare client (unauthenticated; the public rate
    /// limit applies)
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: CRYPTOCOMPARE_API_BASE.to_string(),
            api_key: None,
        }
    }

    /// Create a new authenticated CryptoCompare client
    pub fn with_auth(api_key: String) -> Self {
        let mut client = Self::new();
        client.api_key = Some(api_key);
        client
    }

    /// Point the client at a different base URL (e.g. a local stub)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut client = Self::new();
        client.base_url = base_url.into();
        client
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the full price document for the given symbol lists
    pub async fn price_multi_full(
        &self,
        fsyms: &[String],
        tsyms: &[String],
    ) -> Result<QuoteDocument, FeedError> {
        let url = format!("{}/pricemultifull", self.base_url);
        let fsyms = fsyms.join(",");
        let tsyms = tsyms.join(",");

        debug!("Fetching quotes from {} ({} -> {})", url, fsyms, tsyms);

        let mut request = self
            .client
            .get(&url)
            .query(&[("fsyms", fsyms.as_str()), ("tsyms", tsyms.as_str())])
            .header(header::ACCEPT, "application/json");

        if let Some(ref key) = self.api_key {
            request = request.header(header::AUTHORIZATION, format!("Apikey {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FeedError::network(format!("Failed to fetch quotes: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::api(format!(
                "CryptoCompare API error ({}): {}",
                status, body
            )));
        }

        let document: QuoteDocument = response
            .json()
            .await
            .map_err(|e| FeedError::parse(format!("Failed to parse quote response: {}", e)))?;

        Ok(document)
    }
}

impl Default for CryptoCompareClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for CryptoCompareClient {
    async fn fetch_live(&self, fsyms: &[String], tsyms: &[String]) -> Result<Bytes, FeedError> {
        let document = self.price_multi_full(fsyms, tsyms).await?;

        // Re-serialize the parsed document so malformed upstream responses
        // never reach a subscriber.
        let payload = serde_json::to_vec(&document)
            .map_err(|e| FeedError::parse(format!("Failed to serialize quote document: {}", e)))?;

        Ok(Bytes::from(payload))
    }
}
