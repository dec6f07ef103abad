//! Pool price passthrough
//!
//! Thin client over the pricing service. Returns the service's records as-is,
//! optionally narrowed to a mint allow-list.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::tx_builder::ComposeError;
use crate::types::PoolInfoV2;

#[derive(Debug, Clone)]
pub struct PricesClient {
    http: Client,
    url: String,
}

impl PricesClient {
    pub fn new(prices_url: &str, timeout: Duration) -> Result<Self, ComposeError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ComposeError::Configuration(format!("prices client: {}", e)))?;
        Ok(Self {
            http,
            url: prices_url.to_string(),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, ComposeError> {
        Self::new(&config.prices_url, Duration::from_secs(config.timeout_secs))
    }

    /// Request URL, with `numNfts` when given
    pub fn request_url(&self, num_nfts: Option<u32>) -> String {
        match num_nfts {
            Some(n) if n > 0 => format!("{}?numNfts={}", self.url, n),
            _ => self.url.clone(),
        }
    }

    /// Fetch pool prices
    ///
    /// `mints` keeps only records whose mint is listed; `None` keeps all.
    pub async fn retrieve_prices(
        &self,
        mints: Option<&[String]>,
        num_nfts: Option<u32>,
    ) -> Result<Vec<PoolInfoV2>, ComposeError> {
        let url = self.request_url(num_nfts);
        let response = self.http.get(&url).send().await.map_err(|e| {
            warn!(%url, error = %e, "prices request failed");
            ComposeError::ServiceUnavailable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "prices service error");
            return Err(ComposeError::ServiceUnavailable(format!("HTTP {}", status)));
        }
        let prices: Vec<PoolInfoV2> = response
            .json()
            .await
            .map_err(|e| ComposeError::ServiceUnavailable(format!("JSON parse error: {}", e)))?;

        let prices = filter_by_mint(prices, mints);
        debug!(count = prices.len(), "prices retrieved");
        Ok(prices)
    }
}

pub fn filter_by_mint(prices: Vec<PoolInfoV2>, mints: Option<&[String]>) -> Vec<PoolInfoV2> {
    match mints {
        Some(mints) => prices
            .into_iter()
            .filter(|p| mints.iter().any(|m| *m == p.mint))
            .collect(),
        None => prices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mint: &str) -> PoolInfoV2 {
        PoolInfoV2 {
            mint: mint.to_string(),
            collection_id: "c".to_string(),
            fee: 0.0,
            royalty: 0.0,
            token_price: 1.0,
            raydium: None,
            orca: None,
        }
    }

    #[test]
    fn test_request_url() {
        let client = PricesClient::new("https://prices.example.invalid/v2", Duration::from_secs(1)).unwrap();
        assert_eq!(client.request_url(None), "https://prices.example.invalid/v2");
        assert_eq!(client.request_url(Some(0)), "https://prices.example.invalid/v2");
        assert_eq!(
            client.request_url(Some(5)),
            "https://prices.example.invalid/v2?numNfts=5"
        );
    }

    #[test]
    fn test_filter_by_mint() {
        let all = vec![record("a"), record("b"), record("c")];
        let keep = vec!["c".to_string(), "a".to_string()];

        let filtered = filter_by_mint(all.clone(), Some(&keep));
        assert_eq!(
            filtered.iter().map(|p| p.mint.as_str()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
        assert_eq!(filter_by_mint(all, None).len(), 3);
    }
}
