//! USD prices for pool tokens
//!
//! Prices come from the coins API (`/prices/current/{chain}:{address},...`).
//! A token the API does not know is simply absent from the map and
//! prices at $0 downstream.

use async_trait::async_trait;
use eyre::{eyre, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Coins per request (keeps the URL well under common length limits)
const COINS_PER_REQUEST: usize = 50;

// ============================================
// PRICE MAP
// ============================================

/// USD prices for one batch, keyed by lowercase address
#[derive(Debug, Clone, Default)]
pub struct PriceMap {
    prices: HashMap<String, f64>,
}

impl PriceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Negative or non-finite quotes are stored as 0
    pub fn insert(&mut self, address: &str, price_usd: f64) {
        let price = if price_usd.is_finite() && price_usd > 0.0 {
            price_usd
        } else {
            0.0
        };
        self.prices.insert(address.to_lowercase(), price);
    }

    /// USD price of one whole token, 0 when unknown
    pub fn price_of(&self, address: &str) -> f64 {
        self.prices
            .get(&address.to_lowercase())
            .copied()
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

// ============================================
// RESOLVERS
// ============================================

/// Batch price lookup for one network. `Err` means the whole batch failed.
#[async_trait]
pub trait PriceResolver: Send + Sync {
    async fn resolve(&self, addresses: &[String], network: &str) -> Result<PriceMap>;
}

#[derive(Debug, Deserialize)]
struct PricesResponse {
    #[serde(default)]
    coins: HashMap<String, CoinPrice>,
}

#[derive(Debug, Deserialize)]
struct CoinPrice {
    price: f64,
    #[serde(default)]
    symbol: Option<String>,
}

pub struct LlamaPriceResolver {
    http_client: Client,
    base_url: String,
}

impl LlamaPriceResolver {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn prices_url(&self, addresses: &[String], network: &str) -> String {
        let coins = addresses
            .iter()
            .map(|a| format!("{}:{}", network, a.to_lowercase()))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}/prices/current/{}", self.base_url, coins)
    }
}

#[async_trait]
impl PriceResolver for LlamaPriceResolver {
    async fn resolve(&self, addresses: &[String], network: &str) -> Result<PriceMap> {
        let start = Instant::now();
        let mut prices = PriceMap::new();

        for chunk in addresses.chunks(COINS_PER_REQUEST) {
            let url = self.prices_url(chunk, network);

            let response: PricesResponse = self
                .http_client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            merge_prices(&mut prices, response);
        }

        let missing = addresses
            .iter()
            .filter(|a| prices.price_of(a) == 0.0)
            .count();
        if missing > 0 {
            warn!("[{}] {} of {} tokens have no USD price", network, missing, addresses.len());
        }

        info!(
            "[{}] Fetched {} prices in {:?}",
            network,
            prices.len(),
            start.elapsed()
        );

        Ok(prices)
    }
}

/// Response keys look like `ethereum:0xabc...`
fn merge_prices(prices: &mut PriceMap, response: PricesResponse) {
    for (key, coin) in response.coins {
        let address = key.rsplit(':').next().unwrap_or(&key);
        debug!(
            "{} ({}) = ${}",
            address,
            coin.symbol.as_deref().unwrap_or("?"),
            coin.price
        );
        prices.insert(address, coin.price);
    }
}

/// Fixed price table, for offline runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticPriceResolver {
    prices: PriceMap,
}

impl StaticPriceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, address: &str, price_usd: f64) -> Self {
        self.prices.insert(address, price_usd);
        self
    }
}

#[async_trait]
impl PriceResolver for StaticPriceResolver {
    async fn resolve(&self, addresses: &[String], _network: &str) -> Result<PriceMap> {
        let mut prices = PriceMap::new();
        for address in addresses {
            let price = self.prices.price_of(address);
            if price > 0.0 {
                prices.insert(address, price);
            }
        }
        Ok(prices)
    }
}
