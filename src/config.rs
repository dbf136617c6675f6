//! Configuration for the Teller yield scanner
//!
//! Networks to scan, where their data lives, and the knobs of the
//! historical snapshot. Loaded from the environment (.env supported)
//! or from a TOML file.

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

// ============================================
// DEFAULTS
// ============================================

/// Teller group pools subgraph on the decentralized network gateway
const DEFAULT_ETHEREUM_SUBGRAPH: &str =
    "https://gateway.thegraph.com/api/subgraphs/id/x6qJPkv7FaCWkfcjDWx12Z2NEfsvCCwuy87vQzk9zRh";

const DEFAULT_ETHEREUM_RPC: &str = "https://eth.llamarpc.com";

const DEFAULT_PRICE_API: &str = "https://coins.llama.fi";

/// Indexers trail the chain head; query a few blocks back
const DEFAULT_BLOCK_LAG: u64 = 30;

const DEFAULT_PAGE_SIZE: usize = 1000;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

// ============================================
// NETWORK
// ============================================

/// One network the scanner iterates over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network identifier as used by the price/block API (e.g. "ethereum")
    pub name: String,

    /// GraphQL endpoint exposing `groupPoolMetrics`
    pub subgraph_url: String,

    /// JSON-RPC endpoint used for ERC-20 metadata lookups
    pub rpc_url: String,
}

impl NetworkConfig {
    pub fn ethereum() -> Self {
        Self {
            name: "ethereum".to_string(),
            subgraph_url: DEFAULT_ETHEREUM_SUBGRAPH.to_string(),
            rpc_url: DEFAULT_ETHEREUM_RPC.to_string(),
        }
    }

    /// Build a network from `SUBGRAPH_URL_<NAME>` / `RPC_URL_<NAME>`.
    /// Ethereum falls back to the built-in endpoints.
    fn from_env(name: &str) -> Self {
        let key = name.to_uppercase();
        let fallback = if name == "ethereum" {
            Self::ethereum()
        } else {
            Self {
                name: name.to_string(),
                subgraph_url: String::new(),
                rpc_url: String::new(),
            }
        };

        Self {
            name: name.to_string(),
            subgraph_url: env::var(format!("SUBGRAPH_URL_{}", key))
                .unwrap_or(fallback.subgraph_url),
            rpc_url: env::var(format!("RPC_URL_{}", key)).unwrap_or(fallback.rpc_url),
        }
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Networks scanned sequentially, in this order
    pub networks: Vec<NetworkConfig>,

    /// Base URL of the coins API (prices + block-at-timestamp)
    pub price_api_url: String,

    /// Blocks subtracted from the block resolved for the snapshot timestamp
    pub block_lag: u64,

    /// `first:` argument of the pool metrics query
    pub page_size: usize,

    /// Timeout for every HTTP request
    pub http_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let networks = env::var("NETWORKS")
            .map(|s| {
                s.split(',')
                    .map(|n| n.trim().to_lowercase())
                    .filter(|n| !n.is_empty())
                    .map(|n| NetworkConfig::from_env(&n))
                    .collect()
            })
            .unwrap_or_else(|_| vec![NetworkConfig::from_env("ethereum")]);

        Ok(Self {
            networks,
            price_api_url: env::var("PRICE_API_URL")
                .unwrap_or_else(|_| DEFAULT_PRICE_API.to_string()),
            block_lag: env::var("BLOCK_LAG")
                .unwrap_or_else(|_| DEFAULT_BLOCK_LAG.to_string())
                .parse()
                .unwrap_or(DEFAULT_BLOCK_LAG),
            page_size: env::var("PAGE_SIZE")
                .unwrap_or_else(|_| DEFAULT_PAGE_SIZE.to_string())
                .parse()
                .unwrap_or(DEFAULT_PAGE_SIZE),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_HTTP_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Keep only the named network. Errors if it is not configured.
    pub fn restrict_to(&mut self, network: &str) -> Result<()> {
        let network = network.to_lowercase();
        self.networks.retain(|n| n.name == network);
        if self.networks.is_empty() {
            return Err(eyre::eyre!("Network '{}' is not configured", network));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.networks.is_empty() {
            return Err(eyre::eyre!("No networks configured (set NETWORKS)"));
        }

        for network in &self.networks {
            if network.name.is_empty() {
                return Err(eyre::eyre!("Network with empty name"));
            }
            if !is_usable_url(&network.subgraph_url) {
                return Err(eyre::eyre!(
                    "Invalid subgraph URL for {} - set SUBGRAPH_URL_{}",
                    network.name,
                    network.name.to_uppercase()
                ));
            }
            if !is_usable_url(&network.rpc_url) {
                return Err(eyre::eyre!(
                    "Invalid RPC URL for {} - set RPC_URL_{}",
                    network.name,
                    network.name.to_uppercase()
                ));
            }
        }

        if !is_usable_url(&self.price_api_url) {
            return Err(eyre::eyre!("Invalid PRICE_API_URL"));
        }
        if self.page_size == 0 {
            return Err(eyre::eyre!("PAGE_SIZE must be greater than zero"));
        }

        Ok(())
    }

    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║             TELLER YIELDS - CONFIGURATION                  ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Networks:          {:^40} ║", self.networks.len());
        for network in &self.networks {
            println!("║ • {:<56} ║", network.name);
        }
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ SNAPSHOT                                                   ║");
        println!("║ • Block Lag:       {:>38} blocks ║", self.block_lag);
        println!("║ • Page Size:       {:^40} ║", self.page_size);
        println!("║ • HTTP Timeout:    {:>38} s ║", self.http_timeout_secs);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            networks: vec![NetworkConfig::ethereum()],
            price_api_url: DEFAULT_PRICE_API.to_string(),
            block_lag: DEFAULT_BLOCK_LAG,
            page_size: DEFAULT_PAGE_SIZE,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

fn is_usable_url(url: &str) -> bool {
    (url.starts_with("http://") || url.starts_with("https://")) && !url.contains("YOUR_API_KEY")
}

// ============================================
// TESTS
// ============================================
