//! Output projection
//!
//! Each enriched pool is published as two positions: the lending side
//! (principal supplied by lenders) and the collateral side (what
//! borrowers lock up to draw that principal). Field names follow the
//! yield aggregator schema and are serialized camelCase.

use serde::Serialize;
use std::fmt;

use super::enricher::EnrichedPool;

/// Protocol label carried by every record
pub const PROJECT: &str = "teller";

const APP_URL: &str = "https://app.teller.org";

// ============================================
// RECORDS
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LendingPosition {
    pub pool: String,
    pub chain: String,
    pub project: String,
    pub symbol: String,
    pub tvl_usd: f64,
    pub apy_base: f64,
    pub underlying_tokens: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralPosition {
    pub pool: String,
    pub chain: String,
    pub project: String,
    pub symbol: String,
    /// What is borrowed against this collateral
    pub minted_coin: String,
    pub tvl_usd: f64,
    pub total_supply_usd: f64,
    pub total_borrow_usd: f64,
    pub apy_base_borrow: f64,
    pub apy_base: f64,
    pub underlying_tokens: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionKind {
    Lending,
    Collateral,
}

impl fmt::Display for PositionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionKind::Lending => f.pad("lend"),
            PositionKind::Collateral => f.pad("collateral"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PositionRecord {
    Lending(LendingPosition),
    Collateral(CollateralPosition),
}

impl PositionRecord {
    pub fn kind(&self) -> PositionKind {
        match self {
            PositionRecord::Lending(_) => PositionKind::Lending,
            PositionRecord::Collateral(_) => PositionKind::Collateral,
        }
    }

    pub fn pool(&self) -> &str {
        match self {
            PositionRecord::Lending(p) => &p.pool,
            PositionRecord::Collateral(p) => &p.pool,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            PositionRecord::Lending(p) => &p.symbol,
            PositionRecord::Collateral(p) => &p.symbol,
        }
    }

    pub fn tvl_usd(&self) -> f64 {
        match self {
            PositionRecord::Lending(p) => p.tvl_usd,
            PositionRecord::Collateral(p) => p.tvl_usd,
        }
    }

    /// APY shown for the position: supply APY for lenders, borrow APY for collateral
    pub fn headline_apy(&self) -> f64 {
        match self {
            PositionRecord::Lending(p) => p.apy_base,
            PositionRecord::Collateral(p) => p.apy_base_borrow,
        }
    }

    pub fn numeric_fields(&self) -> Vec<f64> {
        match self {
            PositionRecord::Lending(p) => vec![p.tvl_usd, p.apy_base],
            PositionRecord::Collateral(p) => vec![
                p.tvl_usd,
                p.total_supply_usd,
                p.total_borrow_usd,
                p.apy_base_borrow,
                p.apy_base,
            ],
        }
    }

    /// No NaN or infinity in any numeric field
    pub fn is_finite(&self) -> bool {
        self.numeric_fields().iter().all(|v| v.is_finite())
    }
}

// ============================================
// NETWORK LABELS
// ============================================

/// Display name of a network identifier (`ethereum` -> `Ethereum`)
pub fn format_chain(network: &str) -> String {
    match network {
        "bsc" => "Binance".to_string(),
        "avax" => "Avalanche".to_string(),
        "xdai" => "xDai".to_string(),
        "era" => "zkSync Era".to_string(),
        "polygon_zkevm" => "Polygon zkEVM".to_string(),
        _ => {
            let mut chars = network.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// Canonical network label: `ethereum` is known as `mainnet`,
/// every other identifier is its own label
pub fn app_network(network: &str) -> &str {
    match network {
        "ethereum" => "mainnet",
        other => other,
    }
}

pub fn pool_url(network: &str, pool: &str) -> String {
    format!("{}/{}/lend/pool/{}", APP_URL, network, pool)
}

// ============================================
// PROJECTION
// ============================================

/// Lending record first, collateral record second
pub fn project(pool: &EnrichedPool, network: &str) -> [PositionRecord; 2] {
    let raw = &pool.raw;
    let underlying_tokens = vec![
        raw.principal_token_address.clone(),
        raw.collateral_token_address.clone(),
    ];
    let chain = format_chain(network);
    let url = pool_url(network, &raw.group_pool_address);

    let lending = LendingPosition {
        pool: raw.group_pool_address.clone(),
        chain: chain.clone(),
        project: PROJECT.to_string(),
        symbol: pool.principal_symbol.clone(),
        tvl_usd: pool.total_supply_usd,
        apy_base: pool.apy_base,
        underlying_tokens: underlying_tokens.clone(),
        url: url.clone(),
    };

    let collateral = CollateralPosition {
        pool: raw.group_pool_address.clone(),
        chain,
        project: PROJECT.to_string(),
        symbol: pool.collateral_symbol.clone(),
        minted_coin: pool.principal_symbol.clone(),
        tvl_usd: pool.total_collateral_usd,
        total_supply_usd: pool.total_collateral_usd,
        total_borrow_usd: pool.total_borrow_usd,
        apy_base_borrow: pool.borrow_apy,
        apy_base: 0.0,
        underlying_tokens,
        url,
    };

    [
        PositionRecord::Lending(lending),
        PositionRecord::Collateral(collateral),
    ]
}
