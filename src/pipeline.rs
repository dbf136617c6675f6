//! Single-network pipeline
//!
//! raw pools → token context + prices (one batch each) → enrich → project
//! → drop anything that is not finite.

use eyre::Result;
use futures::future::join_all;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

use crate::prices::PriceResolver;
use crate::subgraph::RawPoolMetrics;
use crate::tokens::TokenContextResolver;
use crate::yields::{app_network, enrich, project, PositionRecord};

pub struct Pipeline<T, P> {
    tokens: T,
    prices: P,
}

impl<T, P> Pipeline<T, P>
where
    T: TokenContextResolver,
    P: PriceResolver,
{
    pub fn new(tokens: T, prices: P) -> Self {
        Self { tokens, prices }
    }

    /// Two records per pool (lending, collateral) in input order, minus
    /// records with a non-finite numeric field.
    ///
    /// Fails if either resolver fails for the batch.
    pub async fn run(&self, network: &str, raw_pools: &[RawPoolMetrics]) -> Result<Vec<PositionRecord>> {
        let start = Instant::now();
        let label = app_network(network);

        if raw_pools.is_empty() {
            info!("[{}] No group pools", label);
            return Ok(Vec::new());
        }

        let addresses = collect_token_addresses(raw_pools);
        debug!("[{}] {} pools reference {} tokens", label, raw_pools.len(), addresses.len());

        let tokens = self.tokens.resolve(&addresses, network).await?;
        let prices = self.prices.resolve(&addresses, network).await?;

        let (tokens, prices) = (&tokens, &prices);
        let enriched = join_all(
            raw_pools
                .iter()
                .map(|raw| async move { enrich(raw, tokens, prices) }),
        )
        .await;

        let records: Vec<PositionRecord> = enriched
            .iter()
            .flat_map(|pool| project(pool, network))
            .collect();

        let produced = records.len();
        let records = retain_finite(records);

        info!(
            "[{}] {} pools → {} records ({} dropped) in {:?}",
            label,
            raw_pools.len(),
            records.len(),
            produced - records.len(),
            start.elapsed()
        );

        Ok(records)
    }
}

/// Distinct principal and collateral addresses, lowercase, first-seen order
pub fn collect_token_addresses(raw_pools: &[RawPoolMetrics]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut addresses = Vec::new();

    for pool in raw_pools {
        for address in pool.token_addresses() {
            let address = address.to_lowercase();
            if seen.insert(address.clone()) {
                addresses.push(address);
            }
        }
    }

    addresses
}

pub fn retain_finite(records: Vec<PositionRecord>) -> Vec<PositionRecord> {
    records.into_iter().filter(|r| r.is_finite()).collect()
}
