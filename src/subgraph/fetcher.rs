//! Pool metrics fetcher
//!
//! Pins the subgraph query to a block a little behind the snapshot
//! timestamp (indexers lag the head), then pulls every group pool.

use eyre::{eyre, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::types::RawPoolMetrics;

const POOL_METRICS_QUERY: &str = r#"
  query GetPoolMetrics($block: Block_height, $first: Int!) {
    groupPoolMetrics(first: $first, block: $block) {
      id
      group_pool_address
      principal_token_address
      collateral_token_address
      shares_token_address
      market_id
      total_principal_tokens_committed
      total_principal_tokens_withdrawn
      total_principal_tokens_borrowed
      total_interest_collected
      token_difference_from_liquidations
      total_principal_tokens_repaid
      total_collateral_tokens_escrowed
      total_collateral_withdrawn
      interest_rate_upper_bound
      interest_rate_lower_bound
      liquidity_threshold_percent
      collateral_ratio
    }
  }
"#;

// ============================================
// WIRE TYPES
// ============================================

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: QueryVariables,
}

#[derive(Debug, Serialize, PartialEq)]
struct QueryVariables {
    block: Option<BlockHeight>,
    first: usize,
}

#[derive(Debug, Serialize, PartialEq)]
struct BlockHeight {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PoolMetricsData {
    #[serde(rename = "groupPoolMetrics")]
    group_pool_metrics: Vec<RawPoolMetrics>,
}

/// `GET /block/{chain}/{timestamp}` response of the coins API
#[derive(Debug, Deserialize)]
struct BlockResponse {
    height: u64,
}

// ============================================
// FETCHER
// ============================================

pub struct SubgraphFetcher {
    http_client: Client,
    network: String,
    subgraph_url: String,
    block_api_url: String,
    block_lag: u64,
    page_size: usize,
}

impl SubgraphFetcher {
    pub fn new(
        network: &str,
        subgraph_url: &str,
        block_api_url: &str,
        block_lag: u64,
        page_size: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            network: network.to_string(),
            subgraph_url: subgraph_url.to_string(),
            block_api_url: block_api_url.trim_end_matches('/').to_string(),
            block_lag,
            page_size,
        })
    }

    /// Fetch all pool metrics as of `timestamp` (unix seconds).
    ///
    /// If the block for the timestamp cannot be resolved the query runs
    /// against the latest indexed block instead.
    pub async fn fetch_pool_metrics(&self, timestamp: i64) -> Result<Vec<RawPoolMetrics>> {
        let start = Instant::now();

        let block = match self.resolve_block(timestamp).await {
            Ok(height) => Some(height.saturating_sub(self.block_lag)),
            Err(e) => {
                warn!(
                    "[{}] Block lookup for {} failed, querying latest: {}",
                    self.network, timestamp, e
                );
                None
            }
        };

        let request = GraphQlRequest {
            query: POOL_METRICS_QUERY,
            variables: self.query_variables(block),
        };

        let response: GraphQlResponse<PoolMetricsData> = self
            .http_client
            .post(&self.subgraph_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let pools = extract_pools(response)?;

        info!(
            "[{}] Fetched {} group pools at block {:?} in {:?}",
            self.network,
            pools.len(),
            block,
            start.elapsed()
        );

        Ok(pools)
    }

    async fn resolve_block(&self, timestamp: i64) -> Result<u64> {
        let url = format!("{}/block/{}/{}", self.block_api_url, self.network, timestamp);

        let response: BlockResponse = self
            .http_client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("[{}] Block at {}: {}", self.network, timestamp, response.height);
        Ok(response.height)
    }

    fn query_variables(&self, block: Option<u64>) -> QueryVariables {
        QueryVariables {
            block: block.map(|number| BlockHeight { number }),
            first: self.page_size,
        }
    }
}

fn extract_pools(response: GraphQlResponse<PoolMetricsData>) -> Result<Vec<RawPoolMetrics>> {
    if !response.errors.is_empty() {
        let messages: Vec<_> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(eyre!("Subgraph query failed: {}", messages.join("; ")));
    }

    response
        .data
        .map(|d| d.group_pool_metrics)
        .ok_or_else(|| eyre!("Subgraph returned no data"))
}
