//! Subgraph ingest
//!
//! Raw group pool counters for one network, pinned to a historical block.

mod fetcher;
mod types;

pub use fetcher::SubgraphFetcher;
pub use types::RawPoolMetrics;
