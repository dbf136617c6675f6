//! Token metadata for Teller pools
//!
//! Every principal and collateral token of a batch gets a symbol and a
//! decimals value. Lookups are batched into Multicall3 `aggregate3` calls
//! with `allowFailure`, so one broken token never sinks the batch: it
//! just resolves to `UNKNOWN` / 18 decimals.

use alloy_primitives::{address, Address};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info, warn};

// ============================================
// CONSTANTS
// ============================================

/// Symbol used when a token's metadata cannot be read
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// Decimals used when a token's metadata cannot be read
pub const DEFAULT_DECIMALS: u8 = 18;

/// Multicall3 address (same on all EVM chains)
const MULTICALL3: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Maximum calls per batch (two calls per token)
const MAX_CALLS_PER_BATCH: usize = 200;

sol! {
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls)
            external payable returns (Result[] memory returnData);
    }

    interface IERC20Metadata {
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
    }
}

// ============================================
// TOKEN CONTEXT
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Fallback for tokens whose metadata could not be resolved
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_SYMBOL, DEFAULT_DECIMALS)
    }
}

/// Token metadata for one batch, keyed by lowercase address.
/// Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct TokenContext {
    tokens: HashMap<String, TokenInfo>,
}

impl TokenContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: &str, info: TokenInfo) {
        self.tokens.insert(address.to_lowercase(), info);
    }

    pub fn get(&self, address: &str) -> Option<&TokenInfo> {
        self.tokens.get(&address.to_lowercase())
    }

    pub fn symbol_of(&self, address: &str) -> &str {
        self.get(address)
            .map(|t| t.symbol.as_str())
            .unwrap_or(UNKNOWN_SYMBOL)
    }

    pub fn decimals_of(&self, address: &str) -> u8 {
        self.get(address)
            .map(|t| t.decimals)
            .unwrap_or(DEFAULT_DECIMALS)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

// ============================================
// RESOLVERS
// ============================================

/// Batch lookup of token metadata for one network.
///
/// Implementations return an entry for every requested address. A
/// per-token failure is recorded as [`TokenInfo::unknown`]; `Err` is
/// reserved for failures of the batch as a whole.
#[async_trait]
pub trait TokenContextResolver: Send + Sync {
    async fn resolve(&self, addresses: &[String], network: &str) -> Result<TokenContext>;
}

/// Reads `symbol()` / `decimals()` on-chain through Multicall3
pub struct Erc20Resolver {
    rpc_url: String,
}

impl Erc20Resolver {
    pub fn new(rpc_url: String) -> Self {
        Self { rpc_url }
    }

    async fn execute_multicall(
        &self,
        calls: Vec<IMulticall3::Call3>,
    ) -> Result<Vec<IMulticall3::Result>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);

        let calldata = IMulticall3::aggregate3Call { calls }.abi_encode();

        let tx = TransactionRequest::default()
            .to(MULTICALL3)
            .input(calldata.into());

        let result = provider
            .call(tx)
            .await
            .map_err(|e| eyre!("Multicall3 failed: {}", e))?;

        let decoded = IMulticall3::aggregate3Call::abi_decode_returns(&result)
            .map_err(|e| eyre!("Failed to decode multicall: {}", e))?;

        Ok(decoded)
    }
}

#[async_trait]
impl TokenContextResolver for Erc20Resolver {
    async fn resolve(&self, addresses: &[String], network: &str) -> Result<TokenContext> {
        let start = Instant::now();
        let mut context = TokenContext::new();

        // Unparseable addresses never reach the chain
        let mut targets = Vec::new();
        for raw in addresses {
            match Address::from_str(raw) {
                Ok(addr) => targets.push((raw.as_str(), addr)),
                Err(e) => {
                    warn!("[{}] Invalid token address {}: {}", network, raw, e);
                    context.insert(raw, TokenInfo::unknown());
                }
            }
        }

        for chunk in targets.chunks(MAX_CALLS_PER_BATCH / 2) {
            let calls = chunk
                .iter()
                .flat_map(|(_, addr)| {
                    [
                        IMulticall3::Call3 {
                            target: *addr,
                            allowFailure: true,
                            callData: IERC20Metadata::symbolCall {}.abi_encode().into(),
                        },
                        IMulticall3::Call3 {
                            target: *addr,
                            allowFailure: true,
                            callData: IERC20Metadata::decimalsCall {}.abi_encode().into(),
                        },
                    ]
                })
                .collect::<Vec<_>>();

            let results = self.execute_multicall(calls).await?;

            for (idx, (raw, _)) in chunk.iter().enumerate() {
                let info = decode_token_info(results.get(idx * 2), results.get(idx * 2 + 1));
                match info {
                    Some(info) => context.insert(raw, info),
                    None => {
                        debug!("[{}] No ERC-20 metadata for {}", network, raw);
                        context.insert(raw, TokenInfo::unknown());
                    }
                }
            }
        }

        info!(
            "[{}] Resolved metadata for {} tokens in {:?}",
            network,
            context.len(),
            start.elapsed()
        );

        Ok(context)
    }
}

/// Both calls must succeed for a token to count as resolved
fn decode_token_info(
    symbol: Option<&IMulticall3::Result>,
    decimals: Option<&IMulticall3::Result>,
) -> Option<TokenInfo> {
    let symbol = symbol.filter(|r| r.success)?;
    let decimals = decimals.filter(|r| r.success)?;

    let symbol = IERC20Metadata::symbolCall::abi_decode_returns(&symbol.returnData).ok()?;
    let decimals = IERC20Metadata::decimalsCall::abi_decode_returns(&decimals.returnData).ok()?;

    Some(TokenInfo::new(symbol, decimals))
}

/// In-memory token table; anything not in it resolves to `UNKNOWN` / 18
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
    tokens: TokenContext,
}

impl StaticTokenResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, address: &str, symbol: &str, decimals: u8) -> Self {
        self.tokens.insert(address, TokenInfo::new(symbol, decimals));
        self
    }
}

#[async_trait]
impl TokenContextResolver for StaticTokenResolver {
    async fn resolve(&self, addresses: &[String], _network: &str) -> Result<TokenContext> {
        let mut context = TokenContext::new();
        for address in addresses {
            let info = self.tokens.get(address).cloned().unwrap_or_else(TokenInfo::unknown);
            context.insert(address, info);
        }
        Ok(context)
    }
}
