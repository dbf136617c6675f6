//! Pool enrichment
//!
//! Turns one raw subgraph row into USD figures, utilization and APYs.
//! Never fails: unknown tokens fall back to 18 decimals and unpriced
//! tokens are worth $0. Counters are plain floats, so oversized values
//! lose precision instead of overflowing and unreadable (NaN) counters
//! surface as non-finite USD figures.

use tracing::debug;

use super::curve::{borrower_yield, lender_yield, InterestBounds};
use crate::prices::PriceMap;
use crate::subgraph::RawPoolMetrics;
use crate::tokens::TokenContext;

/// A raw pool plus everything derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPool {
    pub raw: RawPoolMetrics,

    pub principal_symbol: String,
    pub collateral_symbol: String,
    pub principal_decimals: u8,
    pub collateral_decimals: u8,

    /// Actively borrowed / actively committed, in [0, 1]
    pub utilization: f64,

    pub total_supply_usd: f64,
    pub total_borrow_usd: f64,
    /// Negative when more collateral was withdrawn than escrowed
    pub total_collateral_usd: f64,
    /// Supply net of what is lent out
    pub tvl_usd: f64,

    /// Lender APY in percent
    pub apy_base: f64,
    /// Borrower APY in percent
    pub borrow_apy: f64,
    /// `None` when the pool reports no (or a zero) collateral ratio
    pub ltv: Option<f64>,
}

/// USD value of `raw_amount` base units: `raw × (price / 10^decimals)`
pub fn to_usd(raw_amount: f64, price_usd: f64, decimals: u8) -> f64 {
    let divisor = 10_f64.powi(decimals as i32);
    raw_amount * (price_usd / divisor)
}

/// Borrowed share of the committed base, clamped to [0, 1].
/// Zero when nothing is committed, NaN when either side is unreadable.
pub fn utilization(actively_borrowed: f64, actively_committed: f64) -> f64 {
    if actively_borrowed.is_nan() || actively_committed.is_nan() {
        f64::NAN
    } else if actively_committed > 0.0 {
        (actively_borrowed / actively_committed).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `100 / (ratio / 100)`, e.g. 150 -> 66.67
pub fn loan_to_value(collateral_ratio: Option<i64>) -> Option<f64> {
    match collateral_ratio {
        Some(ratio) if ratio != 0 => Some(100.0 / (ratio as f64 / 100.0)),
        _ => None,
    }
}

pub fn enrich(raw: &RawPoolMetrics, tokens: &TokenContext, prices: &PriceMap) -> EnrichedPool {
    let principal = raw.principal_token_address.as_str();
    let collateral = raw.collateral_token_address.as_str();

    let principal_decimals = tokens.decimals_of(principal);
    let collateral_decimals = tokens.decimals_of(collateral);

    debug!(
        "Token decimals for pool {}: principal={}, collateral={}",
        raw.group_pool_address, principal_decimals, collateral_decimals
    );

    let net_collateral = raw.total_collateral_tokens_escrowed - raw.total_collateral_withdrawn;

    let actively_borrowed = raw.total_principal_tokens_borrowed - raw.total_principal_tokens_repaid;

    // Interest and liquidation deltas move the lendable base too
    let actively_committed = raw.total_principal_tokens_committed
        + raw.total_interest_collected
        + raw.token_difference_from_liquidations
        - raw.total_principal_tokens_withdrawn;

    let utilization = utilization(actively_borrowed, actively_committed);

    let principal_price = prices.price_of(principal);
    let collateral_price = prices.price_of(collateral);

    let total_supply_usd = to_usd(actively_committed, principal_price, principal_decimals);
    let total_borrow_usd = to_usd(actively_borrowed, principal_price, principal_decimals);
    let total_collateral_usd = to_usd(net_collateral, collateral_price, collateral_decimals);

    let bounds = InterestBounds::from_raw(raw.interest_rate_lower_bound, raw.interest_rate_upper_bound);

    EnrichedPool {
        principal_symbol: tokens.symbol_of(principal).to_string(),
        collateral_symbol: tokens.symbol_of(collateral).to_string(),
        principal_decimals,
        collateral_decimals,
        utilization,
        total_supply_usd,
        total_borrow_usd,
        total_collateral_usd,
        tvl_usd: total_supply_usd - total_borrow_usd,
        apy_base: lender_yield(utilization, bounds.lower, bounds.upper),
        borrow_apy: borrower_yield(utilization, bounds.lower, bounds.upper),
        ltv: loan_to_value(raw.collateral_ratio),
        raw: raw.clone(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tokens::TokenInfo;

    pub const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
    pub const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";

    /// Pool lending USDC against WETH with every counter at zero
    pub fn empty_pool(pool: &str) -> RawPoolMetrics {
        RawPoolMetrics {
            id: format!("{}-metrics", pool),
            group_pool_address: pool.to_string(),
            principal_token_address: USDC.to_string(),
            collateral_token_address: WETH.to_string(),
            shares_token_address: None,
            market_id: Some("1".to_string()),
            total_principal_tokens_committed: 0.0,
            total_principal_tokens_withdrawn: 0.0,
            total_principal_tokens_borrowed: 0.0,
            total_principal_tokens_repaid: 0.0,
            total_interest_collected: 0.0,
            token_difference_from_liquidations: 0.0,
            total_collateral_tokens_escrowed: 0.0,
            total_collateral_withdrawn: 0.0,
            interest_rate_lower_bound: Some(500),
            interest_rate_upper_bound: Some(1500),
            liquidity_threshold_percent: Some(8000),
            collateral_ratio: Some(150),
        }
    }

    fn context() -> (TokenContext, PriceMap) {
        let mut tokens = TokenContext::new();
        tokens.insert(USDC, TokenInfo::new("USDC", 6));
        tokens.insert(WETH, TokenInfo::new("WETH", 18));

        let mut prices = PriceMap::new();
        prices.insert(USDC, 1.0);
        prices.insert(WETH, 2000.0);

        (tokens, prices)
    }

    #[test]
    fn test_forty_percent_utilized_pool() {
        let (tokens, prices) = context();
        let mut raw = empty_pool("0xpool");
        raw.total_principal_tokens_committed = 1000.0;
        raw.total_principal_tokens_borrowed = 400.0;

        let pool = enrich(&raw, &tokens, &prices);

        assert_eq!(pool.utilization, 0.4);
        assert!((pool.apy_base - 3.6).abs() < 1e-12);
        assert!((pool.borrow_apy - 9.0).abs() < 1e-12);
        assert_eq!(pool.principal_symbol, "USDC");
        assert_eq!(pool.collateral_symbol, "WETH");
    }

    #[test]
    fn test_usd_figures() {
        let (tokens, prices) = context();
        let mut raw = empty_pool("0xpool");
        raw.total_principal_tokens_committed = 250_000_000_000.0; // 250k USDC
        raw.total_principal_tokens_withdrawn = 50_000_000_000.0;
        raw.total_interest_collected = 2_000_000_000.0;
        raw.token_difference_from_liquidations = -1_000_000_000.0;
        raw.total_principal_tokens_borrowed = 120_000_000_000.0;
        raw.total_principal_tokens_repaid = 20_000_000_000.0;
        raw.total_collateral_tokens_escrowed = 100_000_000_000_000_000_000.0; // 100 WETH
        raw.total_collateral_withdrawn = 40_000_000_000_000_000_000.0;

        let pool = enrich(&raw, &tokens, &prices);

        // committed: 250k + 2k - 1k - 50k = 201k; borrowed: 100k
        assert!((pool.total_supply_usd - 201_000.0).abs() < 1e-6);
        assert!((pool.total_borrow_usd - 100_000.0).abs() < 1e-6);
        assert!((pool.tvl_usd - 101_000.0).abs() < 1e-6);
        assert!((pool.total_collateral_usd - 120_000.0).abs() < 1e-6);
        assert!((pool.utilization - 100.0 / 201.0).abs() < 1e-12);
    }

    #[test]
    fn test_utilization_is_clamped() {
        assert_eq!(utilization(5_000.0, 1_000.0), 1.0);
        assert_eq!(utilization(-300.0, 1_000.0), 0.0);
        assert_eq!(utilization(500.0, 0.0), 0.0);
        assert_eq!(utilization(500.0, -10.0), 0.0);

        let (tokens, prices) = context();
        let mut raw = empty_pool("0xskewed");
        raw.total_principal_tokens_committed = 1_000.0;
        raw.total_principal_tokens_borrowed = 3_000.0;

        let pool = enrich(&raw, &tokens, &prices);
        assert_eq!(pool.utilization, 1.0);
        assert_eq!(pool.apy_base, 15.0);
        assert_eq!(pool.borrow_apy, 15.0);
    }

    #[test]
    fn test_negative_net_collateral_passes_through() {
        let (tokens, prices) = context();
        let mut raw = empty_pool("0xpool");
        raw.total_collateral_tokens_escrowed = 1_000_000_000_000_000_000.0;
        raw.total_collateral_withdrawn = 3_000_000_000_000_000_000.0;

        let pool = enrich(&raw, &tokens, &prices);
        assert!((pool.total_collateral_usd + 4000.0).abs() < 1e-6);
    }

    #[test]
    fn test_loan_to_value() {
        assert!((loan_to_value(Some(150)).unwrap() - 66.666_666_666_666_67).abs() < 1e-9);
        assert_eq!(loan_to_value(Some(200)), Some(50.0));
        assert_eq!(loan_to_value(Some(0)), None);
        assert_eq!(loan_to_value(None), None);
    }

    #[test]
    fn test_unresolved_tokens_use_defaults() {
        let raw = {
            let mut raw = empty_pool("0xpool");
            raw.principal_token_address = "0x000000000000000000000000000000000000beef".to_string();
            raw.total_principal_tokens_committed = 5_000_000_000_000_000_000.0;
            raw
        };

        let mut prices = PriceMap::new();
        prices.insert(&raw.principal_token_address, 2.0);

        let pool = enrich(&raw, &TokenContext::new(), &prices);

        assert_eq!(pool.principal_symbol, "UNKNOWN");
        assert_eq!(pool.principal_decimals, 18);
        assert_eq!(pool.collateral_decimals, 18);
        assert!((pool.total_supply_usd - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_prices_value_at_zero() {
        let (tokens, _) = context();
        let mut raw = empty_pool("0xpool");
        raw.total_principal_tokens_committed = 1_000_000.0;
        raw.total_collateral_tokens_escrowed = 1_000_000.0;

        let pool = enrich(&raw, &tokens, &PriceMap::new());
        assert_eq!(pool.total_supply_usd, 0.0);
        assert_eq!(pool.total_collateral_usd, 0.0);
        assert_eq!(pool.tvl_usd, 0.0);
    }

    #[test]
    fn test_missing_bounds_use_default_curve() {
        let (tokens, prices) = context();
        let mut raw = empty_pool("0xpool");
        raw.interest_rate_lower_bound = None;
        raw.interest_rate_upper_bound = Some(0);

        let pool = enrich(&raw, &tokens, &prices);
        assert_eq!(pool.utilization, 0.0);
        assert_eq!(pool.borrow_apy, 5.0);
        assert_eq!(pool.apy_base, 0.0);
    }

    #[test]
    fn test_oversized_counters_stay_finite() {
        let (tokens, prices) = context();
        let mut raw = empty_pool("0xpool");
        raw.total_principal_tokens_committed = i128::MAX as f64;
        raw.total_interest_collected = 1.0;
        raw.total_principal_tokens_borrowed = 1e36;
        raw.total_collateral_tokens_escrowed = 1e42;

        let pool = enrich(&raw, &tokens, &prices);

        assert!(pool.total_supply_usd.is_finite());
        assert!(pool.total_collateral_usd.is_finite());
        assert!(pool.utilization > 0.0 && pool.utilization < 0.01);
    }

    #[test]
    fn test_unreadable_counter_poisons_pool_figures() {
        let (tokens, prices) = context();
        let mut raw = empty_pool("0xpool");
        raw.total_principal_tokens_committed = 1_000.0;
        raw.total_principal_tokens_borrowed = f64::NAN;

        let pool = enrich(&raw, &tokens, &prices);

        assert!(pool.utilization.is_nan());
        assert!(pool.apy_base.is_nan());
        assert!(pool.borrow_apy.is_nan());
        assert!(pool.total_borrow_usd.is_nan());
        assert!(utilization(1.0, f64::NAN).is_nan());
    }

    #[test]
    fn test_to_usd() {
        assert!((to_usd(1_500_000.0, 1.0, 6) - 1.5).abs() < 1e-12);
        assert_eq!(to_usd(7.0, 3.0, 0), 21.0);
        assert_eq!(to_usd(0.0, 2000.0, 18), 0.0);
    }
}
