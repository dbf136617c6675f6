//! Raw pool metrics as indexed by the Teller subgraph
//!
//! The subgraph serializes BigInt/BigDecimal columns as decimal strings.
//! Every numeric column is read leniently, one field at a time: a row with
//! a bad value still deserializes, so one broken pool never costs the rest
//! of the batch. Counters that cannot be read become NaN and the pool's
//! records are dropped by the finite filter; rate and ratio settings that
//! cannot be read fall back to defaults further down the pipeline.

use serde::de::Deserializer;
use serde::Deserialize;

/// One `groupPoolMetrics` row
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPoolMetrics {
    pub id: String,
    pub group_pool_address: String,
    pub principal_token_address: String,
    pub collateral_token_address: String,
    #[serde(default)]
    pub shares_token_address: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub market_id: Option<String>,

    // ========== Principal counters (raw token units, NaN if unreadable) ==========
    #[serde(default = "unreadable", deserialize_with = "de_counter")]
    pub total_principal_tokens_committed: f64,
    #[serde(default = "unreadable", deserialize_with = "de_counter")]
    pub total_principal_tokens_withdrawn: f64,
    #[serde(default = "unreadable", deserialize_with = "de_counter")]
    pub total_principal_tokens_borrowed: f64,
    #[serde(default = "unreadable", deserialize_with = "de_counter")]
    pub total_principal_tokens_repaid: f64,
    #[serde(default = "unreadable", deserialize_with = "de_counter")]
    pub total_interest_collected: f64,
    /// Signed: liquidations can leave the pool with more or fewer tokens
    #[serde(default = "unreadable", deserialize_with = "de_counter")]
    pub token_difference_from_liquidations: f64,

    // ========== Collateral counters (raw token units, NaN if unreadable) ==========
    #[serde(default = "unreadable", deserialize_with = "de_counter")]
    pub total_collateral_tokens_escrowed: f64,
    #[serde(default = "unreadable", deserialize_with = "de_counter")]
    pub total_collateral_withdrawn: f64,

    // ========== Pool settings ==========
    /// Hundredths of a percent (500 = 5%)
    #[serde(default, deserialize_with = "de_lenient_int")]
    pub interest_rate_lower_bound: Option<i64>,
    #[serde(default, deserialize_with = "de_lenient_int")]
    pub interest_rate_upper_bound: Option<i64>,
    #[serde(default, deserialize_with = "de_lenient_int")]
    pub liquidity_threshold_percent: Option<i64>,
    /// Percent scaled by 100 (150 = 1.5x collateralization)
    #[serde(default, deserialize_with = "de_lenient_int")]
    pub collateral_ratio: Option<i64>,
}

impl RawPoolMetrics {
    /// Principal and collateral token, in that order
    pub fn token_addresses(&self) -> [&str; 2] {
        [&self.principal_token_address, &self.collateral_token_address]
    }
}

// ============================================
// NUMERIC PARSING
// ============================================

/// Anything a numeric column may hold. `Other` swallows objects, arrays
/// and booleans so a single odd value never fails the row.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Int(i64),
    Float(f64),
    Str(String),
    Other(serde::de::IgnoredAny),
}

fn unreadable() -> f64 {
    f64::NAN
}

/// Sign and leading digit run of `s`: optional sign, then digits up to
/// the first non-digit. `None` if there are no digits.
fn int_prefix(s: &str) -> Option<(bool, &str)> {
    let s = s.trim();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    Some((negative, &rest[..end]))
}

/// Integer prefix of `s` as `i64`, saturating at the `i64` range.
fn parse_int_prefix(s: &str) -> Option<i64> {
    let (negative, digits) = int_prefix(s)?;
    let value = match digits.parse::<i64>() {
        Ok(v) => v,
        // digit-only input only fails on overflow
        Err(_) => i64::MAX,
    };
    Some(if negative { value.saturating_neg() } else { value })
}

/// Integer prefix of `s` at any magnitude, NaN if there is none
fn parse_counter(s: &str) -> f64 {
    match int_prefix(s) {
        Some((negative, digits)) => {
            let value = digits.parse::<f64>().unwrap_or(f64::NAN);
            if negative {
                -value
            } else {
                value
            }
        }
        None => f64::NAN,
    }
}

fn de_counter<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumOrStr>::deserialize(deserializer)? {
        Some(NumOrStr::Int(v)) => v as f64,
        Some(NumOrStr::Float(f)) => f.trunc(),
        Some(NumOrStr::Str(s)) => parse_counter(&s),
        Some(NumOrStr::Other(_)) | None => f64::NAN,
    })
}

fn de_lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumOrStr>::deserialize(deserializer)? {
        Some(NumOrStr::Int(v)) => Some(v),
        Some(NumOrStr::Float(f)) if f.is_finite() => Some(f.trunc() as i64),
        Some(NumOrStr::Float(_)) => None,
        Some(NumOrStr::Str(s)) => parse_int_prefix(&s),
        Some(NumOrStr::Other(_)) | None => None,
    })
}

fn de_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumOrStr>::deserialize(deserializer)? {
        Some(NumOrStr::Int(v)) => Some(v.to_string()),
        Some(NumOrStr::Float(f)) => Some(f.to_string()),
        Some(NumOrStr::Str(s)) => Some(s),
        Some(NumOrStr::Other(_)) | None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> serde_json::Value {
        serde_json::json!({
            "id": "0xpool-1",
            "group_pool_address": "0x1111111111111111111111111111111111111111",
            "principal_token_address": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            "collateral_token_address": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
            "shares_token_address": "0x2222222222222222222222222222222222222222",
            "market_id": "33",
            "total_principal_tokens_committed": "250000000000",
            "total_principal_tokens_withdrawn": "10000000000",
            "total_principal_tokens_borrowed": "120000000000",
            "total_interest_collected": "1500000000",
            "token_difference_from_liquidations": "-2000000",
            "total_principal_tokens_repaid": "20000000000",
            "total_collateral_tokens_escrowed": "90000000000000000000",
            "total_collateral_withdrawn": "5000000000000000000",
            "interest_rate_upper_bound": "1800",
            "interest_rate_lower_bound": "400",
            "liquidity_threshold_percent": "8000",
            "collateral_ratio": "150"
        })
    }

    #[test]
    fn test_deserialize_subgraph_row() {
        let pool: RawPoolMetrics = serde_json::from_value(sample_row()).unwrap();

        assert_eq!(pool.market_id.as_deref(), Some("33"));
        assert_eq!(pool.total_principal_tokens_committed, 250_000_000_000.0);
        assert_eq!(pool.token_difference_from_liquidations, -2_000_000.0);
        assert_eq!(pool.total_collateral_tokens_escrowed, 9e19);
        assert_eq!(pool.interest_rate_lower_bound, Some(400));
        assert_eq!(pool.interest_rate_upper_bound, Some(1800));
        assert_eq!(pool.collateral_ratio, Some(150));
    }

    #[test]
    fn test_lenient_settings() {
        let mut row = sample_row();
        row["interest_rate_lower_bound"] = serde_json::json!("not-a-number");
        row["interest_rate_upper_bound"] = serde_json::Value::Null;
        row["collateral_ratio"] = serde_json::json!(175);
        row.as_object_mut().unwrap().remove("liquidity_threshold_percent");

        let pool: RawPoolMetrics = serde_json::from_value(row).unwrap();
        assert_eq!(pool.interest_rate_lower_bound, None);
        assert_eq!(pool.interest_rate_upper_bound, None);
        assert_eq!(pool.liquidity_threshold_percent, None);
        assert_eq!(pool.collateral_ratio, Some(175));
    }

    #[test]
    fn test_bad_rows_do_not_sink_the_batch() {
        let good = sample_row();

        let mut oversized = sample_row();
        oversized["id"] = serde_json::json!("0xpool-2");
        oversized["total_collateral_tokens_escrowed"] =
            serde_json::json!(format!("1{}", "0".repeat(42)));

        let mut malformed = sample_row();
        malformed["id"] = serde_json::json!("0xpool-3");
        malformed["total_principal_tokens_borrowed"] = serde_json::json!("not-a-number");
        malformed["total_principal_tokens_repaid"] = serde_json::json!({ "unexpected": true });

        let pools: Vec<RawPoolMetrics> =
            serde_json::from_value(serde_json::json!([good, oversized, malformed])).unwrap();

        assert_eq!(pools.len(), 3);
        assert_eq!(pools[0].total_principal_tokens_borrowed, 120_000_000_000.0);
        assert!((pools[1].total_collateral_tokens_escrowed / 1e42 - 1.0).abs() < 1e-12);
        assert!(pools[2].total_principal_tokens_borrowed.is_nan());
        assert!(pools[2].total_principal_tokens_repaid.is_nan());
        assert_eq!(pools[2].total_principal_tokens_committed, 250_000_000_000.0);
    }

    #[test]
    fn test_counter_parsing() {
        assert_eq!(parse_counter("1500"), 1500.0);
        assert_eq!(parse_counter(" -42 "), -42.0);
        assert_eq!(parse_counter("12abc"), 12.0);
        assert_eq!(parse_counter("1e5"), 1.0);
        assert!(parse_counter("abc").is_nan());
        assert!(parse_counter("").is_nan());

        let mut row = sample_row();
        row.as_object_mut().unwrap().remove("total_interest_collected");
        row["total_collateral_withdrawn"] = serde_json::json!(3.0e18);
        let pool: RawPoolMetrics = serde_json::from_value(row).unwrap();
        assert!(pool.total_interest_collected.is_nan());
        assert_eq!(pool.total_collateral_withdrawn, 3.0e18);
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("1500"), Some(1500));
        assert_eq!(parse_int_prefix(" 1500.75 "), Some(1500));
        assert_eq!(parse_int_prefix("-42bps"), Some(-42));
        assert_eq!(parse_int_prefix("+7"), Some(7));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("-"), None);
    }

    #[test]
    fn test_parse_int_prefix_saturates() {
        let huge = format!("9{}", "0".repeat(30));
        assert_eq!(parse_int_prefix(&huge), Some(i64::MAX));
        assert_eq!(parse_int_prefix(&format!("-{}", huge)), Some(-i64::MAX));
    }
}
