//! Teller group pool interest curve
//!
//! Rates move linearly between the pool's lower and upper bound as
//! utilization goes from 0 to 1. Bounds are in hundredths of a percent
//! (500 = 5%), so dividing by 100 yields an APY in percent.
//!
//! Borrowers pay the interpolated rate. Lenders only earn it on the
//! deployed share of the pool: idle principal earns nothing.

/// Lower bound used when the pool reports none (5%)
pub const DEFAULT_LOWER_BOUND: i64 = 500;

/// Upper bound used when the pool reports none (15%)
pub const DEFAULT_UPPER_BOUND: i64 = 1500;

/// Interest-rate bounds of one pool, defaults already applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterestBounds {
    pub lower: i64,
    pub upper: i64,
}

impl InterestBounds {
    /// Substitute defaults for bounds that are missing, unparseable or zero
    pub fn from_raw(lower: Option<i64>, upper: Option<i64>) -> Self {
        Self {
            lower: lower.filter(|v| *v != 0).unwrap_or(DEFAULT_LOWER_BOUND),
            upper: upper.filter(|v| *v != 0).unwrap_or(DEFAULT_UPPER_BOUND),
        }
    }
}

impl Default for InterestBounds {
    fn default() -> Self {
        Self::from_raw(None, None)
    }
}

/// Rate (bound units) at `utilization`. Endpoints return the bounds exactly.
pub fn interpolated_rate(utilization: f64, lower: i64, upper: i64) -> f64 {
    if utilization == 0.0 {
        lower as f64
    } else if utilization == 1.0 {
        upper as f64
    } else {
        let range = upper as f64 - lower as f64;
        lower as f64 + utilization * range
    }
}

/// Realized lender APY (%): the curve rate scaled by utilization
pub fn lender_yield(utilization: f64, lower: i64, upper: i64) -> f64 {
    (interpolated_rate(utilization, lower, upper) / 100.0) * utilization
}

/// Borrower APY (%): the curve rate
pub fn borrower_yield(utilization: f64, lower: i64, upper: i64) -> f64 {
    interpolated_rate(utilization, lower, upper) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        assert_eq!(
            InterestBounds::from_raw(None, None),
            InterestBounds { lower: 500, upper: 1500 }
        );
        assert_eq!(
            InterestBounds::from_raw(Some(0), Some(0)),
            InterestBounds { lower: 500, upper: 1500 }
        );
        assert_eq!(
            InterestBounds::from_raw(Some(300), None),
            InterestBounds { lower: 300, upper: 1500 }
        );
        assert_eq!(InterestBounds::default(), InterestBounds::from_raw(None, None));
    }

    #[test]
    fn test_lender_yield_at_endpoints() {
        assert_eq!(lender_yield(0.0, 500, 1500), 0.0);
        assert_eq!(lender_yield(1.0, 500, 1500), 15.0);
        assert_eq!(lender_yield(1.0, 700, 2500), 25.0);
    }

    #[test]
    fn test_borrower_yield_at_endpoints() {
        assert_eq!(borrower_yield(0.0, 500, 1500), 5.0);
        assert_eq!(borrower_yield(1.0, 500, 1500), 15.0);
    }

    #[test]
    fn test_forty_percent_utilization() {
        // 500 + 0.4 * 1000 = 900 -> 9% borrow, 9% * 0.4 = 3.6% lend
        assert!((borrower_yield(0.4, 500, 1500) - 9.0).abs() < 1e-12);
        assert!((lender_yield(0.4, 500, 1500) - 3.6).abs() < 1e-12);
    }

    #[test]
    fn test_borrower_yield_is_monotonic() {
        let mut previous = borrower_yield(0.0, 500, 1500);
        for step in 1..=100 {
            let u = step as f64 / 100.0;
            let current = borrower_yield(u, 500, 1500);
            assert!(current > previous, "not increasing at u={}", u);
            previous = current;
        }
    }

    #[test]
    fn test_flat_curve() {
        for u in [0.0, 0.25, 0.5, 1.0] {
            assert_eq!(borrower_yield(u, 800, 800), 8.0);
        }
    }
}
