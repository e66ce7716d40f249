//! Expected crash cost over an operating period.
//!
//! Each operating hour is treated as an independent trial that crashes with
//! the one-hour failure probability P_F(1). The naive view prices a stable
//! queue (ρ < 1) at zero and an unstable one at a crash every hour.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::{naive_stability, MarkovConfig};
use super::generator::MarkovSystem;
use super::transient::failure_probability;
use crate::error::{Result, RiskError};

/// Lost orders plus recovery for one crash, in dollars.
pub const DEFAULT_CRASH_COST: f64 = 10_000.0;

/// Operating hours in a 30-day month.
pub const HOURS_PER_MONTH: f64 = 24.0 * 30.0;

/// Stochastic and naive crash cost over `hours` of operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrashCostEstimate {
    /// P_F(1), the chance an hour ends in failure.
    pub hourly_crash_probability: f64,
    /// hourly_crash_probability × hours.
    pub expected_crashes: f64,
    /// expected_crashes × cost_per_crash.
    pub expected_cost: f64,
    /// 0 if ρ < 1, else hours × cost_per_crash.
    pub naive_cost: f64,
}

impl CrashCostEstimate {
    /// Cost the naive view fails to budget for (or overstates).
    pub fn difference(&self) -> f64 {
        (self.expected_cost - self.naive_cost).abs()
    }
}

/// Prices transient failure risk over `hours` of operation.
///
/// # Errors
///
/// `InvalidParameter` for a negative or non-finite `cost_per_crash` or
/// non-positive `hours`; solver errors propagate.
///
/// # Examples
///
/// ```
/// use u_fulfillment::markov::{expected_crash_cost, MarkovConfig, DEFAULT_CRASH_COST, HOURS_PER_MONTH};
///
/// let cfg = MarkovConfig::new(95.0, 100.0).unwrap();
/// let est = expected_crash_cost(&cfg, DEFAULT_CRASH_COST, HOURS_PER_MONTH).unwrap();
/// assert_eq!(est.naive_cost, 0.0);
/// assert!(est.expected_cost > 1_000_000.0);
/// ```
pub fn expected_crash_cost(
    config: &MarkovConfig,
    cost_per_crash: f64,
    hours: f64,
) -> Result<CrashCostEstimate> {
    if !cost_per_crash.is_finite() || cost_per_crash < 0.0 {
        return Err(RiskError::invalid(
            "cost_per_crash",
            format!("must be finite and >= 0, got {cost_per_crash}"),
        ));
    }
    if !hours.is_finite() || hours <= 0.0 {
        return Err(RiskError::invalid(
            "hours",
            format!("must be finite and > 0, got {hours}"),
        ));
    }

    let system = MarkovSystem::from_config(config)?;
    let hourly_crash_probability = failure_probability(&system, 1.0)?;
    let expected_crashes = hourly_crash_probability * hours;
    let naive_cost = if naive_stability(config).stable {
        0.0
    } else {
        hours * cost_per_crash
    };

    let estimate = CrashCostEstimate {
        hourly_crash_probability,
        expected_crashes,
        expected_cost: expected_crashes * cost_per_crash,
        naive_cost,
    };
    debug!(
        hourly = hourly_crash_probability,
        expected_cost = estimate.expected_cost,
        naive_cost,
        "crash cost estimated"
    );
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_capacity_queue_costs_what_naive_ignores() {
        let cfg = MarkovConfig::new(95.0, 100.0).unwrap();
        let est = expected_crash_cost(&cfg, DEFAULT_CRASH_COST, HOURS_PER_MONTH).unwrap();
        assert!((est.hourly_crash_probability - 0.56938).abs() < 1e-4);
        assert!((est.expected_crashes - 720.0 * est.hourly_crash_probability).abs() < 1e-9);
        assert!((est.expected_cost - 4.0995e6).abs() < 1e3, "{}", est.expected_cost);
        assert_eq!(est.naive_cost, 0.0);
        assert_eq!(est.difference(), est.expected_cost);
    }

    #[test]
    fn overloaded_queue_naively_crashes_every_hour() {
        let cfg = MarkovConfig::new(150.0, 100.0).unwrap();
        let est = expected_crash_cost(&cfg, 500.0, 10.0).unwrap();
        assert_eq!(est.naive_cost, 5_000.0);
        assert!(est.expected_cost <= est.naive_cost + 1e-6);
        assert!(est.hourly_crash_probability > 0.9);
    }

    #[test]
    fn rejects_bad_inputs() {
        let cfg = MarkovConfig::new(95.0, 100.0).unwrap();
        assert!(expected_crash_cost(&cfg, -1.0, 720.0).unwrap_err().is_invalid_parameter());
        assert!(expected_crash_cost(&cfg, 100.0, 0.0).is_err());
        assert!(expected_crash_cost(&cfg, f64::NAN, 720.0).is_err());
    }
}
