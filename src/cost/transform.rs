//! Change-of-variables from delay-time density to cost density, and
//! empirical Value-at-Risk.
//!
//! # Algorithm
//!
//! For a strictly increasing cost map Y = g(T):
//!
//! ```text
//! f_Y(y) = f_T(g⁻¹(y)) · |d/dy g⁻¹(y)|
//! ```
//!
//! f_T is a Gaussian KDE of the observed delays. For g(t) = t² the Jacobian
//! 1/(2√y) diverges as y → 0, so the cost grid starts at a small positive
//! lower bound.
//!
//! VaR_q is the q-th sample quantile of the transformed observations
//! {g(tᵢ)}.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use u_numflow::stats;

use super::function::CostFunction;
use super::kde::{BandwidthMethod, KernelDensity};
use crate::error::{Result, RiskError};

/// Smallest cost at which the Jacobian is evaluated.
const MIN_COST: f64 = 1e-6;

/// Controls for [`analyze_cost_risk`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRiskConfig {
    /// KDE bandwidth rule for the delay-time density.
    pub bandwidth: BandwidthMethod,
    /// First point of the cost grid (must be > 0).
    pub lower_bound: f64,
    /// The cost grid ends at `upper_multiplier × VaR₉₅`.
    pub upper_multiplier: f64,
    /// Number of cost grid points.
    pub grid_points: usize,
}

impl Default for CostRiskConfig {
    fn default() -> Self {
        Self {
            bandwidth: BandwidthMethod::Scott,
            lower_bound: 0.1,
            upper_multiplier: 1.5,
            grid_points: 500,
        }
    }
}

impl CostRiskConfig {
    fn validate(&self) -> Result<()> {
        if !self.lower_bound.is_finite() || self.lower_bound <= 0.0 {
            return Err(RiskError::invalid(
                "lower_bound",
                format!("cost grid must start above zero, got {}", self.lower_bound),
            ));
        }
        if !self.upper_multiplier.is_finite() || self.upper_multiplier <= 0.0 {
            return Err(RiskError::invalid(
                "upper_multiplier",
                format!("must be positive, got {}", self.upper_multiplier),
            ));
        }
        if self.grid_points < 2 {
            return Err(RiskError::invalid(
                "grid_points",
                format!("grid needs at least 2 points, got {}", self.grid_points),
            ));
        }
        Ok(())
    }
}

/// Continuous cost density sampled on a uniform grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDistribution {
    /// Cost grid (dollars).
    pub y: Vec<f64>,
    /// Density f_Y at each grid point.
    pub density: Vec<f64>,
}

impl CostDistribution {
    /// Trapezoidal integral of the density over the grid.
    pub fn total_mass(&self) -> f64 {
        trapezoid(&self.y, &self.density)
    }
}

/// Tail quantiles of the cost sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueAtRisk {
    /// 95th percentile cost.
    pub var_95: f64,
    /// 99th percentile cost.
    pub var_99: f64,
}

/// Full result of the cost-risk transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRiskReport {
    /// Number of delay observations used.
    pub n_obs: usize,
    /// KDE bandwidth for the delay-time density.
    pub time_bandwidth: f64,
    /// Implied cost density.
    pub distribution: CostDistribution,
    /// Empirical VaR at 95% and 99%.
    pub value_at_risk: ValueAtRisk,
    /// Mean transformed cost.
    pub mean_cost: f64,
    /// Median transformed cost.
    pub median_cost: f64,
    /// Largest transformed cost.
    pub max_cost: f64,
}

/// Linear "time is money" estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NaiveCost {
    /// Mean delay (days).
    pub mean_delay: f64,
    /// mean_delay × rate_per_day.
    pub per_order: f64,
    /// per_order × number of orders.
    pub total: f64,
}

fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| 0.5 * (xw[1] - xw[0]) * (yw[0] + yw[1]))
        .sum()
}

fn validate_times(times: &[f64]) -> Result<()> {
    if let Some(&bad) = times.iter().find(|&&t| !t.is_finite() || t <= 0.0) {
        return Err(RiskError::invalid(
            "times",
            format!("delay observations must be finite and > 0, found {bad}"),
        ));
    }
    Ok(())
}

/// Maps a fitted delay-time density through `g` onto `y_grid`.
///
/// Costs are positive, so grid points at or below zero get density 0.
/// Points in (0, `MIN_COST`) are evaluated at `MIN_COST` so the Jacobian
/// never divides by ~0.
///
/// # Errors
///
/// `InvalidParameter` if `g` fails its own validation.
pub fn transform_density<G: CostFunction>(
    kde: &KernelDensity,
    g: &G,
    y_grid: &[f64],
) -> Result<CostDistribution> {
    g.validate()?;
    let mut clamped = 0_usize;
    let density = y_grid
        .iter()
        .map(|&y| {
            if y <= 0.0 {
                return 0.0;
            }
            let y_eval = if y < MIN_COST {
                clamped += 1;
                MIN_COST
            } else {
                y
            };
            kde.evaluate(g.inverse(y_eval)) * g.inverse_derivative(y_eval).abs()
        })
        .collect();

    if clamped > 0 {
        warn!(clamped, floor = MIN_COST, "cost grid points clamped away from zero");
    }

    Ok(CostDistribution {
        y: y_grid.to_vec(),
        density,
    })
}

/// Empirical Value-at-Risk: the `q`-th quantile of {g(tᵢ)}.
///
/// # Errors
///
/// `InvalidParameter` for q outside (0, 1), non-positive delays or an
/// invalid cost function; `InsufficientData` for an empty sample.
pub fn value_at_risk<G: CostFunction>(times: &[f64], g: &G, q: f64) -> Result<f64> {
    g.validate()?;
    if !q.is_finite() || q <= 0.0 || q >= 1.0 {
        return Err(RiskError::invalid(
            "q",
            format!("confidence level must lie in (0, 1), got {q}"),
        ));
    }
    if times.is_empty() {
        return Err(RiskError::insufficient(1, 0, "VaR needs at least one observation"));
    }
    validate_times(times)?;
    let costs: Vec<f64> = times.iter().map(|&t| g.cost(t)).collect();
    stats::quantile(&costs, q)
        .ok_or_else(|| RiskError::Numerical(format!("quantile {q} of cost sample undefined")))
}

/// Fits a KDE to the delays, transforms it through `g`, and reports VaR.
///
/// # Examples
///
/// ```
/// use u_fulfillment::cost::{analyze_cost_risk, CostRiskConfig, QuadraticCost};
///
/// let times: Vec<f64> = (1..=200).map(|i| 1.0 + (i as f64 * 0.37) % 9.0).collect();
/// let report = analyze_cost_risk(&times, &QuadraticCost::default(), &CostRiskConfig::default())
///     .unwrap();
/// assert!(report.value_at_risk.var_99 >= report.value_at_risk.var_95);
/// assert_eq!(report.distribution.y.len(), 500);
/// ```
pub fn analyze_cost_risk<G: CostFunction>(
    times: &[f64],
    g: &G,
    config: &CostRiskConfig,
) -> Result<CostRiskReport> {
    config.validate()?;
    g.validate()?;
    validate_times(times)?;
    let kde = KernelDensity::fit(times, config.bandwidth)?;

    let costs: Vec<f64> = times.iter().map(|&t| g.cost(t)).collect();
    let quantile = |q: f64| {
        stats::quantile(&costs, q)
            .ok_or_else(|| RiskError::Numerical(format!("quantile {q} of cost sample undefined")))
    };
    let var_95 = quantile(0.95)?;
    let var_99 = quantile(0.99)?.max(var_95);
    let median_cost = quantile(0.5)?;
    let mean_cost = costs.iter().sum::<f64>() / costs.len() as f64;
    let max_cost = costs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let mut upper = config.upper_multiplier * var_95;
    if upper <= config.lower_bound {
        warn!(
            upper,
            lower = config.lower_bound,
            "cost grid collapsed below its lower bound; widening"
        );
        upper = 2.0 * config.lower_bound;
    }
    let step = (upper - config.lower_bound) / (config.grid_points - 1) as f64;
    let y_grid: Vec<f64> = (0..config.grid_points)
        .map(|i| config.lower_bound + i as f64 * step)
        .collect();

    let distribution = transform_density(&kde, g, &y_grid)?;

    debug!(
        n_obs = times.len(),
        bandwidth = kde.bandwidth(),
        var_95,
        var_99,
        mean_cost,
        "cost risk transformed"
    );

    Ok(CostRiskReport {
        n_obs: times.len(),
        time_bandwidth: kde.bandwidth(),
        distribution,
        value_at_risk: ValueAtRisk { var_95, var_99 },
        mean_cost,
        median_cost,
        max_cost,
    })
}

/// Drops observations at or above the `q`-th quantile.
///
/// Used to remove extreme outliers (the top 1%) before fitting.
pub fn trim_upper_tail(times: &[f64], q: f64) -> Result<Vec<f64>> {
    if !q.is_finite() || q <= 0.0 || q > 1.0 {
        return Err(RiskError::invalid(
            "q",
            format!("trim quantile must lie in (0, 1], got {q}"),
        ));
    }
    let finite: Vec<f64> = times.iter().cloned().filter(|t| t.is_finite()).collect();
    if finite.is_empty() {
        return Err(RiskError::insufficient(1, 0, "nothing to trim"));
    }
    if q == 1.0 {
        return Ok(finite);
    }
    let cutoff = stats::quantile(&finite, q)
        .ok_or_else(|| RiskError::Numerical(format!("quantile {q} undefined")))?;
    Ok(finite.into_iter().filter(|&t| t < cutoff).collect())
}

/// Empirical survival function S(t) = 1 − i/n over the sorted delays.
///
/// Returns (sorted delays, survival probabilities); S starts at 1 and
/// decreases by 1/n per observation.
pub fn survival_curve(times: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
    if times.is_empty() {
        return Err(RiskError::insufficient(1, 0, "survival curve needs observations"));
    }
    if times.iter().any(|t| !t.is_finite()) {
        return Err(RiskError::invalid("times", "sample contains non-finite values"));
    }
    let mut sorted = times.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    let survival = (0..sorted.len()).map(|i| 1.0 - i as f64 / n).collect();
    Ok((sorted, survival))
}

/// Linear cost baseline: mean delay × `rate_per_day`, per order and total.
pub fn naive_linear_cost(times: &[f64], rate_per_day: f64) -> Result<NaiveCost> {
    if !rate_per_day.is_finite() || rate_per_day < 0.0 {
        return Err(RiskError::invalid(
            "rate_per_day",
            format!("must be non-negative, got {rate_per_day}"),
        ));
    }
    let mean_delay = stats::mean(times)
        .ok_or_else(|| RiskError::insufficient(1, times.len(), "mean delay needs observations"))?;
    let per_order = mean_delay * rate_per_day;
    Ok(NaiveCost {
        mean_delay,
        per_order,
        total: per_order * times.len() as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::function::{LinearCost, QuadraticCost};
    use u_numflow::special;

    /// Log-normal delays at evenly spaced probability points.
    fn lognormal_delays(n: usize, mu: f64, sigma: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let p = (i as f64 + 0.5) / n as f64;
                (mu + sigma * special::inverse_normal_cdf(p)).exp()
            })
            .collect()
    }

    #[test]
    fn density_integrates_near_one() {
        let times = lognormal_delays(400, 1.0, 0.5);
        let report =
            analyze_cost_risk(&times, &QuadraticCost::default(), &CostRiskConfig::default())
                .unwrap();
        let mass = report.distribution.total_mass();
        assert!(mass > 0.9 && mass < 1.02, "mass = {mass}");
    }

    #[test]
    fn density_over_wide_domain_is_one() {
        let times = lognormal_delays(400, 1.0, 0.4);
        let kde = KernelDensity::fit(&times, BandwidthMethod::Scott).unwrap();
        let g = QuadraticCost::default();
        // Fine grid near zero where the Jacobian is steep, coarse further out
        let mut grid: Vec<f64> = (1..=2000).map(|i| i as f64 * 0.001).collect();
        grid.extend((1..=4000).map(|i| 2.0 + i as f64 * 0.1));
        let dist = transform_density(&kde, &g, &grid).unwrap();
        let mass = dist.total_mass();
        assert!((mass - 1.0).abs() < 0.02, "mass = {mass}");
    }

    #[test]
    fn var_ordering_and_bounds() {
        let times = lognormal_delays(300, 0.5, 0.8);
        let report =
            analyze_cost_risk(&times, &QuadraticCost::default(), &CostRiskConfig::default())
                .unwrap();
        let v = report.value_at_risk;
        assert!(v.var_99 >= v.var_95);
        assert!(v.var_99 <= report.max_cost);
        assert!(report.median_cost < report.mean_cost, "right-skewed costs");
        let grid_end = *report.distribution.y.last().unwrap();
        assert!((grid_end - 1.5 * v.var_95).abs() < 1e-9);
        assert!((report.distribution.y[0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn value_at_risk_matches_report() {
        let times = lognormal_delays(250, 1.2, 0.3);
        let g = QuadraticCost { rate: 3.0 };
        let report = analyze_cost_risk(&times, &g, &CostRiskConfig::default()).unwrap();
        let v95 = value_at_risk(&times, &g, 0.95).unwrap();
        assert!((v95 - report.value_at_risk.var_95).abs() < 1e-9);
    }

    #[test]
    fn jacobian_guard_keeps_density_finite() {
        let times = [0.2, 0.5, 0.9, 1.3, 2.0];
        let kde = KernelDensity::fit(&times, BandwidthMethod::Scott).unwrap();
        let dist =
            transform_density(&kde, &QuadraticCost::default(), &[0.0, -1.0, 1e-12, 0.5]).unwrap();
        assert!(dist.density.iter().all(|d| d.is_finite() && *d >= 0.0));
        assert_eq!(dist.density[0], 0.0);
        assert_eq!(dist.density[1], 0.0);
        assert!(dist.density[2] > 0.0);
    }

    #[test]
    fn rejects_invalid_cost_rates() {
        let times = lognormal_delays(50, 1.0, 0.5);
        let cfg = CostRiskConfig::default();
        let kde = KernelDensity::fit(&times, BandwidthMethod::Scott).unwrap();
        for rate in [0.0, -1.0, f64::NAN] {
            let g = QuadraticCost { rate };
            assert!(analyze_cost_risk(&times, &g, &cfg).unwrap_err().is_invalid_parameter());
            assert!(value_at_risk(&times, &g, 0.95).unwrap_err().is_invalid_parameter());
            assert!(transform_density(&kde, &g, &[1.0, 2.0]).is_err());
        }
        let flat = LinearCost { rate_per_day: 0.0 };
        assert!(analyze_cost_risk(&times, &flat, &cfg).is_err());
    }

    #[test]
    fn rejects_non_positive_delays() {
        let err = analyze_cost_risk(
            &[1.0, 0.0, 2.0],
            &QuadraticCost::default(),
            &CostRiskConfig::default(),
        )
        .unwrap_err();
        assert!(err.is_invalid_parameter());
        assert!(value_at_risk(&[1.0, -2.0], &QuadraticCost::default(), 0.95).is_err());
        assert!(value_at_risk(&[1.0, 2.0], &QuadraticCost::default(), 1.0).is_err());
    }

    #[test]
    fn constant_delays_are_insufficient() {
        let err = analyze_cost_risk(
            &[3.0; 10],
            &QuadraticCost::default(),
            &CostRiskConfig::default(),
        )
        .unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn linear_cost_preserves_var_ordering() {
        let times = lognormal_delays(100, 1.0, 0.5);
        let g = LinearCost { rate_per_day: 5.0 };
        let v95 = value_at_risk(&times, &g, 0.95).unwrap();
        let v99 = value_at_risk(&times, &g, 0.99).unwrap();
        assert!(v99 >= v95);
    }

    #[test]
    fn trim_removes_top_tail() {
        let times: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        let trimmed = trim_upper_tail(&times, 0.99).unwrap();
        assert!(trimmed.len() < times.len());
        assert!(trimmed.iter().all(|&t| t < 100.0));
        assert_eq!(trim_upper_tail(&times, 1.0).unwrap().len(), 100);
        assert!(trim_upper_tail(&times, 0.0).is_err());
    }

    #[test]
    fn survival_steps_down() {
        let (t, s) = survival_curve(&[3.0, 1.0, 2.0, 4.0]).unwrap();
        assert_eq!(t, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s, vec![1.0, 0.75, 0.5, 0.25]);
        assert!(survival_curve(&[]).is_err());
    }

    #[test]
    fn naive_cost_is_linear_in_mean() {
        let naive = naive_linear_cost(&[2.0, 4.0, 6.0], 5.0).unwrap();
        assert_eq!(naive.mean_delay, 4.0);
        assert_eq!(naive.per_order, 20.0);
        assert_eq!(naive.total, 60.0);
        assert!(naive_linear_cost(&[], 5.0).is_err());
        assert!(naive_linear_cost(&[1.0], -1.0).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::cost::function::QuadraticCost;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn var_99_never_below_var_95(
            times in proptest::collection::vec(0.01_f64..60.0, 5..200)
        ) {
            let g = QuadraticCost::default();
            let v95 = value_at_risk(&times, &g, 0.95).unwrap();
            let v99 = value_at_risk(&times, &g, 0.99).unwrap();
            prop_assert!(v99 >= v95, "VaR99 {} < VaR95 {}", v99, v95);
        }
    }
}
