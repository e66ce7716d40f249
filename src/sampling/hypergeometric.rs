//! Hypergeometric acceptance probability and the OC curve.
//!
//! # Algorithm
//!
//! ```text
//! P(X ≤ c) = Σ_{k=0}^{c} C(M,k) · C(N−M, n−k) / C(N,n)
//! ```
//!
//! Every term is evaluated in log space via ln Γ, so batches with N in the
//! thousands never overflow. Only the feasible support
//! `k ∈ [max(0, n − (N − M)), min(n, M)]` contributes.
//!
//! # Reference
//!
//! Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*,
//! 8th ed., §15.2 (single sampling plans and the OC curve).

use serde::{Deserialize, Serialize};
use tracing::debug;
use u_numflow::special;

use super::plan::{check_rate, validate_counts, SamplingPlan};
use crate::error::{Result, RiskError};

/// A point on the operating-characteristic curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OcPoint {
    /// True defect rate p of the batch.
    pub defect_rate: f64,
    /// Defect count M = round(N·p) used for this point.
    pub defects: u64,
    /// Probability of accepting the batch.
    pub accept_probability: f64,
}

fn ln_factorial(n: u64) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    special::ln_gamma(n as f64 + 1.0)
}

fn ln_choose(n: u64, k: u64) -> f64 {
    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

/// Probability that a sample of `n` drawn without replacement from a batch
/// of `batch_size` items containing `defects` defectives holds at most `c`
/// defectives.
///
/// # Errors
///
/// `InvalidParameter` if `defects > batch_size`, `n > batch_size`, or
/// `c > n`.
///
/// # Examples
///
/// ```
/// use u_fulfillment::sampling::accept_probability;
///
/// // 5% defective batch of 1000, inspect 100, accept only on zero defects
/// let p = accept_probability(1000, 50, 100, 0).unwrap();
/// assert!((p - 0.004476).abs() < 1e-5);
/// ```
pub fn accept_probability(batch_size: u64, defects: u64, n: u64, c: u64) -> Result<f64> {
    validate_counts(batch_size, defects, n, c)?;

    if n == 0 || defects == 0 {
        return Ok(1.0);
    }

    let good = batch_size - defects;
    let k_lo = n.saturating_sub(good);
    let k_hi = n.min(defects);

    if c >= k_hi {
        return Ok(1.0);
    }
    if c < k_lo {
        return Ok(0.0);
    }

    let ln_total = ln_choose(batch_size, n);
    let p: f64 = (k_lo..=c)
        .map(|k| (ln_choose(defects, k) + ln_choose(good, n - k) - ln_total).exp())
        .sum();

    if !p.is_finite() {
        return Err(RiskError::Numerical(format!(
            "hypergeometric sum is not finite for N={batch_size}, M={defects}, n={n}, c={c}"
        )));
    }
    Ok(p.clamp(0.0, 1.0))
}

/// Exact hypergeometric probability of drawing exactly `k` defectives.
///
/// Returns 0 outside the feasible support.
pub fn hypergeometric_pmf(batch_size: u64, defects: u64, n: u64, k: u64) -> Result<f64> {
    validate_counts(batch_size, defects, n, 0)?;
    let good = batch_size - defects;
    if k > n || k > defects || n - k > good {
        return Ok(0.0);
    }
    let lp = ln_choose(defects, k) + ln_choose(good, n - k) - ln_choose(batch_size, n);
    Ok(lp.exp().clamp(0.0, 1.0))
}

/// Acceptance probability of the plan at its assumed defect count.
///
/// This is the consumer risk: the chance a batch that really has
/// `plan.defects()` bad items is shipped anyway.
pub fn consumer_risk(plan: &SamplingPlan) -> Result<f64> {
    accept_probability(
        plan.batch_size(),
        plan.defects(),
        plan.sample_size(),
        plan.acceptance_number(),
    )
}

/// Binomial (infinite-population) approximation of the acceptance
/// probability: Σ_{k=0}^{c} C(n,k) pᵏ (1−p)ⁿ⁻ᵏ.
///
/// Ignores the finite batch, so it overstates acceptance for small batches
/// sampled heavily. Kept as the textbook comparator.
pub fn binomial_accept_probability(n: u64, defect_rate: f64, c: u64) -> Result<f64> {
    check_rate("defect_rate", defect_rate)?;
    if c >= n || defect_rate == 0.0 {
        return Ok(1.0);
    }
    if defect_rate == 1.0 {
        return Ok(0.0);
    }
    let ln_p = defect_rate.ln();
    let ln_q = (1.0 - defect_rate).ln();
    let p: f64 = (0..=c)
        .map(|k| (ln_choose(n, k) + k as f64 * ln_p + (n - k) as f64 * ln_q).exp())
        .sum();
    Ok(p.clamp(0.0, 1.0))
}

/// Uniform grid of defect rates `[0, max_rate]` with `points` entries.
///
/// The inspection desk plots 0–20% with 100 points.
pub fn defect_rate_grid(max_rate: f64, points: usize) -> Result<Vec<f64>> {
    check_rate("max_rate", max_rate)?;
    if points < 2 {
        return Err(RiskError::invalid(
            "points",
            format!("grid needs at least 2 points, got {points}"),
        ));
    }
    let step = max_rate / (points - 1) as f64;
    Ok((0..points).map(|i| i as f64 * step).collect())
}

/// Operating-characteristic curve of the plan (N, n, c).
///
/// For every rate p in `defect_rates` the defect count is recomputed as
/// M = round(N·p), clamped to [0, N].
///
/// # Errors
///
/// `InvalidParameter` if the plan is inconsistent or any rate lies outside
/// [0, 1].
///
/// # Examples
///
/// ```
/// use u_fulfillment::sampling::{defect_rate_grid, oc_curve};
///
/// let grid = defect_rate_grid(0.20, 100).unwrap();
/// let oc = oc_curve(1000, 100, 1, &grid).unwrap();
/// assert_eq!(oc.len(), 100);
/// assert!((oc[0].accept_probability - 1.0).abs() < 1e-12);
/// assert!(oc[99].accept_probability < 0.01);
/// ```
pub fn oc_curve(batch_size: u64, n: u64, c: u64, defect_rates: &[f64]) -> Result<Vec<OcPoint>> {
    validate_counts(batch_size, 0, n, c)?;

    let curve = defect_rates
        .iter()
        .map(|&p| {
            check_rate("defect_rate", p)?;
            let defects = ((batch_size as f64 * p).round() as u64).min(batch_size);
            Ok(OcPoint {
                defect_rate: p,
                defects,
                accept_probability: accept_probability(batch_size, defects, n, c)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        batch_size,
        sample_size = n,
        acceptance_number = c,
        points = curve.len(),
        "computed OC curve"
    );
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_heavy_plan() {
        // Exact: Π_{i<100} (950−i)/(1000−i)
        let p = accept_probability(1000, 50, 100, 0).unwrap();
        let exact: f64 = (0..100).map(|i| (950.0 - i as f64) / (1000.0 - i as f64)).product();
        assert!((p - exact).abs() < 1e-10, "p = {p}, exact = {exact}");
        assert!((p - 0.004476).abs() < 1e-5);
    }

    #[test]
    fn binomial_overstates_finite_batch() {
        let hyper = accept_probability(1000, 50, 100, 0).unwrap();
        let binom = binomial_accept_probability(100, 0.05, 0).unwrap();
        assert!((binom - 0.95_f64.powi(100)).abs() < 1e-12);
        assert!((binom - 0.0059).abs() < 1e-4);
        assert!(binom > hyper);
    }

    #[test]
    fn edge_cases_are_certain() {
        assert_eq!(accept_probability(100, 0, 10, 0).unwrap(), 1.0);
        assert_eq!(accept_probability(100, 30, 0, 0).unwrap(), 1.0);
        // c ≥ min(n, M): cannot exceed acceptance number
        assert_eq!(accept_probability(100, 3, 10, 3).unwrap(), 1.0);
        // every item is defective and inspected: X = n > c
        assert_eq!(accept_probability(10, 10, 5, 4).unwrap(), 0.0);
    }

    #[test]
    fn invalid_counts_rejected() {
        assert!(accept_probability(100, 101, 10, 0).unwrap_err().is_invalid_parameter());
        assert!(accept_probability(100, 10, 101, 0).is_err());
        assert!(accept_probability(100, 10, 5, 6).is_err());
    }

    #[test]
    fn pmf_sums_to_one() {
        let total: f64 = (0..=20)
            .map(|k| hypergeometric_pmf(200, 30, 20, k).unwrap())
            .sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
        assert_eq!(hypergeometric_pmf(200, 3, 20, 4).unwrap(), 0.0);
    }

    #[test]
    fn cdf_matches_pmf_sum() {
        let cdf = accept_probability(500, 40, 50, 3).unwrap();
        let sum: f64 = (0..=3).map(|k| hypergeometric_pmf(500, 40, 50, k).unwrap()).sum();
        assert!((cdf - sum).abs() < 1e-12);
    }

    #[test]
    fn large_batches_do_not_overflow() {
        let p = accept_probability(20_000, 400, 2_000, 30).unwrap();
        assert!(p.is_finite() && (0.0..=1.0).contains(&p));
    }

    #[test]
    fn consumer_risk_uses_plan_defects() {
        let plan = SamplingPlan::from_rates(1000, 0.1, 0, 0.05).unwrap();
        let risk = consumer_risk(&plan).unwrap();
        assert_eq!(risk, accept_probability(1000, 50, 100, 0).unwrap());
    }

    #[test]
    fn oc_recomputes_defects_per_point() {
        let grid = [0.0, 0.01, 0.05, 0.2];
        let oc = oc_curve(1000, 100, 0, &grid).unwrap();
        let defects: Vec<u64> = oc.iter().map(|pt| pt.defects).collect();
        assert_eq!(defects, vec![0, 10, 50, 200]);
    }

    #[test]
    fn oc_rejects_bad_rates() {
        assert!(oc_curve(1000, 100, 0, &[0.1, 1.2]).is_err());
        assert!(oc_curve(1000, 100, 0, &[f64::NAN]).is_err());
        assert!(defect_rate_grid(0.2, 1).is_err());
    }

    #[test]
    fn grid_spans_range() {
        let grid = defect_rate_grid(0.2, 100).unwrap();
        assert_eq!(grid.len(), 100);
        assert_eq!(grid[0], 0.0);
        assert!((grid[99] - 0.2).abs() < 1e-12);
    }
}
