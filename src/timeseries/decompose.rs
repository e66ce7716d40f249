//! Classical additive decomposition: yₜ = Tₜ + Sₜ + Rₜ.
//!
//! # Algorithm
//!
//! 1. Trend Tₜ: centred moving average of length m (a 2×m average with
//!    half-weight endpoints when m is even).
//! 2. The ⌊m/2⌋ edge points the average cannot reach are filled by a
//!    least-squares line through the nearest m + 1 trend values.
//! 3. Seasonal indices: mean of yₜ − Tₜ at each phase, shifted to sum to 0.
//! 4. Residual Rₜ = yₜ − Tₜ − Sₜ.
//!
//! # References
//!
//! - Hyndman, R.J. & Athanasopoulos, G. (2021). *Forecasting: Principles
//!   and Practice*, 3rd ed., §3.4.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RiskError};

/// Trend, seasonal and residual components of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub observed: Vec<f64>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
    pub period: usize,
}

impl Decomposition {
    /// One seasonal cycle, starting at phase 0. Sums to zero.
    pub fn seasonal_indices(&self) -> &[f64] {
        &self.seasonal[..self.period]
    }

    /// Share of the detrended variance explained by the seasonal component,
    /// max(0, 1 − Var(R) / Var(S + R)).
    pub fn seasonal_strength(&self) -> f64 {
        let detrended: Vec<f64> = self
            .seasonal
            .iter()
            .zip(&self.residual)
            .map(|(s, r)| s + r)
            .collect();
        match (
            u_numflow::stats::variance(&self.residual),
            u_numflow::stats::variance(&detrended),
        ) {
            (Some(vr), Some(vd)) if vd > 0.0 => (1.0 - vr / vd).max(0.0),
            _ => 0.0,
        }
    }
}

/// Additive decomposition with seasonal `period`.
///
/// # Errors
///
/// - `InvalidParameter` if `period < 2` or any value is non-finite.
/// - `InsufficientData` if the series is shorter than two full cycles.
///
/// # Examples
///
/// ```
/// use u_fulfillment::timeseries::decompose;
///
/// let pattern = [4.0, -1.0, -2.0, -1.0];
/// let y: Vec<f64> = (0..24).map(|t| 50.0 + 0.5 * t as f64 + pattern[t % 4]).collect();
/// let d = decompose(&y, 4).unwrap();
/// for (got, want) in d.seasonal_indices().iter().zip(pattern) {
///     assert!((got - want).abs() < 1e-9);
/// }
/// ```
pub fn decompose(series: &[f64], period: usize) -> Result<Decomposition> {
    if period < 2 {
        return Err(RiskError::invalid(
            "period",
            format!("seasonal period must be >= 2, got {period}"),
        ));
    }
    let n = series.len();
    if n < 2 * period {
        return Err(RiskError::insufficient(
            2 * period,
            n,
            format!("decomposition needs two full cycles of period {period}"),
        ));
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(RiskError::invalid("series", "observations must be finite"));
    }

    let trend = extrapolated_trend(series, period);

    let mut phase_sum = vec![0.0; period];
    let mut phase_count = vec![0usize; period];
    for (t, (y, tr)) in series.iter().zip(&trend).enumerate() {
        phase_sum[t % period] += y - tr;
        phase_count[t % period] += 1;
    }
    let mut indices: Vec<f64> = phase_sum
        .iter()
        .zip(&phase_count)
        .map(|(s, &c)| s / c as f64)
        .collect();
    let shift = indices.iter().sum::<f64>() / period as f64;
    indices.iter_mut().for_each(|s| *s -= shift);

    let seasonal: Vec<f64> = (0..n).map(|t| indices[t % period]).collect();
    let residual: Vec<f64> = (0..n).map(|t| series[t] - trend[t] - seasonal[t]).collect();

    debug!(n, period, "additive decomposition");

    Ok(Decomposition {
        observed: series.to_vec(),
        trend,
        seasonal,
        residual,
        period,
    })
}

/// Centred moving average, with the unreachable edges filled linearly.
fn extrapolated_trend(series: &[f64], period: usize) -> Vec<f64> {
    let n = series.len();
    let half = period / 2;

    // 2×m weights for even m: [½, 1, …, 1, ½] / m
    let weights: Vec<f64> = if period % 2 == 0 {
        let mut w = vec![1.0 / period as f64; period + 1];
        w[0] *= 0.5;
        w[period] *= 0.5;
        w
    } else {
        vec![1.0 / period as f64; period]
    };

    let mut trend = vec![0.0; n];
    for (t, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
        *slot = series[t - half..]
            .iter()
            .zip(&weights)
            .map(|(y, w)| y * w)
            .sum();
    }

    let fit_len = (period + 1).min(n - 2 * half);
    let (slope, intercept) = line_fit(half, &trend[half..half + fit_len]);
    for (t, slot) in trend.iter_mut().enumerate().take(half) {
        *slot = intercept + slope * t as f64;
    }
    let tail_start = n - half - fit_len;
    let (slope, intercept) = line_fit(tail_start, &trend[tail_start..n - half]);
    for (t, slot) in trend.iter_mut().enumerate().skip(n - half) {
        *slot = intercept + slope * t as f64;
    }
    trend
}

/// Least-squares line through (offset + i, values[i]); returns (slope, intercept).
fn line_fit(offset: usize, values: &[f64]) -> (f64, f64) {
    let m = values.len() as f64;
    let xs = (0..values.len()).map(|i| (offset + i) as f64);
    let x_mean = xs.clone().sum::<f64>() / m;
    let y_mean = values.iter().sum::<f64>() / m;
    let (sxy, sxx) = xs
        .zip(values)
        .fold((0.0, 0.0), |(sxy, sxx), (x, &y)| {
            (sxy + (x - x_mean) * (y - y_mean), sxx + (x - x_mean).powi(2))
        });
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    (slope, y_mean - slope * x_mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_planted_weekly_pattern() {
        let pattern = [12.0, 3.0, -1.0, -2.0, -3.0, -4.0, -5.0];
        let y: Vec<f64> = (0..42)
            .map(|t| 100.0 - 0.3 * t as f64 + pattern[t % 7])
            .collect();
        let d = decompose(&y, 7).unwrap();
        for (got, want) in d.seasonal_indices().iter().zip(pattern) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }
        for (t, tr) in d.trend.iter().enumerate() {
            assert!((tr - (100.0 - 0.3 * t as f64)).abs() < 1e-9);
        }
        assert!(d.residual.iter().all(|r| r.abs() < 1e-9));
        assert!(d.seasonal_strength() > 0.999);
    }

    #[test]
    fn components_add_back_up() {
        let y: Vec<f64> = (0..30)
            .map(|t| 10.0 + ((t * 7) % 5) as f64 + (t as f64 * 0.7).sin())
            .collect();
        let d = decompose(&y, 6).unwrap();
        for t in 0..y.len() {
            let sum = d.trend[t] + d.seasonal[t] + d.residual[t];
            assert!((sum - y[t]).abs() < 1e-9);
        }
        assert!(d.seasonal_indices().iter().sum::<f64>().abs() < 1e-9);
    }

    #[test]
    fn exactly_two_cycles_is_enough() {
        let y: Vec<f64> = (0..8).map(|t| [1.0, 5.0, 2.0, 0.0][t % 4]).collect();
        let d = decompose(&y, 4).unwrap();
        assert_eq!(d.trend.len(), 8);
        assert!(d.trend.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn rejects_short_series_and_bad_period() {
        let y = vec![1.0; 13];
        let err = decompose(&y, 7).unwrap_err();
        assert!(err.is_insufficient_data());
        assert!(decompose(&y, 1).unwrap_err().is_invalid_parameter());
    }
}
