//! Sample autocorrelation of demand.

use serde::{Deserialize, Serialize};

use super::series::is_near_constant;
use crate::error::{Result, RiskError};

/// |ρₖ| above this is reported as strong memory at lag k.
pub const STRONG_MEMORY: f64 = 0.3;

/// Autocorrelation coefficients with per-lag significance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Autocorrelation {
    /// ρₖ for k = 0..=max_lag; `coefficients[0]` is 1.
    pub coefficients: Vec<f64>,
    /// Approximate 95 % band 1.96 / √n.
    pub threshold: f64,
    /// |ρₖ| > threshold, per lag. Lag 0 is always `true`.
    pub significant: Vec<bool>,
}

impl Autocorrelation {
    /// Largest lag computed.
    pub fn max_lag(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// ρₖ, or `None` beyond the computed lags.
    pub fn at_lag(&self, lag: usize) -> Option<f64> {
        self.coefficients.get(lag).copied()
    }

    /// Lag k ≥ 1 with the largest ρₖ, with its value.
    pub fn peak_lag(&self) -> Option<(usize, f64)> {
        self.coefficients
            .iter()
            .copied()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// ρ at the seasonal lag, clamped to the last computed lag.
    pub fn seasonal(&self, period: usize) -> (usize, f64) {
        let lag = period.min(self.max_lag());
        (lag, self.coefficients[lag])
    }

    /// Whether |ρₖ| exceeds [`STRONG_MEMORY`].
    pub fn has_strong_memory(&self, lag: usize) -> bool {
        lag > 0 && self.at_lag(lag).is_some_and(|r| r.abs() > STRONG_MEMORY)
    }
}

/// Biased sample ACF (denominator n) for lags `0..=max_lag`.
///
/// `max_lag` is clamped to `n − 1`.
///
/// # Errors
///
/// `InsufficientData` for fewer than 2 observations or a constant series;
/// `InvalidParameter` for non-finite values.
///
/// # Examples
///
/// ```
/// use u_fulfillment::timeseries::autocorrelation;
///
/// // A Monday spike every 7 days
/// let y: Vec<f64> = (0..70).map(|t| if t % 7 == 0 { 30.0 } else { 10.0 }).collect();
/// let acf = autocorrelation(&y, 14).unwrap();
/// assert_eq!(acf.peak_lag().unwrap().0, 7);
/// assert!(acf.significant[7]);
/// ```
pub fn autocorrelation(series: &[f64], max_lag: usize) -> Result<Autocorrelation> {
    let n = series.len();
    if n < 2 {
        return Err(RiskError::insufficient(2, n, "autocorrelation needs 2 observations"));
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(RiskError::invalid("series", "observations must be finite"));
    }
    if is_near_constant(series) {
        return Err(RiskError::insufficient(2, 1, "series is (near-)constant"));
    }
    let max_lag = max_lag.min(n - 1);
    let nf = n as f64;
    let mean = series.iter().sum::<f64>() / nf;

    let c0 = series.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / nf;

    let coefficients: Vec<f64> = (0..=max_lag)
        .map(|lag| {
            let ck = series[..n - lag]
                .iter()
                .zip(&series[lag..])
                .map(|(&a, &b)| (a - mean) * (b - mean))
                .sum::<f64>()
                / nf;
            ck / c0
        })
        .collect();

    let threshold = 1.96 / nf.sqrt();
    let significant = coefficients.iter().map(|r| r.abs() > threshold).collect();

    Ok(Autocorrelation {
        coefficients,
        threshold,
        significant,
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn coefficients_bounded(
            data in proptest::collection::vec(-50.0_f64..50.0, 3..80),
            max_lag in 1usize..30,
        ) {
            prop_assume!(data.iter().any(|&v| (v - data[0]).abs() > 1e-6));
            let r = autocorrelation(&data, max_lag).unwrap();
            for rho in &r.coefficients {
                prop_assert!(rho.abs() <= 1.0 + 1e-9);
            }
        }
    }
}
