//! Gaussian kernel density estimation of delay times.
//!
//! # Algorithm
//!
//! f̂(x) = (1/nh) Σᵢ K((x − xᵢ)/h), with K(u) = (1/√(2π)) exp(−u²/2).
//!
//! Reference: Silverman (1986), "Density Estimation for Statistics and
//! Data Analysis"

use serde::{Deserialize, Serialize};
use u_numflow::stats;

use crate::error::{Result, RiskError};

/// Bandwidth selection method for kernel density estimation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum BandwidthMethod {
    /// Scott's factor: h = σ · n^(-1/5).
    ///
    /// Reference: Scott (1992), "Multivariate Density Estimation"
    #[default]
    Scott,
    /// Silverman's rule of thumb: h = 0.9 · min(σ, IQR/1.34) · n^(-1/5).
    /// Robust to outliers and multimodal data.
    Silverman,
    /// Manual bandwidth specification.
    Manual(f64),
}

/// Density estimate evaluated on a uniform grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KdeResult {
    /// Evaluation points (x-axis).
    pub x: Vec<f64>,
    /// Density estimates at each evaluation point.
    pub density: Vec<f64>,
    /// Bandwidth used.
    pub bandwidth: f64,
}

/// A fitted Gaussian kernel density over a one-dimensional sample.
#[derive(Debug, Clone)]
pub struct KernelDensity {
    data: Vec<f64>,
    bandwidth: f64,
}

impl KernelDensity {
    /// Fits a kernel density to `data`.
    ///
    /// # Errors
    ///
    /// - `InsufficientData` if fewer than 2 observations or zero variance
    ///   (automatic bandwidth methods).
    /// - `InvalidParameter` if the data holds non-finite values or the
    ///   manual bandwidth is not positive.
    pub fn fit(data: &[f64], method: BandwidthMethod) -> Result<Self> {
        if data.iter().any(|v| !v.is_finite()) {
            return Err(RiskError::invalid("data", "sample contains non-finite values"));
        }
        let bandwidth = bandwidth(data, method)?;
        Ok(Self {
            data: data.to_vec(),
            bandwidth,
        })
    }

    /// Bandwidth h.
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Number of observations the density was fitted to.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the fitted sample is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Density estimate at a single point.
    pub fn evaluate(&self, x: f64) -> f64 {
        let inv_h = 1.0 / self.bandwidth;
        let inv_nh = inv_h / self.data.len() as f64;
        let inv_sqrt_2pi = 1.0 / (2.0 * std::f64::consts::PI).sqrt();

        let sum: f64 = self
            .data
            .iter()
            .map(|&xj| {
                let u = (x - xj) * inv_h;
                inv_sqrt_2pi * (-0.5 * u * u).exp()
            })
            .sum();
        sum * inv_nh
    }

    /// Evaluates the density on a grid extending 3h beyond the data range.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `n_points < 2`.
    pub fn on_grid(&self, n_points: usize) -> Result<KdeResult> {
        if n_points < 2 {
            return Err(RiskError::invalid(
                "n_points",
                format!("grid needs at least 2 points, got {n_points}"),
            ));
        }
        let min_val = self.data.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_val = self.data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let x_min = min_val - 3.0 * self.bandwidth;
        let x_max = max_val + 3.0 * self.bandwidth;
        let step = (x_max - x_min) / (n_points - 1) as f64;

        let x: Vec<f64> = (0..n_points).map(|i| x_min + i as f64 * step).collect();
        let density = x.iter().map(|&xi| self.evaluate(xi)).collect();

        Ok(KdeResult {
            x,
            density,
            bandwidth: self.bandwidth,
        })
    }
}

/// Computes the KDE bandwidth for `data` using `method`.
fn bandwidth(data: &[f64], method: BandwidthMethod) -> Result<f64> {
    let n = data.len();
    if n < 2 {
        return Err(RiskError::insufficient(2, n, "density estimation needs two observations"));
    }

    let spread = |sd: f64| -> Result<f64> {
        if sd < 1e-300 {
            return Err(RiskError::insufficient(
                2,
                1,
                "sample has zero variance; need at least two distinct values",
            ));
        }
        Ok(sd)
    };

    let nf = n as f64;
    match method {
        BandwidthMethod::Scott => {
            let sd = spread(stats::std_dev(data).unwrap_or(0.0))?;
            Ok(sd * nf.powf(-0.2))
        }
        BandwidthMethod::Silverman => {
            let sd = spread(stats::std_dev(data).unwrap_or(0.0))?;
            let q1 = stats::quantile(data, 0.25).unwrap_or(0.0);
            let q3 = stats::quantile(data, 0.75).unwrap_or(0.0);
            let iqr = q3 - q1;
            let s = if iqr > 1e-300 { sd.min(iqr / 1.34) } else { sd };
            Ok(0.9 * s * nf.powf(-0.2))
        }
        BandwidthMethod::Manual(h) => {
            if h <= 0.0 || !h.is_finite() {
                Err(RiskError::invalid(
                    "bandwidth",
                    format!("manual bandwidth must be positive, got {h}"),
                ))
            } else {
                Ok(h)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_integrates_to_one() {
        let data = [1.0, 1.1, 1.2, 2.0, 2.1, 2.2, 5.0];
        let kde = KernelDensity::fit(&data, BandwidthMethod::Scott).unwrap();
        let result = kde.on_grid(512).unwrap();
        assert_eq!(result.x.len(), 512);
        let dx = result.x[1] - result.x[0];
        let integral: f64 = result.density.iter().sum::<f64>() * dx;
        assert!((integral - 1.0).abs() < 0.05, "integral = {integral}");
    }

    #[test]
    fn scott_factor() {
        let data: Vec<f64> = (1..=32).map(|i| i as f64).collect();
        let kde = KernelDensity::fit(&data, BandwidthMethod::Scott).unwrap();
        let sd = stats::std_dev(&data).unwrap();
        assert!((kde.bandwidth() - sd * 32_f64.powf(-0.2)).abs() < 1e-12);
    }

    #[test]
    fn silverman_not_wider_than_scott_spread() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 100.0];
        let s = KernelDensity::fit(&data, BandwidthMethod::Silverman).unwrap();
        let sc = KernelDensity::fit(&data, BandwidthMethod::Scott).unwrap();
        assert!(s.bandwidth() < sc.bandwidth());
    }

    #[test]
    fn peak_near_cluster() {
        let data = [5.0, 5.1, 4.9, 5.0, 5.05, 4.95];
        let kde = KernelDensity::fit(&data, BandwidthMethod::Manual(0.2)).unwrap();
        assert!(kde.evaluate(5.0) > kde.evaluate(6.0));
        assert_eq!(kde.len(), 6);
    }

    #[test]
    fn degenerate_samples() {
        assert!(KernelDensity::fit(&[1.0], BandwidthMethod::Scott)
            .unwrap_err()
            .is_insufficient_data());
        assert!(KernelDensity::fit(&[2.0; 5], BandwidthMethod::Scott)
            .unwrap_err()
            .is_insufficient_data());
        assert!(KernelDensity::fit(&[1.0, f64::NAN], BandwidthMethod::Scott).is_err());
        assert!(KernelDensity::fit(&[1.0, 2.0], BandwidthMethod::Manual(0.0)).is_err());
        // Manual bandwidth tolerates a constant sample
        assert!(KernelDensity::fit(&[2.0; 5], BandwidthMethod::Manual(0.5)).is_ok());
    }
}
