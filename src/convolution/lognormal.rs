//! Log-normal service-time model in (shape, scale) form.
//!
//! X ~ LogNormal with ln X ~ N(ln scale, σ²). `scale` is the median; the
//! mean is scale · exp(σ²/2).

use serde::{Deserialize, Serialize};
use u_numflow::special;

/// Log-normal distribution with shape σ and scale (median) e^μ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogNormal {
    /// Shape parameter σ (> 0).
    pub sigma: f64,
    /// Scale parameter e^μ, the median (> 0).
    pub scale: f64,
}

impl LogNormal {
    /// Probability density at `x`; zero for x ≤ 0.
    pub fn pdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        let z = (x / self.scale).ln() / self.sigma;
        (-0.5 * z * z).exp() / (x * self.sigma * (2.0 * std::f64::consts::PI).sqrt())
    }

    /// Cumulative distribution Φ(ln(x / scale) / σ); zero for x ≤ 0.
    pub fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        special::standard_normal_cdf((x / self.scale).ln() / self.sigma)
    }

    /// Mean scale · e^{σ²/2}.
    pub fn mean(&self) -> f64 {
        self.scale * (0.5 * self.sigma * self.sigma).exp()
    }

    /// Standard deviation mean · √(e^{σ²} − 1).
    pub fn std_dev(&self) -> f64 {
        self.mean() * ((self.sigma * self.sigma).exp() - 1.0).sqrt()
    }

    /// Quantile function scale · exp(σ · Φ⁻¹(p)).
    pub fn quantile(&self, p: f64) -> f64 {
        self.scale * (self.sigma * special::inverse_normal_cdf(p)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_is_scale() {
        let d = LogNormal {
            sigma: 0.5,
            scale: 5.0,
        };
        assert!((d.quantile(0.5) - 5.0).abs() < 1e-6);
        assert!((d.mean() - 5.0 * 0.125_f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn pdf_integrates_to_one() {
        let d = LogNormal {
            sigma: 0.5,
            scale: 5.0,
        };
        let dx = 0.001;
        let mass: f64 = (1..60_000).map(|i| d.pdf(i as f64 * dx)).sum::<f64>() * dx;
        assert!((mass - 1.0).abs() < 1e-3, "mass = {mass}");
        assert_eq!(d.pdf(0.0), 0.0);
        assert_eq!(d.pdf(-1.0), 0.0);
    }

    #[test]
    fn cdf_inverts_quantile() {
        let d = LogNormal {
            sigma: 1.5,
            scale: 0.1,
        };
        for p in [0.001, 0.25, 0.5, 0.9, 0.999] {
            assert!((d.cdf(d.quantile(p)) - p).abs() < 5e-4);
        }
        assert_eq!(d.cdf(0.0), 0.0);
    }
}
