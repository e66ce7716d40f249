//! Discrete convolution of the pick and pack densities.
//!
//! # Algorithm
//!
//! ```text
//! f_Z(z) = ∫ f_X(x) f_Y(z − x) dx  ≈  dx · Σᵢ f_X(xᵢ) f_Y(z − xᵢ)
//! ```
//!
//! Both densities are discretised on xᵢ = i·dx, i = 0..k, as cell masses:
//! fᵢ = (F(xᵢ + dx/2) − F(xᵢ − dx/2)) / dx. A spike narrower than one cell
//! keeps its full probability this way, where point sampling of the pdf
//! would miss it. The full discrete convolution has 2k − 1 entries on
//! zⱼ = j·dx, spanning [0, 2·domain].

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::ConvolutionConfig;
use super::lognormal::LogNormal;
use crate::error::{Result, RiskError};

/// Discretised density of Z = X + Y on a uniform grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvolvedDistribution {
    /// Grid zⱼ = j · step.
    pub z: Vec<f64>,
    /// Density f_Z(zⱼ).
    pub density: Vec<f64>,
    /// Grid spacing dx.
    pub step: f64,
}

impl ConvolvedDistribution {
    /// Trapezoidal integral of f_Z over the grid (≈ 1).
    pub fn total_mass(&self) -> f64 {
        trapezoid(&self.z, &self.density)
    }

    /// Mean of Z by trapezoidal integration of z · f_Z(z).
    pub fn mean(&self) -> f64 {
        let weighted: Vec<f64> = self
            .z
            .iter()
            .zip(&self.density)
            .map(|(&z, &f)| z * f)
            .collect();
        trapezoid(&self.z, &weighted)
    }

    /// Grid point with the highest density.
    pub fn mode(&self) -> f64 {
        self.density
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| self.z[i])
            .unwrap_or(0.0)
    }

    /// P(Z > sla): trapezoid rule from the grid point nearest `sla` to the
    /// end of the grid.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `sla` is not finite and positive.
    pub fn tail_probability(&self, sla: f64) -> Result<f64> {
        if !sla.is_finite() || sla <= 0.0 {
            return Err(RiskError::invalid(
                "sla",
                format!("SLA threshold must be finite and > 0, got {sla}"),
            ));
        }
        let idx = ((sla / self.step).round() as usize).min(self.z.len() - 1);
        let tail = trapezoid(&self.z[idx..], &self.density[idx..]);
        Ok(tail.clamp(0.0, 1.0))
    }

    /// Probability mass within `[lo, hi]`, by the trapezoid rule over the
    /// grid points inside the interval.
    pub fn mass_between(&self, lo: f64, hi: f64) -> f64 {
        let start = ((lo.max(0.0) / self.step).ceil() as usize).min(self.z.len() - 1);
        let end = ((hi.max(0.0) / self.step).floor() as usize).min(self.z.len() - 1);
        if end <= start {
            return 0.0;
        }
        trapezoid(&self.z[start..=end], &self.density[start..=end])
    }
}

/// Input densities and their convolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTimeConvolution {
    /// Shared input grid xᵢ.
    pub x: Vec<f64>,
    /// Picking-time density on `x`, averaged over each cell.
    pub pick_density: Vec<f64>,
    /// Packing-time density on `x`, averaged over each cell.
    pub pack_density: Vec<f64>,
    /// Density of the total service time.
    pub total: ConvolvedDistribution,
    /// Sum of the two stage means (the naive estimate).
    pub naive_total: f64,
}

fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| 0.5 * (xw[1] - xw[0]) * (yw[0] + yw[1]))
        .sum()
}

/// Mean density over the cell centred on each grid point, clipped at 0.
fn cell_densities(dist: &LogNormal, x: &[f64], dx: f64) -> Vec<f64> {
    x.iter()
        .map(|&v| ((dist.cdf(v + 0.5 * dx) - dist.cdf(v - 0.5 * dx)) / dx).max(0.0))
        .collect()
}

/// Full linear convolution of `a` and `b` scaled by `dx`.
pub fn convolve_scaled(a: &[f64], b: &[f64], dx: f64) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0.0 {
            continue;
        }
        for (j, &bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
    out.iter_mut().for_each(|v| *v *= dx);
    out
}

/// Density of pick + pack time.
///
/// # Examples
///
/// ```
/// use u_fulfillment::convolution::{convolve_service_times, ConvolutionConfig};
///
/// let cfg = ConvolutionConfig::new(5.0, 5.0, 0.5).unwrap();
/// let result = convolve_service_times(&cfg);
/// // Both medians are 5 minutes, yet a 15-minute SLA is still breached
/// let breach = result.total.tail_probability(15.0).unwrap();
/// assert!(breach > 0.1);
/// assert_eq!(result.total.z.len(), 2 * result.x.len() - 1);
/// ```
pub fn convolve_service_times(config: &ConvolutionConfig) -> ServiceTimeConvolution {
    let (points, domain) = config.effective_grid();
    let dx = domain / (points - 1) as f64;
    let x: Vec<f64> = (0..points).map(|i| i as f64 * dx).collect();

    let (pick, pack) = (config.pick(), config.pack());
    let pick_density = cell_densities(&pick, &x, dx);
    let pack_density = cell_densities(&pack, &x, dx);

    let density = convolve_scaled(&pick_density, &pack_density, dx);
    let z: Vec<f64> = (0..density.len()).map(|j| j as f64 * dx).collect();
    let total = ConvolvedDistribution {
        z,
        density,
        step: dx,
    };

    debug!(
        points,
        domain,
        mass = total.total_mass(),
        mean = total.mean(),
        "convolved service times"
    );

    ServiceTimeConvolution {
        x,
        pick_density,
        pack_density,
        total,
        naive_total: pick.mean() + pack.mean(),
    }
}

/// P(pick + pack > sla) for the configured stages.
pub fn sla_breach_probability(config: &ConvolutionConfig, sla: f64) -> Result<f64> {
    convolve_service_times(config).total.tail_probability(sla)
}

#[cfg(test)]
mod tests {
    use super::*;
    use u_numflow::special;

    #[test]
    fn discrete_convolution_of_boxes() {
        let out = convolve_scaled(&[1.0, 1.0], &[1.0, 2.0, 3.0], 0.5);
        assert_eq!(out, vec![0.5, 1.5, 2.5, 1.5]);
        assert!(convolve_scaled(&[], &[1.0], 1.0).is_empty());
    }

    #[test]
    fn convolved_density_integrates_to_one() {
        let cfg = ConvolutionConfig::new(5.0, 5.0, 0.5).unwrap();
        let result = convolve_service_times(&cfg);
        let mass = result.total.total_mass();
        assert!((mass - 1.0).abs() < 5e-3, "mass = {mass}");
    }

    #[test]
    fn output_grid_spans_twice_the_domain() {
        let cfg = ConvolutionConfig::new(4.0, 6.0, 0.4).unwrap();
        let result = convolve_service_times(&cfg);
        assert_eq!(result.total.z.len(), 2 * result.x.len() - 1);
        assert_eq!(result.total.z[0], 0.0);
        let end = *result.total.z.last().unwrap();
        assert!((end - 2.0 * result.x.last().unwrap()).abs() < 1e-9);
    }

    #[test]
    fn mean_adds() {
        let cfg = ConvolutionConfig::new(5.0, 7.0, 0.4).unwrap();
        let result = convolve_service_times(&cfg);
        let expected = cfg.pick().mean() + cfg.pack().mean();
        assert!((result.naive_total - expected).abs() < 1e-12);
        assert!(
            (result.total.mean() - expected).abs() < 0.1,
            "mean = {}, expected {expected}",
            result.total.mean()
        );
    }

    #[test]
    fn variance_driven_sla_breach() {
        let cfg = ConvolutionConfig::new(5.0, 5.0, 0.5).unwrap();
        let result = convolve_service_times(&cfg);
        assert!(result.naive_total < 15.0);
        let p = result.total.tail_probability(15.0).unwrap();
        assert!(p > 0.0, "p = {p}");
        assert!(p > 0.15 && p < 0.19, "p = {p}");
    }

    #[test]
    fn tail_shrinks_with_looser_sla() {
        let cfg = ConvolutionConfig::new(5.0, 5.0, 0.5).unwrap();
        let total = convolve_service_times(&cfg).total;
        let p15 = total.tail_probability(15.0).unwrap();
        let p25 = total.tail_probability(25.0).unwrap();
        assert!(p25 < p15);
        assert_eq!(total.tail_probability(1_000.0).unwrap(), 0.0);
        assert!(total.tail_probability(0.0).is_err());
        assert!(total.tail_probability(f64::NAN).is_err());
    }

    #[test]
    fn small_sigma_concentrates_near_sum_of_means() {
        let cfg = ConvolutionConfig::new(5.0, 5.0, 0.02).unwrap();
        let result = convolve_service_times(&cfg);
        let center = cfg.pick().mean() + cfg.pack().mean();
        let near = result.total.mass_between(center - 0.5, center + 0.5);
        assert!(near > 0.99, "mass near center = {near}");
        assert!((result.total.mode() - center).abs() < 0.1);
    }

    /// E[(X + Y)·1{X ≤ u, Y ≤ u}] for the configured stages.
    fn truncated_sum_mean(cfg: &ConvolutionConfig, upper: f64) -> f64 {
        let partial = |d: LogNormal| {
            let sigma = d.sigma;
            d.mean() * special::standard_normal_cdf(((upper / d.scale).ln() - sigma * sigma) / sigma)
        };
        let (pick, pack) = (cfg.pick(), cfg.pack());
        partial(pick) * pack.cdf(upper) + partial(pack) * pick.cdf(upper)
    }

    fn grid_upper(result: &ServiceTimeConvolution) -> f64 {
        result.x.last().copied().unwrap_or(0.0) + 0.5 * result.total.step
    }

    #[test]
    fn skewed_inputs_keep_their_mass() {
        for (pick, pack, sigma) in [(0.1, 50.0, 1.5), (0.1, 0.1, 1.5), (1.0, 1.0, 1.5)] {
            let cfg = ConvolutionConfig::new(pick, pack, sigma).unwrap();
            let result = convolve_service_times(&cfg);
            let mass = result.total.total_mass();
            assert!((mass - 1.0).abs() < 0.01, "{pick}/{pack}/{sigma}: mass = {mass}");

            let expected = truncated_sum_mean(&cfg, grid_upper(&result));
            let mean = result.total.mean();
            assert!(
                ((mean - expected) / expected).abs() < 0.01,
                "{pick}/{pack}/{sigma}: mean = {mean}, expected {expected}"
            );
        }
    }

    #[test]
    fn input_cells_carry_full_probability() {
        let cfg = ConvolutionConfig::new(0.1, 50.0, 1.5).unwrap();
        let result = convolve_service_times(&cfg);
        let dx = result.total.step;
        let pick_mass: f64 = result.pick_density.iter().sum::<f64>() * dx;
        assert!((pick_mass - 1.0).abs() < 1e-3, "pick mass = {pick_mass}");
        // The interquartile body of the median-0.1 stage fits in one cell
        assert!(dx > 0.5);
        assert!(result.pick_density[0] * dx > 0.5);
    }

    #[test]
    fn coarse_request_matches_fine_tail() {
        let fine = ConvolutionConfig::new(5.0, 5.0, 0.5).unwrap();
        let coarse = ConvolutionConfig::with_grid(5.0, 5.0, 0.5, 30, 30.0).unwrap();
        let pf = sla_breach_probability(&fine, 15.0).unwrap();
        let pc = sla_breach_probability(&coarse, 15.0).unwrap();
        assert!((pf - pc).abs() < 0.01, "fine {pf} vs guarded coarse {pc}");
    }
}
