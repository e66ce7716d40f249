//! Validated convolution parameters and grid guards.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::lognormal::LogNormal;
use crate::error::{Result, RiskError};

/// Fewest grid points allowed per input density.
pub const MIN_GRID_POINTS: usize = 256;

/// Upper bound on the grid the resolution guard may request.
pub const MAX_GRID_POINTS: usize = 8192;

/// Grid points demanded across the interquartile range of the narrower
/// input.
const POINTS_PER_IQR: f64 = 8.0;

/// Tail probability the grid domain must cover for each input.
const DOMAIN_COVERAGE: f64 = 0.999;

/// Parameters of the pick + pack service-time model.
///
/// Both stages are log-normal with a shared shape σ and their own scale
/// (median) in minutes.
///
/// # Examples
///
/// ```
/// use u_fulfillment::convolution::ConvolutionConfig;
///
/// let cfg = ConvolutionConfig::new(5.0, 5.0, 0.5).unwrap();
/// assert_eq!(cfg.grid_resolution(), 1000);
/// assert_eq!(cfg.domain_max(), 30.0);
/// assert!(ConvolutionConfig::new(5.0, 5.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConvolutionConfig")]
pub struct ConvolutionConfig {
    scale_pick: f64,
    scale_pack: f64,
    sigma: f64,
    grid_resolution: usize,
    domain_max: f64,
}

/// Unchecked wire form; deserialization goes through [`ConvolutionConfig::with_grid`].
#[derive(Deserialize)]
struct RawConvolutionConfig {
    scale_pick: f64,
    scale_pack: f64,
    sigma: f64,
    grid_resolution: usize,
    domain_max: f64,
}

impl TryFrom<RawConvolutionConfig> for ConvolutionConfig {
    type Error = RiskError;

    fn try_from(raw: RawConvolutionConfig) -> Result<Self> {
        Self::with_grid(
            raw.scale_pick,
            raw.scale_pack,
            raw.sigma,
            raw.grid_resolution,
            raw.domain_max,
        )
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(RiskError::invalid(
            name,
            format!("must be finite and > 0, got {value}"),
        ));
    }
    Ok(())
}

impl ConvolutionConfig {
    /// Creates a configuration on the default grid (1000 points over
    /// [0, 30]).
    pub fn new(scale_pick: f64, scale_pack: f64, sigma: f64) -> Result<Self> {
        Self::with_grid(scale_pick, scale_pack, sigma, 1000, 30.0)
    }

    /// Creates a configuration with an explicit grid.
    pub fn with_grid(
        scale_pick: f64,
        scale_pack: f64,
        sigma: f64,
        grid_resolution: usize,
        domain_max: f64,
    ) -> Result<Self> {
        positive("scale_pick", scale_pick)?;
        positive("scale_pack", scale_pack)?;
        positive("sigma", sigma)?;
        positive("domain_max", domain_max)?;
        if grid_resolution < 2 {
            return Err(RiskError::invalid(
                "grid_resolution",
                format!("need at least 2 grid points, got {grid_resolution}"),
            ));
        }
        Ok(Self {
            scale_pick,
            scale_pack,
            sigma,
            grid_resolution,
            domain_max,
        })
    }

    /// Median picking time.
    pub fn scale_pick(&self) -> f64 {
        self.scale_pick
    }

    /// Median packing time.
    pub fn scale_pack(&self) -> f64 {
        self.scale_pack
    }

    /// Shared shape σ.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Requested points per input grid.
    pub fn grid_resolution(&self) -> usize {
        self.grid_resolution
    }

    /// Requested upper end of the input grid.
    pub fn domain_max(&self) -> f64 {
        self.domain_max
    }

    /// Picking-time distribution.
    pub fn pick(&self) -> LogNormal {
        LogNormal {
            sigma: self.sigma,
            scale: self.scale_pick,
        }
    }

    /// Packing-time distribution.
    pub fn pack(&self) -> LogNormal {
        LogNormal {
            sigma: self.sigma,
            scale: self.scale_pack,
        }
    }

    /// Grid actually used: (points, domain_max).
    ///
    /// The domain is extended to reach the 99.9th percentile of the wider
    /// input, and the resolution is raised so the narrower input gets at
    /// least `POINTS_PER_IQR` points across its interquartile range (never
    /// below [`MIN_GRID_POINTS`], never above [`MAX_GRID_POINTS`]). The
    /// interquartile range tracks the body of a skewed log-normal, where a
    /// standard deviation is inflated by the tail. A coarse grid understates
    /// the tail, so these are enforced rather than reported.
    ///
    /// When the cap binds, inputs are still discretised by cell mass, so
    /// total probability and the mean survive; only detail finer than one
    /// cell is lost.
    pub fn effective_grid(&self) -> (usize, f64) {
        let (pick, pack) = (self.pick(), self.pack());

        let reach = pick.quantile(DOMAIN_COVERAGE).max(pack.quantile(DOMAIN_COVERAGE));
        let domain = if reach > self.domain_max {
            warn!(
                requested = self.domain_max,
                extended = reach,
                "grid domain does not cover the 99.9th percentile; extending"
            );
            reach
        } else {
            self.domain_max
        };

        let narrowest = interquartile_range(&pick).min(interquartile_range(&pack));
        let needed = (POINTS_PER_IQR * domain / narrowest).ceil() as usize + 1;
        if needed > MAX_GRID_POINTS {
            warn!(
                needed,
                cap = MAX_GRID_POINTS,
                domain,
                "input spread too wide for the grid cap; densities resolved to one cell"
            );
        }
        let floor = needed.max(MIN_GRID_POINTS).min(MAX_GRID_POINTS);
        let points = if self.grid_resolution < floor {
            warn!(
                requested = self.grid_resolution,
                used = floor,
                "grid too coarse to resolve the input densities; refining"
            );
            floor
        } else {
            self.grid_resolution
        };

        (points, domain)
    }
}

fn interquartile_range(dist: &LogNormal) -> f64 {
    dist.quantile(0.75) - dist.quantile(0.25)
}
