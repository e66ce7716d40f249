//! Engine configuration: every dashboard parameter in one serializable
//! bundle, with the dashboard's defaults.
//!
//! Each section converts into the validated parameter type of its
//! component, so a loaded file is checked once, at the point of use.
//!
//! # Examples
//!
//! ```
//! use u_fulfillment::config::EngineConfig;
//!
//! let cfg: EngineConfig = serde_json::from_str(r#"{ "markov": { "arrival_rate": 120.0 } }"#).unwrap();
//! assert_eq!(cfg.markov.arrival_rate, 120.0);
//! assert_eq!(cfg.markov.servers, 50);
//! assert_eq!(cfg.sampling.batch_size, 1000);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::convolution::ConvolutionConfig;
use crate::cost::CostRiskConfig;
use crate::error::{Result, RiskError};
use crate::markov::{FailurePolicy, MarkovConfig};
use crate::sampling::SamplingPlan;
use crate::timeseries::{BucketWidth, ConfidenceLevel};

/// Acceptance-sampling inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    pub batch_size: u64,
    /// Fraction of the batch inspected.
    pub inspection_rate: f64,
    pub acceptance_number: u64,
    /// Assumed true defect fraction.
    pub true_defect_rate: f64,
    /// OC-curve grid upper end.
    pub oc_max_rate: f64,
    pub oc_points: usize,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            inspection_rate: 0.10,
            acceptance_number: 0,
            true_defect_rate: 0.05,
            oc_max_rate: 0.20,
            oc_points: 100,
        }
    }
}

impl SamplingSettings {
    pub fn plan(&self) -> Result<SamplingPlan> {
        SamplingPlan::from_rates(
            self.batch_size,
            self.inspection_rate,
            self.acceptance_number,
            self.true_defect_rate,
        )
    }
}

/// Delay-cost inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostSettings {
    /// Linear penalty per day of delay for the naive baseline.
    pub cost_per_day: f64,
    /// Observations at or above this quantile are dropped before fitting.
    pub trim_quantile: f64,
    pub risk: CostRiskConfig,
}

impl Default for CostSettings {
    fn default() -> Self {
        Self {
            cost_per_day: 10.0,
            trim_quantile: 0.99,
            risk: CostRiskConfig::default(),
        }
    }
}

/// Pick/pack service-time inputs, in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvolutionSettings {
    pub scale_pick: f64,
    pub scale_pack: f64,
    pub sigma: f64,
    pub sla: f64,
    pub grid_resolution: usize,
    pub domain_max: f64,
}

impl Default for ConvolutionSettings {
    fn default() -> Self {
        Self {
            scale_pick: 5.0,
            scale_pack: 5.0,
            sigma: 0.5,
            sla: 15.0,
            grid_resolution: 1000,
            domain_max: 30.0,
        }
    }
}

impl ConvolutionSettings {
    pub fn config(&self) -> Result<ConvolutionConfig> {
        ConvolutionConfig::with_grid(
            self.scale_pick,
            self.scale_pack,
            self.sigma,
            self.grid_resolution,
            self.domain_max,
        )
    }
}

/// Demand time-series inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSeriesSettings {
    pub window_days: u32,
    pub bucket: BucketWidth,
    pub acf_lags: usize,
    pub confidence: ConfidenceLevel,
    pub seasonal_period: usize,
}

impl Default for TimeSeriesSettings {
    fn default() -> Self {
        Self {
            window_days: 14,
            bucket: BucketWidth::Hour,
            acf_lags: 48,
            confidence: ConfidenceLevel::P95,
            seasonal_period: 24,
        }
    }
}

/// Queue-load inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkovSettings {
    /// Orders per hour.
    pub arrival_rate: f64,
    pub servers: u32,
    /// Orders per hour per server.
    pub per_server_rate: f64,
    pub danger_threshold: f64,
    pub failure_policy: FailurePolicy,
    pub time_scale: f64,
    /// Failure probability at which time-to-risk is reported.
    pub risk_threshold: f64,
    pub horizon: f64,
    pub horizon_points: usize,
    /// Dollars per crash.
    pub crash_cost: f64,
    /// Operating hours the crash cost is priced over.
    pub cost_hours: f64,
}

impl Default for MarkovSettings {
    fn default() -> Self {
        Self {
            arrival_rate: 95.0,
            servers: 50,
            per_server_rate: crate::markov::DEFAULT_PER_SERVER_RATE,
            danger_threshold: crate::markov::DEFAULT_DANGER_THRESHOLD,
            failure_policy: FailurePolicy::default(),
            time_scale: crate::markov::DEFAULT_TIME_SCALE,
            risk_threshold: 0.05,
            horizon: crate::markov::DEFAULT_HORIZON,
            horizon_points: crate::markov::DEFAULT_POINTS,
            crash_cost: crate::markov::DEFAULT_CRASH_COST,
            cost_hours: crate::markov::HOURS_PER_MONTH,
        }
    }
}

impl MarkovSettings {
    pub fn config(&self) -> Result<MarkovConfig> {
        Ok(
            MarkovConfig::from_servers(self.arrival_rate, self.servers, self.per_server_rate)?
                .with_danger_threshold(self.danger_threshold)?
                .with_time_scale(self.time_scale)?
                .with_failure_policy(self.failure_policy),
        )
    }
}

/// All component settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sampling: SamplingSettings,
    pub cost: CostSettings,
    pub convolution: ConvolutionSettings,
    pub timeseries: TimeSeriesSettings,
    pub markov: MarkovSettings,
}

impl EngineConfig {
    /// Parses JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RiskError::Data(format!("invalid config: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RiskError::Data(format!("cannot serialize config: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
