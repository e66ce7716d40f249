//! Load parameters and the rate heuristic behind the generator.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Utilization above which failures accelerate.
pub const DEFAULT_DANGER_THRESHOLD: f64 = 0.9;

/// Divisor mapping orders/hour onto state-transition intensities.
pub const DEFAULT_TIME_SCALE: f64 = 20.0;

/// Orders per hour one server handles.
pub const DEFAULT_PER_SERVER_RATE: f64 = 2.0;

/// Failure-rate multipliers applied to the upward rate.
///
/// An ad-hoc modelling choice: ×2 once utilization exceeds the danger
/// threshold, ×0.5 otherwise. Kept configurable rather than treated as a
/// law of the system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFailurePolicy")]
pub struct FailurePolicy {
    /// Multiplier when ρ > danger threshold.
    pub stressed: f64,
    /// Multiplier when ρ ≤ danger threshold.
    pub calm: f64,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            stressed: 2.0,
            calm: 0.5,
        }
    }
}

#[derive(Deserialize)]
struct RawFailurePolicy {
    stressed: f64,
    calm: f64,
}

impl TryFrom<RawFailurePolicy> for FailurePolicy {
    type Error = RiskError;

    fn try_from(raw: RawFailurePolicy) -> Result<Self> {
        Self::new(raw.stressed, raw.calm)
    }
}

impl FailurePolicy {
    pub fn new(stressed: f64, calm: f64) -> Result<Self> {
        for (name, v) in [("stressed", stressed), ("calm", calm)] {
            if !v.is_finite() || v < 0.0 {
                return Err(RiskError::invalid(
                    name,
                    format!("failure multiplier must be finite and >= 0, got {v}"),
                ));
            }
        }
        Ok(Self { stressed, calm })
    }

    /// Multiplier for utilization `rho` against `threshold`.
    pub fn multiplier(&self, rho: f64, threshold: f64) -> f64 {
        if rho > threshold {
            self.stressed
        } else {
            self.calm
        }
    }
}

/// Transition intensities (u, d, f) of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionRates {
    /// Upward pressure u = λ·stress / time_scale.
    pub up: f64,
    /// Service pull d = μ / time_scale.
    pub down: f64,
    /// Overload → Failure f = u × policy multiplier.
    pub failure: f64,
}

/// Arrival and service parameters of the fulfilment queue.
///
/// # Examples
///
/// ```
/// use u_fulfillment::markov::MarkovConfig;
///
/// // 50 servers at 2 orders/hour each, 95 orders/hour arriving
/// let cfg = MarkovConfig::from_servers(95.0, 50, 2.0).unwrap();
/// assert_eq!(cfg.service_capacity(), 100.0);
/// assert!((cfg.utilization() - 0.95).abs() < 1e-12);
/// let r = cfg.rates();
/// assert!((r.failure - 2.0 * r.up).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMarkovConfig")]
pub struct MarkovConfig {
    arrival_rate: f64,
    service_capacity: f64,
    danger_threshold: f64,
    failure_policy: FailurePolicy,
    time_scale: f64,
}

/// Unchecked wire form, replayed through the builder on deserialization.
#[derive(Deserialize)]
struct RawMarkovConfig {
    arrival_rate: f64,
    service_capacity: f64,
    danger_threshold: f64,
    failure_policy: FailurePolicy,
    time_scale: f64,
}

impl TryFrom<RawMarkovConfig> for MarkovConfig {
    type Error = RiskError;

    fn try_from(raw: RawMarkovConfig) -> Result<Self> {
        Ok(Self::new(raw.arrival_rate, raw.service_capacity)?
            .with_danger_threshold(raw.danger_threshold)?
            .with_time_scale(raw.time_scale)?
            .with_failure_policy(raw.failure_policy))
    }
}

fn positive(name: &'static str, v: f64) -> Result<()> {
    if !v.is_finite() || v <= 0.0 {
        return Err(RiskError::invalid(name, format!("must be finite and > 0, got {v}")));
    }
    Ok(())
}

impl MarkovConfig {
    /// Arrival rate λ and service capacity μ (orders/hour), default policy.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` unless both rates are finite and positive with
    /// ρ = λ/μ < 2 (the stress factor ρ/(2−ρ) is undefined beyond).
    pub fn new(arrival_rate: f64, service_capacity: f64) -> Result<Self> {
        positive("arrival_rate", arrival_rate)?;
        positive("service_capacity", service_capacity)?;
        let rho = arrival_rate / service_capacity;
        if rho >= 2.0 {
            return Err(RiskError::invalid(
                "arrival_rate",
                format!("utilization {rho:.3} >= 2 leaves the stress factor undefined"),
            ));
        }
        Ok(Self {
            arrival_rate,
            service_capacity,
            danger_threshold: DEFAULT_DANGER_THRESHOLD,
            failure_policy: FailurePolicy::default(),
            time_scale: DEFAULT_TIME_SCALE,
        })
    }

    /// Capacity from a server count: μ = servers × per_server_rate.
    pub fn from_servers(arrival_rate: f64, servers: u32, per_server_rate: f64) -> Result<Self> {
        if servers == 0 {
            return Err(RiskError::invalid("servers", "need at least one server"));
        }
        positive("per_server_rate", per_server_rate)?;
        Self::new(arrival_rate, f64::from(servers) * per_server_rate)
    }

    pub fn with_danger_threshold(mut self, threshold: f64) -> Result<Self> {
        if !threshold.is_finite() || threshold <= 0.0 || threshold >= 2.0 {
            return Err(RiskError::invalid(
                "danger_threshold",
                format!("must lie in (0, 2), got {threshold}"),
            ));
        }
        self.danger_threshold = threshold;
        Ok(self)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_time_scale(mut self, time_scale: f64) -> Result<Self> {
        positive("time_scale", time_scale)?;
        self.time_scale = time_scale;
        Ok(self)
    }

    pub fn arrival_rate(&self) -> f64 {
        self.arrival_rate
    }

    pub fn service_capacity(&self) -> f64 {
        self.service_capacity
    }

    pub fn danger_threshold(&self) -> f64 {
        self.danger_threshold
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// ρ = λ / μ.
    pub fn utilization(&self) -> f64 {
        self.arrival_rate / self.service_capacity
    }

    /// ρ / (2 − ρ): grows convexly and reaches 1 at ρ = 1.
    pub fn stress_factor(&self) -> f64 {
        let rho = self.utilization();
        rho / (2.0 - rho)
    }

    pub fn rates(&self) -> TransitionRates {
        let up = self.arrival_rate * self.stress_factor() / self.time_scale;
        let down = self.service_capacity / self.time_scale;
        let failure = up
            * self
                .failure_policy
                .multiplier(self.utilization(), self.danger_threshold);
        TransitionRates { up, down, failure }
    }
}

/// Static utilization verdict: stable whenever ρ < 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NaiveStability {
    pub utilization: f64,
    pub stable: bool,
}

/// The steady-state reading that ignores transient failure risk.
pub fn naive_stability(config: &MarkovConfig) -> NaiveStability {
    let utilization = config.utilization();
    NaiveStability {
        utilization,
        stable: utilization < 1.0,
    }
}
