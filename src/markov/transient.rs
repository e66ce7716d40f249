//! Transient state occupancy P(t) = P0 · exp(Qt).
//!
//! The matrix exponential uses nalgebra's scaling-and-squaring Padé
//! routine. Q is not symmetric and may be close to defective, so an
//! eigen-decomposition exponential is avoided.

use nalgebra::RowVector4;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::generator::{MarkovSystem, State};
use crate::error::{Result, RiskError};

/// Default horizon (hours) for trajectories and time-to-risk.
pub const DEFAULT_HORIZON: f64 = 5.0;

/// Default number of horizon samples.
pub const DEFAULT_POINTS: usize = 100;

/// Round-off below this is clamped silently; larger negatives are logged.
const NEGATIVE_TOL: f64 = 1e-12;

/// Probability of each state at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateDistribution {
    pub probabilities: [f64; 4],
}

impl StateDistribution {
    pub fn get(&self, state: State) -> f64 {
        self.probabilities[state.index()]
    }

    pub fn failure(&self) -> f64 {
        self.get(State::Failure)
    }
}

/// Occupancy over a uniform time grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub distributions: Vec<StateDistribution>,
}

impl Trajectory {
    /// Probability of `state` at each time.
    pub fn state(&self, state: State) -> Vec<f64> {
        self.distributions.iter().map(|d| d.get(state)).collect()
    }
}

/// When the failure probability first reaches a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimeToRisk {
    /// First sampled time with P_Failure(t) ≥ threshold.
    Reached { time: f64 },
    /// Never reached on the sampled horizon; no extrapolation is made.
    NotReached { horizon: f64 },
}

/// P(t) for `t ≥ 0`. P(0) is P0 exactly.
///
/// # Errors
///
/// `InvalidParameter` for negative or non-finite `t`; `Numerical` if the
/// exponential produces non-finite values.
pub fn solve(system: &MarkovSystem, t: f64) -> Result<StateDistribution> {
    if !t.is_finite() || t < 0.0 {
        return Err(RiskError::invalid(
            "t",
            format!("time must be finite and >= 0, got {t}"),
        ));
    }
    if t == 0.0 {
        return Ok(to_distribution(system.initial()));
    }

    let transition = (system.generator() * t).exp();
    let mut p = system.initial() * transition;
    if p.iter().any(|v| !v.is_finite()) {
        return Err(RiskError::Numerical(format!(
            "matrix exponential diverged at t = {t}"
        )));
    }

    let most_negative = p.min();
    if most_negative < -NEGATIVE_TOL {
        warn!(t, most_negative, "clamping negative occupancy from round-off");
    }
    p.iter_mut().for_each(|v| *v = v.max(0.0));
    let total = p.sum();
    if total <= 0.0 {
        return Err(RiskError::Numerical(format!(
            "occupancy vanished at t = {t}"
        )));
    }
    p /= total;
    Ok(to_distribution(&p))
}

fn to_distribution(p: &RowVector4<f64>) -> StateDistribution {
    StateDistribution {
        probabilities: [p[0], p[1], p[2], p[3]],
    }
}

/// P(t)[Failure].
///
/// # Examples
///
/// ```
/// use u_fulfillment::markov::{failure_probability, MarkovConfig, MarkovSystem};
///
/// // 95 % utilization looks stable, yet the chain fails within the hour
/// let system = MarkovSystem::from_config(&MarkovConfig::new(95.0, 100.0).unwrap()).unwrap();
/// let p1 = failure_probability(&system, 1.0).unwrap();
/// assert!(p1 > 0.0);
/// assert!(failure_probability(&system, 2.0).unwrap() > p1);
/// ```
pub fn failure_probability(system: &MarkovSystem, t: f64) -> Result<f64> {
    Ok(solve(system, t)?.failure())
}

fn horizon_grid(horizon: f64, points: usize) -> Result<Vec<f64>> {
    if !horizon.is_finite() || horizon <= 0.0 {
        return Err(RiskError::invalid(
            "horizon",
            format!("must be finite and > 0, got {horizon}"),
        ));
    }
    if points < 2 {
        return Err(RiskError::invalid(
            "points",
            format!("need at least 2 horizon samples, got {points}"),
        ));
    }
    let step = horizon / (points - 1) as f64;
    Ok((0..points).map(|i| i as f64 * step).collect())
}

/// Occupancy of every state on `points` uniform samples of [0, horizon].
pub fn trajectory(system: &MarkovSystem, horizon: f64, points: usize) -> Result<Trajectory> {
    let times = horizon_grid(horizon, points)?;
    let distributions = times
        .iter()
        .map(|&t| solve(system, t))
        .collect::<Result<Vec<_>>>()?;
    Ok(Trajectory {
        times,
        distributions,
    })
}

/// Linear search for the first sampled time where the failure probability
/// reaches `threshold`.
pub fn time_to_risk(
    system: &MarkovSystem,
    threshold: f64,
    horizon: f64,
    points: usize,
) -> Result<TimeToRisk> {
    if !threshold.is_finite() || threshold <= 0.0 || threshold >= 1.0 {
        return Err(RiskError::invalid(
            "threshold",
            format!("risk threshold must lie in (0, 1), got {threshold}"),
        ));
    }
    for t in horizon_grid(horizon, points)? {
        if failure_probability(system, t)? >= threshold {
            debug!(threshold, time = t, "failure risk threshold reached");
            return Ok(TimeToRisk::Reached { time: t });
        }
    }
    Ok(TimeToRisk::NotReached { horizon })
}
