//! Monotonic cost functions of delay time.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// A strictly increasing, invertible map g from delay time (days) to loss.
///
/// Implementations must be differentiable on t > 0 so the Jacobian
/// `d/dy g⁻¹(y)` exists on the support.
pub trait CostFunction {
    /// Loss for a delay of `t` days.
    fn cost(&self, t: f64) -> f64;

    /// Delay that produces loss `y`, g⁻¹(y).
    fn inverse(&self, y: f64) -> f64;

    /// Derivative of the inverse, d/dy g⁻¹(y).
    fn inverse_derivative(&self, y: f64) -> f64;

    /// Checks the parameters before any density or quantile is computed.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

fn positive_rate(name: &'static str, rate: f64) -> Result<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(RiskError::invalid(
            name,
            format!("cost rate must be finite and > 0, got {rate}"),
        ));
    }
    Ok(())
}

/// Convex delay cost g(t) = rate · t².
///
/// Short delays cost little, long ones escalate (refunds, compensation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadraticCost {
    /// Multiplier on t².
    pub rate: f64,
}

impl Default for QuadraticCost {
    fn default() -> Self {
        Self { rate: 1.0 }
    }
}

impl QuadraticCost {
    pub fn new(rate: f64) -> Result<Self> {
        positive_rate("rate", rate)?;
        Ok(Self { rate })
    }
}

impl CostFunction for QuadraticCost {
    fn cost(&self, t: f64) -> f64 {
        self.rate * t * t
    }

    fn inverse(&self, y: f64) -> f64 {
        (y / self.rate).sqrt()
    }

    // d/dy √(y/r) = 1 / (2√(r·y))
    fn inverse_derivative(&self, y: f64) -> f64 {
        1.0 / (2.0 * (self.rate * y).sqrt())
    }

    fn validate(&self) -> Result<()> {
        positive_rate("rate", self.rate)
    }
}

/// Naive linear cost g(t) = rate_per_day · t ("time is money").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCost {
    /// Dollar penalty per day of delay.
    pub rate_per_day: f64,
}

impl LinearCost {
    pub fn new(rate_per_day: f64) -> Result<Self> {
        positive_rate("rate_per_day", rate_per_day)?;
        Ok(Self { rate_per_day })
    }
}

impl CostFunction for LinearCost {
    fn cost(&self, t: f64) -> f64 {
        self.rate_per_day * t
    }

    fn inverse(&self, y: f64) -> f64 {
        y / self.rate_per_day
    }

    fn inverse_derivative(&self, _y: f64) -> f64 {
        1.0 / self.rate_per_day
    }

    fn validate(&self) -> Result<()> {
        positive_rate("rate_per_day", self.rate_per_day)
    }
}
