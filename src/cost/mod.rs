//! Delay-cost risk via the Jacobian transformation.
//!
//! Delivery delays are not priced linearly: a two-day delay is free, a
//! thirty-day delay means a refund plus compensation. This module fits a
//! kernel density to observed delays, pushes it through a convex cost
//! function, and reports tail risk as Value-at-Risk.
//!
//! - [`KernelDensity`] — Gaussian KDE of delay times
//! - [`CostFunction`] — monotonic cost maps ([`QuadraticCost`], [`LinearCost`])
//! - [`analyze_cost_risk`] — cost density, VaR₉₅ / VaR₉₉, summary costs
//! - [`naive_linear_cost`] — "time is money" baseline
//!
//! # References
//!
//! - Casella, G. & Berger, R.L. (2002). *Statistical Inference*, 2nd ed.,
//!   §2.1 (transformations of random variables).
//! - Jorion, P. (2006). *Value at Risk*, 3rd ed.

mod function;
mod kde;
mod transform;

pub use function::{CostFunction, LinearCost, QuadraticCost};
pub use kde::{BandwidthMethod, KdeResult, KernelDensity};
pub use transform::{
    analyze_cost_risk, naive_linear_cost, survival_curve, transform_density, trim_upper_tail,
    value_at_risk, CostDistribution, CostRiskConfig, CostRiskReport, NaiveCost, ValueAtRisk,
};
