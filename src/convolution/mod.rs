//! Service-time convolution for SLA breach risk.
//!
//! Total fulfilment time is picking time plus packing time. Adding the
//! stage means says nothing about the tail; the density of the sum is the
//! convolution of the stage densities, and the probability of breaching an
//! SLA is the area of that density beyond the threshold.
//!
//! - [`LogNormal`] — stage model in (σ, median) form
//! - [`ConvolutionConfig`] — validated parameters with grid guards
//! - [`convolve_service_times`] — discretised f_Z on [0, 2·domain]
//! - [`ConvolvedDistribution::tail_probability`] — P(Z > SLA)
//!
//! # References
//!
//! - Feller, W. (1971). *An Introduction to Probability Theory and Its
//!   Applications*, Vol. II, §V.4.

mod config;
mod convolve;
mod lognormal;

pub use config::{ConvolutionConfig, MAX_GRID_POINTS, MIN_GRID_POINTS};
pub use convolve::{
    convolve_scaled, convolve_service_times, sla_breach_probability, ConvolvedDistribution,
    ServiceTimeConvolution,
};
pub use lognormal::LogNormal;
