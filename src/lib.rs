//! # u-fulfillment
//!
//! Stochastic risk analysis for order fulfilment: quality acceptance,
//! delay cost, service-time SLAs, demand cycles, and transient queue
//! failure.
//!
//! Each component contrasts a "naive" point estimate with the
//! distribution-aware answer: a 10 % inspection that passes a bad batch,
//! a cost that grows with the square of the delay, an SLA breached
//! although the mean total is well under it, a queue at ρ < 1 that still
//! fails within the hour.
//!
//! ## Modules
//!
//! - [`sampling`] — Hypergeometric acceptance probability and OC curves
//! - [`cost`] — KDE of delays, Jacobian transform to cost density, VaR
//! - [`convolution`] — Pick + pack service-time density and SLA breach
//! - [`timeseries`] — ADF stationarity, additive decomposition, ACF
//! - [`markov`] — CTMC generator, transient solve, relaxation time
//! - [`reliability`] — Naive vs. inclusion–exclusion system reliability
//! - [`dataset`] — Historical order log (CSV)
//! - [`config`] — Serializable engine configuration
//!
//! ## Design Philosophy
//!
//! - **Stateless**: every computation is a pure function of its inputs and
//!   returns an owned, immutable result
//! - **Validated inputs**: out-of-range parameters fail with
//!   [`RiskError::InvalidParameter`] before any arithmetic, short or flat
//!   data with [`RiskError::InsufficientData`]
//! - **Numerical stability**: log-space combinatorics, guarded grids, and
//!   a Padé matrix exponential

pub mod config;
pub mod convolution;
pub mod cost;
pub mod dataset;
pub mod error;
pub mod markov;
pub mod reliability;
pub mod sampling;
pub mod timeseries;

pub use error::{Result, RiskError};
