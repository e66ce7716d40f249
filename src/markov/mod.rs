//! Transient CTMC analysis of fulfilment load.
//!
//! A utilization below 1 says the queue is stable *eventually*. It says
//! nothing about the next hour. This module models the system as a
//! four-state continuous-time Markov chain (Idle, Busy, Overload, and an
//! absorbing Failure) and solves the Kolmogorov forward equation
//! dP/dt = P·Q exactly via the matrix exponential.
//!
//! - [`MarkovConfig`] — λ, μ and the rate heuristic ([`FailurePolicy`])
//! - [`MarkovSystem`] — validated generator Q and P0
//! - [`solve`], [`failure_probability`], [`trajectory`] — P(t)
//! - [`time_to_risk`] — first sampled time the failure risk is reached
//! - [`eigen_analysis`] — spectrum and relaxation time
//! - [`naive_stability`] — the static ρ < 1 baseline
//! - [`expected_crash_cost`] — crash cost over a period vs the naive verdict
//!
//! # Examples
//!
//! ```
//! use u_fulfillment::markov::{
//!     eigen_analysis, naive_stability, time_to_risk, MarkovConfig, MarkovSystem, TimeToRisk,
//! };
//!
//! let config = MarkovConfig::from_servers(95.0, 50, 2.0).unwrap();
//! assert!(naive_stability(&config).stable);
//!
//! let system = MarkovSystem::from_config(&config).unwrap();
//! let risk = time_to_risk(&system, 0.05, 5.0, 100).unwrap();
//! assert!(matches!(risk, TimeToRisk::Reached { time } if time < 1.0));
//! assert!(eigen_analysis(&system).relaxation_time.is_some());
//! ```
//!
//! # References
//!
//! - Norris, J.R. (1997). *Markov Chains*, Ch. 2–3.
//! - Al-Mohy, A.H. & Higham, N.J. (2009). "A New Scaling and Squaring
//!   Algorithm for the Matrix Exponential". *SIAM J. Matrix Anal. Appl.*
//!   31(3), 970–989.

mod config;
mod crash;
mod generator;
mod spectral;
mod transient;

pub use config::{
    naive_stability, FailurePolicy, MarkovConfig, NaiveStability, TransitionRates,
    DEFAULT_DANGER_THRESHOLD, DEFAULT_PER_SERVER_RATE, DEFAULT_TIME_SCALE,
};
pub use crash::{expected_crash_cost, CrashCostEstimate, DEFAULT_CRASH_COST, HOURS_PER_MONTH};
pub use generator::{MarkovSystem, State};
pub use spectral::{eigen_analysis, EigenAnalysis, Eigenvalue, ZERO_EIGENVALUE_TOL};
pub use transient::{
    failure_probability, solve, time_to_risk, trajectory, StateDistribution, TimeToRisk,
    Trajectory, DEFAULT_HORIZON, DEFAULT_POINTS,
};
