//! Demand time-series diagnostics.
//!
//! Demand is neither flat nor memoryless: a Monday spike repeats every
//! week, and a busy hour predicts a busy next hour. These routines tell a
//! staffing planner whether demand drifts ([`test_stationarity`]), what its
//! repeating cycle looks like ([`decompose`]), and how far back it
//! remembers ([`autocorrelation`]).
//!
//! - [`DemandSeries`] — bucketed order counts with a seasonal period
//! - [`test_stationarity`] — ADF with MacKinnon p-value and verdict
//! - [`decompose`] — additive trend / seasonal / residual split
//! - [`autocorrelation`] — biased ACF with a 95 % significance band
//! - [`naive_staffing_level`] — the flat-mean baseline

mod autocorr;
mod decompose;
mod series;
mod stationarity;

pub use autocorr::{autocorrelation, Autocorrelation, STRONG_MEMORY};
pub use decompose::{decompose, Decomposition};
pub use series::{naive_staffing_level, BucketWidth, DemandSeries};
pub use stationarity::{
    adf_test, mackinnon_p_value, test_stationarity, AdfRegression, AdfResult, ConfidenceLevel,
    Stationarity, StationarityReport, MIN_OBSERVATIONS,
};
