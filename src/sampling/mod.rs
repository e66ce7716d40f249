//! Acceptance sampling for finite batches.
//!
//! Computes the probability of accepting a batch under a single-stage
//! attribute sampling plan using the exact hypergeometric distribution,
//! and the operating-characteristic (OC) curve across defect rates.
//!
//! # Examples
//!
//! ```
//! use u_fulfillment::sampling::{consumer_risk, SamplingPlan};
//!
//! // Inspect 10% of a 1000-unit batch, reject on the first defect
//! let plan = SamplingPlan::from_rates(1000, 0.10, 0, 0.02).unwrap();
//! let risk = consumer_risk(&plan).unwrap();
//! assert!(risk > 0.1 && risk < 0.15);
//! ```

mod hypergeometric;
mod plan;

pub use hypergeometric::{
    accept_probability, binomial_accept_probability, consumer_risk, defect_rate_grid,
    hypergeometric_pmf, oc_curve, OcPoint,
};
pub use plan::SamplingPlan;
