//! System reliability baselines for two-checkpoint fulfillment lines.
//!
//! The naive view multiplies per-checkpoint reliabilities as if failures
//! were independent. When failures share a cause (a picker fault jams the
//! conveyor) the joint failure probability P(A∩B) is measured instead and
//! the system failure probability follows from inclusion–exclusion:
//!
//! ```text
//! P(system fails) = P(A) + P(B) − P(A ∩ B)
//! R_sys           = 1 − P(system fails)
//! ```
//!
//! # Examples
//!
//! ```
//! use u_fulfillment::reliability::{inclusion_exclusion_reliability, independent_reliability};
//!
//! let naive = independent_reliability(0.05, 0.05).unwrap();
//! let measured = inclusion_exclusion_reliability(0.05, 0.05, 0.02).unwrap();
//! assert!((naive - 0.9025).abs() < 1e-12);
//! assert!((measured - 0.92).abs() < 1e-12);
//! ```

use crate::error::{Result, RiskError};

fn check_probability(name: &'static str, p: f64) -> Result<()> {
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(RiskError::invalid(
            name,
            format!("probability must lie in [0, 1], got {p}"),
        ));
    }
    Ok(())
}

/// Reliability of checkpoints in series assuming independence: Π rᵢ.
///
/// An empty slice is a line with no checkpoints and has reliability 1.
pub fn series_reliability(reliabilities: &[f64]) -> Result<f64> {
    for &r in reliabilities {
        check_probability("reliability", r)?;
    }
    Ok(reliabilities.iter().product())
}

/// System reliability from two failure probabilities and their measured
/// joint failure probability.
///
/// # Errors
///
/// `InvalidParameter` if any probability is outside [0, 1] or `p_both`
/// violates the Fréchet bounds max(0, p_a + p_b − 1) ≤ p_both ≤ min(p_a, p_b).
pub fn inclusion_exclusion_reliability(p_a: f64, p_b: f64, p_both: f64) -> Result<f64> {
    check_probability("p_a", p_a)?;
    check_probability("p_b", p_b)?;
    check_probability("p_both", p_both)?;

    let lower = (p_a + p_b - 1.0).max(0.0);
    let upper = p_a.min(p_b);
    if p_both < lower - 1e-12 || p_both > upper + 1e-12 {
        return Err(RiskError::invalid(
            "p_both",
            format!("joint failure probability {p_both} outside [{lower}, {upper}]"),
        ));
    }

    let p_fail = p_a + p_b - p_both;
    Ok((1.0 - p_fail).clamp(0.0, 1.0))
}

/// System reliability assuming the two failures are independent
/// (P(A∩B) = P(A)·P(B)).
pub fn independent_reliability(p_a: f64, p_b: f64) -> Result<f64> {
    check_probability("p_a", p_a)?;
    check_probability("p_b", p_b)?;
    inclusion_exclusion_reliability(p_a, p_b, p_a * p_b)
}
