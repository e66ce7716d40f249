//! Validated acceptance sampling plan.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// A single-stage attribute sampling plan applied to a finite batch.
///
/// Invariants (checked at construction): `defects ≤ batch_size`,
/// `sample_size ≤ batch_size`, `acceptance_number ≤ sample_size`.
///
/// # Examples
///
/// ```
/// use u_fulfillment::sampling::SamplingPlan;
///
/// let plan = SamplingPlan::from_rates(1000, 0.10, 0, 0.05).unwrap();
/// assert_eq!(plan.sample_size(), 100);
/// assert_eq!(plan.defects(), 50);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSamplingPlan")]
pub struct SamplingPlan {
    batch_size: u64,
    sample_size: u64,
    acceptance_number: u64,
    defects: u64,
}

#[derive(Deserialize)]
struct RawSamplingPlan {
    batch_size: u64,
    sample_size: u64,
    acceptance_number: u64,
    defects: u64,
}

impl TryFrom<RawSamplingPlan> for SamplingPlan {
    type Error = RiskError;

    fn try_from(raw: RawSamplingPlan) -> Result<Self> {
        Self::new(
            raw.batch_size,
            raw.sample_size,
            raw.acceptance_number,
            raw.defects,
        )
    }
}

impl SamplingPlan {
    /// Creates a plan from absolute counts.
    ///
    /// # Parameters
    /// - `batch_size`: N, items in the batch
    /// - `sample_size`: n, items inspected without replacement
    /// - `acceptance_number`: c, maximum defectives tolerated in the sample
    /// - `defects`: M, assumed true number of defective items in the batch
    pub fn new(
        batch_size: u64,
        sample_size: u64,
        acceptance_number: u64,
        defects: u64,
    ) -> Result<Self> {
        validate_counts(batch_size, defects, sample_size, acceptance_number)?;
        Ok(Self {
            batch_size,
            sample_size,
            acceptance_number,
            defects,
        })
    }

    /// Creates a plan from an inspection rate and a true defect rate.
    ///
    /// n = ⌊N · inspection_rate⌋ and M = ⌊N · defect_rate⌋, mirroring how
    /// the inspection desk enters percentages rather than counts.
    pub fn from_rates(
        batch_size: u64,
        inspection_rate: f64,
        acceptance_number: u64,
        defect_rate: f64,
    ) -> Result<Self> {
        check_rate("inspection_rate", inspection_rate)?;
        check_rate("defect_rate", defect_rate)?;
        let sample_size = (batch_size as f64 * inspection_rate).floor() as u64;
        let defects = (batch_size as f64 * defect_rate).floor() as u64;
        Self::new(
            batch_size,
            sample_size.min(batch_size),
            acceptance_number,
            defects.min(batch_size),
        )
    }

    /// Batch size N.
    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// Sample size n.
    pub fn sample_size(&self) -> u64 {
        self.sample_size
    }

    /// Acceptance number c.
    pub fn acceptance_number(&self) -> u64 {
        self.acceptance_number
    }

    /// Assumed true defect count M.
    pub fn defects(&self) -> u64 {
        self.defects
    }

    /// True defect rate M / N (0 for an empty batch).
    pub fn defect_rate(&self) -> f64 {
        if self.batch_size == 0 {
            0.0
        } else {
            self.defects as f64 / self.batch_size as f64
        }
    }

    /// Returns a copy of this plan with a different true defect count.
    pub fn with_defects(&self, defects: u64) -> Result<Self> {
        Self::new(
            self.batch_size,
            self.sample_size,
            self.acceptance_number,
            defects,
        )
    }
}

pub(crate) fn validate_counts(n_pop: u64, m: u64, n: u64, c: u64) -> Result<()> {
    if m > n_pop {
        return Err(RiskError::invalid(
            "defects",
            format!("defect count {m} exceeds batch size {n_pop}"),
        ));
    }
    if n > n_pop {
        return Err(RiskError::invalid(
            "sample_size",
            format!("sample size {n} exceeds batch size {n_pop}"),
        ));
    }
    if c > n {
        return Err(RiskError::invalid(
            "acceptance_number",
            format!("acceptance number {c} exceeds sample size {n}"),
        ));
    }
    Ok(())
}

pub(crate) fn check_rate(name: &'static str, rate: f64) -> Result<()> {
    if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
        return Err(RiskError::invalid(
            name,
            format!("rate must lie in [0, 1], got {rate}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inconsistent_counts() {
        assert!(SamplingPlan::new(100, 10, 0, 101).is_err());
        assert!(SamplingPlan::new(100, 101, 0, 5).is_err());
        assert!(SamplingPlan::new(100, 10, 11, 5).is_err());
        assert!(SamplingPlan::new(100, 10, 10, 100).is_ok());
    }

    #[test]
    fn from_rates_floors_counts() {
        let plan = SamplingPlan::from_rates(999, 0.1, 1, 0.05).unwrap();
        assert_eq!(plan.sample_size(), 99);
        assert_eq!(plan.defects(), 49);
        assert_eq!(plan.acceptance_number(), 1);
    }

    #[test]
    fn from_rates_rejects_out_of_range() {
        assert!(SamplingPlan::from_rates(100, 1.5, 0, 0.05).is_err());
        assert!(SamplingPlan::from_rates(100, 0.1, 0, -0.01).is_err());
        assert!(SamplingPlan::from_rates(100, f64::NAN, 0, 0.05).is_err());
    }

    #[test]
    fn with_defects_revalidates() {
        let plan = SamplingPlan::new(50, 5, 0, 2).unwrap();
        assert_eq!(plan.with_defects(10).unwrap().defects(), 10);
        assert!(plan.with_defects(51).is_err());
        assert!((plan.defect_rate() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn deserialization_revalidates() {
        let plan = SamplingPlan::new(1000, 100, 0, 50).unwrap();
        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(serde_json::from_str::<SamplingPlan>(&json).unwrap(), plan);

        let too_many_defects =
            r#"{"batch_size":100,"sample_size":10,"acceptance_number":0,"defects":101}"#;
        assert!(serde_json::from_str::<SamplingPlan>(too_many_defects).is_err());
    }
}
