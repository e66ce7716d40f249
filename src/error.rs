//! Error taxonomy shared by every risk component.
//!
//! Errors are local to a single computation call. Numerical degeneracies
//! that can be guarded (clamped domains, minimum grid density) are handled
//! inside the components and logged rather than surfaced here.

use thiserror::Error;

/// Errors produced by the risk engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    /// An input is out of range and was rejected before computation.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The data is too short or too flat for the requested analysis.
    ///
    /// The remedy is to acquire more data (widen the window, pick a smaller
    /// period), not to change the request.
    #[error("insufficient data: {reason} (need {needed}, got {got})")]
    InsufficientData {
        needed: usize,
        got: usize,
        reason: String,
    },

    /// A computation produced a non-finite value despite valid inputs.
    #[error("numerical failure: {0}")]
    Numerical(String),

    /// The order log could not be read or parsed.
    #[error("order log error: {0}")]
    Data(String),
}

impl RiskError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        RiskError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn insufficient(needed: usize, got: usize, reason: impl Into<String>) -> Self {
        RiskError::InsufficientData {
            needed,
            got,
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`RiskError::InsufficientData`].
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, RiskError::InsufficientData { .. })
    }

    /// Returns `true` for [`RiskError::InvalidParameter`].
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, RiskError::InvalidParameter { .. })
    }
}

impl From<csv::Error> for RiskError {
    fn from(err: csv::Error) -> Self {
        RiskError::Data(err.to_string())
    }
}

impl From<std::io::Error> for RiskError {
    fn from(err: std::io::Error) -> Self {
        RiskError::Data(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RiskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_parameter() {
        let e = RiskError::invalid("sigma", "must be positive, got -1");
        assert_eq!(
            e.to_string(),
            "invalid parameter `sigma`: must be positive, got -1"
        );
        assert!(e.is_invalid_parameter());
        assert!(!e.is_insufficient_data());
    }

    #[test]
    fn insufficient_data_is_distinct() {
        let e = RiskError::insufficient(48, 20, "decomposition needs two full periods");
        assert!(e.is_insufficient_data());
        assert!(e.to_string().contains("need 48, got 20"));
    }
}
