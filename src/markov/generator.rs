//! Four-state generator matrix.

use nalgebra::{Matrix4, RowVector4};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::MarkovConfig;
use crate::error::{Result, RiskError};

/// Absolute tolerance on generator row sums and P0 mass.
const ROW_SUM_TOL: f64 = 1e-9;

/// Operating state of the fulfilment system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    Idle,
    Busy,
    Overload,
    /// Absorbing.
    Failure,
}

impl State {
    pub const ALL: [State; 4] = [State::Idle, State::Busy, State::Overload, State::Failure];

    /// Row/column index in the generator.
    pub fn index(self) -> usize {
        match self {
            State::Idle => 0,
            State::Busy => 1,
            State::Overload => 2,
            State::Failure => 3,
        }
    }
}

/// A validated CTMC: generator Q and initial distribution P0.
///
/// ```text
/// Q = [ -u     u      0      0 ]
///     [  d  -(u+d)    u      0 ]
///     [  0     d   -(f+d)    f ]
///     [  0     0      0      0 ]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MarkovSystem {
    generator: Matrix4<f64>,
    initial: RowVector4<f64>,
}

impl MarkovSystem {
    /// Builds Q from the configured rates, starting in Idle.
    pub fn from_config(config: &MarkovConfig) -> Result<Self> {
        let r = config.rates();
        #[rustfmt::skip]
        let q = Matrix4::new(
            -r.up,   r.up,               0.0,                   0.0,
            r.down,  -(r.up + r.down),   r.up,                  0.0,
            0.0,     r.down,             -(r.failure + r.down), r.failure,
            0.0,     0.0,                0.0,                   0.0,
        );
        debug!(
            utilization = config.utilization(),
            up = r.up,
            down = r.down,
            failure = r.failure,
            "built generator"
        );
        Self::new(q, RowVector4::new(1.0, 0.0, 0.0, 0.0))
    }

    /// Wraps an explicit generator and initial distribution.
    ///
    /// # Errors
    ///
    /// - `Numerical` if any entry is non-finite.
    /// - `InvalidParameter` if an off-diagonal rate is negative, a row does
    ///   not sum to zero, the Failure row is not all zero, or P0 is not a
    ///   probability vector.
    pub fn new(generator: Matrix4<f64>, initial: RowVector4<f64>) -> Result<Self> {
        if generator.iter().chain(initial.iter()).any(|v| !v.is_finite()) {
            return Err(RiskError::Numerical("generator has non-finite entries".into()));
        }
        for i in 0..4 {
            for j in 0..4 {
                if i != j && generator[(i, j)] < 0.0 {
                    return Err(RiskError::invalid(
                        "generator",
                        format!("off-diagonal rate Q[{i}][{j}] = {} is negative", generator[(i, j)]),
                    ));
                }
            }
            let row_sum: f64 = generator.row(i).sum();
            let scale = generator.row(i).amax().max(1.0);
            if row_sum.abs() > ROW_SUM_TOL * scale {
                return Err(RiskError::invalid(
                    "generator",
                    format!("row {i} sums to {row_sum}, expected 0"),
                ));
            }
        }
        if generator.row(State::Failure.index()).iter().any(|&v| v != 0.0) {
            return Err(RiskError::invalid("generator", "Failure state must be absorbing"));
        }
        if initial.iter().any(|&p| p < 0.0) || (initial.sum() - 1.0).abs() > ROW_SUM_TOL {
            return Err(RiskError::invalid(
                "initial",
                "initial distribution must be non-negative and sum to 1",
            ));
        }
        Ok(Self { generator, initial })
    }

    /// Replaces P0.
    pub fn with_initial(self, initial: RowVector4<f64>) -> Result<Self> {
        Self::new(self.generator, initial)
    }

    pub fn generator(&self) -> &Matrix4<f64> {
        &self.generator
    }

    pub fn initial(&self) -> &RowVector4<f64> {
        &self.initial
    }

    /// Rate from `from` to `to`.
    pub fn rate(&self, from: State, to: State) -> f64 {
        self.generator[(from.index(), to.index())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system(lambda: f64, mu: f64) -> MarkovSystem {
        MarkovSystem::from_config(&MarkovConfig::new(lambda, mu).unwrap()).unwrap()
    }

    #[test]
    fn rows_sum_to_zero() {
        for (l, m) in [(95.0, 100.0), (10.0, 100.0), (180.0, 100.0)] {
            let s = system(l, m);
            for i in 0..4 {
                assert!(s.generator().row(i).sum().abs() < 1e-12);
            }
        }
    }

    #[test]
    fn structure_and_signs() {
        let s = system(95.0, 100.0);
        assert_eq!(s.rate(State::Idle, State::Overload), 0.0);
        assert_eq!(s.rate(State::Idle, State::Failure), 0.0);
        assert!(s.rate(State::Overload, State::Failure) > 0.0);
        assert!(s.rate(State::Busy, State::Idle) > 0.0);
        for st in State::ALL {
            assert!(s.rate(st, st) <= 0.0);
            assert_eq!(s.rate(State::Failure, st), 0.0);
        }
        assert_eq!(s.initial()[State::Idle.index()], 1.0);
    }

    #[test]
    fn rejects_malformed_generators() {
        let p0 = RowVector4::new(1.0, 0.0, 0.0, 0.0);
        let mut q = *system(95.0, 100.0).generator();
        q[(0, 1)] += 0.5;
        assert!(MarkovSystem::new(q, p0).is_err());

        let mut q = *system(95.0, 100.0).generator();
        q[(3, 0)] = 1.0;
        q[(3, 3)] = -1.0;
        assert!(MarkovSystem::new(q, p0).is_err());

        let mut q = Matrix4::zeros();
        q[(0, 0)] = f64::NAN;
        assert!(matches!(
            MarkovSystem::new(q, p0),
            Err(RiskError::Numerical(_))
        ));

        let s = system(95.0, 100.0);
        assert!(s.with_initial(RowVector4::new(0.5, 0.2, 0.0, 0.0)).is_err());
    }
}
