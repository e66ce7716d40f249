//! Eigenvalues of Q and the relaxation timescale.

use serde::{Deserialize, Serialize};

use super::generator::MarkovSystem;

/// Magnitudes at or below this count as the zero eigenvalue.
pub const ZERO_EIGENVALUE_TOL: f64 = 1e-10;

/// One (possibly complex) eigenvalue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Eigenvalue {
    pub re: f64,
    pub im: f64,
}

impl Eigenvalue {
    pub fn magnitude(&self) -> f64 {
        self.re.hypot(self.im)
    }
}

/// Spectrum of the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigenAnalysis {
    /// Eigenvalues in ascending order of magnitude.
    pub eigenvalues: Vec<Eigenvalue>,
    /// 1/|λ₁| for the smallest nonzero |λ₁|; `None` if every eigenvalue is
    /// zero.
    pub relaxation_time: Option<f64>,
}

/// Eigenvalues of Q (via the real Schur form) and the relaxation time,
/// the longest timescale on which transients decay.
pub fn eigen_analysis(system: &MarkovSystem) -> EigenAnalysis {
    let mut eigenvalues: Vec<Eigenvalue> = system
        .generator()
        .complex_eigenvalues()
        .iter()
        .map(|c| Eigenvalue { re: c.re, im: c.im })
        .collect();
    eigenvalues.sort_by(|a, b| a.magnitude().total_cmp(&b.magnitude()));

    let relaxation_time = eigenvalues
        .iter()
        .map(Eigenvalue::magnitude)
        .find(|&m| m > ZERO_EIGENVALUE_TOL)
        .map(|m| 1.0 / m);

    EigenAnalysis {
        eigenvalues,
        relaxation_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markov::MarkovConfig;
    use nalgebra::{Matrix4, RowVector4};

    #[test]
    fn absorbing_chain_has_zero_eigenvalue() {
        let s = MarkovSystem::from_config(&MarkovConfig::new(95.0, 100.0).unwrap()).unwrap();
        let eig = eigen_analysis(&s);
        assert_eq!(eig.eigenvalues.len(), 4);
        assert!(eig.eigenvalues[0].magnitude() < 1e-9);
        for w in eig.eigenvalues.windows(2) {
            assert!(w[0].magnitude() <= w[1].magnitude());
        }
        for e in &eig.eigenvalues {
            assert!(e.re <= 1e-9);
        }
        let slowest = eig.eigenvalues[1].magnitude();
        let tau = eig.relaxation_time.unwrap();
        assert!((tau - 1.0 / slowest).abs() < 1e-12);
    }

    #[test]
    fn trace_is_preserved() {
        let s = MarkovSystem::from_config(&MarkovConfig::new(60.0, 100.0).unwrap()).unwrap();
        let eig = eigen_analysis(&s);
        let sum_re: f64 = eig.eigenvalues.iter().map(|e| e.re).sum();
        assert!((sum_re - s.generator().trace()).abs() < 1e-9);
    }

    #[test]
    fn zero_generator_has_no_relaxation() {
        let s = MarkovSystem::new(Matrix4::zeros(), RowVector4::new(1.0, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(eigen_analysis(&s).relaxation_time, None);
    }
}
