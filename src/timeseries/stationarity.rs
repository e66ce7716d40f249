//! Augmented Dickey–Fuller unit-root test.
//!
//! Tests H₀: unit root (demand drifts, yesterday's level persists) against
//! H₁: stationary (demand reverts to a stable mean).
//!
//! # Algorithm
//!
//! 1. Regress Δyₜ = α + γyₜ₋₁ + Σᵢ δᵢΔyₜ₋ᵢ + εₜ by OLS.
//! 2. Choose the lag count p by AIC over 0..=p_max on a common sample,
//!    p_max = ⌈12·(n/100)^¼⌉ (Schwert 1989), capped so the regression
//!    keeps enough rows.
//! 3. Refit at the chosen p on all available rows and return the t-ratio
//!    of γ̂, compared against MacKinnon critical values.
//!
//! # References
//!
//! - Dickey, D.A. & Fuller, W.A. (1979). "Distribution of the Estimators for
//!   Autoregressive Time Series with a Unit Root". *JASA* 74(366), 427–431.
//! - MacKinnon, J.G. (1994). "Approximate Asymptotic Distribution Functions
//!   for Unit-Root and Cointegration Tests". *JBES* 12(2), 167–176.
//! - MacKinnon, J.G. (2010). "Critical Values for Cointegration Tests".
//!   Queen's Economics Department Working Paper No. 1227.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use u_numflow::special;

use super::series::is_near_constant;
use crate::error::{Result, RiskError};

/// Fewest observations accepted by the test.
pub const MIN_OBSERVATIONS: usize = 10;

/// Fewest regression rows kept after lagging.
const MIN_ROWS: usize = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Deterministic terms in the test regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdfRegression {
    /// Δyₜ = γyₜ₋₁ + Σδᵢ·Δyₜ₋ᵢ + εₜ
    NoConstant,
    /// Δyₜ = α + γyₜ₋₁ + Σδᵢ·Δyₜ₋ᵢ + εₜ
    #[default]
    Constant,
    /// Δyₜ = α + βt + γyₜ₋₁ + Σδᵢ·Δyₜ₋ᵢ + εₜ
    ConstantTrend,
}

impl AdfRegression {
    fn deterministic_terms(self) -> usize {
        match self {
            Self::NoConstant => 0,
            Self::Constant => 1,
            Self::ConstantTrend => 2,
        }
    }
}

/// Confidence at which the unit root is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    /// 90 %, compared against the 10 % critical value.
    P90,
    /// 95 %, compared against the 5 % critical value.
    #[default]
    P95,
    /// 99 %, compared against the 1 % critical value.
    P99,
}

impl ConfidenceLevel {
    /// Parses a percentage (90, 95 or 99).
    pub fn from_percent(percent: u8) -> Result<Self> {
        match percent {
            90 => Ok(Self::P90),
            95 => Ok(Self::P95),
            99 => Ok(Self::P99),
            other => Err(RiskError::invalid(
                "confidence",
                format!("supported levels are 90, 95 and 99, got {other}"),
            )),
        }
    }

    /// Significance level α = 1 − confidence.
    pub fn significance(self) -> f64 {
        match self {
            Self::P90 => 0.10,
            Self::P95 => 0.05,
            Self::P99 => 0.01,
        }
    }

    /// Index into `[1 %, 5 %, 10 %]` critical values.
    fn critical_index(self) -> usize {
        match self {
            Self::P99 => 0,
            Self::P95 => 1,
            Self::P90 => 2,
        }
    }
}

/// Stationarity verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stationarity {
    /// Unit root rejected: demand reverts to a stable level.
    Stationary,
    /// Unit root not rejected: demand drifts.
    NonStationary,
}

/// Outcome of an ADF regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    /// t-ratio of γ̂.
    pub statistic: f64,
    /// MacKinnon (1994) approximate p-value.
    pub p_value: f64,
    /// Lagged differences included.
    pub n_lags: usize,
    /// Regression rows used.
    pub n_obs: usize,
    /// Critical values at 1 %, 5 %, 10 %.
    pub critical_values: [f64; 3],
    /// Deterministic terms used.
    pub regression: AdfRegression,
}

impl AdfResult {
    /// Whether H₀ is rejected at the given confidence.
    pub fn rejects_unit_root(&self, confidence: ConfidenceLevel) -> bool {
        self.statistic < self.critical_values[confidence.critical_index()]
    }
}

/// ADF result paired with a verdict at a chosen confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityReport {
    pub adf: AdfResult,
    pub confidence: ConfidenceLevel,
    /// Critical value the statistic was compared against.
    pub critical_value: f64,
    pub verdict: Stationarity,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// ADF test with a constant, AIC lag selection, and a verdict at
/// `confidence`.
///
/// # Errors
///
/// - `InvalidParameter` for non-finite observations.
/// - `InsufficientData` for fewer than [`MIN_OBSERVATIONS`] points or a
///   constant series.
///
/// # Examples
///
/// ```
/// use u_fulfillment::timeseries::{test_stationarity, ConfidenceLevel, Stationarity};
///
/// // Strongly mean-reverting demand around 20 orders per bucket
/// let mut y = vec![20.0_f64; 60];
/// for t in 1..60 {
///     let shock = [3.0, -2.0, 1.5, -4.0, 2.5, -1.0, 0.5][t % 7];
///     y[t] = 20.0 + 0.2 * (y[t - 1] - 20.0) + shock;
/// }
/// let report = test_stationarity(&y, ConfidenceLevel::P95).unwrap();
/// assert!(report.adf.statistic.is_finite());
/// assert_eq!(report.critical_value, report.adf.critical_values[1]);
/// ```
pub fn test_stationarity(series: &[f64], confidence: ConfidenceLevel) -> Result<StationarityReport> {
    let adf = adf_test(series, AdfRegression::Constant, None)?;
    let critical_value = adf.critical_values[confidence.critical_index()];
    let verdict = if adf.rejects_unit_root(confidence) {
        Stationarity::Stationary
    } else {
        Stationarity::NonStationary
    };
    debug!(
        statistic = adf.statistic,
        p_value = adf.p_value,
        lags = adf.n_lags,
        ?verdict,
        "ADF stationarity test"
    );
    Ok(StationarityReport {
        adf,
        confidence,
        critical_value,
        verdict,
    })
}

/// Augmented Dickey–Fuller test.
///
/// With `max_lags = None` the lag count is chosen by AIC up to the Schwert
/// bound; with `Some(p)` exactly `p` lags are used.
pub fn adf_test(data: &[f64], regression: AdfRegression, max_lags: Option<usize>) -> Result<AdfResult> {
    let n = data.len();
    if n < MIN_OBSERVATIONS {
        return Err(RiskError::insufficient(
            MIN_OBSERVATIONS,
            n,
            "ADF test needs at least 10 observations",
        ));
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(RiskError::invalid("series", "observations must be finite"));
    }
    if is_near_constant(data) {
        return Err(RiskError::insufficient(2, 1, "series is (near-)constant"));
    }

    let dy: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();
    let k_det = regression.deterministic_terms();

    let lags = match max_lags {
        Some(p) => p,
        None => {
            let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
            let cap = (n / 2).saturating_sub(k_det + 1);
            select_lag(data, &dy, regression, schwert.min(cap))
        }
    };

    let fit = fit_regression(data, &dy, regression, lags, lags).ok_or_else(|| {
        RiskError::insufficient(
            lags + k_det + 1 + MIN_ROWS,
            dy.len(),
            format!("too few rows for an ADF regression with {lags} lags"),
        )
    })?;

    Ok(AdfResult {
        statistic: fit.t_gamma,
        p_value: mackinnon_p_value(fit.t_gamma, regression),
        n_lags: lags,
        n_obs: fit.rows,
        critical_values: critical_values(regression, fit.rows),
        regression,
    })
}

// ---------------------------------------------------------------------------
// Regression
// ---------------------------------------------------------------------------

struct AdfFit {
    t_gamma: f64,
    rss: f64,
    rows: usize,
    cols: usize,
}

/// AIC-minimising lag on the common sample that starts after `p_max`.
fn select_lag(data: &[f64], dy: &[f64], regression: AdfRegression, p_max: usize) -> usize {
    let mut best = (f64::INFINITY, 0);
    for p in 0..=p_max {
        if let Some(fit) = fit_regression(data, dy, regression, p, p_max) {
            let m = fit.rows as f64;
            let aic = 2.0 * fit.cols as f64 + m * (fit.rss / m).ln();
            if aic < best.0 {
                best = (aic, p);
            }
        }
    }
    best.1
}

/// OLS of Δyₜ for t ∈ start..len(dy) on the deterministic terms, yₜ and
/// `p` lagged differences. Returns `None` for too few rows or a singular
/// design.
fn fit_regression(
    data: &[f64],
    dy: &[f64],
    regression: AdfRegression,
    p: usize,
    start: usize,
) -> Option<AdfFit> {
    let start = start.max(p);
    let k_det = regression.deterministic_terms();
    let cols = k_det + 1 + p;
    let rows = dy.len().checked_sub(start)?;
    if rows < MIN_ROWS || rows <= cols {
        return None;
    }

    let gamma_col = k_det;
    let x = DMatrix::from_fn(rows, cols, |r, c| {
        let t = start + r;
        match c {
            0 if k_det > 0 => 1.0,
            1 if k_det > 1 => (t + 1) as f64,
            c if c == gamma_col => data[t],
            c => dy[t - (c - gamma_col)],
        }
    });
    let y = DVector::from_column_slice(&dy[start..]);

    let xt = x.transpose();
    let xtx_inv = (&xt * &x).cholesky()?.inverse();
    let beta = &xtx_inv * (&xt * &y);
    let rss = (&y - &x * &beta).norm_squared();

    let mse = rss / (rows - cols) as f64;
    let var_gamma = mse * xtx_inv[(gamma_col, gamma_col)];
    if var_gamma.is_nan() || var_gamma <= 0.0 {
        return None;
    }
    Some(AdfFit {
        t_gamma: beta[gamma_col] / var_gamma.sqrt(),
        rss,
        rows,
        cols,
    })
}

// ---------------------------------------------------------------------------
// Distribution of the statistic
// ---------------------------------------------------------------------------

/// MacKinnon (2010) finite-sample critical values
/// cv(n) = τ∞ + τ₁/n + τ₂/n², ordered [1 %, 5 %, 10 %].
fn critical_values(regression: AdfRegression, n: usize) -> [f64; 3] {
    let (tau_inf, tau1, tau2): ([f64; 3], [f64; 3], [f64; 3]) = match regression {
        AdfRegression::NoConstant => (
            [-2.5658, -1.9393, -1.6156],
            [-1.960, -0.398, -0.181],
            [-10.04, 0.0, 0.0],
        ),
        AdfRegression::Constant => (
            [-3.4336, -2.8621, -2.5671],
            [-5.999, -2.738, -1.438],
            [-29.25, -8.36, -4.48],
        ),
        AdfRegression::ConstantTrend => (
            [-3.9638, -3.4126, -3.1279],
            [-8.353, -4.039, -2.418],
            [-47.44, -17.83, -7.58],
        ),
    };
    let inv_n = 1.0 / n as f64;
    std::array::from_fn(|i| tau_inf[i] + tau1[i] * inv_n + tau2[i] * inv_n * inv_n)
}

/// MacKinnon (1994) approximate asymptotic p-value of an ADF statistic.
///
/// p = Φ(Σ βᵢ τⁱ) with one polynomial below the switch point τ* and
/// another above it; clipped to 0 and 1 outside the tabulated range.
pub fn mackinnon_p_value(statistic: f64, regression: AdfRegression) -> f64 {
    let (small, large, star, min, max): ([f64; 3], [f64; 4], f64, f64, f64) = match regression {
        AdfRegression::NoConstant => (
            [0.6344, 1.2378, 0.032496],
            [0.4797, 0.93557, -0.06999, 0.033066],
            -1.04,
            -19.04,
            f64::INFINITY,
        ),
        AdfRegression::Constant => (
            [2.1659, 1.4412, 0.038269],
            [1.7339, 0.93202, -0.12745, -0.010368],
            -1.61,
            -18.83,
            2.74,
        ),
        AdfRegression::ConstantTrend => (
            [3.2512, 1.6047, 0.049588],
            [2.5261, 0.61654, -0.37956, -0.060285],
            -2.89,
            -16.18,
            0.7,
        ),
    };
    if statistic > max {
        return 1.0;
    }
    if statistic < min {
        return 0.0;
    }
    let coefs = if statistic <= star { &small[..] } else { &large[..] };
    let poly = coefs.iter().rev().fold(0.0, |acc, &b| acc * statistic + b);
    special::standard_normal_cdf(poly)
}
