//! Demand counts on a regular calendar grid.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;
use u_numflow::stats;

use super::autocorr::{autocorrelation, Autocorrelation};
use super::decompose::{decompose, Decomposition};
use super::stationarity::{test_stationarity, ConfidenceLevel, StationarityReport};
use crate::error::{Result, RiskError};

const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;
/// 1970-01-05, the first Monday after the Unix epoch.
const FIRST_MONDAY: i64 = 4 * SECONDS_PER_DAY;

/// Spread, relative to the largest magnitude, at or below which a series
/// is indistinguishable from a constant carrying round-off.
const NEAR_CONSTANT_TOL: f64 = 1e-10;

/// True when the sample standard deviation is negligible against the
/// magnitude of the values. Empty and single-point series count as constant.
pub(crate) fn is_near_constant(data: &[f64]) -> bool {
    let scale = data.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    stats::std_dev(data).map_or(true, |sd| sd <= NEAR_CONSTANT_TOL * scale)
}

/// Width of one demand bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BucketWidth {
    /// Calendar hours.
    #[default]
    Hour,
    /// Calendar days (midnight to midnight).
    Day,
    /// Calendar weeks starting Monday 00:00.
    Week,
}

impl BucketWidth {
    /// Bucket length in seconds.
    pub fn seconds(self) -> i64 {
        match self {
            Self::Hour => SECONDS_PER_HOUR,
            Self::Day => SECONDS_PER_DAY,
            Self::Week => SECONDS_PER_WEEK,
        }
    }

    /// Natural seasonal period: a day of hours, a week of days, roughly a
    /// month of weeks.
    pub fn default_period(self) -> usize {
        match self {
            Self::Hour => 24,
            Self::Day => 7,
            Self::Week => 4,
        }
    }

    /// Start (Unix seconds) of the bucket containing `secs`.
    fn floor(self, secs: i64) -> i64 {
        match self {
            Self::Week => {
                (secs - FIRST_MONDAY).div_euclid(SECONDS_PER_WEEK) * SECONDS_PER_WEEK
                    + FIRST_MONDAY
            }
            _ => secs.div_euclid(self.seconds()) * self.seconds(),
        }
    }
}

/// Order counts per bucket with a declared seasonal period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandSeries {
    counts: Vec<u64>,
    bucket: BucketWidth,
    period: usize,
    start: Option<NaiveDateTime>,
}

fn check_period(period: usize) -> Result<()> {
    if period < 2 {
        return Err(RiskError::invalid(
            "period",
            format!("seasonal period must be >= 2, got {period}"),
        ));
    }
    Ok(())
}

impl DemandSeries {
    /// Wraps pre-bucketed counts.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `period < 2`.
    pub fn new(counts: Vec<u64>, bucket: BucketWidth, period: usize) -> Result<Self> {
        check_period(period)?;
        Ok(Self {
            counts,
            bucket,
            period,
            start: None,
        })
    }

    /// Buckets purchase timestamps over a trailing window.
    ///
    /// Only timestamps at or after `latest − window_days` are kept. Buckets
    /// run from the one holding the earliest kept timestamp to the one
    /// holding the latest; empty buckets count 0. The period defaults to
    /// [`BucketWidth::default_period`].
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use u_fulfillment::timeseries::{BucketWidth, DemandSeries};
    ///
    /// let day = NaiveDate::from_ymd_opt(2018, 3, 5).unwrap();
    /// let stamps = [
    ///     day.and_hms_opt(9, 15, 0).unwrap(),
    ///     day.and_hms_opt(9, 45, 0).unwrap(),
    ///     day.and_hms_opt(12, 5, 0).unwrap(),
    /// ];
    /// let series = DemandSeries::from_timestamps(&stamps, BucketWidth::Hour, 7).unwrap();
    /// assert_eq!(series.counts(), &[2, 0, 0, 1]);
    /// ```
    pub fn from_timestamps(
        timestamps: &[NaiveDateTime],
        bucket: BucketWidth,
        window_days: u32,
    ) -> Result<Self> {
        if window_days == 0 {
            return Err(RiskError::invalid(
                "window_days",
                "analysis window must cover at least one day",
            ));
        }
        let Some(latest) = timestamps.iter().map(|t| t.and_utc().timestamp()).max() else {
            return Err(RiskError::insufficient(1, 0, "no timestamps to bucket"));
        };
        let cutoff = latest - i64::from(window_days) * SECONDS_PER_DAY;
        let kept: Vec<i64> = timestamps
            .iter()
            .map(|t| t.and_utc().timestamp())
            .filter(|&s| s >= cutoff)
            .collect();

        let width = bucket.seconds();
        let first = kept.iter().map(|&s| bucket.floor(s)).min().unwrap_or(latest);
        let last = bucket.floor(latest);
        let n_buckets = ((last - first) / width) as usize + 1;

        let mut counts = vec![0_u64; n_buckets];
        for s in kept {
            counts[((bucket.floor(s) - first) / width) as usize] += 1;
        }

        debug!(
            ?bucket,
            window_days,
            n_buckets,
            n_orders = timestamps.len(),
            "bucketed demand"
        );

        Ok(Self {
            counts,
            bucket,
            period: bucket.default_period(),
            start: chrono::DateTime::from_timestamp(first, 0).map(|d| d.naive_utc()),
        })
    }

    /// Replaces the seasonal period.
    pub fn with_period(mut self, period: usize) -> Result<Self> {
        check_period(period)?;
        self.period = period;
        Ok(self)
    }

    /// Raw counts.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Counts as floating point.
    pub fn values(&self) -> Vec<f64> {
        self.counts.iter().map(|&c| c as f64).collect()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn bucket(&self) -> BucketWidth {
        self.bucket
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Start of the first bucket, when built from timestamps.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.start
    }

    /// ADF stationarity test on the counts.
    pub fn stationarity(&self, confidence: ConfidenceLevel) -> Result<StationarityReport> {
        test_stationarity(&self.values(), confidence)
    }

    /// Additive decomposition with the declared period.
    pub fn decompose(&self) -> Result<Decomposition> {
        decompose(&self.values(), self.period)
    }

    /// Sample ACF up to `max_lag`.
    pub fn autocorrelation(&self, max_lag: usize) -> Result<Autocorrelation> {
        autocorrelation(&self.values(), max_lag)
    }
}

/// Flat staffing baseline: mean demand per bucket, applied to every
/// bucket regardless of cycles.
pub fn naive_staffing_level(series: &[f64]) -> Result<f64> {
    u_numflow::stats::mean(series)
        .ok_or_else(|| RiskError::insufficient(1, series.len(), "empty demand series"))
}
