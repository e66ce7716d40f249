//! Historical order log: the read-only input the risk components consume.
//!
//! One row per order with columns
//! `order_id, order_purchase_timestamp, inter_arrival_time, service_time,
//! cost_of_delay_risk, is_defective`. Timestamps are `YYYY-MM-DD HH:MM:SS`
//! (a `T` separator is also accepted). Service times are in days.
//!
//! The `is_defective` column is a synthetic label drawn at a fixed 5 % rate
//! during ingestion. It is not an observed quality signal and should not be
//! treated as ground truth.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::error::{Result, RiskError};
use crate::timeseries::{BucketWidth, DemandSeries};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn parse_timestamp<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp `{trimmed}`")))
}

/// One historical fulfilment event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    #[serde(deserialize_with = "parse_timestamp")]
    pub order_purchase_timestamp: NaiveDateTime,
    /// Minutes since the previous order; empty for the first row.
    pub inter_arrival_time: Option<f64>,
    /// Days from purchase to carrier hand-off.
    pub service_time: Option<f64>,
    /// Order value in dollars.
    pub cost_of_delay_risk: f64,
    /// Synthetic 0/1 defect label.
    pub is_defective: u8,
}

impl OrderRecord {
    pub fn is_defective(&self) -> bool {
        self.is_defective != 0
    }

    fn has_valid_service_time(&self) -> bool {
        self.service_time.is_some_and(|t| t.is_finite() && t > 0.0)
    }
}

/// Loaded, filtered order records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderLog {
    records: Vec<OrderRecord>,
}

impl OrderLog {
    /// Reads CSV with a header row.
    ///
    /// Rows whose service time is missing, non-finite or ≤ 0 are dropped.
    ///
    /// # Errors
    ///
    /// `Data` for unreadable input or a row that does not parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_fulfillment::dataset::OrderLog;
    ///
    /// let csv = "\
    /// order_id,order_purchase_timestamp,inter_arrival_time,service_time,cost_of_delay_risk,is_defective
    /// a1,2018-01-01 10:00:00,,2.5,59.9,0
    /// a2,2018-01-01 10:30:00,30.0,-0.2,12.0,0
    /// a3,2018-01-01 11:00:00,30.0,4.0,120.0,1
    /// ";
    /// let log = OrderLog::from_reader(csv.as_bytes()).unwrap();
    /// assert_eq!(log.len(), 2);
    /// assert_eq!(log.service_times(), vec![2.5, 4.0]);
    /// ```
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        let mut dropped = 0usize;
        for (row_idx, row) in rdr.deserialize::<OrderRecord>().enumerate() {
            let record = row.map_err(|e| RiskError::Data(format!("row {}: {e}", row_idx + 2)))?;
            if record.has_valid_service_time() {
                records.push(record);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "dropped orders without a positive service time");
        }
        info!(orders = records.len(), "loaded order log");
        Ok(Self { records })
    }

    /// Reads a CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_records(records: Vec<OrderRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .filter(OrderRecord::has_valid_service_time)
                .collect(),
        }
    }

    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Service times in days, all finite and positive.
    pub fn service_times(&self) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.service_time).collect()
    }

    /// Order values in dollars.
    pub fn order_values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.cost_of_delay_risk).collect()
    }

    /// Share of orders carrying the (synthetic) defect label.
    pub fn defect_rate(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let defects = self.records.iter().filter(|r| r.is_defective()).count();
        Some(defects as f64 / self.records.len() as f64)
    }

    pub fn purchase_timestamps(&self) -> Vec<NaiveDateTime> {
        self.records.iter().map(|r| r.order_purchase_timestamp).collect()
    }

    /// Order counts per bucket over the trailing `window_days`.
    pub fn demand_series(
        &self,
        bucket: BucketWidth,
        window_days: u32,
        period: usize,
    ) -> Result<DemandSeries> {
        DemandSeries::from_timestamps(&self.purchase_timestamps(), bucket, window_days)?
            .with_period(period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str =
        "order_id,order_purchase_timestamp,inter_arrival_time,service_time,cost_of_delay_risk,is_defective";

    fn sample_log() -> String {
        [
            HEADER,
            "o1,2018-03-01 08:10:00,,3.2,40.0,0",
            "o2,2018-03-01 09:05:00,55.0,1.1,15.5,1",
            "o3,2018-03-02 14:00:00,1735.0,0.0,99.0,0",
            "o4,2018-03-03T08:00:00,1080.0,6.8,250.0,0",
            "o5,2018-03-03 09:00:00,60.0,,10.0,0",
        ]
        .join("\n")
    }

    #[test]
    fn drops_non_positive_and_missing_service_times() {
        let log = OrderLog::from_reader(sample_log().as_bytes()).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log.service_times(), vec![3.2, 1.1, 6.8]);
        assert_eq!(log.order_values(), vec![40.0, 15.5, 250.0]);
        assert_eq!(log.records()[0].inter_arrival_time, None);
    }

    #[test]
    fn defect_rate_counts_flags() {
        let log = OrderLog::from_reader(sample_log().as_bytes()).unwrap();
        let rate = log.defect_rate().unwrap();
        assert!((rate - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(OrderLog::default().defect_rate(), None);
    }

    #[test]
    fn daily_demand_from_log() {
        let log = OrderLog::from_reader(sample_log().as_bytes()).unwrap();
        let series = log.demand_series(BucketWidth::Day, 14, 2).unwrap();
        assert_eq!(series.counts(), &[2, 0, 1]);
        assert_eq!(series.period(), 2);
    }

    #[test]
    fn reads_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", sample_log()).unwrap();
        let log = OrderLog::from_path(file.path()).unwrap();
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn malformed_rows_are_data_errors() {
        let bad = format!("{HEADER}\no1,yesterday,,1.0,10.0,0");
        assert!(matches!(
            OrderLog::from_reader(bad.as_bytes()),
            Err(RiskError::Data(_))
        ));
        assert!(matches!(
            OrderLog::from_path("no/such/orders.csv"),
            Err(RiskError::Data(_))
        ));
    }
}
