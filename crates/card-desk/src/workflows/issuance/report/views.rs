use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::workflows::issuance::domain::{Application, Card};

/// Time-truncation granularity for grouped reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    #[default]
    Day,
    Week,
    Month,
}

impl Bucket {
    /// First day of the bucket containing `date`; the grouping key.
    pub fn truncate(self, date: NaiveDate) -> NaiveDate {
        match self {
            Bucket::Day => date,
            Bucket::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            Bucket::Month => date.with_day(1).unwrap_or(date),
        }
    }

    /// Display label for a truncated bucket key.
    pub fn label(self, key: NaiveDate) -> String {
        match self {
            Bucket::Day => key.format("%Y-%m-%d").to_string(),
            Bucket::Week => {
                let week = key.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Bucket::Month => key.format("%Y-%m").to_string(),
        }
    }
}

/// Read-only inputs the projections consume.
#[derive(Debug, Clone, Default)]
pub struct ReportSnapshot {
    pub applications: Vec<Application>,
    pub cards: Vec<Card>,
}

/// Application counts by milestone reached. Each application contributes at
/// most one unit per milestone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FunnelReport {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub issued: usize,
    pub handed: usize,
    pub activated: usize,
}

/// Milestone counts for one time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumePoint {
    pub bucket: String,
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub issued: usize,
    pub handed: usize,
    pub activated: usize,
}

/// Elapsed-time statistic over the samples present in one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SlaMetric {
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_days: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p90_days: Option<f64>,
}

/// SLA statistics for one time bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaPoint {
    pub bucket: String,
    pub submit_to_decision: SlaMetric,
    pub decision_to_issue: SlaMetric,
    pub issue_to_delivery: SlaMetric,
    pub submit_to_activation: SlaMetric,
}

/// One row of the rejection histogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectReasonCount {
    pub reject_reason_id: u32,
    pub code: String,
    pub name: String,
    pub count: usize,
}
