//! Pure reporting projections over a read-only snapshot of the workflow.
//! Nothing in here mutates state; a stale snapshot yields a stale but
//! internally consistent report.

pub mod projections;
pub mod views;

pub use projections::{funnel, reject_reasons, sla, volume};
pub use views::{
    Bucket, FunnelReport, RejectReasonCount, ReportSnapshot, SlaMetric, SlaPoint, VolumePoint,
};
