use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::catalog::RefItem;
use crate::workflows::issuance::domain::{Application, ApplicationStatus, Card, CardId};

use super::views::{
    Bucket, FunnelReport, RejectReasonCount, ReportSnapshot, SlaMetric, SlaPoint, VolumePoint,
};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Which milestones one application has reached. Card-derived milestones
/// follow the linked card's timestamps, not its current status, so a closed
/// card still counts the stages it passed through.
#[derive(Debug, Clone, Copy, Default)]
struct Milestones {
    approved: bool,
    rejected: bool,
    issued: bool,
    handed: bool,
    activated: bool,
}

fn milestones(application: &Application, cards: &BTreeMap<&CardId, &Card>) -> Milestones {
    let card = application.card_id.as_ref().and_then(|id| cards.get(id));
    Milestones {
        approved: matches!(
            application.status,
            ApplicationStatus::Approved | ApplicationStatus::InBatch
        ),
        rejected: application.status == ApplicationStatus::Rejected,
        issued: card.map(|c| c.issued_at.is_some()).unwrap_or(false),
        handed: card.map(|c| c.handed_at.is_some()).unwrap_or(false),
        activated: card.map(|c| c.activated_at.is_some()).unwrap_or(false),
    }
}

fn card_index(snapshot: &ReportSnapshot) -> BTreeMap<&CardId, &Card> {
    snapshot.cards.iter().map(|card| (&card.id, card)).collect()
}

/// Counts of applications by milestone reached.
pub fn funnel(snapshot: &ReportSnapshot) -> FunnelReport {
    let cards = card_index(snapshot);
    let mut report = FunnelReport::default();
    for application in &snapshot.applications {
        let m = milestones(application, &cards);
        report.total += 1;
        report.approved += m.approved as usize;
        report.rejected += m.rejected as usize;
        report.issued += m.issued as usize;
        report.handed += m.handed as usize;
        report.activated += m.activated as usize;
    }
    report
}

/// Applications grouped by truncation of `requested_at`, one point per
/// non-empty bucket, chronological.
pub fn volume(snapshot: &ReportSnapshot, bucket: Bucket) -> Vec<VolumePoint> {
    let cards = card_index(snapshot);
    let mut groups: BTreeMap<NaiveDate, FunnelReport> = BTreeMap::new();

    for application in &snapshot.applications {
        let key = bucket.truncate(application.requested_at.date_naive());
        let entry = groups.entry(key).or_default();
        let m = milestones(application, &cards);
        entry.total += 1;
        entry.approved += m.approved as usize;
        entry.rejected += m.rejected as usize;
        entry.issued += m.issued as usize;
        entry.handed += m.handed as usize;
        entry.activated += m.activated as usize;
    }

    groups
        .into_iter()
        .map(|(key, counts)| VolumePoint {
            bucket: bucket.label(key),
            total: counts.total,
            approved: counts.approved,
            rejected: counts.rejected,
            issued: counts.issued,
            handed: counts.handed,
            activated: counts.activated,
        })
        .collect()
}

/// Per-bucket elapsed-day statistics between lifecycle timestamp pairs.
/// Samples require both endpoints; empty metrics report count 0 with no
/// averages.
pub fn sla(snapshot: &ReportSnapshot, bucket: Bucket) -> Vec<SlaPoint> {
    let cards = card_index(snapshot);

    #[derive(Default)]
    struct Samples {
        submit_to_decision: Vec<f64>,
        decision_to_issue: Vec<f64>,
        issue_to_delivery: Vec<f64>,
        submit_to_activation: Vec<f64>,
    }

    let mut groups: BTreeMap<NaiveDate, Samples> = BTreeMap::new();

    for application in &snapshot.applications {
        let key = bucket.truncate(application.requested_at.date_naive());
        let samples = groups.entry(key).or_default();
        let card = application.card_id.as_ref().and_then(|id| cards.get(id));

        if let Some(decision_at) = application.decision_at {
            samples
                .submit_to_decision
                .push(elapsed_days(application.requested_at, decision_at));

            if let Some(issued_at) = card.and_then(|c| c.issued_at) {
                samples
                    .decision_to_issue
                    .push(elapsed_days(decision_at, issued_at));
            }
        }
        if let Some(card) = card {
            if let (Some(issued_at), Some(delivered_at)) = (card.issued_at, card.delivered_at) {
                samples
                    .issue_to_delivery
                    .push(elapsed_days(issued_at, delivered_at));
            }
            if let Some(activated_at) = card.activated_at {
                samples
                    .submit_to_activation
                    .push(elapsed_days(application.requested_at, activated_at));
            }
        }
    }

    groups
        .into_iter()
        .map(|(key, samples)| SlaPoint {
            bucket: bucket.label(key),
            submit_to_decision: metric(samples.submit_to_decision),
            decision_to_issue: metric(samples.decision_to_issue),
            issue_to_delivery: metric(samples.issue_to_delivery),
            submit_to_activation: metric(samples.submit_to_activation),
        })
        .collect()
}

/// Histogram of rejected applications by reason, most frequent first.
pub fn reject_reasons(snapshot: &ReportSnapshot, reasons: &[RefItem]) -> Vec<RejectReasonCount> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for application in &snapshot.applications {
        if application.status != ApplicationStatus::Rejected {
            continue;
        }
        if let Some(reason_id) = application.reject_reason_id {
            *counts.entry(reason_id).or_default() += 1;
        }
    }

    let mut rows: Vec<RejectReasonCount> = counts
        .into_iter()
        .map(|(reason_id, count)| {
            let reason = reasons.iter().find(|r| r.id == reason_id);
            RejectReasonCount {
                reject_reason_id: reason_id,
                code: reason.map(|r| r.code.clone()).unwrap_or_default(),
                name: reason
                    .map(|r| r.name.clone())
                    .unwrap_or_else(|| format!("reason #{reason_id}")),
                count,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.count.cmp(&a.count).then(a.reject_reason_id.cmp(&b.reject_reason_id)));
    rows
}

fn elapsed_days(from: chrono::DateTime<chrono::Utc>, to: chrono::DateTime<chrono::Utc>) -> f64 {
    (to - from).num_seconds() as f64 / SECONDS_PER_DAY
}

fn metric(mut samples: Vec<f64>) -> SlaMetric {
    if samples.is_empty() {
        return SlaMetric::default();
    }
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let count = samples.len();
    let avg = samples.iter().sum::<f64>() / count as f64;
    let rank = ((count as f64 * 0.9).ceil() as usize).max(1) - 1;
    SlaMetric {
        count,
        avg_days: Some(avg),
        p90_days: Some(samples[rank]),
    }
}
