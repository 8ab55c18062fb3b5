use crate::infra::{default_catalog, InMemoryIssuanceStore};
use card_desk::catalog::CatalogSnapshot;
use card_desk::error::AppError;
use card_desk::workflows::issuance::{
    funnel, reject_reasons, sla, volume, ApplicationId, BatchStatus, Bucket, CardEvent,
    CardEventRequest, Client, Decision, DecisionRequest, IssuanceError, IssuanceService,
    IssuanceStore, NewApplication, NewBatch, NewClient, SlaMetric,
};
use chrono::{Duration, Local};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Grouping for the volume and SLA sections: day, week, or month.
    #[arg(long, default_value = "month", value_parser = parse_bucket)]
    pub(crate) bucket: Option<Bucket>,
}

pub(crate) fn parse_bucket(raw: &str) -> Result<Bucket, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "day" => Ok(Bucket::Day),
        "week" => Ok(Bucket::Week),
        "month" => Ok(Bucket::Month),
        other => Err(format!("unknown bucket '{other}', expected day, week, or month")),
    }
}

fn bucket_name(bucket: Bucket) -> &'static str {
    match bucket {
        Bucket::Day => "day",
        Bucket::Week => "week",
        Bucket::Month => "month",
    }
}

/// Seed a handful of clients and drive their applications through the full
/// lifecycle: submit, review, decide, batch, issue, and card events.
pub(crate) fn seed_demo_data<S>(
    service: &IssuanceService<S>,
    catalog: &CatalogSnapshot,
) -> Result<(), IssuanceError>
where
    S: IssuanceStore + 'static,
{
    let clients = seed_clients(service)?;

    let mut submitted: Vec<ApplicationId> = Vec::new();
    for (index, client) in clients.iter().enumerate() {
        let slot = (index % 3) as u32 + 1;
        let application = service.submit(
            catalog,
            NewApplication {
                client_id: Some(client.id.0.clone()),
                product_id: Some(slot),
                tariff_id: Some(slot),
                channel_id: Some(slot),
                branch_id: Some(slot),
                delivery_method_id: Some((index % 2) as u32 + 1),
                embossing_name: Some(client.full_name.to_uppercase()),
                ..NewApplication::default()
            },
        )?;
        submitted.push(application.id);
    }

    // Three approvals, two rejections, one left in review.
    let mut approved: Vec<ApplicationId> = Vec::new();
    for id in &submitted[..3] {
        service.start_review(id)?;
        service.decide(catalog, id, approval(82))?;
        approved.push(id.clone());
    }
    service.start_review(&submitted[3])?;
    service.decide(catalog, &submitted[3], rejection(1))?;
    service.decide(catalog, &submitted[4], rejection(3))?;
    service.start_review(&submitted[5])?;

    let batch = service.create_batch(
        catalog,
        NewBatch {
            vendor_id: Some(1),
            planned_send_at: Some(Local::now().date_naive() + Duration::days(3)),
        },
    )?;
    service.add_items(&batch.id, &approved)?;
    service.set_batch_status(&batch.id, BatchStatus::Sent)?;
    service.set_batch_status(&batch.id, BatchStatus::Received)?;
    service.issue_cards(&batch.id)?;

    // First card reaches activation, second stops at delivery, third stays
    // issued.
    advance_card(service, &approved[0], &[CardEvent::Delivered, CardEvent::Handed, CardEvent::Activated])?;
    advance_card(service, &approved[1], &[CardEvent::Delivered])?;

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let bucket = args.bucket.unwrap_or_default();

    let store = Arc::new(InMemoryIssuanceStore::default());
    let service = IssuanceService::new(store);
    let catalog = default_catalog();

    seed_demo_data(&service, &catalog)?;
    let snapshot = service.snapshot()?;

    println!("Card issuance demo");

    let totals = funnel(&snapshot);
    println!("\nFunnel");
    println!(
        "- {} applications | {} approved | {} rejected",
        totals.total, totals.approved, totals.rejected
    );
    println!(
        "- {} cards issued | {} handed | {} activated",
        totals.issued, totals.handed, totals.activated
    );

    println!("\nVolume by {}", bucket_name(bucket));
    for point in volume(&snapshot, bucket) {
        println!(
            "- {}: {} submitted | {} approved | {} issued | {} activated",
            point.bucket, point.total, point.approved, point.issued, point.activated
        );
    }

    println!("\nSLA by {}", bucket_name(bucket));
    for point in sla(&snapshot, bucket) {
        println!("- {}:", point.bucket);
        println!(
            "    submit to decision   {}",
            metric_line(&point.submit_to_decision)
        );
        println!(
            "    decision to issue    {}",
            metric_line(&point.decision_to_issue)
        );
        println!(
            "    issue to delivery    {}",
            metric_line(&point.issue_to_delivery)
        );
        println!(
            "    submit to activation {}",
            metric_line(&point.submit_to_activation)
        );
    }

    println!("\nReject reasons");
    let rows = reject_reasons(&snapshot, &catalog.reject_reasons);
    if rows.is_empty() {
        println!("- none");
    }
    for row in rows {
        println!("- {} ({}): {}", row.name, row.code, row.count);
    }

    Ok(())
}

fn seed_clients<S>(service: &IssuanceService<S>) -> Result<Vec<Client>, IssuanceError>
where
    S: IssuanceStore + 'static,
{
    let profiles = [
        ("Ava Thompson", "+1-555-0101", "ID-550101"),
        ("Liam Carter", "+1-555-0102", "ID-550102"),
        ("Maya Patel", "+1-555-0103", "ID-550103"),
        ("Noah Kim", "+1-555-0104", "ID-550104"),
        ("Olivia Reyes", "+1-555-0105", "ID-550105"),
        ("Ethan Walker", "+1-555-0106", "ID-550106"),
    ];

    profiles
        .iter()
        .map(|(full_name, phone, doc_number)| {
            service.create_client(NewClient {
                full_name: Some((*full_name).to_string()),
                phone: Some((*phone).to_string()),
                doc_number: Some((*doc_number).to_string()),
                segment: Some("retail".to_string()),
                ..NewClient::default()
            })
        })
        .collect()
}

fn approval(kyc_score: u16) -> DecisionRequest {
    DecisionRequest {
        decision: Decision::Approve,
        reject_reason_id: None,
        planned_issue_date: None,
        kyc_score: Some(kyc_score),
        kyc_result: Some("pass".to_string()),
        decided_by: Some("demo".to_string()),
    }
}

fn rejection(reject_reason_id: u32) -> DecisionRequest {
    DecisionRequest {
        decision: Decision::Reject,
        reject_reason_id: Some(reject_reason_id),
        planned_issue_date: None,
        kyc_score: None,
        kyc_result: Some("fail".to_string()),
        decided_by: Some("demo".to_string()),
    }
}

fn advance_card<S>(
    service: &IssuanceService<S>,
    application_id: &ApplicationId,
    events: &[CardEvent],
) -> Result<(), IssuanceError>
where
    S: IssuanceStore + 'static,
{
    let application = service.get_application(application_id)?;
    let card_id = match application.card_id {
        Some(card_id) => card_id,
        None => return Ok(()),
    };
    for event in events {
        service.apply_card_event(&card_id, CardEventRequest { event: *event })?;
    }
    Ok(())
}

fn metric_line(metric: &SlaMetric) -> String {
    match (metric.avg_days, metric.p90_days) {
        (Some(avg), Some(p90)) => format!(
            "{} samples | avg {avg:.1}d | p90 {p90:.1}d",
            metric.count
        ),
        _ => "no samples".to_string(),
    }
}
