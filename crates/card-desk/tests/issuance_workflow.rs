use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use card_desk::catalog::{
    Branch, CatalogSnapshot, Channel, DeliveryMethod, Product, RefItem, Tariff, Vendor, VendorType,
};
use card_desk::workflows::issuance::{
    funnel, reject_reasons, sla, volume, Application, ApplicationId, ApplicationStatus, Batch,
    BatchId, BatchStatus, Bucket, Card, CardEvent, CardEventRequest, CardId, CardStatus, Client,
    ClientId, Decision, DecisionRequest, IssuanceService, IssuanceStore, NewApplication, NewBatch,
    NewClient, RepositoryError,
};

#[derive(Default)]
struct HashMapStore {
    clients: Mutex<HashMap<String, Client>>,
    applications: Mutex<HashMap<String, Application>>,
    batches: Mutex<HashMap<String, Batch>>,
    cards: Mutex<HashMap<String, Card>>,
}

macro_rules! store_entity {
    ($insert:ident, $update:ident, $fetch:ident, $list:ident, $field:ident, $ty:ty, $id:ty) => {
        fn $insert(&self, value: $ty) -> Result<$ty, RepositoryError> {
            let mut guard = self.$field.lock().expect("mutex poisoned");
            if guard.contains_key(&value.id.0) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(value.id.0.clone(), value.clone());
            Ok(value)
        }

        fn $update(&self, value: $ty) -> Result<(), RepositoryError> {
            let mut guard = self.$field.lock().expect("mutex poisoned");
            if !guard.contains_key(&value.id.0) {
                return Err(RepositoryError::NotFound);
            }
            guard.insert(value.id.0.clone(), value);
            Ok(())
        }

        fn $fetch(&self, id: &$id) -> Result<Option<$ty>, RepositoryError> {
            Ok(self
                .$field
                .lock()
                .expect("mutex poisoned")
                .get(&id.0)
                .cloned())
        }

        fn $list(&self) -> Result<Vec<$ty>, RepositoryError> {
            Ok(self
                .$field
                .lock()
                .expect("mutex poisoned")
                .values()
                .cloned()
                .collect())
        }
    };
}

impl IssuanceStore for HashMapStore {
    store_entity!(
        insert_client,
        update_client,
        fetch_client,
        list_clients,
        clients,
        Client,
        ClientId
    );
    store_entity!(
        insert_application,
        update_application,
        fetch_application,
        list_applications,
        applications,
        Application,
        ApplicationId
    );
    store_entity!(
        insert_batch,
        update_batch,
        fetch_batch,
        list_batches,
        batches,
        Batch,
        BatchId
    );
    store_entity!(
        insert_card,
        update_card,
        fetch_card,
        list_cards,
        cards,
        Card,
        CardId
    );
}

fn catalog() -> CatalogSnapshot {
    CatalogSnapshot {
        branches: vec![Branch {
            id: 1,
            code: "HQ".to_string(),
            name: "Head Office".to_string(),
            city: "Springfield".to_string(),
            active: true,
        }],
        channels: vec![Channel {
            id: 1,
            code: "ONLINE".to_string(),
            name: "Online".to_string(),
            active: true,
        }],
        delivery_methods: vec![DeliveryMethod {
            id: 1,
            code: "PICKUP".to_string(),
            name: "Branch pickup".to_string(),
            base_cost: 0.0,
            sla_days: 1,
            active: true,
        }],
        vendors: vec![Vendor {
            id: 1,
            code: "EMB".to_string(),
            name: "Embosser One".to_string(),
            vendor_type: VendorType::Embossing,
            sla_days: 5,
            active: true,
        }],
        products: vec![Product {
            id: 1,
            code: "DEBIT".to_string(),
            name: "Debit Classic".to_string(),
            currency: "USD".to_string(),
            term_months: 48,
            active: true,
        }],
        tariffs: vec![Tariff {
            id: 1,
            code: "STD".to_string(),
            name: "Standard".to_string(),
            product_id: 1,
            issue_fee: 10.0,
            monthly_fee: 1.5,
            annual_fee: 0.0,
            active: true,
        }],
        reject_reasons: vec![RefItem {
            id: 3,
            code: "DOCS".to_string(),
            name: "Incomplete documents".to_string(),
            active: true,
        }],
    }
}

fn new_client(name: &str) -> NewClient {
    NewClient {
        full_name: Some(name.to_string()),
        phone: Some("+1-555-0100".to_string()),
        doc_number: Some("AB1234567".to_string()),
        ..NewClient::default()
    }
}

fn submission(client: &Client) -> NewApplication {
    NewApplication {
        client_id: Some(client.id.0.clone()),
        product_id: Some(1),
        tariff_id: Some(1),
        channel_id: Some(1),
        branch_id: Some(1),
        delivery_method_id: Some(1),
        ..NewApplication::default()
    }
}

fn approve() -> DecisionRequest {
    DecisionRequest {
        decision: Decision::Approve,
        reject_reason_id: None,
        planned_issue_date: None,
        kyc_score: Some(91),
        kyc_result: Some("pass".to_string()),
        decided_by: Some("reviewer".to_string()),
    }
}

fn reject(reason: u32) -> DecisionRequest {
    DecisionRequest {
        decision: Decision::Reject,
        reject_reason_id: Some(reason),
        planned_issue_date: None,
        kyc_score: None,
        kyc_result: None,
        decided_by: None,
    }
}

#[test]
fn full_lifecycle_from_submission_to_activation() {
    let service = IssuanceService::new(Arc::new(HashMapStore::default()));
    let catalog = catalog();

    let client = service
        .create_client(new_client("Jordan Smith"))
        .expect("client created");

    // two approvals and one rejection
    let first = service
        .submit(&catalog, submission(&client))
        .expect("submitted");
    let second = service
        .submit(&catalog, submission(&client))
        .expect("submitted");
    let third = service
        .submit(&catalog, submission(&client))
        .expect("submitted");

    let first = service
        .decide(&catalog, &first.id, approve())
        .expect("approved");
    let second = service
        .decide(&catalog, &second.id, approve())
        .expect("approved");
    service
        .decide(&catalog, &third.id, reject(3))
        .expect("rejected");

    // batch the approvals and walk the vendor roundtrip
    let batch = service
        .create_batch(
            &catalog,
            NewBatch {
                vendor_id: Some(1),
                planned_send_at: None,
            },
        )
        .expect("batch created");
    service
        .add_items(&batch.id, &[first.id.clone(), second.id.clone()])
        .expect("items added");
    service
        .set_batch_status(&batch.id, BatchStatus::Sent)
        .expect("sent");
    service
        .set_batch_status(&batch.id, BatchStatus::Received)
        .expect("received");

    let outcome = service.issue_cards(&batch.id).expect("cards issued");
    assert_eq!(outcome.created, 2);
    assert_eq!(outcome.issued, 2);

    // drive one card to activation
    let first = service.get_application(&first.id).expect("present");
    assert_eq!(first.status, ApplicationStatus::InBatch);
    let card_id = first.card_id.clone().expect("card linked");

    for event in [CardEvent::Delivered, CardEvent::Handed, CardEvent::Activated] {
        service
            .apply_card_event(&card_id, CardEventRequest { event })
            .expect("card advances");
    }
    let card = service.get_card(&card_id).expect("present");
    assert_eq!(card.status, CardStatus::Activated);
    assert!(card.issued_at.expect("issued") <= card.activated_at.expect("activated"));

    // projections over the final state
    let snapshot = service.snapshot().expect("snapshot");
    let report = funnel(&snapshot);
    assert_eq!(report.total, 3);
    assert_eq!(report.approved, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.issued, 2);
    assert_eq!(report.activated, 1);

    let points = volume(&snapshot, Bucket::Day);
    assert_eq!(points.len(), 1, "everything happened today");
    assert_eq!(points[0].total, 3);

    let sla_points = sla(&snapshot, Bucket::Month);
    assert_eq!(sla_points.len(), 1);
    assert_eq!(sla_points[0].submit_to_decision.count, 3);
    assert_eq!(sla_points[0].submit_to_activation.count, 1);

    let histogram = reject_reasons(&snapshot, &catalog.reject_reasons);
    assert_eq!(histogram.len(), 1);
    assert_eq!(histogram[0].code, "DOCS");
    assert_eq!(histogram[0].count, 1);
}

#[test]
fn ineligible_applications_never_reach_a_batch() {
    let service = IssuanceService::new(Arc::new(HashMapStore::default()));
    let catalog = catalog();

    let client = service
        .create_client(new_client("Casey Fields"))
        .expect("client created");
    let pending = service
        .submit(&catalog, submission(&client))
        .expect("submitted");

    let batch = service
        .create_batch(
            &catalog,
            NewBatch {
                vendor_id: Some(1),
                planned_send_at: None,
            },
        )
        .expect("batch created");

    service
        .add_items(&batch.id, &[pending.id.clone()])
        .expect_err("NEW application cannot join a batch");

    let batch = service.get_batch(&batch.id).expect("present");
    assert!(batch.items.is_empty());
    let pending = service.get_application(&pending.id).expect("present");
    assert_eq!(pending.status, ApplicationStatus::New);
}
