use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::catalog::{
    Branch, CatalogSnapshot, Channel, DeliveryMethod, Product, RefItem, Tariff, Vendor, VendorType,
};
use crate::workflows::issuance::domain::{
    Application, ApplicationId, Batch, BatchId, Card, CardId, Client, ClientId, Decision,
};
use crate::workflows::issuance::repository::{IssuanceStore, RepositoryError};
use crate::workflows::issuance::router::{issuance_router, IssuanceState};
use crate::workflows::issuance::service::{
    DecisionRequest, IssuanceService, NewApplication, NewBatch, NewClient,
};

pub(super) fn catalog() -> CatalogSnapshot {
    CatalogSnapshot {
        branches: vec![
            Branch {
                id: 1,
                code: "HQ".to_string(),
                name: "Head Office".to_string(),
                city: "Springfield".to_string(),
                active: true,
            },
            Branch {
                id: 2,
                code: "OLD".to_string(),
                name: "Closed Branch".to_string(),
                city: "Springfield".to_string(),
                active: false,
            },
        ],
        channels: vec![Channel {
            id: 1,
            code: "BRANCH".to_string(),
            name: "Branch walk-in".to_string(),
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
        vendors: vec![
            Vendor {
                id: 1,
                code: "EMB".to_string(),
                name: "Embosser One".to_string(),
                vendor_type: VendorType::Embossing,
                sla_days: 5,
                active: true,
            },
            Vendor {
                id: 2,
                code: "COURIER".to_string(),
                name: "City Courier".to_string(),
                vendor_type: VendorType::Courier,
                sla_days: 2,
                active: true,
            },
        ],
        products: vec![Product {
            id: 1,
            code: "DEBIT".to_string(),
            name: "Debit Classic".to_string(),
            currency: "USD".to_string(),
            term_months: 48,
            active: true,
        }],
        tariffs: vec![
            Tariff {
                id: 1,
                code: "STD".to_string(),
                name: "Standard".to_string(),
                product_id: 1,
                issue_fee: 10.0,
                monthly_fee: 1.5,
                annual_fee: 0.0,
                active: true,
            },
            Tariff {
                id: 9,
                code: "LEGACY".to_string(),
                name: "Legacy".to_string(),
                product_id: 1,
                issue_fee: 5.0,
                monthly_fee: 2.0,
                annual_fee: 12.0,
                active: false,
            },
        ],
        reject_reasons: vec![
            RefItem {
                id: 3,
                code: "DOCS".to_string(),
                name: "Incomplete documents".to_string(),
                active: true,
            },
            RefItem {
                id: 4,
                code: "RISK".to_string(),
                name: "Risk policy".to_string(),
                active: true,
            },
        ],
    }
}

pub(super) fn build_service() -> (Arc<IssuanceService<MemoryStore>>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let service = Arc::new(IssuanceService::new(store.clone()));
    (service, store)
}

pub(super) fn client_payload() -> NewClient {
    NewClient {
        full_name: Some("Jordan Smith".to_string()),
        phone: Some("+1-555-0100".to_string()),
        doc_number: Some("AB1234567".to_string()),
        segment: Some("retail".to_string()),
        ..NewClient::default()
    }
}

pub(super) fn application_payload(client: &Client) -> NewApplication {
    NewApplication {
        client_id: Some(client.id.0.clone()),
        product_id: Some(1),
        tariff_id: Some(1),
        channel_id: Some(1),
        branch_id: Some(1),
        delivery_method_id: Some(1),
        embossing_name: Some("JORDAN SMITH".to_string()),
        ..NewApplication::default()
    }
}

pub(super) fn approve_request() -> DecisionRequest {
    DecisionRequest {
        decision: Decision::Approve,
        reject_reason_id: None,
        planned_issue_date: None,
        kyc_score: Some(87),
        kyc_result: Some("pass".to_string()),
        decided_by: Some("reviewer".to_string()),
    }
}

pub(super) fn reject_request(reason: Option<u32>) -> DecisionRequest {
    DecisionRequest {
        decision: Decision::Reject,
        reject_reason_id: reason,
        planned_issue_date: None,
        kyc_score: None,
        kyc_result: None,
        decided_by: None,
    }
}

/// Submit one application for a fresh client.
pub(super) fn submitted_application(
    service: &IssuanceService<MemoryStore>,
    catalog: &CatalogSnapshot,
) -> Application {
    let client = service
        .create_client(client_payload())
        .expect("client created");
    service
        .submit(catalog, application_payload(&client))
        .expect("application submitted")
}

/// Submit and approve one application for a fresh client.
pub(super) fn approved_application(
    service: &IssuanceService<MemoryStore>,
    catalog: &CatalogSnapshot,
) -> Application {
    let application = submitted_application(service, catalog);
    service
        .decide(catalog, &application.id, approve_request())
        .expect("application approved")
}

pub(super) fn batch_for(service: &IssuanceService<MemoryStore>, catalog: &CatalogSnapshot) -> Batch {
    service
        .create_batch(
            catalog,
            NewBatch {
                vendor_id: Some(1),
                planned_send_at: None,
            },
        )
        .expect("batch created")
}

pub(super) fn test_router(
    service: Arc<IssuanceService<MemoryStore>>,
    catalog: CatalogSnapshot,
) -> axum::Router {
    issuance_router(IssuanceState::new(service, catalog))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
pub(super) struct MemoryStore {
    clients: Mutex<BTreeMap<ClientId, Client>>,
    applications: Mutex<BTreeMap<ApplicationId, Application>>,
    batches: Mutex<BTreeMap<BatchId, Batch>>,
    cards: Mutex<BTreeMap<CardId, Card>>,
}

fn insert_new<K: Ord + Clone, V: Clone>(
    map: &Mutex<BTreeMap<K, V>>,
    key: K,
    value: V,
) -> Result<V, RepositoryError> {
    let mut guard = map.lock().expect("store mutex poisoned");
    if guard.contains_key(&key) {
        return Err(RepositoryError::Conflict);
    }
    guard.insert(key, value.clone());
    Ok(value)
}

fn update_existing<K: Ord, V>(
    map: &Mutex<BTreeMap<K, V>>,
    key: K,
    value: V,
) -> Result<(), RepositoryError> {
    let mut guard = map.lock().expect("store mutex poisoned");
    if !guard.contains_key(&key) {
        return Err(RepositoryError::NotFound);
    }
    guard.insert(key, value);
    Ok(())
}

impl IssuanceStore for MemoryStore {
    fn insert_client(&self, client: Client) -> Result<Client, RepositoryError> {
        insert_new(&self.clients, client.id.clone(), client)
    }

    fn update_client(&self, client: Client) -> Result<(), RepositoryError> {
        update_existing(&self.clients, client.id.clone(), client)
    }

    fn fetch_client(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError> {
        Ok(self.clients.lock().expect("store mutex poisoned").get(id).cloned())
    }

    fn list_clients(&self) -> Result<Vec<Client>, RepositoryError> {
        Ok(self
            .clients
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        insert_new(&self.applications, application.id.clone(), application)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        update_existing(&self.applications, application.id.clone(), application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .applications
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned())
    }

    fn list_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .applications
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn insert_batch(&self, batch: Batch) -> Result<Batch, RepositoryError> {
        insert_new(&self.batches, batch.id.clone(), batch)
    }

    fn update_batch(&self, batch: Batch) -> Result<(), RepositoryError> {
        update_existing(&self.batches, batch.id.clone(), batch)
    }

    fn fetch_batch(&self, id: &BatchId) -> Result<Option<Batch>, RepositoryError> {
        Ok(self.batches.lock().expect("store mutex poisoned").get(id).cloned())
    }

    fn list_batches(&self) -> Result<Vec<Batch>, RepositoryError> {
        Ok(self
            .batches
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn insert_card(&self, card: Card) -> Result<Card, RepositoryError> {
        insert_new(&self.cards, card.id.clone(), card)
    }

    fn update_card(&self, card: Card) -> Result<(), RepositoryError> {
        update_existing(&self.cards, card.id.clone(), card)
    }

    fn fetch_card(&self, id: &CardId) -> Result<Option<Card>, RepositoryError> {
        Ok(self.cards.lock().expect("store mutex poisoned").get(id).cloned())
    }

    fn list_cards(&self) -> Result<Vec<Card>, RepositoryError> {
        Ok(self
            .cards
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect())
    }
}

/// Store double that fails every call, for boundary error mapping tests.
pub(super) struct UnavailableStore;

impl UnavailableStore {
    fn err<T>() -> Result<T, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }
}

impl IssuanceStore for UnavailableStore {
    fn insert_client(&self, _client: Client) -> Result<Client, RepositoryError> {
        Self::err()
    }

    fn update_client(&self, _client: Client) -> Result<(), RepositoryError> {
        Self::err()
    }

    fn fetch_client(&self, _id: &ClientId) -> Result<Option<Client>, RepositoryError> {
        Self::err()
    }

    fn list_clients(&self) -> Result<Vec<Client>, RepositoryError> {
        Self::err()
    }

    fn insert_application(
        &self,
        _application: Application,
    ) -> Result<Application, RepositoryError> {
        Self::err()
    }

    fn update_application(&self, _application: Application) -> Result<(), RepositoryError> {
        Self::err()
    }

    fn fetch_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Self::err()
    }

    fn list_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Self::err()
    }

    fn insert_batch(&self, _batch: Batch) -> Result<Batch, RepositoryError> {
        Self::err()
    }

    fn update_batch(&self, _batch: Batch) -> Result<(), RepositoryError> {
        Self::err()
    }

    fn fetch_batch(&self, _id: &BatchId) -> Result<Option<Batch>, RepositoryError> {
        Self::err()
    }

    fn list_batches(&self) -> Result<Vec<Batch>, RepositoryError> {
        Self::err()
    }

    fn insert_card(&self, _card: Card) -> Result<Card, RepositoryError> {
        Self::err()
    }

    fn update_card(&self, _card: Card) -> Result<(), RepositoryError> {
        Self::err()
    }

    fn fetch_card(&self, _id: &CardId) -> Result<Option<Card>, RepositoryError> {
        Self::err()
    }

    fn list_cards(&self) -> Result<Vec<Card>, RepositoryError> {
        Self::err()
    }
}
