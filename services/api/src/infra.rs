use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use card_desk::catalog::{
    Branch, CatalogSnapshot, Channel, DeliveryMethod, Product, RefItem, Tariff, Vendor, VendorType,
};
use card_desk::workflows::issuance::{
    Application, ApplicationId, Batch, BatchId, Card, CardId, Client, ClientId, IssuanceStore,
    RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local store backing the service. Mutex-per-entity keeps writers
/// serialized the way the workflow contract expects.
#[derive(Default)]
pub(crate) struct InMemoryIssuanceStore {
    clients: Mutex<BTreeMap<ClientId, Client>>,
    applications: Mutex<BTreeMap<ApplicationId, Application>>,
    batches: Mutex<BTreeMap<BatchId, Batch>>,
    cards: Mutex<BTreeMap<CardId, Card>>,
}

impl IssuanceStore for InMemoryIssuanceStore {
    fn insert_client(&self, client: Client) -> Result<Client, RepositoryError> {
        let mut guard = self.clients.lock().expect("store mutex poisoned");
        if guard.contains_key(&client.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(client.id.clone(), client.clone());
        Ok(client)
    }

    fn update_client(&self, client: Client) -> Result<(), RepositoryError> {
        let mut guard = self.clients.lock().expect("store mutex poisoned");
        if !guard.contains_key(&client.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(client.id.clone(), client);
        Ok(())
    }

    fn fetch_client(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError> {
        let guard = self.clients.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_clients(&self) -> Result<Vec<Client>, RepositoryError> {
        let guard = self.clients.lock().expect("store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.applications.lock().expect("store mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = self.applications.lock().expect("store mutex poisoned");
        if !guard.contains_key(&application.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(application.id.clone(), application);
        Ok(())
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let guard = self.applications.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.applications.lock().expect("store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn insert_batch(&self, batch: Batch) -> Result<Batch, RepositoryError> {
        let mut guard = self.batches.lock().expect("store mutex poisoned");
        if guard.contains_key(&batch.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(batch.id.clone(), batch.clone());
        Ok(batch)
    }

    fn update_batch(&self, batch: Batch) -> Result<(), RepositoryError> {
        let mut guard = self.batches.lock().expect("store mutex poisoned");
        if !guard.contains_key(&batch.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(batch.id.clone(), batch);
        Ok(())
    }

    fn fetch_batch(&self, id: &BatchId) -> Result<Option<Batch>, RepositoryError> {
        let guard = self.batches.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_batches(&self) -> Result<Vec<Batch>, RepositoryError> {
        let guard = self.batches.lock().expect("store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn insert_card(&self, card: Card) -> Result<Card, RepositoryError> {
        let mut guard = self.cards.lock().expect("store mutex poisoned");
        if guard.contains_key(&card.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(card.id.clone(), card.clone());
        Ok(card)
    }

    fn update_card(&self, card: Card) -> Result<(), RepositoryError> {
        let mut guard = self.cards.lock().expect("store mutex poisoned");
        if !guard.contains_key(&card.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(card.id.clone(), card);
        Ok(())
    }

    fn fetch_card(&self, id: &CardId) -> Result<Option<Card>, RepositoryError> {
        let guard = self.cards.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_cards(&self) -> Result<Vec<Card>, RepositoryError> {
        let guard = self.cards.lock().expect("store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

fn ref_item(id: u32, code: &str, name: &str) -> RefItem {
    RefItem {
        id,
        code: code.to_string(),
        name: name.to_string(),
        active: true,
    }
}

/// Reference data loaded at startup. A real deployment would fetch this from
/// the catalog administration service and refresh it on mutation.
pub(crate) fn default_catalog() -> CatalogSnapshot {
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
                code: "NORTH".to_string(),
                name: "North Side Branch".to_string(),
                city: "Springfield".to_string(),
                active: true,
            },
            Branch {
                id: 3,
                code: "RIVER".to_string(),
                name: "Riverside Branch".to_string(),
                city: "Shelbyville".to_string(),
                active: true,
            },
        ],
        channels: vec![
            Channel {
                id: 1,
                code: "BRANCH".to_string(),
                name: "Branch walk-in".to_string(),
                active: true,
            },
            Channel {
                id: 2,
                code: "ONLINE".to_string(),
                name: "Online banking".to_string(),
                active: true,
            },
            Channel {
                id: 3,
                code: "MOBILE".to_string(),
                name: "Mobile app".to_string(),
                active: true,
            },
        ],
        delivery_methods: vec![
            DeliveryMethod {
                id: 1,
                code: "PICKUP".to_string(),
                name: "Branch pickup".to_string(),
                base_cost: 0.0,
                sla_days: 1,
                active: true,
            },
            DeliveryMethod {
                id: 2,
                code: "COURIER".to_string(),
                name: "Courier delivery".to_string(),
                base_cost: 7.5,
                sla_days: 3,
                active: true,
            },
        ],
        vendors: vec![
            Vendor {
                id: 1,
                code: "EMB-PRIME".to_string(),
                name: "Prime Embossing".to_string(),
                vendor_type: VendorType::Embossing,
                sla_days: 5,
                active: true,
            },
            Vendor {
                id: 2,
                code: "EMB-BACKUP".to_string(),
                name: "Backup Embossing".to_string(),
                vendor_type: VendorType::Embossing,
                sla_days: 7,
                active: true,
            },
            Vendor {
                id: 3,
                code: "CITY-COURIER".to_string(),
                name: "City Courier".to_string(),
                vendor_type: VendorType::Courier,
                sla_days: 2,
                active: true,
            },
        ],
        products: vec![
            Product {
                id: 1,
                code: "DEBIT_CLASSIC".to_string(),
                name: "Debit Classic".to_string(),
                currency: "USD".to_string(),
                term_months: 48,
                active: true,
            },
            Product {
                id: 2,
                code: "DEBIT_GOLD".to_string(),
                name: "Debit Gold".to_string(),
                currency: "USD".to_string(),
                term_months: 48,
                active: true,
            },
            Product {
                id: 3,
                code: "CREDIT_STANDARD".to_string(),
                name: "Credit Standard".to_string(),
                currency: "USD".to_string(),
                term_months: 36,
                active: true,
            },
        ],
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
                id: 2,
                code: "GOLD".to_string(),
                name: "Gold".to_string(),
                product_id: 2,
                issue_fee: 25.0,
                monthly_fee: 4.0,
                annual_fee: 0.0,
                active: true,
            },
            Tariff {
                id: 3,
                code: "CREDIT-BASE".to_string(),
                name: "Credit base".to_string(),
                product_id: 3,
                issue_fee: 0.0,
                monthly_fee: 2.5,
                annual_fee: 30.0,
                active: true,
            },
        ],
        reject_reasons: vec![
            ref_item(1, "DOCS", "Incomplete documents"),
            ref_item(2, "KYC", "KYC check failed"),
            ref_item(3, "RISK", "Risk policy"),
            ref_item(4, "DUPLICATE", "Duplicate request"),
        ],
    }
}
