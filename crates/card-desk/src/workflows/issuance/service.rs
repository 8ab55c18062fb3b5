use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogSnapshot, VendorType};

use super::dates;
use super::domain::{
    Application, ApplicationId, ApplicationStatus, Batch, BatchId, BatchItem, BatchStatus, Card,
    CardEvent, CardId, CardStatus, Client, ClientId, Decision, TransitionError,
};
use super::report::ReportSnapshot;
use super::repository::{IssuanceStore, RepositoryError};
use super::validation::{ValidationError, ValidationReport};

/// Service facade over an [`IssuanceStore`]. Every mutating operation
/// re-validates preconditions against freshly fetched state, then applies the
/// full set of writes or none of them.
pub struct IssuanceService<S> {
    store: Arc<S>,
    client_seq: AtomicU64,
    application_seq: AtomicU64,
    batch_seq: AtomicU64,
    card_seq: AtomicU64,
}

/// Payload for registering a customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewClient {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "dates::deserialize_optional_date")]
    pub birth_date: Option<NaiveDate>,
    pub doc_number: Option<String>,
    #[serde(default, deserialize_with = "dates::deserialize_optional_date")]
    pub doc_issue_date: Option<NaiveDate>,
    pub doc_issuer: Option<String>,
    pub reg_address: Option<String>,
    pub fact_address: Option<String>,
    pub segment: Option<String>,
    pub kyc_status: Option<String>,
    pub risk_level: Option<String>,
}

/// Payload for submitting an application. Reference fields are optional at
/// the wire level so validation can enumerate every absent one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewApplication {
    pub client_id: Option<String>,
    pub product_id: Option<u32>,
    pub tariff_id: Option<u32>,
    pub channel_id: Option<u32>,
    pub branch_id: Option<u32>,
    pub delivery_method_id: Option<u32>,
    pub priority: Option<String>,
    pub embossing_name: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_comment: Option<String>,
    pub comment: Option<String>,
}

/// Payload for deciding an application.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
    #[serde(default)]
    pub reject_reason_id: Option<u32>,
    #[serde(default, deserialize_with = "dates::deserialize_optional_date")]
    pub planned_issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub kyc_score: Option<u16>,
    #[serde(default)]
    pub kyc_result: Option<String>,
    #[serde(default)]
    pub decided_by: Option<String>,
}

/// Payload for creating a batch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBatch {
    pub vendor_id: Option<u32>,
    #[serde(default, deserialize_with = "dates::deserialize_optional_date")]
    pub planned_send_at: Option<NaiveDate>,
}

/// Payload for advancing a card.
#[derive(Debug, Clone, Deserialize)]
pub struct CardEventRequest {
    pub event: CardEvent,
}

/// Counts returned by [`IssuanceService::issue_cards`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IssueCardsOutcome {
    pub created: usize,
    pub issued: usize,
}

/// Offset/limit pagination with a hard cap on page size.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "PageRequest::default_limit")]
    pub limit: usize,
}

impl PageRequest {
    const fn default_limit() -> usize {
        20
    }

    pub fn limit(&self) -> usize {
        self.limit.clamp(1, 200)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: Self::default_limit(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// One page of results plus the total count behind it.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub meta: PageMeta,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    fn slice(mut items: Vec<T>, page: PageRequest) -> Self {
        let total = items.len();
        let limit = page.limit();
        let items = if page.offset >= total {
            Vec::new()
        } else {
            items.drain(page.offset..).take(limit).collect()
        };
        Self {
            meta: PageMeta {
                total,
                limit,
                offset: page.offset,
            },
            items,
        }
    }
}

/// Listing filter for applications.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    /// Full-text match over application number, client name, document number.
    pub q: Option<String>,
    pub statuses: Vec<ApplicationStatus>,
    pub requested_from: Option<NaiveDate>,
    pub requested_to: Option<NaiveDate>,
}

/// Error raised by the issuance service.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("conflict: {detail}")]
    Conflict { detail: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl<S> IssuanceService<S>
where
    S: IssuanceStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            client_seq: AtomicU64::new(1),
            application_seq: AtomicU64::new(1),
            batch_seq: AtomicU64::new(1),
            card_seq: AtomicU64::new(1),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // Clients

    pub fn create_client(&self, payload: NewClient) -> Result<Client, IssuanceError> {
        let (full_name, phone, doc_number) = validate_client_fields(&payload)?;

        let seq = self.client_seq.fetch_add(1, Ordering::Relaxed);
        let client = Client {
            id: ClientId(format!("cli-{seq:06}")),
            full_name,
            phone,
            email: payload.email,
            birth_date: payload.birth_date,
            doc_number,
            doc_issue_date: payload.doc_issue_date,
            doc_issuer: payload.doc_issuer,
            reg_address: payload.reg_address,
            fact_address: payload.fact_address,
            segment: payload.segment,
            kyc_status: payload.kyc_status,
            risk_level: payload.risk_level,
            created_at: Utc::now(),
        };
        Ok(self.store.insert_client(client)?)
    }

    pub fn update_client(
        &self,
        id: &ClientId,
        payload: NewClient,
    ) -> Result<Client, IssuanceError> {
        let (full_name, phone, doc_number) = validate_client_fields(&payload)?;

        let mut client = self
            .store
            .fetch_client(id)?
            .ok_or_else(|| IssuanceError::NotFound {
                entity: "client",
                id: id.0.clone(),
            })?;

        client.full_name = full_name;
        client.phone = phone;
        client.doc_number = doc_number;
        client.email = payload.email;
        client.birth_date = payload.birth_date;
        client.doc_issue_date = payload.doc_issue_date;
        client.doc_issuer = payload.doc_issuer;
        client.reg_address = payload.reg_address;
        client.fact_address = payload.fact_address;
        client.segment = payload.segment;
        client.kyc_status = payload.kyc_status;
        client.risk_level = payload.risk_level;

        self.store.update_client(client.clone())?;
        Ok(client)
    }

    pub fn get_client(&self, id: &ClientId) -> Result<Client, IssuanceError> {
        self.store
            .fetch_client(id)?
            .ok_or_else(|| IssuanceError::NotFound {
                entity: "client",
                id: id.0.clone(),
            })
    }

    pub fn list_clients(&self, page: PageRequest) -> Result<Page<Client>, IssuanceError> {
        let mut clients = self.store.list_clients()?;
        clients.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(Page::slice(clients, page))
    }

    // Applications

    /// Validate every reference against the catalog snapshot and create the
    /// application in `NEW`.
    pub fn submit(
        &self,
        catalog: &CatalogSnapshot,
        payload: NewApplication,
    ) -> Result<Application, IssuanceError> {
        let mut report = ValidationReport::new();

        let client_id = match payload.client_id.as_deref().map(str::trim) {
            None | Some("") => {
                report.push("client_id", "required");
                None
            }
            Some(raw) => {
                let id = ClientId(raw.to_string());
                if self.store.fetch_client(&id)?.is_none() {
                    report.push("client_id", "unknown client");
                    None
                } else {
                    Some(id)
                }
            }
        };

        let product_id = require_ref(&mut report, "product_id", payload.product_id, |id| {
            catalog.has_active_product(id)
        });
        let tariff_id = match (payload.tariff_id, product_id) {
            (None, _) => {
                report.push("tariff_id", "required");
                None
            }
            (Some(id), Some(product)) if catalog.has_active_tariff_for(id, product) => Some(id),
            (Some(_), None) => {
                // cannot check product membership without a valid product
                report.push("tariff_id", "unknown or inactive reference");
                None
            }
            (Some(_), Some(_)) => {
                report.push("tariff_id", "unknown, inactive, or wrong product");
                None
            }
        };
        let channel_id = require_ref(&mut report, "channel_id", payload.channel_id, |id| {
            catalog.has_active_channel(id)
        });
        let branch_id = require_ref(&mut report, "branch_id", payload.branch_id, |id| {
            catalog.has_active_branch(id)
        });
        let delivery_method_id = require_ref(
            &mut report,
            "delivery_method_id",
            payload.delivery_method_id,
            |id| catalog.has_active_delivery_method(id),
        );

        report.finish()?;

        let now = Utc::now();
        let seq = self.application_seq.fetch_add(1, Ordering::Relaxed);
        let application = Application {
            id: ApplicationId(format!("app-{seq:06}")),
            application_no: make_no("APP", now, seq),
            // validated above, report.finish() returned Err otherwise
            client_id: client_id.ok_or_else(validation_slipped)?,
            product_id: product_id.ok_or_else(validation_slipped)?,
            tariff_id: tariff_id.ok_or_else(validation_slipped)?,
            channel_id: channel_id.ok_or_else(validation_slipped)?,
            branch_id: branch_id.ok_or_else(validation_slipped)?,
            delivery_method_id: delivery_method_id.ok_or_else(validation_slipped)?,
            status: ApplicationStatus::New,
            priority: payload.priority,
            embossing_name: payload.embossing_name,
            delivery_address: payload.delivery_address,
            delivery_comment: payload.delivery_comment,
            comment: payload.comment,
            requested_at: now,
            planned_issue_date: None,
            kyc_score: None,
            kyc_result: None,
            reject_reason_id: None,
            decision_at: None,
            decision_by: None,
            batch_id: None,
            card_id: None,
        };

        Ok(self.store.insert_application(application)?)
    }

    /// Move a fresh application into review.
    pub fn start_review(&self, id: &ApplicationId) -> Result<Application, IssuanceError> {
        let mut application = self.get_application(id)?;
        if application.status != ApplicationStatus::New {
            return Err(TransitionError {
                entity: "application",
                id: id.0.clone(),
                current: application.status.code(),
                operation: "start review",
            }
            .into());
        }
        application.status = ApplicationStatus::InReview;
        self.store.update_application(application.clone())?;
        Ok(application)
    }

    /// Approve or reject an application under review.
    pub fn decide(
        &self,
        catalog: &CatalogSnapshot,
        id: &ApplicationId,
        request: DecisionRequest,
    ) -> Result<Application, IssuanceError> {
        let mut application = self.get_application(id)?;
        if !application.status.accepts_decision() {
            return Err(TransitionError {
                entity: "application",
                id: id.0.clone(),
                current: application.status.code(),
                operation: "decide",
            }
            .into());
        }

        let now = Utc::now();
        let decided_by = request
            .decided_by
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "operator".to_string());

        match request.decision {
            Decision::Approve => {
                application.status = ApplicationStatus::Approved;
                application.planned_issue_date = request.planned_issue_date;
                application.kyc_score = request.kyc_score;
                application.kyc_result = request.kyc_result;
            }
            Decision::Reject => {
                let mut report = ValidationReport::new();
                match request.reject_reason_id {
                    None => report.push("reject_reason_id", "required when rejecting"),
                    Some(reason) => report.require(
                        catalog.has_active_reject_reason(reason),
                        "reject_reason_id",
                        "unknown or inactive reject reason",
                    ),
                }
                report.finish()?;
                application.status = ApplicationStatus::Rejected;
                application.reject_reason_id = request.reject_reason_id;
                application.kyc_score = request.kyc_score;
                application.kyc_result = request.kyc_result;
            }
        }

        application.decision_at = Some(now);
        application.decision_by = Some(decided_by);
        self.store.update_application(application.clone())?;
        Ok(application)
    }

    /// Create the card for an approved application, or return the existing
    /// one. Idempotent.
    pub fn ensure_card(&self, id: &ApplicationId) -> Result<Card, IssuanceError> {
        let mut application = self.get_application(id)?;
        if !application.status.allows_card() {
            return Err(TransitionError {
                entity: "application",
                id: id.0.clone(),
                current: application.status.code(),
                operation: "ensure card",
            }
            .into());
        }

        if let Some(card_id) = &application.card_id {
            return self.get_card(card_id);
        }

        let card = self.mint_card(&application, Utc::now())?;
        application.card_id = Some(card.id.clone());
        self.store.update_application(application.clone())?;

        if let Some(batch_id) = &application.batch_id {
            self.link_batch_item(batch_id, &application.id, &card.id)?;
        }

        Ok(card)
    }

    pub fn get_application(&self, id: &ApplicationId) -> Result<Application, IssuanceError> {
        self.store
            .fetch_application(id)?
            .ok_or_else(|| IssuanceError::NotFound {
                entity: "application",
                id: id.0.clone(),
            })
    }

    pub fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: PageRequest,
    ) -> Result<Page<Application>, IssuanceError> {
        let mut applications = self.store.list_applications()?;

        let clients: BTreeMap<ClientId, Client> = self
            .store
            .list_clients()?
            .into_iter()
            .map(|client| (client.id.clone(), client))
            .collect();

        let needle = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        applications.retain(|application| {
            if !filter.statuses.is_empty() && !filter.statuses.contains(&application.status) {
                return false;
            }
            let requested = application.requested_at.date_naive();
            if let Some(from) = filter.requested_from {
                if requested < from {
                    return false;
                }
            }
            if let Some(to) = filter.requested_to {
                if requested > to {
                    return false;
                }
            }
            if let Some(needle) = &needle {
                let client = clients.get(&application.client_id);
                let mut haystack = application.application_no.to_lowercase();
                if let Some(client) = client {
                    haystack.push('\n');
                    haystack.push_str(&client.full_name.to_lowercase());
                    haystack.push('\n');
                    haystack.push_str(&client.doc_number.to_lowercase());
                }
                if !haystack.contains(needle) {
                    return false;
                }
            }
            true
        });

        applications.sort_by(|a, b| b.requested_at.cmp(&a.requested_at).then(a.id.cmp(&b.id)));
        Ok(Page::slice(applications, page))
    }

    // Batches

    pub fn create_batch(
        &self,
        catalog: &CatalogSnapshot,
        payload: NewBatch,
    ) -> Result<Batch, IssuanceError> {
        let mut report = ValidationReport::new();
        let vendor_id = require_ref(&mut report, "vendor_id", payload.vendor_id, |id| {
            catalog.has_active_vendor(id, VendorType::Embossing)
        });
        report.finish()?;

        let now = Utc::now();
        let seq = self.batch_seq.fetch_add(1, Ordering::Relaxed);
        let batch = Batch {
            id: BatchId(format!("bat-{seq:06}")),
            batch_no: make_no("BAT", now, seq),
            vendor_id: vendor_id.ok_or_else(validation_slipped)?,
            status: BatchStatus::Created,
            planned_send_at: payload.planned_send_at,
            sent_at: None,
            received_at: None,
            items: Vec::new(),
            created_at: now,
        };
        Ok(self.store.insert_batch(batch)?)
    }

    /// Add approved applications to a batch. All-or-nothing: if any
    /// application is ineligible the whole call fails and nothing changes.
    pub fn add_items(
        &self,
        id: &BatchId,
        application_ids: &[ApplicationId],
    ) -> Result<Batch, IssuanceError> {
        let mut batch = self.get_batch(id)?;
        if batch.status != BatchStatus::Created {
            return Err(TransitionError {
                entity: "batch",
                id: id.0.clone(),
                current: batch.status.code(),
                operation: "add items",
            }
            .into());
        }

        let mut seen: HashSet<&ApplicationId> = HashSet::new();
        let mut offending: Vec<String> = Vec::new();
        let mut eligible: Vec<Application> = Vec::new();

        for application_id in application_ids {
            if !seen.insert(application_id) || batch.contains(application_id) {
                offending.push(format!("{} (duplicate)", application_id.0));
                continue;
            }
            match self.store.fetch_application(application_id)? {
                None => offending.push(format!("{} (not found)", application_id.0)),
                Some(application) if application.batch_id.is_some() => {
                    offending.push(format!("{} (already in a batch)", application_id.0));
                }
                Some(application) if application.status != ApplicationStatus::Approved => {
                    offending.push(format!(
                        "{} (status {})",
                        application_id.0,
                        application.status.code()
                    ));
                }
                Some(application) => eligible.push(application),
            }
        }

        if !offending.is_empty() {
            return Err(IssuanceError::Conflict {
                detail: format!("cannot add applications: {}", offending.join(", ")),
            });
        }

        // validation complete; per the store contract these writes all land
        for mut application in eligible {
            application.status = ApplicationStatus::InBatch;
            application.batch_id = Some(batch.id.clone());
            batch.items.push(BatchItem {
                application_id: application.id.clone(),
                card_id: application.card_id.clone(),
            });
            self.store.update_application(application)?;
        }
        self.store.update_batch(batch.clone())?;
        Ok(batch)
    }

    pub fn set_batch_status(
        &self,
        id: &BatchId,
        target: BatchStatus,
    ) -> Result<Batch, IssuanceError> {
        let mut batch = self.get_batch(id)?;
        batch.set_status(target, Utc::now())?;
        self.store.update_batch(batch.clone())?;
        Ok(batch)
    }

    /// Produce cards for a received batch. Creates a card for every item
    /// whose application has none, then advances every still-`CREATED` card
    /// on the batch to `ISSUED`.
    pub fn issue_cards(&self, id: &BatchId) -> Result<IssueCardsOutcome, IssuanceError> {
        let mut batch = self.get_batch(id)?;
        if batch.status != BatchStatus::Received {
            return Err(TransitionError {
                entity: "batch",
                id: id.0.clone(),
                current: batch.status.code(),
                operation: "issue cards",
            }
            .into());
        }

        let now = Utc::now();
        let mut created = 0usize;
        let mut issued = 0usize;

        // per the store contract the per-item writes all land once validated
        let items = batch.items.clone();
        for (index, item) in items.into_iter().enumerate() {
            let mut application = self.get_application(&item.application_id)?;

            let mut card = match &application.card_id {
                Some(card_id) => self.get_card(card_id)?,
                None => {
                    let card = self.mint_card(&application, now)?;
                    application.card_id = Some(card.id.clone());
                    created += 1;
                    card
                }
            };

            if card.batch_id.is_none() {
                card.batch_id = Some(batch.id.clone());
            }
            if card.status == CardStatus::Created {
                card.apply_event(CardEvent::Issued, now)?;
                issued += 1;
            }

            batch.items[index].card_id = Some(card.id.clone());
            self.store.update_card(card)?;
            self.store.update_application(application)?;
        }

        self.store.update_batch(batch)?;
        Ok(IssueCardsOutcome { created, issued })
    }

    pub fn get_batch(&self, id: &BatchId) -> Result<Batch, IssuanceError> {
        self.store
            .fetch_batch(id)?
            .ok_or_else(|| IssuanceError::NotFound {
                entity: "batch",
                id: id.0.clone(),
            })
    }

    pub fn list_batches(
        &self,
        status: Option<BatchStatus>,
        page: PageRequest,
    ) -> Result<Page<Batch>, IssuanceError> {
        let mut batches = self.store.list_batches()?;
        if let Some(status) = status {
            batches.retain(|batch| batch.status == status);
        }
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(Page::slice(batches, page))
    }

    // Cards

    pub fn apply_card_event(
        &self,
        id: &CardId,
        request: CardEventRequest,
    ) -> Result<Card, IssuanceError> {
        let mut card = self.get_card(id)?;
        card.apply_event(request.event, Utc::now())?;
        self.store.update_card(card.clone())?;
        Ok(card)
    }

    /// Administrative closure.
    pub fn close_card(&self, id: &CardId) -> Result<Card, IssuanceError> {
        let mut card = self.get_card(id)?;
        card.close(Utc::now())?;
        self.store.update_card(card.clone())?;
        Ok(card)
    }

    pub fn get_card(&self, id: &CardId) -> Result<Card, IssuanceError> {
        self.store
            .fetch_card(id)?
            .ok_or_else(|| IssuanceError::NotFound {
                entity: "card",
                id: id.0.clone(),
            })
    }

    pub fn list_cards(
        &self,
        status: Option<CardStatus>,
        page: PageRequest,
    ) -> Result<Page<Card>, IssuanceError> {
        let mut cards = self.store.list_cards()?;
        if let Some(status) = status {
            cards.retain(|card| card.status == status);
        }
        cards.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(Page::slice(cards, page))
    }

    /// Read-only snapshot for reporting projections.
    pub fn snapshot(&self) -> Result<ReportSnapshot, IssuanceError> {
        Ok(ReportSnapshot {
            applications: self.store.list_applications()?,
            cards: self.store.list_cards()?,
        })
    }

    fn mint_card(
        &self,
        application: &Application,
        now: DateTime<Utc>,
    ) -> Result<Card, IssuanceError> {
        let seq = self.card_seq.fetch_add(1, Ordering::Relaxed);
        let card = Card {
            id: CardId(format!("card-{seq:06}")),
            card_no: make_no("CARD", now, seq),
            pan_masked: format!("**** **** **** {:04}", seq % 10_000),
            expiry_month: now.month() as u8,
            expiry_year: (now.year() + 4) as u16,
            application_id: application.id.clone(),
            batch_id: application.batch_id.clone(),
            status: CardStatus::Created,
            created_at: now,
            issued_at: None,
            delivered_at: None,
            handed_at: None,
            activated_at: None,
            closed_at: None,
        };
        Ok(self.store.insert_card(card)?)
    }

    fn link_batch_item(
        &self,
        batch_id: &BatchId,
        application_id: &ApplicationId,
        card_id: &CardId,
    ) -> Result<(), IssuanceError> {
        let mut batch = self.get_batch(batch_id)?;
        for item in &mut batch.items {
            if &item.application_id == application_id {
                item.card_id = Some(card_id.clone());
            }
        }
        self.store.update_batch(batch)?;
        Ok(())
    }
}

fn validate_client_fields(
    payload: &NewClient,
) -> Result<(String, String, String), IssuanceError> {
    let mut report = ValidationReport::new();
    let full_name = required_text(&mut report, "full_name", payload.full_name.as_deref());
    let phone = required_text(&mut report, "phone", payload.phone.as_deref());
    let doc_number = required_text(&mut report, "doc_number", payload.doc_number.as_deref());
    report.finish()?;

    match (full_name, phone, doc_number) {
        (Some(full_name), Some(phone), Some(doc_number)) => Ok((full_name, phone, doc_number)),
        // report.finish() returned Err above when any field was missing
        _ => Err(validation_slipped()),
    }
}

fn required_text(
    report: &mut ValidationReport,
    field: &'static str,
    value: Option<&str>,
) -> Option<String> {
    match value.map(str::trim) {
        None | Some("") => {
            report.push(field, "required");
            None
        }
        Some(text) => Some(text.to_string()),
    }
}

fn require_ref(
    report: &mut ValidationReport,
    field: &'static str,
    value: Option<u32>,
    resolves: impl Fn(u32) -> bool,
) -> Option<u32> {
    match value {
        None => {
            report.push(field, "required");
            None
        }
        Some(id) if resolves(id) => Some(id),
        Some(_) => {
            report.push(field, "unknown or inactive reference");
            None
        }
    }
}

/// Human-readable numbers in the `PREFIX-<year>-<seq>` shape.
fn make_no(prefix: &str, now: DateTime<Utc>, seq: u64) -> String {
    format!("{prefix}-{}-{seq:06}", now.year())
}

fn validation_slipped() -> IssuanceError {
    IssuanceError::Repository(RepositoryError::Unavailable(
        "validated field missing after report passed".to_string(),
    ))
}
