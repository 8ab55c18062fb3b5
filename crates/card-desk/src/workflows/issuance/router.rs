use std::sync::{Arc, RwLock};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::catalog::CatalogSnapshot;

use super::domain::{
    ApplicationId, ApplicationStatus, BatchId, BatchStatus, CardId, CardStatus, ClientId,
};
use super::report::{self, Bucket, ReportSnapshot};
use super::repository::{IssuanceStore, RepositoryError};
use super::service::{
    ApplicationFilter, CardEventRequest, DecisionRequest, IssuanceError, IssuanceService,
    NewApplication, NewBatch, NewClient, PageRequest,
};
use super::validation::{FieldError, ValidationError};

/// Shared router state: the service plus the current catalog snapshot. The
/// snapshot is swapped wholesale on refresh; handlers read a clone and never
/// observe a half-updated catalog.
pub struct IssuanceState<S> {
    pub service: Arc<IssuanceService<S>>,
    pub catalog: Arc<RwLock<CatalogSnapshot>>,
}

impl<S> Clone for IssuanceState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<S> IssuanceState<S> {
    pub fn new(service: Arc<IssuanceService<S>>, catalog: CatalogSnapshot) -> Self {
        Self {
            service,
            catalog: Arc::new(RwLock::new(catalog)),
        }
    }

    pub fn catalog(&self) -> CatalogSnapshot {
        match self.catalog.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace_catalog(&self, snapshot: CatalogSnapshot) {
        match self.catalog.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

/// Router builder exposing the issuance workflow over HTTP.
pub fn issuance_router<S>(state: IssuanceState<S>) -> Router
where
    S: IssuanceStore + 'static,
{
    Router::new()
        .route("/api/meta", get(meta_handler::<S>))
        .route(
            "/api/clients",
            get(list_clients_handler::<S>).post(create_client_handler::<S>),
        )
        .route(
            "/api/clients/:client_id",
            get(get_client_handler::<S>).put(update_client_handler::<S>),
        )
        .route(
            "/api/applications",
            get(list_applications_handler::<S>).post(submit_handler::<S>),
        )
        .route(
            "/api/applications/:application_id",
            get(get_application_handler::<S>),
        )
        .route(
            "/api/applications/:application_id/review",
            post(start_review_handler::<S>),
        )
        .route(
            "/api/applications/:application_id/decision",
            post(decision_handler::<S>),
        )
        .route(
            "/api/applications/:application_id/ensure-card",
            post(ensure_card_handler::<S>),
        )
        .route(
            "/api/batches",
            get(list_batches_handler::<S>).post(create_batch_handler::<S>),
        )
        .route("/api/batches/:batch_id", get(get_batch_handler::<S>))
        .route("/api/batches/:batch_id/items", post(add_items_handler::<S>))
        .route(
            "/api/batches/:batch_id/status",
            post(set_batch_status_handler::<S>),
        )
        .route(
            "/api/batches/:batch_id/issue-cards",
            post(issue_cards_handler::<S>),
        )
        .route("/api/cards", get(list_cards_handler::<S>))
        .route("/api/cards/:card_id", get(get_card_handler::<S>))
        .route("/api/cards/:card_id/event", post(card_event_handler::<S>))
        .route("/api/cards/:card_id/close", post(close_card_handler::<S>))
        .route("/api/reports/funnel", get(funnel_handler::<S>))
        .route("/api/reports/volume", get(volume_handler::<S>))
        .route("/api/reports/sla", get(sla_handler::<S>))
        .route(
            "/api/reports/reject-reasons",
            get(reject_reasons_handler::<S>),
        )
        .with_state(state)
}

impl IntoResponse for IssuanceError {
    fn into_response(self) -> Response {
        match self {
            IssuanceError::Validation(error) => validation_response(&error),
            IssuanceError::Transition(error) => {
                let payload = json!({ "error": error.to_string() });
                (StatusCode::CONFLICT, Json(payload)).into_response()
            }
            IssuanceError::Conflict { .. } => {
                let payload = json!({ "error": self.to_string() });
                (StatusCode::CONFLICT, Json(payload)).into_response()
            }
            IssuanceError::NotFound { .. } => {
                let payload = json!({ "error": self.to_string() });
                (StatusCode::NOT_FOUND, Json(payload)).into_response()
            }
            IssuanceError::Repository(RepositoryError::Conflict) => {
                let payload = json!({ "error": "record already exists" });
                (StatusCode::CONFLICT, Json(payload)).into_response()
            }
            IssuanceError::Repository(RepositoryError::NotFound) => {
                let payload = json!({ "error": "record not found" });
                (StatusCode::NOT_FOUND, Json(payload)).into_response()
            }
            IssuanceError::Repository(error) => {
                let payload = json!({ "error": error.to_string() });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
            }
        }
    }
}

fn validation_response(error: &ValidationError) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "fields": error.fields,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

fn query_error(fields: Vec<FieldError>) -> IssuanceError {
    IssuanceError::Validation(ValidationError { fields })
}

// Meta

async fn meta_handler<S>(State(state): State<IssuanceState<S>>) -> Response
where
    S: IssuanceStore + 'static,
{
    let payload = json!({
        "catalog": state.catalog(),
        "server_time_utc": Utc::now(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

// Clients

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    offset: Option<usize>,
    limit: Option<usize>,
}

impl PageQuery {
    fn page(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            offset: self.offset.unwrap_or(defaults.offset),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }
}

/// Paging plus a single status code, for batch and card listings.
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    status: Option<String>,
    offset: Option<usize>,
    limit: Option<usize>,
}

impl ListQuery {
    fn page(&self) -> PageRequest {
        PageQuery {
            offset: self.offset,
            limit: self.limit,
        }
        .page()
    }
}

async fn list_clients_handler<S>(
    State(state): State<IssuanceState<S>>,
    Query(query): Query<PageQuery>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.list_clients(query.page()) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn create_client_handler<S>(
    State(state): State<IssuanceState<S>>,
    Json(payload): Json<NewClient>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.create_client(payload) {
        Ok(client) => (StatusCode::CREATED, Json(client)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn get_client_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(client_id): Path<String>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.get_client(&ClientId(client_id)) {
        Ok(client) => (StatusCode::OK, Json(client)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn update_client_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(client_id): Path<String>,
    Json(payload): Json<NewClient>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.update_client(&ClientId(client_id), payload) {
        Ok(client) => (StatusCode::OK, Json(client)).into_response(),
        Err(error) => error.into_response(),
    }
}

// Applications

#[derive(Debug, Default, Deserialize)]
struct ApplicationListQuery {
    q: Option<String>,
    /// Comma-separated status codes, e.g. `NEW,IN_REVIEW`.
    status: Option<String>,
    from: Option<String>,
    to: Option<String>,
    offset: Option<usize>,
    limit: Option<usize>,
}

impl ApplicationListQuery {
    fn filter(&self) -> Result<ApplicationFilter, IssuanceError> {
        let mut fields = Vec::new();

        let mut statuses = Vec::new();
        if let Some(raw) = self.status.as_deref() {
            for code in raw.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                match ApplicationStatus::from_code(code) {
                    Some(status) => statuses.push(status),
                    None => fields.push(FieldError::new(
                        "status",
                        format!("unknown status code {code}"),
                    )),
                }
            }
        }

        let requested_from = parse_query_date(self.from.as_deref(), "from", &mut fields);
        let requested_to = parse_query_date(self.to.as_deref(), "to", &mut fields);

        if !fields.is_empty() {
            return Err(query_error(fields));
        }

        Ok(ApplicationFilter {
            q: self.q.clone(),
            statuses,
            requested_from,
            requested_to,
        })
    }

    fn page(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            offset: self.offset.unwrap_or(defaults.offset),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }
}

fn parse_query_date(
    raw: Option<&str>,
    field: &'static str,
    fields: &mut Vec<FieldError>,
) -> Option<NaiveDate> {
    match raw.map(str::trim) {
        None | Some("") => None,
        Some(value) => match value.parse::<NaiveDate>() {
            Ok(date) => Some(date),
            Err(_) => {
                fields.push(FieldError::new(field, "expected YYYY-MM-DD"));
                None
            }
        },
    }
}

async fn list_applications_handler<S>(
    State(state): State<IssuanceState<S>>,
    Query(query): Query<ApplicationListQuery>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(error) => return error.into_response(),
    };
    match state.service.list_applications(&filter, query.page()) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn submit_handler<S>(
    State(state): State<IssuanceState<S>>,
    Json(payload): Json<NewApplication>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    let catalog = state.catalog();
    match state.service.submit(&catalog, payload) {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn get_application_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.get_application(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn start_review_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.start_review(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn decision_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(application_id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    let catalog = state.catalog();
    match state
        .service
        .decide(&catalog, &ApplicationId(application_id), request)
    {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn ensure_card_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.ensure_card(&ApplicationId(application_id)) {
        Ok(card) => (StatusCode::OK, Json(card)).into_response(),
        Err(error) => error.into_response(),
    }
}

// Batches

async fn list_batches_handler<S>(
    State(state): State<IssuanceState<S>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    let status = match parse_status_filter(query.status.as_deref(), BatchStatus::from_code) {
        Ok(status) => status,
        Err(error) => return error.into_response(),
    };
    match state.service.list_batches(status, query.page()) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => error.into_response(),
    }
}

fn parse_status_filter<T>(
    raw: Option<&str>,
    from_code: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, IssuanceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(code) => from_code(code).map(Some).ok_or_else(|| {
            query_error(vec![FieldError::new(
                "status",
                format!("unknown status code {code}"),
            )])
        }),
    }
}

async fn create_batch_handler<S>(
    State(state): State<IssuanceState<S>>,
    Json(payload): Json<NewBatch>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    let catalog = state.catalog();
    match state.service.create_batch(&catalog, payload) {
        Ok(batch) => (StatusCode::CREATED, Json(batch)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn get_batch_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(batch_id): Path<String>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.get_batch(&BatchId(batch_id)) {
        Ok(batch) => (StatusCode::OK, Json(batch)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct AddItemsRequest {
    application_ids: Vec<String>,
}

async fn add_items_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(batch_id): Path<String>,
    Json(request): Json<AddItemsRequest>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    let ids: Vec<ApplicationId> = request
        .application_ids
        .into_iter()
        .map(ApplicationId)
        .collect();
    match state.service.add_items(&BatchId(batch_id), &ids) {
        Ok(batch) => (StatusCode::OK, Json(batch)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct BatchStatusRequest {
    status: BatchStatus,
}

async fn set_batch_status_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(batch_id): Path<String>,
    Json(request): Json<BatchStatusRequest>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state
        .service
        .set_batch_status(&BatchId(batch_id), request.status)
    {
        Ok(batch) => (StatusCode::OK, Json(batch)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn issue_cards_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(batch_id): Path<String>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.issue_cards(&BatchId(batch_id)) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error.into_response(),
    }
}

// Cards

async fn list_cards_handler<S>(
    State(state): State<IssuanceState<S>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    let status = match parse_status_filter(query.status.as_deref(), CardStatus::from_code) {
        Ok(status) => status,
        Err(error) => return error.into_response(),
    };
    match state.service.list_cards(status, query.page()) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn get_card_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(card_id): Path<String>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.get_card(&CardId(card_id)) {
        Ok(card) => (StatusCode::OK, Json(card)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn card_event_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(card_id): Path<String>,
    Json(request): Json<CardEventRequest>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.apply_card_event(&CardId(card_id), request) {
        Ok(card) => (StatusCode::OK, Json(card)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn close_card_handler<S>(
    State(state): State<IssuanceState<S>>,
    Path(card_id): Path<String>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.close_card(&CardId(card_id)) {
        Ok(card) => (StatusCode::OK, Json(card)).into_response(),
        Err(error) => error.into_response(),
    }
}

// Reports

#[derive(Debug, Default, Deserialize)]
struct ReportQuery {
    bucket: Option<Bucket>,
    from: Option<String>,
    to: Option<String>,
}

const DEFAULT_REPORT_WINDOW_DAYS: i64 = 90;

impl ReportQuery {
    fn bucket(&self) -> Bucket {
        self.bucket.unwrap_or_default()
    }

    /// Explicit bounds win; otherwise a trailing 90-day window.
    fn window(&self) -> Result<(NaiveDate, NaiveDate), IssuanceError> {
        let mut fields = Vec::new();
        let from = parse_query_date(self.from.as_deref(), "from", &mut fields);
        let to = parse_query_date(self.to.as_deref(), "to", &mut fields);
        if !fields.is_empty() {
            return Err(query_error(fields));
        }

        let today = Utc::now().date_naive();
        let to = to.unwrap_or(today);
        let from = from.unwrap_or(to - Duration::days(DEFAULT_REPORT_WINDOW_DAYS));
        Ok((from, to))
    }
}

fn windowed_snapshot(snapshot: ReportSnapshot, from: NaiveDate, to: NaiveDate) -> ReportSnapshot {
    let mut snapshot = snapshot;
    snapshot.applications.retain(|application| {
        let requested = application.requested_at.date_naive();
        requested >= from && requested <= to
    });
    snapshot
}

async fn funnel_handler<S>(State(state): State<IssuanceState<S>>) -> Response
where
    S: IssuanceStore + 'static,
{
    match state.service.snapshot() {
        Ok(snapshot) => (StatusCode::OK, Json(report::funnel(&snapshot))).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn volume_handler<S>(
    State(state): State<IssuanceState<S>>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    let (from, to) = match query.window() {
        Ok(window) => window,
        Err(error) => return error.into_response(),
    };
    match state.service.snapshot() {
        Ok(snapshot) => {
            let snapshot = windowed_snapshot(snapshot, from, to);
            let points = report::volume(&snapshot, query.bucket());
            (StatusCode::OK, Json(points)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

async fn sla_handler<S>(
    State(state): State<IssuanceState<S>>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    S: IssuanceStore + 'static,
{
    let (from, to) = match query.window() {
        Ok(window) => window,
        Err(error) => return error.into_response(),
    };
    match state.service.snapshot() {
        Ok(snapshot) => {
            let snapshot = windowed_snapshot(snapshot, from, to);
            let points = report::sla(&snapshot, query.bucket());
            (StatusCode::OK, Json(points)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

async fn reject_reasons_handler<S>(State(state): State<IssuanceState<S>>) -> Response
where
    S: IssuanceStore + 'static,
{
    let catalog = state.catalog();
    match state.service.snapshot() {
        Ok(snapshot) => {
            let rows = report::reject_reasons(&snapshot, &catalog.reject_reasons);
            (StatusCode::OK, Json(rows)).into_response()
        }
        Err(error) => error.into_response(),
    }
}
