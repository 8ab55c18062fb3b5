use crate::cli::ServeArgs;
use crate::demo::seed_demo_data;
use crate::infra::{default_catalog, AppState, InMemoryIssuanceStore};
use crate::routes::with_issuance_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use card_desk::config::AppConfig;
use card_desk::error::AppError;
use card_desk::telemetry;
use card_desk::workflows::issuance::{IssuanceService, IssuanceState};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryIssuanceStore::default());
    let service = Arc::new(IssuanceService::new(store));
    let catalog = default_catalog();

    if config.demo_seed {
        seed_demo_data(&service, &catalog)?;
        info!("seeded demo lifecycle data");
    }

    let state = IssuanceState::new(service, catalog);
    let app = with_issuance_routes(state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "card issuance back office ready");

    axum::serve(listener, app).await?;
    Ok(())
}
