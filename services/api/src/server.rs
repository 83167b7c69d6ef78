use crate::cli::ServeArgs;
use crate::infra::{in_memory_backend, AppState};
use crate::routes::with_case_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use equivalence::config::AppConfig;
use equivalence::error::AppError;
use equivalence::telemetry;
use equivalence::workflows::cases::CommissionCaseService;
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

    let (store, dispatcher) = in_memory_backend();
    let service = Arc::new(CommissionCaseService::new(store, dispatcher));
    service
        .ensure_default_rubric()
        .map_err(|err| AppError::Io(std::io::Error::other(err.to_string())))?;

    let app = with_case_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "equivalence commission service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
