use crate::cli::ServeArgs;
use crate::infra::{build_service, AppState};
use crate::routes::with_study_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use newsvendor_lab::config::AppConfig;
use newsvendor_lab::error::AppError;
use newsvendor_lab::telemetry::{self, LogOutput};
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

    telemetry::init(&config.telemetry, LogOutput::Stdout)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let study_service = Arc::new(build_service(&config)?);

    let app = with_study_routes(study_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        rounds = config.study.rounds,
        frame_mode = ?config.study.frame_mode,
        sync_enabled = config.sync.endpoint.is_some(),
        "newsvendor study service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
