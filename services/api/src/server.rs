use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use creator_intake::config::AppConfig;
use creator_intake::error::AppError;
use creator_intake::telemetry;
use creator_intake::workflows::intake::{IntakeSessionService, RestApplicationGateway};
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let gateway = RestApplicationGateway::new(config.backend()?)?;
    info!(endpoint = gateway.endpoint(), "application gateway configured");
    let intake_service = Arc::new(
        IntakeSessionService::new(Arc::new(gateway), config.submission.clone())
            .with_limits(config.sessions.clone()),
    );

    let app = with_intake_routes(intake_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "creator intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
