use crate::cli::ServeArgs;
use crate::infra::{build_score_model, default_rubric_config, AppState, InMemoryDealflowRepository};
use crate::routes::with_evaluation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use dealflow::config::AppConfig;
use dealflow::error::AppError;
use dealflow::telemetry;
use dealflow::workflows::evaluation::{EvaluationOrchestrator, StatusFeed};
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

    let repository = Arc::new(InMemoryDealflowRepository::default());
    let feed = Arc::new(StatusFeed::default());
    let model = build_score_model(&config.model);
    let scorer = model.tag();
    let service = Arc::new(EvaluationOrchestrator::new(
        repository,
        feed,
        model,
        default_rubric_config(),
    ));

    let app = with_evaluation_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, %scorer, "dealflow evaluation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
