use crate::cli::ServeArgs;
use crate::infra::{load_wardrobe, AppState, InMemoryItemStore};
use crate::routes::with_generation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use outfit_ai::config::AppConfig;
use outfit_ai::error::AppError;
use outfit_ai::guardrails::GuardrailMonitor;
use outfit_ai::healing::OutfitGenerationService;
use outfit_ai::telemetry;
use outfit_ai::wardrobe::domain::UserId;
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

    let rules = Arc::new(config.styling.load_rules()?);
    let monitor = Arc::new(GuardrailMonitor::new(config.guardrails));
    let store = InMemoryItemStore::default();

    if let Some(path) = args.wardrobe.take() {
        let user = UserId(args.user.clone());
        let items = load_wardrobe(&path, &user)?;
        let count = store.insert_wardrobe(user, items);
        info!(path = %path.display(), user = %args.user, count, "seeded wardrobe");
    }

    let service = Arc::new(OutfitGenerationService::new(
        Arc::new(store),
        rules,
        monitor,
    ));

    let app = with_generation_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "outfit generation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
