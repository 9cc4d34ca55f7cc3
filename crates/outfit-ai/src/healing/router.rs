use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::service::{GenerationError, GenerationRequest, OutfitGenerationService};
use super::store::{ItemStore, StoreError};
use crate::guardrails::MonitorError;

const DEBUG_REASON_LIMIT: usize = 10;

/// Router exposing outfit generation and the guardrail telemetry endpoints.
pub fn generation_router<S>(service: Arc<OutfitGenerationService<S>>) -> Router
where
    S: ItemStore + 'static,
{
    Router::new()
        .route("/api/v1/outfits/generate", post(generate_handler::<S>))
        .route("/api/v1/telemetry/status", get(status_handler::<S>))
        .route(
            "/api/v1/telemetry/debug-reasons",
            get(debug_reasons_handler::<S>),
        )
        .route("/api/v1/telemetry/alerts", get(alerts_handler::<S>))
        .route("/api/v1/telemetry/baseline", post(baseline_handler::<S>))
        .with_state(service)
}

pub(crate) async fn generate_handler<S>(
    State(service): State<Arc<OutfitGenerationService<S>>>,
    axum::Json(request): axum::Json<GenerationRequest>,
) -> Response
where
    S: ItemStore + 'static,
{
    match service.generate(request).await {
        Ok(response) => (StatusCode::OK, axum::Json(response)).into_response(),
        Err(GenerationError::EmptyWardrobe) => {
            let payload = json!({
                "error": GenerationError::EmptyWardrobe.to_string(),
                "items": [],
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(error @ (GenerationError::MissingUser | GenerationError::InvalidContext(_))) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(GenerationError::Store(StoreError::UnknownUser(user))) => {
            let payload = json!({
                "error": format!("no wardrobe found for user {user}"),
                "items": [],
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn status_handler<S>(
    State(service): State<Arc<OutfitGenerationService<S>>>,
) -> Response
where
    S: ItemStore + 'static,
{
    let status = service.monitor().status();
    (StatusCode::OK, axum::Json(status)).into_response()
}

pub(crate) async fn debug_reasons_handler<S>(
    State(service): State<Arc<OutfitGenerationService<S>>>,
) -> Response
where
    S: ItemStore + 'static,
{
    let analytics = service.monitor().debug_reasons(DEBUG_REASON_LIMIT);
    let validation = service.pipeline().stats();
    let payload = json!({
        "total_rejections": analytics.total_rejections,
        "rejection_reasons": analytics.reasons,
        "validation_failure_rate": validation.failure_rate(),
        "top_validation_failures": validation
            .top_failures(DEBUG_REASON_LIMIT)
            .into_iter()
            .map(|(message, count)| json!({ "message": message, "count": count }))
            .collect::<Vec<_>>(),
        "failures_by_validator": validation.failures_by_validator,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn alerts_handler<S>(
    State(service): State<Arc<OutfitGenerationService<S>>>,
) -> Response
where
    S: ItemStore + 'static,
{
    let alerts = service.monitor().alerts();
    let payload = json!({
        "count": alerts.len(),
        "alerts": alerts,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn baseline_handler<S>(
    State(service): State<Arc<OutfitGenerationService<S>>>,
) -> Response
where
    S: ItemStore + 'static,
{
    match service.monitor().establish_baseline() {
        Ok(baseline) => (StatusCode::CREATED, axum::Json(baseline)).into_response(),
        Err(error @ MonitorError::InsufficientSamples { required, available }) => {
            let payload = json!({
                "error": error.to_string(),
                "required": required,
                "available": available,
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
    }
}
