use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::healing::router::{generate_handler, generation_router};

#[tokio::test]
async fn generate_handler_returns_unprocessable_for_empty_wardrobe() {
    let service = Arc::new(build_service(MemoryStore::default()));

    let response = generate_handler::<MemoryStore>(
        State(service),
        axum::Json(inline_request("casual", 70.0, Vec::new())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["items"], json!([]));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn generate_handler_returns_bad_request_without_user() {
    let service = Arc::new(build_service(MemoryStore::default()));

    let response =
        generate_handler::<MemoryStore>(State(service), axum::Json(request("casual", 70.0))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generate_handler_returns_not_found_for_unknown_user() {
    let service = Arc::new(build_service(MemoryStore::with_wardrobe(
        OWNER,
        business_wardrobe(),
    )));

    let response = generate_handler::<MemoryStore>(
        State(service),
        axum::Json(stored_request("business", 90.0, "stranger")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn generate_handler_returns_unavailable_on_store_failure() {
    let service = Arc::new(build_service(UnavailableStore));

    let response = generate_handler::<UnavailableStore>(
        State(service),
        axum::Json(stored_request("business", 90.0, OWNER)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn generate_route_accepts_camel_case_payloads() {
    let router = generation_router(Arc::new(build_service(MemoryStore::with_wardrobe(
        OWNER,
        business_wardrobe(),
    ))));
    let payload = json!({
        "occasion": "business",
        "weather": { "temperature_f": 90.0, "condition": "sunny" },
        "userId": OWNER,
        "debug": true,
    });

    let response = router
        .oneshot(
            Request::post("/api/v1/outfits/generate")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["metadata"]["generation_strategy"], "primary");
    assert_eq!(body["metadata"]["is_valid"], true);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["healing"]["final_strategy"], "primary");
    assert!(body["debug"]["rejections"].is_array());
    assert!(body.get("variations").is_none());
}

#[tokio::test]
async fn telemetry_routes_report_recorded_generations() {
    let service = Arc::new(build_service(MemoryStore::default()));
    for _ in 0..2 {
        service
            .generate(inline_request("business", 90.0, business_wardrobe()))
            .await
            .expect("generation succeeds");
    }
    let router = generation_router(service);

    let status = router
        .clone()
        .oneshot(
            Request::get("/api/v1/telemetry/status")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("status response");
    assert_eq!(status.status(), StatusCode::OK);
    let body = read_json_body(status).await;
    assert_eq!(body["total_recorded"], 2);

    let reasons = router
        .clone()
        .oneshot(
            Request::get("/api/v1/telemetry/debug-reasons")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("debug reasons response");
    assert_eq!(reasons.status(), StatusCode::OK);
    let body = read_json_body(reasons).await;
    assert!(body["total_rejections"].as_u64().unwrap_or(0) >= 4);
    assert_eq!(body["validation_failure_rate"], 0.0);

    let baseline = router
        .clone()
        .oneshot(
            Request::post("/api/v1/telemetry/baseline")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("baseline response");
    assert_eq!(baseline.status(), StatusCode::CREATED);

    let alerts = router
        .oneshot(
            Request::get("/api/v1/telemetry/alerts")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("alerts response");
    let body = read_json_body(alerts).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn baseline_route_conflicts_until_enough_samples() {
    let router = generation_router(Arc::new(build_service(MemoryStore::default())));

    let response = router
        .oneshot(
            Request::post("/api/v1/telemetry/baseline")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("baseline response");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert_eq!(body["required"], 2);
    assert_eq!(body["available"], 0);
}
