mod common;

use axum::http::StatusCode;
use common::*;
use dispatch_api::create_routes;
use dispatch_infrastructure::InMemoryStore;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let app = app(&InMemoryStore::new());

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_assistance_uses_ambulance_then_falls_back_to_chw() {
    let store = seeded_store();
    let app = app(&store);

    let response = post_json(&app, "/api/emergency/assistance", &assistance_body(Some(1))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["mode"], "AMBULANCE");
    assert_eq!(body["data"]["status"], "REQUESTED");
    assert!(body["data"]["incident_id"]
        .as_str()
        .unwrap()
        .starts_with("EMG-"));

    let response = post_json(&app, "/api/emergency/assistance", &assistance_body(Some(1))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["mode"], "CHW");
    assert_eq!(body["data"]["chw_id"], 1);
    assert_eq!(body["data"]["status"], "ASSIGNED");

    assert_eq!(store.dispatch_count(), 1);
    assert_eq!(store.assignment_count(), 1);
}

#[tokio::test]
async fn test_missing_coordinates_is_bad_request() {
    let store = seeded_store();
    let app = app(&store);

    let mut request = assistance_body(Some(1));
    request.as_object_mut().unwrap().remove("pickup_longitude");

    let response = post_json(&app, "/api/emergency/assistance", &request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["code"], 400);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("pickup_longitude"));
    assert!(body["error"]["suggestions"].is_array());
    assert_eq!(store.dispatch_count(), 0);
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let app = app(&seeded_store());

    let response = post_json(
        &app,
        "/api/emergency/assistance",
        &json!({ "pickup_latitude": "north" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_hospital_is_not_found() {
    let app = app(&seeded_store());

    let response = post_json(&app, "/api/emergency/assistance", &assistance_body(Some(99))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "HOSPITAL_NOT_FOUND");
}

#[tokio::test]
async fn test_no_chw_available_is_not_found() {
    let store = InMemoryStore::new();
    let app = app(&store);

    let mut request = assistance_body(None);
    request.as_object_mut().unwrap().remove("patient_id");

    let response = post_json(&app, "/api/emergency/assistance", &request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "NO_AVAILABLE_CHW");
    assert_eq!(store.assignment_count(), 0);
}

#[tokio::test]
async fn test_dispatch_event_flow() {
    let store = seeded_store();
    let app = app(&store);

    let body = body_json(
        post_json(&app, "/api/emergency/assistance", &assistance_body(Some(1))).await,
    )
    .await;
    let incident_id = body["data"]["incident_id"].as_str().unwrap().to_string();
    let events_uri = format!("/api/dispatches/{incident_id}/events");

    let response = post_json(&app, &events_uri, &json!({ "event": "DISPATCH" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        &events_uri,
        &json!({ "event": "DISPATCH", "ambulance_id": 1 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "DISPATCHED");
    assert_eq!(body["data"]["ambulance_id"], 1);

    let available = body_json(get(&app, "/api/ambulances").await).await;
    assert_eq!(available["data"].as_array().unwrap().len(), 0);
    let on_call = body_json(get(&app, "/api/ambulances?status=on_call").await).await;
    assert_eq!(on_call["data"][0]["id"], 1);

    let response = post_json(&app, &events_uri, &json!({ "event": "cancel" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(&app, &events_uri, &json!({ "event": "COMPLETE" })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "INVALID_TRANSITION");

    let available = body_json(get(&app, "/api/ambulances").await).await;
    assert_eq!(available["data"][0]["id"], 1);

    let detail = body_json(get(&app, &format!("/api/dispatches/{incident_id}")).await).await;
    assert_eq!(detail["data"]["status"], "CANCELED");
    assert!(detail["data"]["canceled_time"].is_string());
}

#[tokio::test]
async fn test_unknown_event_is_bad_request() {
    let store = seeded_store();
    let app = app(&store);

    let body = body_json(
        post_json(&app, "/api/emergency/assistance", &assistance_body(Some(1))).await,
    )
    .await;
    let incident_id = body["data"]["incident_id"].as_str().unwrap();

    let response = post_json(
        &app,
        &format!("/api/dispatches/{incident_id}/events"),
        &json!({ "event": "TELEPORT" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_dispatch_is_not_found() {
    let app = app(&seeded_store());

    let response = get(&app, "/api/dispatches/EMG-20240101-000000-ABCDEF").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "DISPATCH_NOT_FOUND");
}

#[tokio::test]
async fn test_list_dispatches_filters() {
    let store = seeded_store();
    let app = app(&store);
    post_json(&app, "/api/emergency/assistance", &assistance_body(Some(1))).await;

    let body = body_json(get(&app, "/api/dispatches?hospital_id=1&status=REQUESTED").await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let body = body_json(get(&app, "/api/dispatches?status=COMPLETED").await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let response = get(&app, "/api/dispatches?status=PARKED").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, "/api/dispatches?limit=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_assignment_lifecycle_endpoints() {
    let store = seeded_store();
    let app = app(&store);

    let body = body_json(
        post_json(&app, "/api/emergency/assistance", &assistance_body(None)).await,
    )
    .await;
    assert_eq!(body["data"]["mode"], "CHW");
    let id = body["data"]["assignment_id"].as_i64().unwrap();

    let response = post_empty(&app, &format!("/api/chw-assignments/{id}/complete")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_empty(&app, &format!("/api/chw-assignments/{id}/start")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "IN_PROGRESS");

    let response = post_empty(&app, &format!("/api/chw-assignments/{id}/complete")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "COMPLETED");
    assert!(body["data"]["completed_at"].is_string());

    let response = post_empty(&app, &format!("/api/chw-assignments/{id}/cancel")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(get(&app, "/api/chw-assignments?chw_id=1&status=completed").await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = get(&app, "/api/chw-assignments/999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_nearest_chw_lookup() {
    let app = app(&seeded_store());

    let response = get(&app, "/api/chws/nearest?lat=-1.2921&lon=36.8219").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["chw"]["id"], 1);
    assert!(body["data"]["distance_km"].as_f64().unwrap() < 5.0);

    let response = get(&app, "/api/chws/nearest?lat=-1.2921&lon=36.8219&radius_km=0.5").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&app, "/api/chws/nearest?lat=-1.2921").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, "/api/chws/nearest?lat=-1.2921&lon=36.8219&radius_km=-3").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_hospital_capacity() {
    let store = seeded_store();
    let app = app(&store);

    let body = body_json(get(&app, "/api/hospitals/1/capacity").await).await;
    assert_eq!(body["data"]["number_of_ambulances"], 1);
    assert_eq!(body["data"]["available_slots"], 1);

    post_json(&app, "/api/emergency/assistance", &assistance_body(Some(1))).await;

    let body = body_json(get(&app, "/api/hospitals/1/capacity").await).await;
    assert_eq!(body["data"]["active_dispatches"], 1);
    assert_eq!(body["data"]["available_slots"], 0);

    let response = get(&app, "/api/hospitals/42/capacity").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let store = InMemoryStore::new();

    let response = get(&app(&store), "/metrics").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let handle = PrometheusBuilder::new().build_recorder().handle();
    let app = create_routes(app_state(&store, Some(handle)));
    let response = get(&app, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

#[tokio::test]
async fn test_create_app_serves_through_middleware() {
    let config = dispatch_core::config::ApiConfig::default();
    let app = dispatch_api::create_app(
        app_state(&seeded_store(), None),
        &config,
        dispatch_api::routes::DEFAULT_METRICS_ENDPOINT,
    );

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/api/hospitals/1/capacity").await;
    assert_eq!(response.status(), StatusCode::OK);
}
