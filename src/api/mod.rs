// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{BankDestination, Order, OrderStatus, StatusEntry},
    rates::RateSnapshot,
    state::AppState,
};

pub mod admin;
pub mod health;
pub mod identity;
pub mod orders;
pub mod rate;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    let v1_routes = Router::new()
        .route("/rate", get(rate::get_rate))
        .route("/identity/verify", post(identity::verify_identity))
        .route(
            "/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route("/orders/{id}", get(orders::get_order))
        .route("/admin/login", post(admin::login))
        .route("/admin/orders", get(admin::list_all_orders))
        .route("/admin/orders/{id}/status", put(admin::set_order_status))
        .route("/admin/stats", get(admin::stats));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins.trim() == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        rate::get_rate,
        identity::verify_identity,
        orders::create_order,
        orders::get_order,
        orders::list_orders,
        admin::login,
        admin::list_all_orders,
        admin::stats,
        admin::set_order_status
    ),
    components(
        schemas(
            Order,
            OrderStatus,
            BankDestination,
            StatusEntry,
            RateSnapshot,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks,
            identity::VerifyIdentityRequest,
            identity::VerifyIdentityResponse,
            orders::CreateOrderRequest,
            orders::OrderListResponse,
            admin::LoginRequest,
            admin::LoginResponse,
            admin::UpdateStatusRequest,
            admin::StatusCounts,
            admin::AdminStatsResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Rates", description = "WLD buy rate in COP"),
        (name = "Identity", description = "World ID proof verification"),
        (name = "Orders", description = "Exchange order creation and lookup"),
        (name = "Admin", description = "Operator login, listing, and status changes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app() -> (Router, AppState, TempDir) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let state = AppState::for_tests(dir.path());
        (router(state.clone()), state, dir)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request")
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn create_order_body(bank: &str, nullifier: &str) -> Value {
        json!({
            "bank": bank,
            "account_holder": "Ana Gomez",
            "account_number": "3001234567",
            "amount_wld": 10.0,
            "amount_cop": 95000.0,
            "identity_proof": {
                "nullifier_hash": nullifier,
                "merkle_root": "0xroot",
                "proof": "0xproof"
            }
        })
    }

    async fn admin_token(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/v1/admin/login",
                json!({"pin": "492817"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["token"]
            .as_str()
            .expect("token")
            .to_string()
    }

    #[tokio::test]
    async fn liveness_always_answers_ok() {
        let (app, _state, _dir) = test_app();
        let response = app
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn create_then_get_roundtrip() {
        let (app, _state, _dir) = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/v1/orders",
                create_order_body("nequi", "0xn1"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        assert_eq!(created["status"], "pending");
        assert_eq!(created["id"], 1);

        let response = app
            .oneshot(Request::get("/v1/orders/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response).await;
        assert_eq!(fetched["nullifier"], "0xn1");
        assert_eq!(fetched["bank"], "nequi");
    }

    #[tokio::test]
    async fn unknown_bank_is_rejected_with_400() {
        let (app, state, _dir) = test_app();

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/v1/orders",
                create_order_body("UnknownBank", "0xn1"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["ok"], false);

        // No record persisted, no id consumed.
        assert!(state.store.list_all().unwrap().is_empty());
        assert_eq!(state.store.peek_next_id().unwrap(), 1);
    }

    #[tokio::test]
    async fn fourth_order_in_a_day_hits_the_quota() {
        let (app, _state, _dir) = test_app();

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(json_request(
                    Method::POST,
                    "/v1/orders",
                    create_order_body("nequi", "0xn1"),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/v1/orders",
                create_order_body("nequi", "0xn1"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn missing_order_is_404() {
        let (app, _state, _dir) = test_app();
        let response = app
            .oneshot(Request::get("/v1/orders/999").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_requires_identity_param() {
        let (app, _state, _dir) = test_app();
        let response = app
            .clone()
            .oneshot(Request::get("/v1/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(
                Request::get("/v1/orders?identity=0xnobody")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["total"], 0);
    }

    #[tokio::test]
    async fn identity_verify_accepts_complete_proof_in_simulation() {
        let (app, _state, _dir) = test_app();
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/v1/identity/verify",
                json!({
                    "nullifier_hash": "0xn1",
                    "merkle_root": "0xroot",
                    "proof": "0xproof",
                    "wallet_address": "0xwallet"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["verified"], true);
        assert_eq!(body["nullifier"], "0xn1");
        assert_eq!(body["linked_wallet"], "0xwallet");
    }

    #[tokio::test]
    async fn admin_login_with_wrong_pin_is_401() {
        let (app, _state, _dir) = test_app();
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/v1/admin/login",
                json!({"pin": "000000"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_reject_missing_or_garbage_tokens_with_403() {
        let (app, state, _dir) = test_app();
        let order = seed_order(&state);

        // No token.
        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/v1/admin/orders/{}/status", order.id),
                json!({"status": "sent"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Garbage token.
        let mut request = json_request(
            Method::PUT,
            &format!("/v1/admin/orders/{}/status", order.id),
            json!({"status": "sent"}),
        );
        request.headers_mut().insert(
            header::AUTHORIZATION,
            "Bearer not-a-real-token".parse().unwrap(),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // The order was not touched.
        let loaded = state.store.get(order.id).unwrap();
        assert_eq!(loaded.status, OrderStatus::Pending);
        assert_eq!(loaded.status_history.len(), 1);

        let response = app
            .oneshot(Request::get("/v1/admin/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_can_list_and_transition_orders() {
        let (app, state, _dir) = test_app();
        let order = seed_order(&state);
        let token = admin_token(&app).await;

        let mut request = Request::get("/v1/admin/orders").body(Body::empty()).unwrap();
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["total"], 1);

        let mut request = json_request(
            Method::PUT,
            &format!("/v1/admin/orders/{}/status", order.id),
            json!({"status": "sent"}),
        );
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "sent");
        assert_eq!(body["status_history"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn illegal_transition_without_force_is_400() {
        let (app, state, _dir) = test_app();
        let order = seed_order(&state);
        let token = admin_token(&app).await;

        let mut request = json_request(
            Method::PUT,
            &format!("/v1/admin/orders/{}/status", order.id),
            json!({"status": "paid"}),
        );
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_status_is_400() {
        let (app, state, _dir) = test_app();
        let order = seed_order(&state);
        let token = admin_token(&app).await;

        let mut request = json_request(
            Method::PUT,
            &format!("/v1/admin/orders/{}/status", order.id),
            json!({"status": "shipped"}),
        );
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_stats_aggregate_orders() {
        let (app, state, _dir) = test_app();
        seed_order(&state);
        let token = admin_token(&app).await;

        let mut request = Request::get("/v1/admin/stats").body(Body::empty()).unwrap();
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total_orders"], 1);
        assert_eq!(body["by_status"]["pending"], 1);
        assert_eq!(body["total_wld"], 10.0);
        assert!(body.get("deposit_balance_wld").is_none());
    }

    fn seed_order(state: &AppState) -> Order {
        let identity = crate::identity::VerifiedIdentity {
            nullifier: "0xn1".to_string(),
            verification_level: "orb".to_string(),
        };
        state
            .lifecycle
            .create_order(
                &identity,
                &crate::orders::CreateOrderInput {
                    bank: "nequi".to_string(),
                    account_holder: "Ana Gomez".to_string(),
                    account_number: "3001234567".to_string(),
                    amount_wld: 10.0,
                    amount_cop: 95_000.0,
                },
            )
            .expect("seed order")
    }
}
