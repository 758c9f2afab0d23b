use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Method, StatusCode},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod affiliates;
pub mod billing;
pub mod bookings;
pub mod customers;
pub mod contacts;
pub mod error;
pub mod extract;
pub mod fleet;
pub mod metrics;
pub mod middleware;
pub mod packages;
pub mod state;

pub use state::{AppState, AuthConfig, Backends};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .merge(packages::routes(state.clone()))
        .merge(fleet::routes(state.clone()))
        .merge(bookings::routes(state.clone()))
        .merge(customers::routes(state.clone()))
        .merge(affiliates::routes(state.clone()))
        .merge(contacts::routes(state.clone()))
        .merge(billing::routes(state.clone()))
        .route("/health", get(health))
        .route("/metrics", get(metrics::render))
        .layer(from_fn_with_state(state.clone(), metrics::track))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "local".into());
    let key = format!("ratelimit:{}", client);
    let limit = state.business_rules.rate_limit_per_minute;

    match state.rate_limiter.check_rate_limit(&key, limit, 60).await {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            state.metrics.rate_limited.inc();
            (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": "Rate limit exceeded" }))).into_response()
        }
        // Fail open
        Err(e) => {
            tracing::warn!("Rate limiter unavailable: {}", e);
            next.run(req).await
        }
    }
}
