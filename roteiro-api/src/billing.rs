use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use roteiro_core::billing::{Invoice, Subscription};

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::admin_auth_middleware;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct PortalRequest {
    return_url: String,
}

#[derive(Debug, Serialize)]
struct PortalResponse {
    url: String,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/subscription", get(subscription))
        .route("/api/invoices", get(invoices))
        .route("/api/portal", post(portal))
        .route_layer(from_fn_with_state(state, admin_auth_middleware))
}

async fn subscription(State(state): State<AppState>) -> Result<Json<Option<Subscription>>, AppError> {
    Ok(Json(state.billing.subscription().await?))
}

async fn invoices(State(state): State<AppState>) -> Result<Json<Vec<Invoice>>, AppError> {
    Ok(Json(state.billing.invoices().await?))
}

async fn portal(State(state): State<AppState>, ApiJson(req): ApiJson<PortalRequest>) -> Result<Json<PortalResponse>, AppError> {
    if req.return_url.trim().is_empty() {
        return Err(AppError::ValidationError("return_url is required".into()));
    }
    let url = state.billing.portal_session(req.return_url.trim()).await?;
    Ok(Json(PortalResponse { url }))
}
