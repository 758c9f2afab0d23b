use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use roteiro_catalog::{Bus, BusInput};

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::{admin_auth_middleware, optional_claims};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/api/fleet", post(create_bus))
        .route("/api/fleet/{id}", get(get_bus).put(update_bus).delete(delete_bus))
        .route_layer(from_fn_with_state(state, admin_auth_middleware));

    Router::new().route("/api/fleet", get(list_buses)).merge(admin)
}

/// Active buses for everyone; admins also see retired ones.
async fn list_buses(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Vec<Bus>>, AppError> {
    let admin = optional_claims(&state.auth, &headers).is_some_and(|c| c.is_admin());
    Ok(Json(state.fleet.list_buses(!admin).await?))
}

async fn get_bus(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Bus>, AppError> {
    state
        .fleet
        .get_bus(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format_args!("bus {id}")))
}

async fn create_bus(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<BusInput>,
) -> Result<(StatusCode, Json<Bus>), AppError> {
    input.validate()?;
    let bus = input.into_bus();
    state.fleet.create_bus(&bus).await?;
    info!("Bus {} registered ({} seats)", bus.plate, bus.seat_count);
    Ok((StatusCode::CREATED, Json(bus)))
}

async fn update_bus(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<BusInput>,
) -> Result<Json<Bus>, AppError> {
    input.validate()?;
    let existing = state
        .fleet
        .get_bus(id)
        .await?
        .ok_or_else(|| AppError::not_found(format_args!("bus {id}")))?;
    let bus = input.apply_to(&existing);
    state.fleet.update_bus(&bus).await?;
    Ok(Json(bus))
}

async fn delete_bus(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.fleet.delete_bus(id).await?;
    info!("Bus {} removed", id);
    Ok(StatusCode::NO_CONTENT)
}
