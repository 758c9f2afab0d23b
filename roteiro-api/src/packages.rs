use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    middleware::from_fn_with_state,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use roteiro_catalog::{Package, PackageFilter, PackageInput, SeatError, SeatMap, SeatRow};
use roteiro_core::holds::blocked_for;
use roteiro_order::{BookingError, Occupancy};
use roteiro_shared::format_brl;
use roteiro_shared::models::events::SeatsChangedEvent;

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::{admin_auth_middleware, optional_claims};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PackageView {
    #[serde(flatten)]
    pub package: Package,
    pub price_display: String,
}

impl From<Package> for PackageView {
    fn from(package: Package) -> Self {
        let price_display = format_brl(package.price_cents);
        Self { package, price_display }
    }
}

#[derive(Debug, Serialize)]
struct PackageDetail {
    #[serde(flatten)]
    package: PackageView,
    available_seats: u32,
}

#[derive(Debug, Serialize)]
struct SeatsResponse {
    package_id: Uuid,
    total_seats: u32,
    /// False when no bus is assigned: seats are counted, not numbered.
    seat_map: bool,
    /// Claimed by bookings.
    occupied: Vec<u32>,
    /// Held by other booking sessions.
    held: Vec<u32>,
    available: u32,
    rows: Vec<SeatRow>,
}

#[derive(Debug, Deserialize)]
struct SeatsQuery {
    hold_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HoldRequest {
    hold_token: String,
    seats: Vec<u32>,
}

#[derive(Debug, Serialize)]
struct HoldResponse {
    seats: Vec<u32>,
    expires_in_seconds: u64,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/api/packages", post(create_package))
        .route("/api/packages/{id}", put(update_package).delete(delete_package))
        .route_layer(from_fn_with_state(state, admin_auth_middleware));

    Router::new()
        .route("/api/packages", get(list_packages))
        .route("/api/packages/{id}", get(get_package))
        .route("/api/packages/{id}/seats", get(get_seats))
        .route("/api/packages/{id}/seats/hold", post(hold_seats))
        .route("/api/packages/{id}/seats/release", post(release_seats))
        .route("/api/packages/{id}/seats/stream", get(stream_seats))
        .merge(admin)
}

/// Loads a package visible to the caller: drafts only exist for admins.
async fn visible_package(state: &AppState, id: Uuid, admin: bool) -> Result<Package, AppError> {
    match state.packages.get_package(id).await? {
        Some(package) if admin || package.is_published() => Ok(package),
        _ => Err(AppError::not_found(format_args!("package {id}"))),
    }
}

/// Seats booked plus seats held by sessions other than `token`.
async fn seat_map_for(
    state: &AppState,
    package: &Package,
    token: Option<&str>,
) -> Result<(SeatMap, Vec<u32>, Occupancy), AppError> {
    let occupancy = state.bookings.occupancy(package.id).await?;
    let held = match state.holds.held_seats(package.id).await {
        Ok(holds) => blocked_for(&holds, token),
        Err(e) => {
            warn!("Seat holds unavailable for package {}: {}", package.id, e);
            Vec::new()
        }
    };
    let held: Vec<u32> = held.into_iter().filter(|s| !occupancy.seats.contains(s)).collect();
    let map = SeatMap::new(package.total_seats, occupancy.seats.iter().chain(held.iter()).copied());
    Ok((map, held, occupancy))
}

/// Pushes the current unavailable seats of a package to stream subscribers.
pub(crate) async fn notify_seats(state: &AppState, package_id: Uuid) {
    let package = match state.packages.get_package(package_id).await {
        Ok(Some(package)) => package,
        _ => return,
    };
    match seat_map_for(state, &package, None).await {
        Ok((map, _, _)) => {
            // No subscribers is not an error.
            let _ = state.sse_tx.send(SeatsChangedEvent {
                package_id,
                occupied: map.occupied(),
                changed_at: Utc::now(),
            });
        }
        Err(e) => warn!("Could not compute seats for package {}: {:?}", package_id, e),
    }
}

async fn list_packages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<PackageFilter>,
) -> Result<Json<Vec<PackageView>>, AppError> {
    let admin = optional_claims(&state.auth, &headers).is_some_and(|c| c.is_admin());
    let filter = if admin { filter } else { filter.published_only() };

    let packages = state.packages.list_packages(filter.status).await?;
    Ok(Json(filter.apply(packages).into_iter().map(PackageView::from).collect()))
}

async fn get_package(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PackageDetail>, AppError> {
    let admin = optional_claims(&state.auth, &headers).is_some_and(|c| c.is_admin());
    let package = visible_package(&state, id, admin).await?;
    let occupancy = state.bookings.occupancy(id).await?;

    Ok(Json(PackageDetail {
        available_seats: package.total_seats.saturating_sub(occupancy.passengers),
        package: package.into(),
    }))
}

async fn get_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SeatsQuery>,
) -> Result<Json<SeatsResponse>, AppError> {
    let package = visible_package(&state, id, false).await?;
    let (map, held, occupancy) = seat_map_for(&state, &package, query.hold_token.as_deref()).await?;
    let occupied: Vec<u32> = map.occupied().into_iter().filter(|s| !held.contains(s)).collect();
    // Bookings made before a bus was assigned count passengers, not seat numbers.
    let available = map
        .available_count()
        .min(package.total_seats.saturating_sub(occupancy.passengers + held.len() as u32));

    Ok(Json(SeatsResponse {
        package_id: id,
        total_seats: map.total_seats(),
        seat_map: package.has_seat_map(),
        occupied,
        held,
        available,
        rows: if package.has_seat_map() { map.rows() } else { Vec::new() },
    }))
}

async fn hold_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<HoldRequest>,
) -> Result<Json<HoldResponse>, AppError> {
    if req.hold_token.trim().is_empty() {
        return Err(AppError::ValidationError("hold_token is required".into()));
    }
    if req.seats.is_empty() {
        return Err(AppError::ValidationError("seats must not be empty".into()));
    }

    let package = visible_package(&state, id, false).await?;
    if !package.has_seat_map() {
        return Err(AppError::ValidationError("package has no seat map".into()));
    }

    let (map, _, _) = seat_map_for(&state, &package, Some(&req.hold_token)).await?;
    let seats = map.claim(&req.seats).map_err(|e| {
        if matches!(e, SeatError::Taken(_)) {
            state.metrics.seat_conflicts.inc();
        }
        AppError::from(BookingError::Seats(e))
    })?;

    let ttl = state.business_rules.seat_hold_seconds;
    let conflicts = state.holds.hold_seats(id, &seats, &req.hold_token, ttl).await?;
    if !conflicts.is_empty() {
        state.metrics.seat_conflicts.inc();
        return Err(AppError::ConflictError(format!("seats already held: {conflicts:?}")));
    }

    info!("Seats {:?} held on package {}", seats, id);
    notify_seats(&state, id).await;
    Ok(Json(HoldResponse { seats, expires_in_seconds: ttl }))
}

async fn release_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<HoldRequest>,
) -> Result<StatusCode, AppError> {
    state.holds.release_seats(id, &req.seats, &req.hold_token).await?;
    notify_seats(&state, id).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn stream_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    visible_package(&state, id, false).await?;

    let rx = state.sse_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.package_id == id => Event::default().event("seats").json_data(&event).ok().map(Ok),
            _ => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn create_package(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<PackageInput>,
) -> Result<(StatusCode, Json<PackageView>), AppError> {
    input.validate()?;
    let bus = match input.bus_id {
        Some(bus_id) => Some(
            state
                .fleet
                .get_bus(bus_id)
                .await?
                .ok_or_else(|| AppError::ValidationError(format!("bus {bus_id} does not exist")))?,
        ),
        None => None,
    };
    let total_seats = input.resolve_total_seats(bus.as_ref())?;
    let package = input.into_package(total_seats);

    state.packages.create_package(&package).await?;
    info!("Package {} created: {}", package.id, package.title);
    Ok((StatusCode::CREATED, Json(package.into())))
}

async fn update_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<PackageInput>,
) -> Result<Json<PackageView>, AppError> {
    input.validate()?;
    let existing = state
        .packages
        .get_package(id)
        .await?
        .ok_or_else(|| AppError::not_found(format_args!("package {id}")))?;
    let bus = match input.bus_id {
        Some(bus_id) => Some(
            state
                .fleet
                .get_bus(bus_id)
                .await?
                .ok_or_else(|| AppError::ValidationError(format!("bus {bus_id} does not exist")))?,
        ),
        None => None,
    };
    let total_seats = input.resolve_total_seats(bus.as_ref())?;

    let occupancy = state.bookings.occupancy(id).await?;
    if occupancy.passengers > total_seats || occupancy.seats.iter().any(|&s| s > total_seats) {
        return Err(AppError::ConflictError(format!(
            "{} seats are already booked, cannot shrink to {}",
            occupancy.passengers, total_seats
        )));
    }

    let package = input.apply_to(&existing, total_seats);
    state.packages.update_package(&package).await?;
    notify_seats(&state, id).await;
    Ok(Json(package.into()))
}

async fn delete_package(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.packages.delete_package(id).await?;
    info!("Package {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}
