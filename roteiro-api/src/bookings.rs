use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use roteiro_core::holds::blocked_for;
use roteiro_core::repository::BookingFilter;
use roteiro_core::CoreError;
use roteiro_order::lifecycle::{record_payment, transition};
use roteiro_order::{prepare_booking, Booking, BookingRequest, BookingStatus, PaymentStatus};
use roteiro_shared::format_brl;
use roteiro_shared::models::events::{BookingCreatedEvent, BookingStatusChangedEvent, DomainEvent};

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::admin_auth_middleware;
use crate::packages::notify_seats;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub total_display: String,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        let total_display = format_brl(booking.total_cents);
        Self { booking, total_display }
    }
}

#[derive(Debug, Deserialize)]
struct RefQuery {
    #[serde(rename = "ref")]
    affiliate_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: Option<BookingStatus>,
    payment_status: Option<PaymentStatus>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/api/bookings", get(list_bookings))
        .route("/api/bookings/{id}", get(get_booking))
        .route("/api/bookings/{id}/status", patch(update_status))
        .route_layer(from_fn_with_state(state, admin_auth_middleware));

    Router::new().route("/api/bookings", post(create_booking)).merge(admin)
}

async fn create_booking(
    State(state): State<AppState>,
    Query(query): Query<RefQuery>,
    ApiJson(mut req): ApiJson<BookingRequest>,
) -> Result<(StatusCode, Json<BookingView>), AppError> {
    req.validate_fields()?;
    if req.affiliate_code.is_none() {
        req.affiliate_code = query.affiliate_code;
    }

    let package = match state.packages.get_package(req.package_id).await? {
        Some(package) if package.is_published() => package,
        _ => return Err(AppError::not_found(format_args!("package {}", req.package_id))),
    };

    let occupancy = state.bookings.occupancy(package.id).await?;
    let occupancy = match state.holds.held_seats(package.id).await {
        Ok(holds) => occupancy.with_blocked(blocked_for(&holds, req.hold_token.as_deref())),
        Err(e) => {
            warn!("Seat holds unavailable, booking without them: {}", e);
            occupancy
        }
    };

    let booking = prepare_booking(&req, &package, &occupancy).map_err(|e| {
        let err = AppError::from(e);
        if matches!(err, AppError::ConflictError(_)) {
            state.metrics.seat_conflicts.inc();
        }
        err
    })?;

    if let Err(e) = state.bookings.create_booking(&booking, package.total_seats).await {
        if matches!(e, CoreError::Conflict(_)) {
            state.metrics.seat_conflicts.inc();
        }
        return Err(e.into());
    }
    state.metrics.bookings_created.inc();
    info!("Booking {} created for package {} ({} pax)", booking.id, package.id, booking.passengers);

    if let Some(token) = req.hold_token.as_deref() {
        if let Err(e) = state.holds.release_seats(package.id, &booking.seats, token).await {
            warn!("Failed to release holds for booking {}: {}", booking.id, e);
        }
    }

    record_referral(&state, &booking).await;

    let event = DomainEvent::BookingCreated(BookingCreatedEvent {
        booking_id: booking.id,
        package_id: booking.package_id,
        customer_email: booking.customer_email.clone().into(),
        passengers: booking.passengers,
        seats: booking.seats.clone(),
        total_cents: booking.total_cents,
        affiliate_code: booking.affiliate_code.clone(),
        timestamp: Utc::now().timestamp(),
    });
    if let Err(e) = state.events.publish(&event).await {
        warn!("Failed to publish {}: {}", event.topic(), e);
    }

    notify_seats(&state, package.id).await;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// Credits the affiliate named by the booking's code. Unknown or inactive
/// codes never fail the booking.
async fn record_referral(state: &AppState, booking: &Booking) {
    let Some(code) = booking.affiliate_code.as_deref() else { return };

    match state.affiliates.find_affiliate_by_code(code).await {
        Ok(Some(affiliate)) if affiliate.is_active() => {
            let referral = affiliate.referral_for(booking);
            match state.affiliates.create_referral(&referral).await {
                Ok(()) => info!(
                    "Referral {} recorded for affiliate {}: {}",
                    referral.id,
                    affiliate.code,
                    format_brl(referral.commission_cents)
                ),
                Err(e) => warn!("Failed to record referral for booking {}: {}", booking.id, e),
            }
        }
        Ok(Some(affiliate)) => info!("Ignoring code {} of {} affiliate", code, affiliate.status.as_str()),
        Ok(None) => info!("Ignoring unknown affiliate code {}", code),
        Err(e) => warn!("Affiliate lookup failed for code {}: {}", code, e),
    }
}

async fn list_bookings(
    State(state): State<AppState>,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let bookings = state.bookings.list_bookings(&filter).await?;
    Ok(Json(bookings.into_iter().map(BookingView::from).collect()))
}

async fn get_booking(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<BookingView>, AppError> {
    state
        .bookings
        .get_booking(id)
        .await?
        .map(|b| Json(b.into()))
        .ok_or_else(|| AppError::not_found(format_args!("booking {id}")))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<BookingView>, AppError> {
    if update.status.is_none() && update.payment_status.is_none() {
        return Err(AppError::ValidationError("status or payment_status is required".into()));
    }

    let mut booking = state
        .bookings
        .get_booking(id)
        .await?
        .ok_or_else(|| AppError::not_found(format_args!("booking {id}")))?;

    let read = (booking.status, booking.payment_status);
    let mut changes = Vec::new();
    if let Some(status) = update.status {
        if status != booking.status {
            changes.push(transition(&mut booking, status)?);
        }
    }
    if let Some(payment) = update.payment_status {
        changes.extend(record_payment(&mut booking, payment)?);
    }

    state.bookings.update_booking_status(&booking, read).await?;

    for change in &changes {
        info!("Booking {} moved {} -> {}", booking.id, change.from.as_str(), change.to.as_str());
        let event = DomainEvent::BookingStatusChanged(BookingStatusChangedEvent {
            booking_id: booking.id,
            package_id: booking.package_id,
            from: change.from.as_str().to_string(),
            to: change.to.as_str().to_string(),
            timestamp: Utc::now().timestamp(),
        });
        if let Err(e) = state.events.publish(&event).await {
            warn!("Failed to publish {}: {}", event.topic(), e);
        }
    }
    if changes.iter().any(|c| c.releases_seats()) {
        notify_seats(&state, booking.package_id).await;
    }

    Ok(Json(booking.into()))
}
