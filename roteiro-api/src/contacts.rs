use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use roteiro_core::contact::{ContactInput, ContactMessage, ContactStatus};
use roteiro_shared::models::events::{ContactReceivedEvent, DomainEvent};
use roteiro_shared::pii::redact_email;

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::admin_auth_middleware;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ContactListQuery {
    status: Option<ContactStatus>,
}

#[derive(Debug, Deserialize)]
struct ContactUpdate {
    status: ContactStatus,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/api/contacts", get(list_contacts))
        .route("/api/contacts/{id}", get(get_contact).patch(update_contact).delete(delete_contact))
        .route_layer(from_fn_with_state(state, admin_auth_middleware));

    Router::new().route("/api/contacts", post(create_contact)).merge(admin)
}

async fn create_contact(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ContactInput>,
) -> Result<(StatusCode, Json<ContactMessage>), AppError> {
    let contact = input.into_message()?;
    state.contacts.create_contact(&contact).await?;
    info!("Contact {} received from {}: {}", contact.id, redact_email(&contact.email), contact.subject);

    let event = DomainEvent::ContactReceived(ContactReceivedEvent {
        contact_id: contact.id,
        email: contact.email.clone().into(),
        subject: contact.subject.clone(),
        timestamp: Utc::now().timestamp(),
    });
    if let Err(e) = state.events.publish(&event).await {
        warn!("Failed to publish {}: {}", event.topic(), e);
    }

    Ok((StatusCode::CREATED, Json(contact)))
}

async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ContactListQuery>,
) -> Result<Json<Vec<ContactMessage>>, AppError> {
    Ok(Json(state.contacts.list_contacts(query.status).await?))
}

async fn get_contact(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ContactMessage>, AppError> {
    state
        .contacts
        .get_contact(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format_args!("contact {id}")))
}

async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<ContactUpdate>,
) -> Result<Json<ContactMessage>, AppError> {
    let mut contact = state
        .contacts
        .get_contact(id)
        .await?
        .ok_or_else(|| AppError::not_found(format_args!("contact {id}")))?;

    contact.status = update.status;
    contact.updated_at = Utc::now();
    state.contacts.update_contact(&contact).await?;
    Ok(Json(contact))
}

async fn delete_contact(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.contacts.delete_contact(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
