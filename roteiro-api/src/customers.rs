use axum::{extract::State, middleware::from_fn_with_state, routing::get, Json, Router};
use serde::Serialize;

use roteiro_core::repository::BookingFilter;
use roteiro_order::{merge_customers, Customer};
use roteiro_shared::format_brl;

use crate::error::AppError;
use crate::middleware::admin_auth_middleware;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct CustomerView {
    #[serde(flatten)]
    customer: Customer,
    total_spent_display: String,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list_customers))
        .route_layer(from_fn_with_state(state, admin_auth_middleware))
}

async fn list_customers(State(state): State<AppState>) -> Result<Json<Vec<CustomerView>>, AppError> {
    let users = state.users.list_users().await?;
    let bookings = state.bookings.list_bookings(&BookingFilter::default()).await?;

    let customers = merge_customers(&users, &bookings)
        .into_iter()
        .map(|customer| CustomerView {
            total_spent_display: format_brl(customer.total_spent_cents),
            customer,
        })
        .collect();
    Ok(Json(customers))
}
