use crate::handlers::common::{success_response, PaginatedResponse, PaginationParams};
use crate::handlers::CurrentUser;
use crate::{errors::ServiceError, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Router,
};
use uuid::Uuid;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:public_id", get(get_order))
        .route("/:public_id/cancel", post(cancel_order))
}

/// List the current user's orders, newest first
async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let (orders, total) = state
        .services
        .orders
        .list_orders_for_user(user_id, pagination.page, pagination.per_page)
        .await?;

    Ok(success_response(PaginatedResponse::new(
        orders,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Fetch one order with its frozen line items
async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(public_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .get_order_for_user(user_id, public_id)
        .await?;

    Ok(success_response(order))
}

/// Cancel an unpaid order, returning its units to stock
async fn cancel_order(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(public_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let order = state.services.orders.cancel_order(user_id, public_id).await?;
    Ok(success_response(order))
}
