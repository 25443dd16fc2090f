use crate::handlers::common::{no_content_response, success_response, validate_input};
use crate::handlers::CurrentUser;
use crate::{errors::ServiceError, services::cart::AddItemInput, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/items", post(add_to_cart))
        .route("/items/:item_id", put(update_cart_item))
        .route("/items/:item_id", delete(remove_cart_item))
}

/// Get the current user's cart with per-line availability
async fn get_cart(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let view = state.services.cart.get_cart_view(user_id).await?;
    Ok(success_response(view))
}

/// Add a variant to the cart (or increment its existing line)
async fn add_to_cart(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let input = AddItemInput {
        variant_id: payload.variant_id,
        quantity: payload.quantity,
    };

    let item = state.services.cart.add_item(user_id, input).await?;
    Ok(success_response(item))
}

/// Replace a cart line's quantity
async fn update_cart_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let item = state
        .services
        .cart
        .update_item_quantity(user_id, item_id, payload.quantity)
        .await?;

    Ok(success_response(item))
}

/// Remove a line from the cart
async fn remove_cart_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    state.services.cart.remove_item(user_id, item_id).await?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize, Validate)]
struct AddItemRequest {
    variant_id: Uuid,
    #[validate(range(min = 1))]
    quantity: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateQuantityRequest {
    #[validate(range(min = 1))]
    quantity: i32,
}
