use crate::handlers::common::{created_response, success_response, validate_input};
use crate::handlers::CurrentUser;
use crate::{
    errors::ServiceError,
    services::checkout::CheckoutInput,
    services::shipping::{self, ShippingMethod},
    AppState,
};
use axum::{
    extract::{Json, Query, State},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

/// Creates the router for checkout endpoints
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(commit_checkout))
        .route("/shipping-quote", get(shipping_quote))
}

/// Commit the cart into an order: the single atomic checkout operation
async fn commit_checkout(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let input = CheckoutInput {
        address_text: payload.address_text,
        shipping_method: payload.shipping_method,
        promo_code: payload.promo_code,
    };

    let order = state
        .services
        .checkout
        .create_order_from_cart(user_id, input)
        .await?;

    Ok(created_response(order))
}

/// Preview a shipping method's fee and delivery window
async fn shipping_quote(
    Query(params): Query<ShippingQuoteParams>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let method = ShippingMethod::normalize(params.method.as_deref());
    let quote = shipping::quote(method, Utc::now().date_naive());
    Ok(success_response(quote))
}

#[derive(Debug, Deserialize, Validate)]
struct CheckoutRequest {
    #[validate(length(min = 1, message = "Delivery address is required"))]
    address_text: String,
    shipping_method: Option<String>,
    promo_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShippingQuoteParams {
    method: Option<String>,
}
