use crate::handlers::common::{success_response, validate_input};
use crate::handlers::CurrentUser;
use crate::{errors::ServiceError, money, services::promotions, AppState};
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Creates the router for promotion endpoints
pub fn promos_routes() -> Router<AppState> {
    Router::new().route("/validate", post(validate_promo))
}

/// Pure promo preview: validates a code against the user's current cart and
/// computes the discount without recording anything. Checkout re-runs the
/// same validation at commit time, so this answer is advisory.
async fn validate_promo(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<ValidatePromoRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let cart = state.services.cart.get_cart_view(user_id).await?;
    if cart.items.is_empty() {
        return Err(ServiceError::ValidationError("Cart is empty.".to_string()));
    }

    let grant =
        promotions::validate_for_cart(&*state.db, user_id, cart.subtotal_minor, &payload.code)
            .await?;

    Ok(success_response(ValidatePromoResponse {
        accepted: true,
        code: grant.promo.code.clone(),
        discount_minor: grant.discount_minor,
        discount: money::display_minor(grant.discount_minor),
    }))
}

#[derive(Debug, Deserialize, Validate)]
struct ValidatePromoRequest {
    #[validate(length(min = 1, message = "Enter promo code."))]
    code: String,
}

#[derive(Debug, Serialize)]
struct ValidatePromoResponse {
    accepted: bool,
    code: String,
    discount_minor: i64,
    discount: Decimal,
}
