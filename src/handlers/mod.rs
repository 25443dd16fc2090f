pub mod carts;
pub mod checkout;
pub mod common;
pub mod orders;
pub mod promotions;

use crate::{
    config::AppConfig,
    errors::ServiceError,
    events::EventSender,
    services::{CartService, CheckoutService, OrderService},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

/// Aggregated services used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            cart: Arc::new(CartService::new(db.clone(), event_sender.clone())),
            checkout: Arc::new(CheckoutService::new(
                db.clone(),
                event_sender.clone(),
                config.clone(),
            )),
            orders: Arc::new(OrderService::new(db, event_sender, config)),
        }
    }
}

/// Authenticated user identity.
///
/// Authentication itself lives with an upstream collaborator; it hands the
/// verified user id to this service as an `X-User-Id` header.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ServiceError::ValidationError("Missing X-User-Id header".to_string())
            })?;

        let user_id = Uuid::parse_str(raw).map_err(|_| {
            ServiceError::ValidationError("Invalid X-User-Id header".to_string())
        })?;

        Ok(CurrentUser(user_id))
    }
}
