#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::Value;
use surplus_store_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::{
        product_variant, promo_code, promo_usage, DiscountType, ProductVariant,
        ProductVariantModel, PromoCodeModel, PromoUsage,
    },
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness backing every integration test with a fresh in-memory
/// SQLite database and the full service stack.
pub struct TestApp {
    pub state: AppState,
    router: Router,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        Self::with_config(cfg).await
    }

    /// Construct with a custom configuration (tax rate, stock policy).
    pub async fn with_config(cfg: AppConfig) -> Self {
        // A single pooled connection keeps the in-memory database alive and
        // shared for the whole test.
        let db_cfg = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let cfg = Arc::new(cfg);
        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()), cfg.clone());

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", surplus_store_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            state,
            router,
            _event_task: event_task,
        }
    }

    /// Send a request against the router, optionally acting as a user.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<Uuid>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(user_id) = user_id {
            builder = builder.header("x-user-id", user_id.to_string());
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Seed a catalog variant the way the (external) catalog collaborator
    /// would: 1.5 kg at Rs 300.00/kg gives the canonical Rs 450.00 unit price.
    pub async fn seed_variant(&self, name: &str, stock: i32) -> ProductVariantModel {
        self.seed_variant_priced(name, stock, 1500, 30000).await
    }

    pub async fn seed_variant_priced(
        &self,
        name: &str,
        stock: i32,
        weight_grams: i64,
        price_per_kg_minor: i64,
    ) -> ProductVariantModel {
        product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_name: Set(name.to_string()),
            color: Set("Olive".to_string()),
            size: Set("M".to_string()),
            weight_grams: Set(weight_grams),
            price_per_kg_minor: Set(price_per_kg_minor),
            stock: Set(stock),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed variant")
    }

    pub async fn set_stock(&self, variant_id: Uuid, stock: i32) {
        let variant = ProductVariant::find_by_id(variant_id)
            .one(&*self.state.db)
            .await
            .expect("find variant")
            .expect("variant exists");
        let mut active: product_variant::ActiveModel = variant.into();
        active.stock = Set(stock);
        active.update(&*self.state.db).await.expect("update stock");
    }

    pub async fn set_price_per_kg(&self, variant_id: Uuid, price_per_kg_minor: i64) {
        let variant = ProductVariant::find_by_id(variant_id)
            .one(&*self.state.db)
            .await
            .expect("find variant")
            .expect("variant exists");
        let mut active: product_variant::ActiveModel = variant.into();
        active.price_per_kg_minor = Set(price_per_kg_minor);
        active.update(&*self.state.db).await.expect("update price");
    }

    pub async fn deactivate_variant(&self, variant_id: Uuid) {
        self.set_active(variant_id, false).await;
    }

    pub async fn activate_variant(&self, variant_id: Uuid) {
        self.set_active(variant_id, true).await;
    }

    async fn set_active(&self, variant_id: Uuid, is_active: bool) {
        let variant = ProductVariant::find_by_id(variant_id)
            .one(&*self.state.db)
            .await
            .expect("find variant")
            .expect("variant exists");
        let mut active: product_variant::ActiveModel = variant.into();
        active.is_active = Set(is_active);
        active.update(&*self.state.db).await.expect("set active");
    }

    pub async fn delete_variant(&self, variant_id: Uuid) {
        ProductVariant::delete_by_id(variant_id)
            .exec(&*self.state.db)
            .await
            .expect("delete variant");
    }

    pub async fn current_stock(&self, variant_id: Uuid) -> i32 {
        ProductVariant::find_by_id(variant_id)
            .one(&*self.state.db)
            .await
            .expect("find variant")
            .expect("variant exists")
            .stock
    }

    pub async fn seed_promo(&self, seed: PromoSeed) -> PromoCodeModel {
        let now = Utc::now();
        promo_code::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(seed.code.to_uppercase()),
            discount_type: Set(seed.discount_type),
            discount_value: Set(seed.discount_value),
            min_cart_value_minor: Set(seed.min_cart_value_minor),
            max_discount_minor: Set(seed.max_discount_minor),
            usage_limit_total: Set(seed.usage_limit_total),
            valid_from: Set(now + Duration::days(seed.starts_in_days)),
            valid_to: Set(now + Duration::days(seed.ends_in_days)),
            is_active: Set(seed.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed promo")
    }

    pub async fn promo_usage_count(&self, promo_id: Uuid) -> u64 {
        PromoUsage::find()
            .filter(promo_usage::Column::PromoId.eq(promo_id))
            .count(&*self.state.db)
            .await
            .expect("count promo usages")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Promo seeding parameters; the default is the storefront's canonical
/// SAVE50 flat code (Rs 50.00 off above a Rs 500.00 cart).
pub struct PromoSeed {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_cart_value_minor: i64,
    pub max_discount_minor: Option<i64>,
    pub usage_limit_total: Option<i32>,
    pub is_active: bool,
    pub starts_in_days: i64,
    pub ends_in_days: i64,
}

impl Default for PromoSeed {
    fn default() -> Self {
        Self {
            code: "SAVE50".to_string(),
            discount_type: DiscountType::Flat,
            discount_value: 5000,
            min_cart_value_minor: 50000,
            max_discount_minor: None,
            usage_limit_total: None,
            is_active: true,
            starts_in_days: -1,
            ends_in_days: 30,
        }
    }
}
