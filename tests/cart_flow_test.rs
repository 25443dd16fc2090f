//! Integration tests for cart mutations and the cart view: snapshotting at
//! add time, stock-bounded quantities, and live availability statuses.

mod common;

use common::TestApp;
use surplus_store_api::{
    errors::ServiceError,
    services::{cart::AddItemInput, inventory::CartLineStatus},
};
use uuid::Uuid;

fn add(variant_id: Uuid, quantity: Option<i32>) -> AddItemInput {
    AddItemInput {
        variant_id,
        quantity,
    }
}

#[tokio::test]
async fn add_item_snapshots_variant_fields() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let variant = app.seed_variant("Army Jacket", 10).await;

    let item = app
        .state
        .services
        .cart
        .add_item(user, add(variant.id, None))
        .await
        .expect("add to cart");

    assert_eq!(item.quantity, 1);
    assert_eq!(item.product_name, "Army Jacket");
    assert_eq!(item.weight_grams, 1500);
    assert_eq!(item.price_per_kg_minor, 30000);
    // 1.5 kg x Rs 300.00/kg
    assert_eq!(item.unit_price_minor, 45000);
}

#[tokio::test]
async fn re_adding_increments_the_same_line() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let variant = app.seed_variant("Canvas Tarp", 10).await;

    app.state
        .services
        .cart
        .add_item(user, add(variant.id, Some(2)))
        .await
        .expect("first add");
    let item = app
        .state
        .services
        .cart
        .add_item(user, add(variant.id, Some(3)))
        .await
        .expect("second add");

    assert_eq!(item.quantity, 5);

    let view = app
        .state
        .services
        .cart
        .get_cart_view(user)
        .await
        .expect("view");
    assert_eq!(view.items.len(), 1, "same variant must not duplicate lines");
    assert_eq!(view.subtotal_minor, 5 * 45000);
}

#[tokio::test]
async fn add_rejects_beyond_live_stock() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let variant = app.seed_variant("Field Stove", 1).await;

    app.state
        .services
        .cart
        .add_item(user, add(variant.id, None))
        .await
        .expect("first unit fits");

    // The cart already holds the entire stock; the increment must fail.
    let err = app
        .state
        .services
        .cart
        .add_item(user, add(variant.id, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    let view = app.state.services.cart.get_cart_view(user).await.unwrap();
    assert_eq!(view.items[0].item.quantity, 1, "rejected add must not change the line");
}

#[tokio::test]
async fn add_rejects_out_of_stock_variant() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let variant = app.seed_variant("Empty Shelf", 0).await;

    let err = app
        .state
        .services
        .cart
        .add_item(user, add(variant.id, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));
}

#[tokio::test]
async fn add_rejects_inactive_variant() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let variant = app.seed_variant("Retired Item", 5).await;
    app.deactivate_variant(variant.id).await;

    let err = app
        .state
        .services
        .cart
        .add_item(user, add(variant.id, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn update_quantity_enforces_bounds() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let variant = app.seed_variant("Rope Coil", 4).await;

    let item = app
        .state
        .services
        .cart
        .add_item(user, add(variant.id, Some(2)))
        .await
        .unwrap();

    // Below one
    let err = app
        .state
        .services
        .cart
        .update_item_quantity(user, item.id, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Beyond live stock
    let err = app
        .state
        .services
        .cart
        .update_item_quantity(user, item.id, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // Within stock
    let item = app
        .state
        .services
        .cart
        .update_item_quantity(user, item.id, 4)
        .await
        .unwrap();
    assert_eq!(item.quantity, 4);
}

#[tokio::test]
async fn remove_item_deletes_only_that_line() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let first = app.seed_variant("First", 5).await;
    let second = app.seed_variant("Second", 5).await;

    let kept = app
        .state
        .services
        .cart
        .add_item(user, add(first.id, None))
        .await
        .unwrap();
    let removed = app
        .state
        .services
        .cart
        .add_item(user, add(second.id, None))
        .await
        .unwrap();

    app.state
        .services
        .cart
        .remove_item(user, removed.id)
        .await
        .expect("remove");

    let view = app.state.services.cart.get_cart_view(user).await.unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].item.id, kept.id);

    let err = app
        .state
        .services
        .cart
        .remove_item(user, removed.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn catalog_price_change_never_touches_the_snapshot() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let variant = app.seed_variant("Wool Blanket", 5).await;

    app.state
        .services
        .cart
        .add_item(user, add(variant.id, None))
        .await
        .unwrap();

    // The catalog collaborator doubles the rate after the item is in the cart.
    app.set_price_per_kg(variant.id, 60000).await;

    let view = app.state.services.cart.get_cart_view(user).await.unwrap();
    assert_eq!(view.items[0].item.unit_price_minor, 45000);
    assert_eq!(view.items[0].status, CartLineStatus::Valid);
    assert_eq!(view.subtotal_minor, 45000);
}

#[tokio::test]
async fn availability_is_always_live() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let variant = app.seed_variant("Mess Kit", 5).await;

    app.state
        .services
        .cart
        .add_item(user, add(variant.id, Some(3)))
        .await
        .unwrap();

    // Stock drops below the cart quantity
    app.set_stock(variant.id, 2).await;
    let view = app.state.services.cart.get_cart_view(user).await.unwrap();
    assert_eq!(view.items[0].status, CartLineStatus::InsufficientStock);
    assert!(!view.checkout_allowed);

    // Stock runs out entirely
    app.set_stock(variant.id, 0).await;
    let view = app.state.services.cart.get_cart_view(user).await.unwrap();
    assert_eq!(view.items[0].status, CartLineStatus::OutOfStock);

    // Variant disabled wins over stock
    app.deactivate_variant(variant.id).await;
    let view = app.state.services.cart.get_cart_view(user).await.unwrap();
    assert_eq!(view.items[0].status, CartLineStatus::Disabled);

    // Back in stock and active again
    app.set_stock(variant.id, 5).await;
    app.activate_variant(variant.id).await;

    let view = app.state.services.cart.get_cart_view(user).await.unwrap();
    assert_eq!(view.items[0].status, CartLineStatus::Valid);
    assert!(view.checkout_allowed);
}

#[tokio::test]
async fn checkoutability_follows_line_statuses() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let variant = app.seed_variant("Gatekeeper", 3).await;

    app.state
        .services
        .cart
        .add_item(user, add(variant.id, Some(3)))
        .await
        .unwrap();
    let cart = app
        .state
        .services
        .cart
        .get_or_create_cart(user)
        .await
        .unwrap();

    assert!(
        surplus_store_api::services::inventory::cart_is_checkoutable(&*app.state.db, cart.id)
            .await
            .unwrap()
    );

    app.set_stock(variant.id, 2).await;
    assert!(
        !surplus_store_api::services::inventory::cart_is_checkoutable(&*app.state.db, cart.id)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn empty_and_lazy_cart_view() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    // No cart row yet
    let view = app.state.services.cart.get_cart_view(user).await.unwrap();
    assert!(view.cart_id.is_none());
    assert!(view.items.is_empty());
    assert_eq!(view.subtotal_minor, 0);
    assert!(!view.checkout_allowed);

    // Lazy creation is idempotent
    let first = app
        .state
        .services
        .cart
        .get_or_create_cart(user)
        .await
        .unwrap();
    let second = app
        .state
        .services
        .cart
        .get_or_create_cart(user)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn carts_are_isolated_per_user() {
    let app = TestApp::new().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let variant = app.seed_variant("Shared Variant", 10).await;

    app.state
        .services
        .cart
        .add_item(alice, add(variant.id, Some(2)))
        .await
        .unwrap();

    let bobs_view = app.state.services.cart.get_cart_view(bob).await.unwrap();
    assert!(bobs_view.items.is_empty());

    let item = app
        .state
        .services
        .cart
        .add_item(bob, add(variant.id, Some(1)))
        .await
        .unwrap();
    let alices_view = app.state.services.cart.get_cart_view(alice).await.unwrap();
    assert_eq!(alices_view.items[0].item.quantity, 2);
    assert_ne!(alices_view.items[0].item.id, item.id);
}
