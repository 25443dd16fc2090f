/// Checkout engine entities
pub mod cart;
pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod product_variant;
pub mod promo_code;
pub mod promo_usage;

// Re-export entities
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus, PaymentStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product_variant::{Entity as ProductVariant, Model as ProductVariantModel};
pub use promo_code::{DiscountType, Entity as PromoCode, Model as PromoCodeModel};
pub use promo_usage::{Entity as PromoUsage, Model as PromoUsageModel};
