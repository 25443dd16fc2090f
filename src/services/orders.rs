use crate::{
    config::AppConfig,
    entities::{
        order, order_item, Order, OrderItem, OrderItemModel, OrderModel, OrderStatus,
        PaymentStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Order read and lifecycle service.
///
/// Orders are immutable after checkout except for status transitions; the
/// legal moves live on `OrderStatus::can_transition_to`. Payment transitions
/// are placeholder edges for the external payment collaborator to drive.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

/// An order with its frozen line items
#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Fetches one of the user's orders by its public identifier.
    #[instrument(skip(self))]
    pub async fn get_order_for_user(
        &self,
        user_id: Uuid,
        public_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        let order = self.find_for_user(&*self.db, user_id, public_id).await?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(OrderWithItems { order, items })
    }

    /// Lists the user's orders, newest first.
    pub async fn list_orders_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((data, total))
    }

    /// Cancels an order that has not been paid yet, returning its units to
    /// stock in the same transaction when checkout took them.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        user_id: Uuid,
        public_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let order = self.find_for_user(&txn, user_id, public_id).await?;
        let old_status = order.status;

        if !old_status.can_transition_to(OrderStatus::Cancelled) {
            return Err(ServiceError::InvalidOperation(
                "Order can no longer be cancelled".to_string(),
            ));
        }

        let mut restocked = Vec::new();
        if self.config.decrement_stock_on_order {
            let items = OrderItem::find()
                .filter(order_item::Column::OrderId.eq(order.id))
                .all(&txn)
                .await?;
            for item in items {
                inventory::restock(&txn, item.variant_id, item.quantity).await?;
                restocked.push((item.variant_id, item.quantity));
            }
        }

        let order = self
            .transition(&txn, order, OrderStatus::Cancelled, None)
            .await?;
        txn.commit().await?;

        for (variant_id, quantity) in restocked {
            self.event_sender
                .send_or_log(Event::StockRestored {
                    variant_id,
                    quantity,
                })
                .await;
        }
        self.event_sender
            .send_or_log(Event::OrderCancelled(order.id))
            .await;
        self.event_sender
            .send_or_log(status_changed(&order, old_status))
            .await;

        info!("Cancelled order {}", order.public_id);
        Ok(order)
    }

    /// Moves a freshly created order into the payment flow.
    #[instrument(skip(self))]
    pub async fn begin_payment(
        &self,
        user_id: Uuid,
        public_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        let order = self.find_for_user(&*self.db, user_id, public_id).await?;
        let old_status = order.status;

        if !old_status.can_transition_to(OrderStatus::PendingPayment) {
            return Err(ServiceError::InvalidOperation(
                "Order cannot enter payment from its current state".to_string(),
            ));
        }

        let order = self
            .transition(&*self.db, order, OrderStatus::PendingPayment, None)
            .await?;

        self.event_sender
            .send_or_log(status_changed(&order, old_status))
            .await;
        Ok(order)
    }

    /// Records the payment collaborator's verdict. Success completes the
    /// `pending_payment -> paid` edge; failure leaves the order awaiting
    /// another attempt.
    #[instrument(skip(self))]
    pub async fn record_payment_result(
        &self,
        user_id: Uuid,
        public_id: Uuid,
        success: bool,
    ) -> Result<OrderModel, ServiceError> {
        let order = self.find_for_user(&*self.db, user_id, public_id).await?;
        let old_status = order.status;

        if success {
            if !old_status.can_transition_to(OrderStatus::Paid) {
                return Err(ServiceError::InvalidOperation(
                    "Order is not awaiting payment".to_string(),
                ));
            }
            let order = self
                .transition(
                    &*self.db,
                    order,
                    OrderStatus::Paid,
                    Some(PaymentStatus::Success),
                )
                .await?;
            self.event_sender
                .send_or_log(status_changed(&order, old_status))
                .await;
            Ok(order)
        } else {
            if old_status != OrderStatus::PendingPayment {
                return Err(ServiceError::InvalidOperation(
                    "Order is not awaiting payment".to_string(),
                ));
            }
            let mut active: order::ActiveModel = order.into();
            active.payment_status = Set(PaymentStatus::Failed);
            active.updated_at = Set(Utc::now());
            Ok(active.update(&*self.db).await?)
        }
    }

    async fn find_for_user<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
        public_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        Order::find()
            .filter(order::Column::PublicId.eq(public_id))
            .filter(order::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", public_id)))
    }

    async fn transition<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        order: OrderModel,
        status: OrderStatus,
        payment_status: Option<PaymentStatus>,
    ) -> Result<OrderModel, ServiceError> {
        let mut active: order::ActiveModel = order.into();
        active.status = Set(status);
        if let Some(payment_status) = payment_status {
            active.payment_status = Set(payment_status);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(conn).await?)
    }
}

fn status_changed(order: &OrderModel, old_status: OrderStatus) -> Event {
    Event::OrderStatusChanged {
        order_id: order.id,
        old_status: old_status.as_str().to_string(),
        new_status: order.status.as_str().to_string(),
    }
}
