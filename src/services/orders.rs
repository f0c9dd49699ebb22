use crate::{
    entities::{
        order::{self, OrderStatus},
        Order,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Service for querying and administering persisted orders.
///
/// Orders are created exclusively by checkout; this service never inserts or
/// deletes them. Status transitions are unrestricted within the closed status
/// set; any valid status may replace any other.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// All orders, newest first. Administrator view.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<order::Model>, ServiceError> {
        let orders = Order::find()
            .order_by_desc(order::Column::OrderDate)
            .all(&*self.db)
            .await?;

        if orders.is_empty() {
            return Err(ServiceError::NotFound("No orders found.".to_string()));
        }
        Ok(orders)
    }

    /// The given user's own orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<order::Model>, ServiceError> {
        let orders = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::OrderDate)
            .all(&*self.db)
            .await?;

        if orders.is_empty() {
            return Err(ServiceError::NotFound(
                "No orders found for this user.".to_string(),
            ));
        }
        Ok(orders)
    }

    /// Replaces an order's status with any member of the closed status set.
    /// A status string outside the set is a validation failure and leaves the
    /// order unmodified.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: i32,
        status: &str,
    ) -> Result<order::Model, ServiceError> {
        let new_status: OrderStatus = status
            .parse()
            .map_err(|_| ServiceError::InvalidStatus(status.to_string()))?;

        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                warn!(order_id, "Order not found for status update");
                ServiceError::NotFound("Order not found.".to_string())
            })?;

        let old_status = order.status;

        let mut order: order::ActiveModel = order.into();
        order.status = Set(new_status);
        let order = order.update(&txn).await?;

        txn.commit().await?;

        info!(
            order_id,
            old_status = %old_status,
            new_status = %new_status,
            "Order status updated"
        );

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            })
            .await;

        Ok(order)
    }
}
