use crate::{
    entities::{
        book, cart_item,
        order::{self, OrderStatus},
        Book, CartItem,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Checkout service: converts a user's cart into persisted orders and
/// decrements stock, as one atomic unit.
///
/// The whole transition runs in a single database transaction. Stock is
/// decremented with a conditional update (`stock >= quantity` in the WHERE
/// clause), so two checkouts racing over the same book cannot both succeed
/// past the available stock: the write that loses the race matches zero rows
/// and the entire operation is rolled back and rejected. Nothing is retried
/// automatically; the caller resubmits in full.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Converts the user's cart into one order row per cart line.
    ///
    /// Steps, all inside one transaction:
    /// 1. Load the cart joined with current book state; an empty cart fails.
    /// 2. Total the cart from the snapshotted unit prices (price-at-add-time,
    ///    not the live catalog price).
    /// 3. Validate every line against current stock; the first shortfall
    ///    aborts the whole operation naming the offending title.
    /// 4. Conditionally decrement each book's stock and insert one order row
    ///    per line, all rows sharing the checkout id, shipping details, and
    ///    batch total, with initial status `Pending`.
    /// 5. Delete the user's cart lines and commit.
    ///
    /// If a concurrent writer invalidates a validated quantity between steps
    /// 3 and 4, the conditional decrement matches no rows and the operation
    /// fails as a whole: no partial orders, no partial stock decrements, and
    /// the cart is left untouched.
    #[instrument(skip(self, details))]
    pub async fn checkout(
        &self,
        user_id: i32,
        details: ShippingDetails,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let txn = self.db.begin().await?;

        let rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .find_also_related(Book)
            .all(&txn)
            .await?;

        if rows.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let mut lines = Vec::with_capacity(rows.len());
        for (item, book) in rows {
            let book = book.ok_or_else(|| {
                ServiceError::NotFound(format!("Book {} no longer exists", item.book_id))
            })?;
            lines.push((item, book));
        }

        let total_price = batch_total(lines.iter().map(|(item, _)| item));

        for (item, book) in &lines {
            if item.quantity > book.stock {
                return Err(ServiceError::InsufficientStock(book.title.clone()));
            }
        }

        let checkout_id = Uuid::new_v4();
        let now = Utc::now();
        let mut orders = Vec::with_capacity(lines.len());

        for (item, book) in &lines {
            // Conditional decrement: matches only while enough stock remains.
            let result = Book::update_many()
                .col_expr(
                    book::Column::Stock,
                    Expr::col(book::Column::Stock).sub(item.quantity),
                )
                .filter(book::Column::Id.eq(book.id))
                .filter(book::Column::Stock.gte(item.quantity))
                .exec(&txn)
                .await?;

            if result.rows_affected == 0 {
                return Err(ServiceError::CheckoutFailed(format!(
                    "stock for '{}' changed during checkout",
                    book.title
                )));
            }

            let order = order::ActiveModel {
                checkout_id: Set(checkout_id),
                user_id: Set(user_id),
                total_amount: Set(total_price),
                order_date: Set(now),
                full_name: Set(details.full_name.clone()),
                email: Set(details.email.clone()),
                phone_number: Set(details.phone_number.clone()),
                shipping_address: Set(details.shipping_address.clone()),
                city: Set(details.city.clone()),
                postal_code: Set(details.postal_code.clone()),
                book_id: Set(book.id),
                book_title: Set(book.title.clone()),
                book_price: Set(item.unit_price),
                quantity: Set(item.quantity),
                status: Set(OrderStatus::Pending),
                ..Default::default()
            };
            orders.push(order.insert(&txn).await?);
        }

        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CheckoutCompleted {
                user_id,
                checkout_id,
                order_count: orders.len(),
                total: total_price,
            })
            .await;

        info!(
            "Checkout {} for user {}: {} orders, total {}",
            checkout_id,
            user_id,
            orders.len(),
            total_price
        );

        Ok(CheckoutOutcome {
            checkout_id,
            orders,
            total_price,
        })
    }
}

/// Total of a cart computed from the snapshotted unit prices.
fn batch_total<'a>(items: impl Iterator<Item = &'a cart_item::Model>) -> Decimal {
    items
        .map(|item| item.unit_price * Decimal::from(item.quantity))
        .sum()
}

/// Shipping and contact details shared by every order row of one checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct ShippingDetails {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub shipping_address: String,
    pub city: String,
    pub postal_code: String,
}

/// Result of a successful checkout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutcome {
    pub checkout_id: Uuid,
    pub orders: Vec<order::Model>,
    pub total_price: Decimal,
}
