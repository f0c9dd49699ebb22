use crate::{
    entities::{book, cart_item, Book, CartItem},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Shopping cart service.
///
/// A cart is the set of `cart_items` rows owned by one user; there is no cart
/// header row. At most one line exists per (user, book) pair; adding an
/// already-present book merges quantities into the existing line. The unit
/// price is snapshotted from the catalog at the time of the first add and is
/// what checkout later charges.
///
/// Every operation takes the owning user's id as resolved by the
/// authorization gate; a line that exists but belongs to someone else is
/// reported as absent.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Returns the user's cart lines joined with live book details, plus the
    /// total computed from the snapshotted unit prices.
    #[instrument(skip(self))]
    pub async fn list(&self, user_id: i32) -> Result<CartView, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .find_also_related(Book)
            .all(&*self.db)
            .await?;

        let cart_items: Vec<CartLine> = rows
            .into_iter()
            .filter_map(|(item, book)| book.map(|book| CartLine::new(item, book)))
            .collect();

        let total_price = cart_items
            .iter()
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum();

        Ok(CartView {
            cart_items,
            total_price,
        })
    }

    /// Adds a book to the cart, merging into an existing line when the book
    /// is already present. The catalog price is snapshotted on first add.
    #[instrument(skip(self))]
    pub async fn add_item(&self, user_id: i32, input: AddToCartInput) -> Result<(), ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let book = Book::find_by_id(input.book_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Book not found".to_string()))?;

        let existing = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::BookId.eq(input.book_id))
            .one(&txn)
            .await?;

        if let Some(item) = existing {
            let quantity = item.quantity;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(quantity + input.quantity);
            item.updated_at = Set(Utc::now());
            item.update(&txn).await?;
        } else {
            let item = cart_item::ActiveModel {
                user_id: Set(user_id),
                book_id: Set(input.book_id),
                quantity: Set(input.quantity),
                unit_price: Set(book.price),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
                ..Default::default()
            };
            item.insert(&txn).await?;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id,
                book_id: input.book_id,
            })
            .await;

        info!(
            "Added book {} x{} to cart of user {}",
            input.book_id, input.quantity, user_id
        );
        Ok(())
    }

    /// Updates the quantity of a cart line owned by the user. The referenced
    /// book must still exist; the price snapshot is left untouched.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: i32,
        cart_item_id: i32,
        input: UpdateCartItemInput,
    ) -> Result<(), ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let item = CartItem::find_by_id(cart_item_id)
            .one(&txn)
            .await?
            .filter(|item| item.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;

        if input.book_id <= 0 {
            return Err(ServiceError::ValidationError("Invalid bookId.".to_string()));
        }
        Book::find_by_id(input.book_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Book not found".to_string()))?;

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(input.quantity);
        item.updated_at = Set(Utc::now());
        item.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                user_id,
                cart_item_id,
            })
            .await;

        Ok(())
    }

    /// Removes a cart line owned by the user.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: i32, cart_item_id: i32) -> Result<(), ServiceError> {
        let item = CartItem::find_by_id(cart_item_id)
            .one(&*self.db)
            .await?
            .filter(|item| item.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;

        item.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                user_id,
                cart_item_id,
            })
            .await;

        Ok(())
    }

    /// Deletes every cart line owned by the user.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: i32) -> Result<(), ServiceError> {
        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        self.event_sender.send_or_log(Event::CartCleared(user_id)).await;

        info!("Cleared cart of user {}", user_id);
        Ok(())
    }
}

/// Input for adding an item to the cart
#[derive(Debug, Deserialize)]
pub struct AddToCartInput {
    pub book_id: i32,
    pub quantity: i32,
}

/// Input for updating a cart line
#[derive(Debug, Deserialize)]
pub struct UpdateCartItemInput {
    pub book_id: i32,
    pub quantity: i32,
}

/// One cart line joined with live book details.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: i32,
    pub book_id: i32,
    pub quantity: i32,
    /// Price snapshotted when the line was first added
    pub unit_price: Decimal,
    pub title: String,
    pub author: String,
    /// Current catalog price, which may differ from the snapshot
    pub price: Decimal,
}

impl CartLine {
    fn new(item: cart_item::Model, book: book::Model) -> Self {
        Self {
            id: item.id,
            book_id: item.book_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            title: book.title,
            author: book.author,
            price: book.price,
        }
    }
}

/// A user's cart: lines plus the snapshot-priced total.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_items: Vec<CartLine>,
    pub total_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(quantity: i32, unit_price: Decimal, live_price: Decimal) -> CartLine {
        CartLine {
            id: 1,
            book_id: 1,
            quantity,
            unit_price,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            price: live_price,
        }
    }

    #[test]
    fn total_uses_snapshot_price_not_live_price() {
        let lines = vec![line(2, dec!(12.00), dec!(15.00))];
        let total: Decimal = lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();
        assert_eq!(total, dec!(24.00));
    }

    #[test]
    fn total_sums_across_lines() {
        let lines = vec![
            line(2, dec!(12.00), dec!(12.00)),
            line(1, dec!(7.50), dec!(7.50)),
            line(3, dec!(0.99), dec!(0.99)),
        ];
        let total: Decimal = lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();
        assert_eq!(total, dec!(34.47));
    }

    #[test]
    fn cart_view_serializes_camel_case() {
        let view = CartView {
            cart_items: vec![line(1, dec!(5.00), dec!(5.00))],
            total_price: dec!(5.00),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("cartItems").is_some());
        assert!(json.get("totalPrice").is_some());
        assert!(json["cartItems"][0].get("unitPrice").is_some());
        assert!(json["cartItems"][0].get("bookId").is_some());
    }
}
