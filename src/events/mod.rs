use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

/// Handle used by services to publish domain events.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    /// Event delivery must never abort the business operation that emitted it.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Event delivery failed: {}", e);
        }
    }
}

// The various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    BookCreated(i32),
    BookUpdated(i32),
    BookDeleted(i32),
    GenreCreated(i32),
    GenreUpdated(i32),
    GenreDeleted(i32),

    // Cart events
    CartItemAdded { user_id: i32, book_id: i32 },
    CartItemUpdated { user_id: i32, cart_item_id: i32 },
    CartItemRemoved { user_id: i32, cart_item_id: i32 },
    CartCleared(i32),

    // Checkout events
    CheckoutCompleted {
        user_id: i32,
        checkout_id: Uuid,
        order_count: usize,
        total: Decimal,
    },

    // Order events
    OrderStatusChanged {
        order_id: i32,
        old_status: String,
        new_status: String,
    },

    // Account events
    UserRegistered(i32),
}

/// Consumes domain events for the lifetime of the process.
///
/// Currently events only feed structured logging; the channel boundary keeps
/// handlers and services free of any knowledge of downstream consumers.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "domain event");
    }
    info!("event channel closed, stopping event processor");
}
