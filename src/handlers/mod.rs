use crate::{auth::AuthService, db::DbPool, events::EventSender, services};
use std::sync::Arc;

pub mod books;
pub mod cart;
pub mod common;
pub mod genres;
pub mod orders;
pub mod users;

/// Aggregated services used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<services::catalog::CatalogService>,
    pub cart: Arc<services::cart::CartService>,
    pub checkout: Arc<services::checkout::CheckoutService>,
    pub orders: Arc<services::orders::OrderService>,
    pub users: Arc<services::users::UserService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
    ) -> Self {
        let catalog = Arc::new(services::catalog::CatalogService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let cart = Arc::new(services::cart::CartService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let checkout = Arc::new(services::checkout::CheckoutService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let orders = Arc::new(services::orders::OrderService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let users = Arc::new(services::users::UserService::new(
            db,
            auth_service,
            event_sender,
        ));

        Self {
            catalog,
            cart,
            checkout,
            orders,
            users,
        }
    }
}
