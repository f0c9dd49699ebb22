//! Bookstore API Library
//!
//! This crate provides the core functionality for the bookstore API
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod openapi;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Full API surface, mounted by `main` under `/api`.
///
/// Identity resolution happens in middleware before any of these routes run;
/// each handler gates itself with the resolved identity, so no route here is
/// wrapped in a rejecting auth layer.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Accounts
        .nest("/auth", handlers::users::auth_routes())
        // Catalog
        .nest("/books", handlers::books::book_routes())
        .nest("/genres", handlers::genres::genre_routes())
        // Cart and checkout
        .nest("/cart", handlers::cart::cart_routes())
        // Orders
        .nest("/order", handlers::orders::order_routes())
}

async fn api_status() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    Json(json!({
        "status": "ok",
        "service": "bookstore-api",
        "version": version,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
