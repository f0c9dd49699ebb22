// Shared across several integration-test binaries; not every binary uses
// every helper.
#![allow(dead_code)]

use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DbBackend, Schema};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower::ServiceExt;

use bookstore_api::{
    api_routes,
    auth::{identity_middleware, AuthConfig, AuthService},
    config::AppConfig,
    entities,
    events::{self, EventSender},
    handlers::AppServices,
    services::catalog::{CreateBookInput, CreateGenreInput},
    AppState,
};

const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_64_characters_long_xx";

/// Helper harness: the full application router backed by an in-memory SQLite
/// database with the schema created from the entity definitions.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        // A single connection keeps every query on the same in-memory database.
        let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
        options.max_connections(1).min_connections(1);
        let db = Database::connect(options)
            .await
            .expect("failed to create test database");

        let schema = Schema::new(DbBackend::Sqlite);
        let backend = db.get_database_backend();
        db.execute(backend.build(&schema.create_table_from_entity(entities::Genre)))
            .await
            .expect("create genres table");
        db.execute(backend.build(&schema.create_table_from_entity(entities::Book)))
            .await
            .expect("create books table");
        db.execute(backend.build(&schema.create_table_from_entity(entities::User)))
            .await
            .expect("create users table");
        db.execute(backend.build(&schema.create_table_from_entity(entities::CartItem)))
            .await
            .expect("create cart_items table");
        db.execute(backend.build(&schema.create_table_from_entity(entities::Order)))
            .await
            .expect("create orders table");

        let db = Arc::new(db);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(AuthConfig::new(
            TEST_JWT_SECRET.to_string(),
            "bookstore-auth".to_string(),
            "bookstore-api".to_string(),
            Duration::from_secs(3600),
        )));

        let services = AppServices::new(
            db.clone(),
            Arc::new(event_sender.clone()),
            auth_service.clone(),
        );

        let state = AppState {
            db,
            config: test_config(),
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api", api_routes())
            .layer(axum::middleware::from_fn_with_state(
                auth_service,
                identity_middleware,
            ))
            .with_state(state.clone());

        Self { router, state }
    }

    /// Send a request through the full router, optionally authenticated.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Register an account and log it in, returning the bearer token.
    pub async fn register_and_login(&self, name: &str, email: &str, role: &str) -> String {
        let register = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": name,
                    "email": email,
                    "password": "password1",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(register.status(), StatusCode::OK, "registration failed");

        let login = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": "password1" })),
            )
            .await;
        assert_eq!(login.status(), StatusCode::OK, "login failed");

        let body = response_json(login).await;
        body["token"].as_str().expect("token in login body").to_string()
    }

    /// Seed a genre directly through the catalog service.
    pub async fn seed_genre(&self, name: &str) -> i32 {
        self.state
            .services
            .catalog
            .create_genre(CreateGenreInput {
                name: name.to_string(),
            })
            .await
            .expect("seed genre")
            .id
    }

    /// Seed a book directly through the catalog service.
    pub async fn seed_book(
        &self,
        title: &str,
        author: &str,
        price: Decimal,
        stock: i32,
        genre_id: i32,
    ) -> i32 {
        self.state
            .services
            .catalog
            .create_book(CreateBookInput {
                title: title.to_string(),
                author: author.to_string(),
                price,
                stock,
                genre_id,
            })
            .await
            .expect("seed book")
            .id
    }

    pub async fn book_stock(&self, id: i32) -> i32 {
        self.state
            .services
            .catalog
            .get_book(id)
            .await
            .expect("book exists")
            .stock
    }

    pub async fn genre_book_count(&self, id: i32) -> i32 {
        self.state
            .services
            .catalog
            .get_genre(id)
            .await
            .expect("genre exists")
            .book_count
    }
}

/// Deserialize a response body as JSON.
pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Standard shipping payload for checkout requests.
pub fn shipping_details() -> Value {
    json!({
        "fullName": "Paul Atreides",
        "email": "paul@example.com",
        "phoneNumber": "+1-555-010-0001",
        "shippingAddress": "1 Sietch Tabr",
        "city": "Arrakeen",
        "postalCode": "00001",
    })
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_expiration: 3600,
        auth_issuer: "bookstore-auth".to_string(),
        auth_audience: "bookstore-api".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        log_level: "info".to_string(),
        log_json: false,
        cors_allowed_origins: None,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 30,
        db_idle_timeout_secs: 600,
        db_acquire_timeout_secs: 8,
    }
}
