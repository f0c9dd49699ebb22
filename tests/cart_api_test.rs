//! Integration tests for cart management: merge-on-add, price snapshots,
//! ownership scoping, and line lifecycle.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::str::FromStr;

fn decimal_field(value: &serde_json::Value) -> Decimal {
    match value {
        serde_json::Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected decimal, got {other:?}"),
    }
}

#[tokio::test]
async fn adding_same_book_twice_merges_into_one_line() {
    let app = TestApp::new().await;
    let genre = app.seed_genre("Science Fiction").await;
    let book = app
        .seed_book("Dune", "Frank Herbert", dec!(12.00), 20, genre)
        .await;
    let token = app.register_and_login("Paul", "paul@example.com", "User").await;

    for quantity in [2, 3] {
        let add = app
            .request(
                Method::POST,
                "/api/cart",
                Some(&token),
                Some(json!({ "bookId": book, "quantity": quantity })),
            )
            .await;
        assert_eq!(add.status(), StatusCode::OK);
    }

    let cart = response_json(app.request(Method::GET, "/api/cart", Some(&token), None).await).await;
    let items = cart["cartItems"].as_array().unwrap();
    assert_eq!(items.len(), 1, "one row per (user, book) pair");
    assert_eq!(items[0]["quantity"], json!(5));
    assert_eq!(decimal_field(&cart["totalPrice"]), dec!(60.00));
}

#[tokio::test]
async fn cart_keeps_price_snapshot_when_catalog_price_changes() {
    let app = TestApp::new().await;
    let genre = app.seed_genre("Science Fiction").await;
    let book = app
        .seed_book("Dune", "Frank Herbert", dec!(12.00), 20, genre)
        .await;
    let token = app.register_and_login("Paul", "paul@example.com", "User").await;

    app.request(
        Method::POST,
        "/api/cart",
        Some(&token),
        Some(json!({ "bookId": book, "quantity": 2 })),
    )
    .await;

    // Catalog price changes after the add
    app.state
        .services
        .catalog
        .update_book(
            book,
            bookstore_api::services::catalog::UpdateBookInput {
                id: book,
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                price: dec!(15.00),
                stock: 20,
                genre_id: genre,
            },
        )
        .await
        .unwrap();

    let cart = response_json(app.request(Method::GET, "/api/cart", Some(&token), None).await).await;
    let line = &cart["cartItems"][0];
    assert_eq!(decimal_field(&line["unitPrice"]), dec!(12.00));
    assert_eq!(decimal_field(&line["price"]), dec!(15.00));
    // The total charges the price at add time
    assert_eq!(decimal_field(&cart["totalPrice"]), dec!(24.00));
}

#[tokio::test]
async fn adding_missing_book_is_not_found() {
    let app = TestApp::new().await;
    let token = app.register_and_login("Paul", "paul@example.com", "User").await;

    let add = app
        .request(
            Method::POST,
            "/api/cart",
            Some(&token),
            Some(json!({ "bookId": 999, "quantity": 1 })),
        )
        .await;
    assert_eq!(add.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn zero_quantity_add_is_a_validation_failure() {
    let app = TestApp::new().await;
    let genre = app.seed_genre("Science Fiction").await;
    let book = app
        .seed_book("Dune", "Frank Herbert", dec!(12.00), 20, genre)
        .await;
    let token = app.register_and_login("Paul", "paul@example.com", "User").await;

    let add = app
        .request(
            Method::POST,
            "/api/cart",
            Some(&token),
            Some(json!({ "bookId": book, "quantity": 0 })),
        )
        .await;
    assert_eq!(add.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn updating_a_line_changes_quantity_only() {
    let app = TestApp::new().await;
    let genre = app.seed_genre("Science Fiction").await;
    let book = app
        .seed_book("Dune", "Frank Herbert", dec!(12.00), 20, genre)
        .await;
    let token = app.register_and_login("Paul", "paul@example.com", "User").await;

    app.request(
        Method::POST,
        "/api/cart",
        Some(&token),
        Some(json!({ "bookId": book, "quantity": 2 })),
    )
    .await;

    let cart = response_json(app.request(Method::GET, "/api/cart", Some(&token), None).await).await;
    let line_id = cart["cartItems"][0]["id"].as_i64().unwrap();

    let update = app
        .request(
            Method::PUT,
            &format!("/api/cart/{line_id}"),
            Some(&token),
            Some(json!({ "bookId": book, "quantity": 7 })),
        )
        .await;
    assert_eq!(update.status(), StatusCode::OK);

    let cart = response_json(app.request(Method::GET, "/api/cart", Some(&token), None).await).await;
    assert_eq!(cart["cartItems"][0]["quantity"], json!(7));
    assert_eq!(decimal_field(&cart["cartItems"][0]["unitPrice"]), dec!(12.00));
}

#[tokio::test]
async fn another_users_line_is_reported_absent() {
    let app = TestApp::new().await;
    let genre = app.seed_genre("Science Fiction").await;
    let book = app
        .seed_book("Dune", "Frank Herbert", dec!(12.00), 20, genre)
        .await;

    let owner = app.register_and_login("Paul", "paul@example.com", "User").await;
    let intruder = app
        .register_and_login("Feyd", "feyd@example.com", "User")
        .await;

    app.request(
        Method::POST,
        "/api/cart",
        Some(&owner),
        Some(json!({ "bookId": book, "quantity": 1 })),
    )
    .await;

    let cart = response_json(app.request(Method::GET, "/api/cart", Some(&owner), None).await).await;
    let line_id = cart["cartItems"][0]["id"].as_i64().unwrap();

    // Existence must not leak: not-owned behaves exactly like absent
    let update = app
        .request(
            Method::PUT,
            &format!("/api/cart/{line_id}"),
            Some(&intruder),
            Some(json!({ "bookId": book, "quantity": 5 })),
        )
        .await;
    assert_eq!(update.status(), StatusCode::NOT_FOUND);

    let remove = app
        .request(
            Method::DELETE,
            &format!("/api/cart/{line_id}"),
            Some(&intruder),
            None,
        )
        .await;
    assert_eq!(remove.status(), StatusCode::NOT_FOUND);

    // The owner's line is untouched
    let cart = response_json(app.request(Method::GET, "/api/cart", Some(&owner), None).await).await;
    assert_eq!(cart["cartItems"][0]["quantity"], json!(1));
}

#[tokio::test]
async fn removing_a_line_then_clearing_the_cart() {
    let app = TestApp::new().await;
    let genre = app.seed_genre("Science Fiction").await;
    let first = app
        .seed_book("Dune", "Frank Herbert", dec!(12.00), 20, genre)
        .await;
    let second = app
        .seed_book("Hyperion", "Dan Simmons", dec!(9.00), 20, genre)
        .await;
    let token = app.register_and_login("Paul", "paul@example.com", "User").await;

    for book in [first, second] {
        app.request(
            Method::POST,
            "/api/cart",
            Some(&token),
            Some(json!({ "bookId": book, "quantity": 1 })),
        )
        .await;
    }

    let cart = response_json(app.request(Method::GET, "/api/cart", Some(&token), None).await).await;
    let line_id = cart["cartItems"][0]["id"].as_i64().unwrap();

    let remove = app
        .request(
            Method::DELETE,
            &format!("/api/cart/{line_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(remove.status(), StatusCode::NO_CONTENT);

    // Removing again: the line no longer exists
    let again = app
        .request(
            Method::DELETE,
            &format!("/api/cart/{line_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let clear = app
        .request(Method::DELETE, "/api/cart/clear", Some(&token), None)
        .await;
    assert_eq!(clear.status(), StatusCode::OK);

    let cart = response_json(app.request(Method::GET, "/api/cart", Some(&token), None).await).await;
    assert!(cart["cartItems"].as_array().unwrap().is_empty());
}
