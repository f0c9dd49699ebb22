use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::Identity,
    errors::ApiError,
    services::catalog::{CreateBookInput, UpdateBookInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

/// Creates the router for book endpoints. Reads are public; every mutation is
/// an administrator operation.
pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_books).post(create_book))
        .route("/search", get(search_books))
        .route("/filter", get(filter_books))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
}

/// List all books
pub async fn get_books(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let books = state
        .services
        .catalog
        .list_books()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(books))
}

/// Get a book by id
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state
        .services
        .catalog
        .get_book(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(book))
}

/// Search books by title and/or author substring
pub async fn search_books(
    State(state): State<AppState>,
    Query(query): Query<SearchBooksQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let books = state
        .services
        .catalog
        .search_books(query.title, query.author)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(books))
}

/// Filter books by genre and/or price bounds
pub async fn filter_books(
    State(state): State<AppState>,
    Query(query): Query<FilterBooksQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let books = state
        .services
        .catalog
        .filter_books(query.genre_id, query.min_price, query.max_price)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(books))
}

/// Create a book (administrator)
pub async fn create_book(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin().map_err(map_service_error)?;
    validate_input(&payload)?;

    let input = CreateBookInput {
        title: payload.title,
        author: payload.author,
        price: payload.price,
        stock: payload.stock,
        genre_id: payload.genre_id,
    };

    let book = state
        .services
        .catalog
        .create_book(input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(book))
}

/// Update a book (administrator)
pub async fn update_book(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin().map_err(map_service_error)?;
    validate_input(&payload)?;

    let input = UpdateBookInput {
        id: payload.id,
        title: payload.title,
        author: payload.author,
        price: payload.price,
        stock: payload.stock,
        genre_id: payload.genre_id,
    };

    state
        .services
        .catalog
        .update_book(id, input)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Delete a book (administrator); returns the removed book
pub async fn delete_book(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin().map_err(map_service_error)?;

    let book = state
        .services
        .catalog
        .delete_book(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(book))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub author: String,
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock: i32,
    pub genre_id: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub id: i32,
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub author: String,
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock: i32,
    pub genre_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct SearchBooksQuery {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterBooksQuery {
    pub genre_id: Option<i32>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}
