use crate::handlers::common::{
    map_service_error, message_response, no_content_response, success_response, validate_input,
};
use crate::{
    auth::Identity,
    errors::ApiError,
    services::cart::{AddToCartInput, UpdateCartItemInput},
    services::checkout::ShippingDetails,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for cart endpoints. Every operation requires the User
/// role; the resolved identity scopes each one to the caller's own cart.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).post(add_cart_item))
        .route("/clear", delete(clear_cart))
        .route("/checkout", post(checkout))
        .route("/{id}", put(update_cart_item).delete(remove_cart_item))
}

/// Get the current user's cart with its computed total
#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart lines joined with book details plus totalPrice"),
        (status = 401, description = "Missing credential or wrong role", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity.require_user().map_err(map_service_error)?;

    let view = state
        .services
        .cart
        .list(user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(view))
}

/// Add a book to the cart, merging quantity if it is already present
#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Item added to cart"),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing credential or wrong role", body = crate::errors::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn add_cart_item(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<AddCartItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity.require_user().map_err(map_service_error)?;
    validate_input(&payload)?;

    let input = AddToCartInput {
        book_id: payload.book_id,
        quantity: payload.quantity,
    };

    state
        .services
        .cart
        .add_item(user_id, input)
        .await
        .map_err(map_service_error)?;

    Ok(message_response("Item added to cart"))
}

/// Update a cart line's quantity
#[utoipa::path(
    put,
    path = "/api/cart/{id}",
    params(("id" = i32, Path, description = "Cart item id")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Cart item updated"),
        (status = 400, description = "Invalid book reference or quantity", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing credential or wrong role", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart item absent or owned by someone else", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity.require_user().map_err(map_service_error)?;
    validate_input(&payload)?;

    let input = UpdateCartItemInput {
        book_id: payload.book_id,
        quantity: payload.quantity,
    };

    state
        .services
        .cart
        .update_item(user_id, id, input)
        .await
        .map_err(map_service_error)?;

    Ok(message_response("Cart item updated successfully"))
}

/// Remove a cart line
#[utoipa::path(
    delete,
    path = "/api/cart/{id}",
    params(("id" = i32, Path, description = "Cart item id")),
    responses(
        (status = 204, description = "Cart item removed"),
        (status = 401, description = "Missing credential or wrong role", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart item absent or owned by someone else", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity.require_user().map_err(map_service_error)?;

    state
        .services
        .cart
        .remove_item(user_id, id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Empty the current user's cart
#[utoipa::path(
    delete,
    path = "/api/cart/clear",
    responses(
        (status = 200, description = "Cart cleared"),
        (status = 401, description = "Missing credential or wrong role", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity.require_user().map_err(map_service_error)?;

    state
        .services
        .cart
        .clear(user_id)
        .await
        .map_err(map_service_error)?;

    Ok(message_response("Cart cleared"))
}

/// Convert the cart into an order batch, decrementing stock atomically
#[utoipa::path(
    post,
    path = "/api/cart/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checkout successful; body carries totalPrice and checkoutId"),
        (status = 400, description = "Empty cart or not enough stock", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing credential or wrong role", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent stock change; resubmit the checkout", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn checkout(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity.require_user().map_err(map_service_error)?;
    validate_input(&payload)?;

    let details = ShippingDetails {
        full_name: payload.full_name,
        email: payload.email,
        phone_number: payload.phone_number,
        shipping_address: payload.shipping_address,
        city: payload.city,
        postal_code: payload.postal_code,
    };

    let outcome = state
        .services
        .checkout
        .checkout(user_id, details)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "success": true,
        "message": "Checkout successful",
        "checkoutId": outcome.checkout_id,
        "totalPrice": outcome.total_price,
    })))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    pub book_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    pub book_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(length(min = 1))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub phone_number: String,
    #[validate(length(min = 1))]
    pub shipping_address: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub postal_code: String,
}
