use crate::handlers::common::{map_service_error, message_response, success_response};
use crate::{auth::Identity, errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

/// Creates the router for order endpoints. Listing everything and mutating
/// status are administrator operations; users only ever see their own rows.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/getOrders", get(get_orders))
        .route("/getUserOrders", get(get_user_orders))
        .route("/updateStatus/{id}", put(update_order_status))
}

/// List every order (administrator)
#[utoipa::path(
    get,
    path = "/api/order/getOrders",
    responses(
        (status = 200, description = "All orders, newest first"),
        (status = 401, description = "Missing credential or wrong role", body = crate::errors::ErrorResponse),
        (status = 404, description = "No orders exist", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_orders(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin().map_err(map_service_error)?;

    let orders = state
        .services
        .orders
        .list_all()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(orders))
}

/// List the current user's own orders
#[utoipa::path(
    get,
    path = "/api/order/getUserOrders",
    responses(
        (status = 200, description = "The caller's orders, newest first"),
        (status = 401, description = "Missing credential or wrong role", body = crate::errors::ErrorResponse),
        (status = 404, description = "The caller has no orders", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_user_orders(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity.require_user().map_err(map_service_error)?;

    let orders = state
        .services
        .orders
        .list_for_user(user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(orders))
}

/// Replace an order's status (administrator)
#[utoipa::path(
    put,
    path = "/api/order/updateStatus/{id}",
    params(("id" = i32, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated"),
        (status = 400, description = "Status outside the allowed set", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing credential or wrong role", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin().map_err(map_service_error)?;

    state
        .services
        .orders
        .update_status(id, &payload.status)
        .await
        .map_err(map_service_error)?;

    Ok(message_response("Order status updated."))
}

// Request DTOs

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of: Pending, Processed, Shipped, Completed, Cancelled
    pub status: String,
}
