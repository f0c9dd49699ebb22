use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::{
    auth::Identity, errors::ApiError, errors::ServiceError, services::users::RegisterInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use validator::Validate;

/// Creates the router for account endpoints.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/all", get(list_users))
        .route("/{id}", get(get_user))
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = RegisterInput {
        name: payload.name,
        email: payload.email,
        password: payload.password,
        role: payload.role,
    };

    let user = state
        .services
        .users
        .register(input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(user))
}

/// Authenticate and receive a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state
        .services
        .users
        .authenticate(&payload.email, &payload.password)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({ "token": token })))
}

/// Stateless logout acknowledgement; the bearer token simply expires
pub async fn logout() -> impl IntoResponse {
    success_response(serde_json::json!({ "message": "Logout successful" }))
}

/// List all accounts (administrator)
pub async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin().map_err(map_service_error)?;

    let users = state
        .services
        .users
        .list_users()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(users))
}

/// Get the caller's own account record. Another user's id is reported as
/// absent rather than forbidden.
pub async fn get_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let subject = identity.require_user().map_err(map_service_error)?;
    if id != subject {
        return Err(map_service_error(ServiceError::NotFound(
            "User not found".to_string(),
        )));
    }

    let user = state
        .services
        .users
        .get_user(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(user))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    /// "Admin" or "User"
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
