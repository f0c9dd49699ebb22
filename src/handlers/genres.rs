use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::Identity,
    errors::ApiError,
    services::catalog::{CreateGenreInput, UpdateGenreInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use validator::Validate;

/// Creates the router for genre endpoints. Reads are public; every mutation
/// is an administrator operation.
pub fn genre_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_genres).post(create_genre))
        .route(
            "/{id}",
            get(get_genre).put(update_genre).delete(delete_genre),
        )
}

/// List all genres
pub async fn get_genres(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let genres = state
        .services
        .catalog
        .list_genres()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(genres))
}

/// Get a genre by id
pub async fn get_genre(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let genre = state
        .services
        .catalog
        .get_genre(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(genre))
}

/// Create a genre (administrator)
pub async fn create_genre(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateGenreRequest>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin().map_err(map_service_error)?;
    validate_input(&payload)?;

    let genre = state
        .services
        .catalog
        .create_genre(CreateGenreInput { name: payload.name })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(genre))
}

/// Update a genre (administrator)
pub async fn update_genre(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateGenreRequest>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin().map_err(map_service_error)?;
    validate_input(&payload)?;

    state
        .services
        .catalog
        .update_genre(
            id,
            UpdateGenreInput {
                id: payload.id,
                name: payload.name,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Delete a genre (administrator); returns the removed genre
pub async fn delete_genre(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin().map_err(map_service_error)?;

    let genre = state
        .services
        .catalog
        .delete_genre(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "message": "Genre deleted successfully!",
        "deletedGenre": genre,
    })))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGenreRequest {
    #[validate(length(min = 1))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGenreRequest {
    pub id: i32,
    #[validate(length(min = 1))]
    pub name: String,
}
