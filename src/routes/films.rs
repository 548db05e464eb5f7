use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{validate_id_imdb, Film, FilmDetails},
    state::AppState,
};

use super::insertion_response;

/// Handler caching a film's metadata the first time a client posts it
pub async fn cache_film(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(details): Json<FilmDetails>,
) -> AppResult<(StatusCode, Json<Film>)> {
    details.validate()?;

    let insertion = state.store.cache_film(details).await?;
    if insertion.is_created() {
        tracing::info!(posted_by = caller.user_id, "Cached new film metadata");
    }

    Ok(insertion_response(insertion))
}

/// Handler for cached film metadata
pub async fn get_film(
    State(state): State<AppState>,
    Path(id_imdb): Path<String>,
) -> AppResult<Json<Film>> {
    validate_id_imdb(&id_imdb)?;

    let film = state
        .store
        .find_film(&id_imdb)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Film {}", id_imdb)))?;
    Ok(Json(film))
}
